//! QR export, the offline counterpart of the generator page.

use std::path::{Path, PathBuf};

use clap::Args;
use pgcards_storefront::qr::{self, ExportFormat, Logo, QrOptions};
use tracing::info;

use super::{CliError, write_output};

#[derive(Debug, Args)]
pub struct QrArgs {
    /// Text or link to encode
    pub data: String,

    /// Output file; the extension picks the format unless `--format` is set
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// `png`, `jpeg` or `svg`
    #[arg(short, long)]
    pub format: Option<String>,

    /// Width and height in pixels
    #[arg(long, default_value_t = 300)]
    pub size: u32,

    /// Quiet zone in pixels
    #[arg(long, default_value_t = 10)]
    pub margin: u32,

    /// `square`, `rounded`, `dots` or `classy`
    #[arg(long, default_value = "square")]
    pub dot_style: String,

    #[arg(long, default_value = "square")]
    pub corner_square_style: String,

    #[arg(long, default_value = "square")]
    pub corner_dot_style: String,

    #[arg(long, default_value = "#000000")]
    pub foreground: String,

    /// Colour or `transparent`
    #[arg(long, default_value = "#ffffff")]
    pub background: String,

    /// `L`, `M`, `Q` or `H`
    #[arg(long, default_value = "M")]
    pub error_correction: String,

    /// Image placed in the centre
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Logo width as a fraction of the code
    #[arg(long, default_value_t = 0.3)]
    pub logo_size: f32,

    /// Padding around the logo in pixels
    #[arg(long, default_value_t = 5)]
    pub logo_margin: u32,
}

impl QrArgs {
    /// Same parsing as the generator form, so both reject the same input.
    fn options(&self) -> Result<QrOptions, CliError> {
        let pairs: Vec<(String, String)> = [
            ("data", self.data.clone()),
            ("size", self.size.to_string()),
            ("margin", self.margin.to_string()),
            ("dot_style", self.dot_style.clone()),
            ("corner_square_style", self.corner_square_style.clone()),
            ("corner_dot_style", self.corner_dot_style.clone()),
            ("foreground", self.foreground.clone()),
            ("background", self.background.clone()),
            ("error_correction", self.error_correction.clone()),
            ("logo_size", self.logo_size.to_string()),
            ("logo_margin", self.logo_margin.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Ok(QrOptions::from_pairs(&pairs)?)
    }

    fn format(&self) -> Result<ExportFormat, CliError> {
        if let Some(format) = &self.format {
            return Ok(format.parse()?);
        }
        Ok(self
            .output
            .as_deref()
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
            .unwrap_or_default())
    }
}

/// Render and write the code.
pub async fn export(args: QrArgs) -> Result<(), CliError> {
    let mut options = args.options()?;
    let format = args.format()?;

    if let Some(path) = &args.logo {
        let bytes = tokio::fs::read(path).await.map_err(|source| CliError::Io {
            path: path.clone(),
            source,
        })?;
        options.logo = Some(Logo {
            content_type: logo_content_type(path)?.to_string(),
            bytes,
        });
    }

    let export = tokio::task::spawn_blocking(move || qr::export(&options, format))
        .await
        .map_err(|e| CliError::Invalid(format!("render task failed: {e}")))??;

    let output = args.output.unwrap_or_else(|| PathBuf::from(export.filename()));
    write_output(Some(&output), &export.bytes).await?;
    info!(path = %output.display(), bytes = export.bytes.len(), "QR code written");
    Ok(())
}

fn logo_content_type(path: &Path) -> Result<&'static str, CliError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        _ => Err(CliError::Invalid(format!(
            "{}: the logo must be a PNG, JPEG, WebP or GIF image",
            path.display()
        ))),
    }
}
