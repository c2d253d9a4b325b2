//! Styled QR code generation and export.
//!
//! The QR matrix is turned into a flat list of [`shapes::Shape`]s once; the
//! same list renders to SVG markup ([`svg`]) and rasterises onto an RGBA
//! canvas ([`raster`]) for PNG and JPEG downloads. Finder patterns (the three
//! corner squares) are drawn separately from data modules so they can have
//! their own style.
//!
//! # Example
//!
//! ```rust
//! use pgcards_storefront::qr::{ExportFormat, QrOptions, export};
//!
//! let options = QrOptions {
//!     data: "https://pgcards.com/epic/6650a1b2".to_string(),
//!     ..QrOptions::default()
//! };
//! let svg = export(&options, ExportFormat::Svg).unwrap();
//! assert!(svg.bytes.starts_with(b"<svg"));
//! ```

pub mod raster;
pub mod shapes;
pub mod svg;

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, Rgba};
use thiserror::Error;

use crate::services::image_crop::{ImageError, encode_jpeg, encode_png, flatten_on_white};

pub use shapes::{QrLayout, Shape};

/// Longest payload accepted (fits a version 40 code at level L).
pub const MAX_DATA_LEN: usize = 2_000;

/// Errors that can occur while generating a QR code.
#[derive(Debug, Error)]
pub enum QrError {
    #[error("Enter some text or a link to encode")]
    EmptyData,

    #[error("Text is too long for a QR code ({0} characters)")]
    TooLong(usize),

    #[error("Could not encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("Invalid colour: {0}")]
    InvalidColor(String),

    #[error("Invalid option {name}: {value}")]
    InvalidOption { name: &'static str, value: String },

    #[error("Could not read logo: {0}")]
    Logo(image::ImageError),

    #[error("Could not encode image: {0}")]
    Image(#[from] ImageError),
}

// =============================================================================
// Options
// =============================================================================

/// Shape used for data modules, corner squares and corner dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotStyle {
    #[default]
    Square,
    Rounded,
    Dots,
    /// Leaf shape: two opposite corners rounded.
    Classy,
}

impl DotStyle {
    pub const ALL: [Self; 4] = [Self::Square, Self::Rounded, Self::Dots, Self::Classy];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Rounded => "rounded",
            Self::Dots => "dots",
            Self::Classy => "classy",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Square => "Square",
            Self::Rounded => "Rounded",
            Self::Dots => "Dots",
            Self::Classy => "Classy",
        }
    }
}

impl fmt::Display for DotStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DotStyle {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QrError::InvalidOption {
                name: "style",
                value: s.to_string(),
            })
    }
}

/// Error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    Low,
    #[default]
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::Quartile, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::Quartile => "Q",
            Self::High => "H",
        }
    }

    const fn level(self) -> qrcode::EcLevel {
        match self {
            Self::Low => qrcode::EcLevel::L,
            Self::Medium => qrcode::EcLevel::M,
            Self::Quartile => qrcode::EcLevel::Q,
            Self::High => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QrError::InvalidOption {
                name: "error_correction",
                value: s.to_string(),
            })
    }
}

/// A logo to place in the centre of the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Everything that shapes a generated code.
#[derive(Debug, Clone, PartialEq)]
pub struct QrOptions {
    pub data: String,
    /// Output width and height in pixels.
    pub size: u32,
    /// Quiet zone in pixels.
    pub margin: u32,
    pub dot_style: DotStyle,
    pub corner_square_style: DotStyle,
    pub corner_dot_style: DotStyle,
    /// `#rgb` or `#rrggbb`.
    pub foreground: String,
    /// `#rgb`, `#rrggbb` or `transparent`.
    pub background: String,
    pub logo: Option<Logo>,
    /// Logo box as a fraction of the code width.
    pub logo_size: f32,
    /// Background padding around the logo, in pixels.
    pub logo_margin: u32,
    pub error_correction: ErrorCorrection,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            data: String::new(),
            size: 300,
            margin: 10,
            dot_style: DotStyle::Square,
            corner_square_style: DotStyle::Square,
            corner_dot_style: DotStyle::Square,
            foreground: "#000000".to_string(),
            background: "#ffffff".to_string(),
            logo: None,
            logo_size: 0.3,
            logo_margin: 5,
            error_correction: ErrorCorrection::Medium,
        }
    }
}

impl QrOptions {
    pub const MIN_SIZE: u32 = 100;
    pub const MAX_SIZE: u32 = 2_000;

    /// Build from form fields. Unknown keys are ignored and blank values
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `QrError::InvalidOption` for values that do not parse.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, QrError> {
        let mut options = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() && key != "data" {
                continue;
            }
            match key.as_str() {
                "data" => options.data = value.to_string(),
                "size" => options.size = parse_number("size", value)?,
                "margin" => options.margin = parse_number("margin", value)?,
                "dot_style" => options.dot_style = value.parse()?,
                "corner_square_style" => options.corner_square_style = value.parse()?,
                "corner_dot_style" => options.corner_dot_style = value.parse()?,
                "foreground" => options.foreground = value.to_string(),
                "background" => options.background = value.to_string(),
                "logo_size" => options.logo_size = parse_number("logo_size", value)?,
                "logo_margin" => options.logo_margin = parse_number("logo_margin", value)?,
                "error_correction" => options.error_correction = value.parse()?,
                _ => {}
            }
        }
        Ok(options)
    }

    /// Check ranges and colours before rendering.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option found.
    pub fn validate(&self) -> Result<(), QrError> {
        let data_len = self.data.trim().chars().count();
        if data_len == 0 {
            return Err(QrError::EmptyData);
        }
        if data_len > MAX_DATA_LEN {
            return Err(QrError::TooLong(data_len));
        }
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&self.size) {
            return Err(QrError::InvalidOption {
                name: "size",
                value: self.size.to_string(),
            });
        }
        if self.margin > self.size / 4 {
            return Err(QrError::InvalidOption {
                name: "margin",
                value: self.margin.to_string(),
            });
        }
        if !(0.0..=0.5).contains(&self.logo_size) {
            return Err(QrError::InvalidOption {
                name: "logo_size",
                value: self.logo_size.to_string(),
            });
        }
        parse_color(&self.foreground)?;
        parse_color(&self.background)?;
        Ok(())
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, QrError> {
    value.parse().map_err(|_| QrError::InvalidOption {
        name,
        value: value.to_string(),
    })
}

/// Parse `#rgb`, `#rrggbb` or `transparent` into RGBA.
///
/// # Errors
///
/// Returns `QrError::InvalidColor` for anything else.
pub fn parse_color(raw: &str) -> Result<Rgba<u8>, QrError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("transparent") {
        return Ok(Rgba([255, 255, 255, 0]));
    }
    let invalid = || QrError::InvalidColor(raw.to_string());
    let hex = raw.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let mut out = [255u8; 4];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                *slot = channel(&c.to_string().repeat(2))?;
            }
            Ok(Rgba(out))
        }
        6 => Ok(Rgba([
            channel(hex.get(0..2).ok_or_else(invalid)?)?,
            channel(hex.get(2..4).ok_or_else(invalid)?)?,
            channel(hex.get(4..6).ok_or_else(invalid)?)?,
            255,
        ])),
        _ => Err(invalid()),
    }
}

// =============================================================================
// Export
// =============================================================================

/// Download formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Svg,
}

impl ExportFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            _ => Err(QrError::InvalidOption {
                name: "format",
                value: s.to_string(),
            }),
        }
    }
}

/// An encoded QR image ready to download.
#[derive(Debug, Clone)]
pub struct QrExport {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
}

impl QrExport {
    /// Suggested download filename.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("qr-code.{}", self.format.extension())
    }
}

/// Render the SVG markup for a preview.
///
/// # Errors
///
/// Returns an error if the options are invalid or the data cannot be encoded.
pub fn render_svg(options: &QrOptions) -> Result<String, QrError> {
    options.validate()?;
    let layout = QrLayout::build(options, options.error_correction.level())?;
    svg::render(&layout, options)
}

/// Render and encode a code in the requested format.
///
/// # Errors
///
/// Returns an error if the options are invalid, the data cannot be encoded,
/// or the logo cannot be decoded.
pub fn export(options: &QrOptions, format: ExportFormat) -> Result<QrExport, QrError> {
    options.validate()?;
    let layout = QrLayout::build(options, options.error_correction.level())?;

    let bytes = match format {
        ExportFormat::Svg => svg::render(&layout, options)?.into_bytes(),
        ExportFormat::Png => {
            let canvas = DynamicImage::ImageRgba8(raster::render(&layout, options)?);
            encode_png(&DynamicImage::ImageRgb8(flatten_on_white(&canvas)))?
        }
        ExportFormat::Jpeg => {
            let canvas = raster::render(&layout, options)?;
            encode_jpeg(&DynamicImage::ImageRgba8(canvas))?
        }
    };

    Ok(QrExport { bytes, format })
}
