//! QR code generator: live SVG preview and PNG/JPEG/SVG downloads.
//!
//! Both endpoints take multipart bodies so a logo can ride along with the
//! style fields.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Query},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::PageContext;
use crate::error::{AppError, Result};
use crate::filters;
use crate::qr::{DotStyle, ErrorCorrection, ExportFormat, Logo, QrOptions, export, render_svg};

/// Select option for templates.
#[derive(Clone)]
pub struct StyleOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "qr/index.html")]
pub struct QrIndexTemplate {
    pub page: PageContext,
    pub data: String,
    pub styles: Vec<StyleOption>,
    pub levels: Vec<&'static str>,
    pub defaults: QrOptions,
    pub min_size: u32,
    pub max_size: u32,
}

/// Preview fragment: the SVG or what is wrong with the options.
#[derive(Template, WebTemplate)]
#[template(path = "partials/qr_preview.html")]
pub struct QrPreviewTemplate {
    pub svg: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub data: Option<String>,
}

/// Display the generator.
pub async fn index(Query(query): Query<IndexQuery>, page: PageContext) -> impl IntoResponse {
    QrIndexTemplate {
        page,
        data: query.data.unwrap_or_default(),
        styles: DotStyle::ALL
            .iter()
            .map(|s| StyleOption {
                value: s.as_str(),
                label: s.label(),
            })
            .collect(),
        levels: ErrorCorrection::ALL.iter().map(|l| l.as_str()).collect(),
        defaults: QrOptions::default(),
        min_size: QrOptions::MIN_SIZE,
        max_size: QrOptions::MAX_SIZE,
    }
}

/// A parsed generator form.
struct QrRequest {
    options: QrOptions,
    format: Option<String>,
}

async fn read_request(mut multipart: Multipart) -> Result<QrRequest> {
    let mut pairs = Vec::new();
    let mut logo = None;
    let mut format = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "logo" {
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if bytes.is_empty() {
                continue;
            }
            if !content_type.starts_with("image/") {
                return Err(AppError::BadRequest("The logo must be an image".to_string()));
            }
            logo = Some(Logo {
                bytes: bytes.to_vec(),
                content_type,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if name == "format" {
            format = Some(value);
        } else {
            pairs.push((name, value));
        }
    }

    let mut options = QrOptions::from_pairs(&pairs)?;
    options.logo = logo;
    Ok(QrRequest { options, format })
}

/// Render the SVG preview (HTMX).
///
/// Option errors render inline so the form stays usable.
///
/// # Errors
///
/// Returns 400 for unreadable multipart bodies.
#[instrument(skip_all)]
pub async fn preview(multipart: Multipart) -> Result<Response> {
    let fragment = match read_request(multipart).await {
        Ok(request) => match render_svg(&request.options) {
            Ok(svg) => QrPreviewTemplate {
                svg: Some(svg),
                error: None,
            },
            Err(e) => QrPreviewTemplate {
                svg: None,
                error: Some(e.to_string()),
            },
        },
        Err(AppError::Qr(e)) => QrPreviewTemplate {
            svg: None,
            error: Some(e.to_string()),
        },
        Err(e) => return Err(e),
    };
    Ok(fragment.into_response())
}

/// Download the code in the requested format.
///
/// # Errors
///
/// Returns 400 for invalid options or an unknown format.
#[instrument(skip_all)]
pub async fn download(multipart: Multipart) -> Result<Response> {
    let request = read_request(multipart).await?;
    let format: ExportFormat = match request.format.as_deref().map(str::trim) {
        Some(f) if !f.is_empty() => f.parse()?,
        _ => ExportFormat::default(),
    };

    let options = request.options;
    let exported = tokio::task::spawn_blocking(move || export(&options, format))
        .await
        .map_err(|e| AppError::Internal(format!("QR export task failed: {e}")))??;

    let disposition = format!("attachment; filename=\"{}\"", exported.filename());
    Ok((
        [
            (header::CONTENT_TYPE, exported.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        exported.bytes,
    )
        .into_response())
}
