//! SVG rendering of a [`QrLayout`].

use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::shapes::{QrLayout, Shape, num};
use super::{QrError, QrOptions, parse_color};

/// Render the layout as a standalone SVG document.
///
/// Data modules are merged into one path; each corner square is its own
/// even-odd path so the hole stays open.
///
/// # Errors
///
/// Returns `QrError::InvalidColor` for colours that do not parse.
pub fn render(layout: &QrLayout, options: &QrOptions) -> Result<String, QrError> {
    let foreground = svg_color(&options.foreground)?;
    let background = svg_color(&options.background)?;
    let size = layout.size;

    let mut out = String::with_capacity(layout.shapes.len() * 48 + 512);
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}" shape-rendering="geometricPrecision">"#
    );
    if let Some(bg) = background {
        let _ = write!(out, r#"<rect width="{size}" height="{size}" fill="{bg}"/>"#);
    }

    let fill = foreground.unwrap_or_else(|| "#000000".to_string());
    let mut modules = String::new();
    for shape in &layout.shapes {
        match shape {
            Shape::Solid(rect) => modules.push_str(&rect.svg_path()),
            Shape::Frame { outer, inner } => {
                let _ = write!(
                    out,
                    r#"<path fill="{fill}" fill-rule="evenodd" d="{}{}"/>"#,
                    outer.svg_path(),
                    inner.svg_path()
                );
            }
        }
    }
    let _ = write!(out, r#"<path fill="{fill}" d="{modules}"/>"#);

    if let (Some(logo), Some(area)) = (&options.logo, layout.logo) {
        let _ = write!(
            out,
            r#"<image href="data:{};base64,{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid meet"/>"#,
            escape_attr(&logo.content_type),
            STANDARD.encode(&logo.bytes),
            num(area.x),
            num(area.y),
            num(area.side),
            num(area.side)
        );
    }

    out.push_str("</svg>");
    Ok(out)
}

/// Normalised hex colour, or `None` for transparent.
fn svg_color(raw: &str) -> Result<Option<String>, QrError> {
    let rgba = parse_color(raw)?;
    if rgba[3] == 0 {
        return Ok(None);
    }
    Ok(Some(format!("#{:02x}{:02x}{:02x}", rgba[0], rgba[1], rgba[2])))
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use qrcode::EcLevel;

    use super::*;
    use crate::qr::{DotStyle, Logo};

    fn options() -> QrOptions {
        QrOptions {
            data: "PG Cards".to_string(),
            foreground: "#123".to_string(),
            ..QrOptions::default()
        }
    }

    #[test]
    fn test_frames_use_even_odd() {
        let opts = options();
        let layout = QrLayout::build(&opts, EcLevel::M).unwrap();
        let svg = render(&layout, &opts).unwrap();
        assert_eq!(svg.matches(r#"fill-rule="evenodd""#).count(), 3);
        assert!(svg.contains(r##"fill="#112233""##));
        assert!(svg.contains(r##"<rect width="300" height="300" fill="#ffffff"/>"##));
    }

    #[test]
    fn test_transparent_background_has_no_rect() {
        let mut opts = options();
        opts.background = "transparent".to_string();
        let layout = QrLayout::build(&opts, EcLevel::M).unwrap();
        assert!(!render(&layout, &opts).unwrap().contains("<rect"));
    }

    #[test]
    fn test_logo_embedded_as_data_uri() {
        let mut opts = options();
        opts.dot_style = DotStyle::Dots;
        opts.logo = Some(Logo {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".to_string(),
        });
        let layout = QrLayout::build(&opts, EcLevel::H).unwrap();
        let svg = render(&layout, &opts).unwrap();
        assert!(svg.contains(r#"href="data:image/png;base64,iVBORw==""#));
    }
}
