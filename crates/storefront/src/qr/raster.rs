//! Rasterisation of a [`QrLayout`] onto an RGBA canvas.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::shapes::QrLayout;
use super::{QrError, QrOptions, parse_color};

/// Samples per pixel axis when testing shape coverage.
const SUPERSAMPLE: u32 = 3;

/// Draw every shape, then the logo, onto a `size` x `size` canvas.
///
/// # Errors
///
/// Returns an error for invalid colours or a logo that cannot be decoded.
pub fn render(layout: &QrLayout, options: &QrOptions) -> Result<RgbaImage, QrError> {
    let foreground = parse_color(&options.foreground)?;
    let background = parse_color(&options.background)?;
    let mut canvas = RgbaImage::from_pixel(layout.size, layout.size, background);

    for shape in &layout.shapes {
        let (x, y, w, h) = shape.bounds();
        let (x0, y0) = (pixel_floor(x), pixel_floor(y));
        let (x1, y1) = (
            pixel_ceil(x + w).min(layout.size),
            pixel_ceil(y + h).min(layout.size),
        );
        for py in y0..y1 {
            for px in x0..x1 {
                let hits = coverage(|sx, sy| shape.contains(sx, sy), px, py);
                if hits > 0 {
                    let pixel = canvas.get_pixel_mut(px, py);
                    *pixel = blend(*pixel, foreground, hits);
                }
            }
        }
    }

    if let (Some(logo), Some(area)) = (&options.logo, layout.logo) {
        let decoded = image::load_from_memory(&logo.bytes).map_err(QrError::Logo)?;
        let side = pixel_floor(area.side).max(1);
        let scaled = decoded.resize(side, side, FilterType::Lanczos3).to_rgba8();
        let offset_x = area.x + (area.side - f64::from(scaled.width())) / 2.0;
        let offset_y = area.y + (area.side - f64::from(scaled.height())) / 2.0;
        #[allow(clippy::cast_possible_truncation)]
        imageops::overlay(
            &mut canvas,
            &scaled,
            offset_x.round() as i64,
            offset_y.round() as i64,
        );
    }

    Ok(canvas)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_floor(v: f64) -> u32 {
    v.max(0.0).floor() as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_ceil(v: f64) -> u32 {
    v.max(0.0).ceil() as u32
}

/// Number of sub-samples of pixel (`px`, `py`) inside the shape.
fn coverage(inside: impl Fn(f64, f64) -> bool, px: u32, py: u32) -> u32 {
    let step = 1.0 / f64::from(SUPERSAMPLE);
    let mut hits = 0;
    for j in 0..SUPERSAMPLE {
        for i in 0..SUPERSAMPLE {
            let sx = f64::from(px) + (f64::from(i) + 0.5) * step;
            let sy = f64::from(py) + (f64::from(j) + 0.5) * step;
            if inside(sx, sy) {
                hits += 1;
            }
        }
    }
    hits
}

/// Mix `fg` over `bg` by `hits` out of `SUPERSAMPLE²` samples.
fn blend(bg: Rgba<u8>, fg: Rgba<u8>, hits: u32) -> Rgba<u8> {
    let total = SUPERSAMPLE * SUPERSAMPLE;
    let mix = |b: u8, f: u8| -> u8 {
        let value = (u32::from(f) * hits + u32::from(b) * (total - hits)) / total;
        u8::try_from(value).unwrap_or(u8::MAX)
    };
    Rgba([
        mix(bg[0], fg[0]),
        mix(bg[1], fg[1]),
        mix(bg[2], fg[2]),
        mix(bg[3], fg[3]),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};
    use qrcode::EcLevel;

    use super::*;
    use crate::qr::Logo;

    fn options() -> QrOptions {
        QrOptions {
            data: "https://pgcards.com".to_string(),
            ..QrOptions::default()
        }
    }

    #[test]
    fn test_finder_corner_is_foreground_and_margin_background() {
        let opts = options();
        let layout = QrLayout::build(&opts, EcLevel::M).unwrap();
        let canvas = render(&layout, &opts).unwrap();

        assert_eq!(*canvas.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
        let inside_finder = 10 + (layout.module_size / 2.0) as u32;
        assert_eq!(
            *canvas.get_pixel(inside_finder, inside_finder),
            Rgba([0, 0, 0, 255])
        );
    }

    #[test]
    fn test_logo_painted_in_centre() {
        let mut logo_png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])))
            .write_to(&mut logo_png, ImageFormat::Png)
            .unwrap();

        let mut opts = options();
        opts.logo = Some(Logo {
            bytes: logo_png.into_inner(),
            content_type: "image/png".to_string(),
        });
        let layout = QrLayout::build(&opts, EcLevel::H).unwrap();
        let canvas = render(&layout, &opts).unwrap();
        assert_eq!(*canvas.get_pixel(150, 150), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_bad_logo_is_an_error() {
        let mut opts = options();
        opts.logo = Some(Logo {
            bytes: b"nope".to_vec(),
            content_type: "image/png".to_string(),
        });
        let layout = QrLayout::build(&opts, EcLevel::H).unwrap();
        assert!(matches!(render(&layout, &opts), Err(QrError::Logo(_))));
    }
}
