//! Server-side cropping for profile images.
//!
//! The browser posts the original file together with the rectangle the
//! visitor picked. Each target has a fixed treatment:
//!
//! | target | aspect | output |
//! |---|---|---|
//! | profile picture | 1:1, circular alpha mask | PNG, max 512px |
//! | cover image | 16:9 | JPEG, max 1600x900 |
//! | carousel image | uncropped | JPEG re-encode, max 1600px |

use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use super::image_host::UploadFile;

/// Largest upload accepted before decoding.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const JPEG_QUALITY: u8 = 88;

/// Errors that can occur while cropping an upload.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Could not read image: {0}")]
    Decode(image::ImageError),

    #[error("Could not encode image: {0}")]
    Encode(image::ImageError),

    #[error("Image is larger than {max} bytes")]
    TooLarge { max: usize },

    #[error("Crop area is empty")]
    EmptyCrop,

    #[error("Unknown image field: {0}")]
    UnknownTarget(String),
}

/// Where a cropped image will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropTarget {
    ProfilePicture,
    Cover,
    Carousel,
}

impl CropTarget {
    /// Required width/height ratio, `None` for free-form.
    #[must_use]
    pub const fn aspect(self) -> Option<(u32, u32)> {
        match self {
            Self::ProfilePicture => Some((1, 1)),
            Self::Cover => Some((16, 9)),
            Self::Carousel => None,
        }
    }

    const fn max_size(self) -> (u32, u32) {
        match self {
            Self::ProfilePicture => (512, 512),
            Self::Cover => (1600, 900),
            Self::Carousel => (1600, 1600),
        }
    }

    /// Form field name the target is posted as.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::ProfilePicture => "profile_picture",
            Self::Cover => "cover_image",
            Self::Carousel => "carousel_image",
        }
    }
}

impl FromStr for CropTarget {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile_picture" => Ok(Self::ProfilePicture),
            "cover_image" | "cover" => Ok(Self::Cover),
            "carousel_image" | "carousel" => Ok(Self::Carousel),
            other => Err(ImageError::UnknownTarget(other.to_string())),
        }
    }
}

/// Crop rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Clamp to the image bounds. A zero-sized rectangle means "whole image".
    #[must_use]
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        if self.width == 0 || self.height == 0 {
            return Self {
                x: 0,
                y: 0,
                width,
                height,
            };
        }
        let x = self.x.min(width.saturating_sub(1));
        let y = self.y.min(height.saturating_sub(1));
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    /// Shrink the longer side around the centre until the ratio matches.
    #[must_use]
    pub fn fit_aspect(self, (aw, ah): (u32, u32)) -> Self {
        let (w, h) = (u64::from(self.width), u64::from(self.height));
        let (aw, ah) = (u64::from(aw), u64::from(ah));
        if w * ah > h * aw {
            let new_w = (h * aw / ah).max(1);
            let trim = (w - new_w) / 2;
            Self {
                x: self.x + to_u32(trim),
                width: to_u32(new_w),
                ..self
            }
        } else {
            let new_h = (w * ah / aw).max(1);
            let trim = (h - new_h) / 2;
            Self {
                y: self.y + to_u32(trim),
                height: to_u32(new_h),
                ..self
            }
        }
    }
}

fn to_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Crop and re-encode an upload for `target`.
///
/// # Errors
///
/// Returns an error if the bytes are too large, cannot be decoded, or the
/// crop area is empty.
pub fn crop_image(
    bytes: &[u8],
    rect: CropRect,
    target: CropTarget,
    stem: &str,
) -> Result<UploadFile, ImageError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge {
            max: MAX_UPLOAD_BYTES,
        });
    }
    let source = image::load_from_memory(bytes).map_err(ImageError::Decode)?;
    let (width, height) = (source.width(), source.height());
    if width == 0 || height == 0 {
        return Err(ImageError::EmptyCrop);
    }

    let cropped = match target.aspect() {
        Some(aspect) => {
            let area = rect.clamp_to(width, height).fit_aspect(aspect);
            if area.width == 0 || area.height == 0 {
                return Err(ImageError::EmptyCrop);
            }
            source.crop_imm(area.x, area.y, area.width, area.height)
        }
        None => source,
    };

    let (max_w, max_h) = target.max_size();
    let sized = if cropped.width() > max_w || cropped.height() > max_h {
        cropped.resize(max_w, max_h, FilterType::Lanczos3)
    } else {
        cropped
    };

    match target {
        CropTarget::ProfilePicture => {
            let masked = circular_mask(sized.to_rgba8());
            Ok(UploadFile {
                bytes: encode_png(&DynamicImage::ImageRgba8(masked))?,
                filename: format!("{stem}.png"),
                content_type: "image/png".to_string(),
            })
        }
        CropTarget::Cover | CropTarget::Carousel => Ok(UploadFile {
            bytes: encode_jpeg(&sized)?,
            filename: format!("{stem}.jpg"),
            content_type: "image/jpeg".to_string(),
        }),
    }
}

/// Make everything outside the inscribed circle transparent.
fn circular_mask(mut img: RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let cx = f64::from(w) / 2.0;
    let cy = f64::from(h) / 2.0;
    let radius = cx.min(cy);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - cx;
        let dy = f64::from(y) + 0.5 - cy;
        let distance = dx.hypot(dy);
        // One pixel of feathering along the edge.
        let coverage = (radius - distance + 0.5).clamp(0.0, 1.0);
        let Rgba([r, g, b, a]) = *pixel;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let alpha = (f64::from(a) * coverage).round() as u8;
        *pixel = Rgba([r, g, b, alpha]);
    }
    img
}

pub(crate) fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(ImageError::Encode)?;
    Ok(out.into_inner())
}

/// Composite onto an opaque white background.
pub(crate) fn flatten_on_white(img: &DynamicImage) -> image::RgbImage {
    let rgba = img.to_rgba8();
    let mut flat = image::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, Rgba([r, g, b, a])) in rgba.enumerate_pixels().map(|(x, y, p)| (x, y, *p)) {
        let blend = |c: u8| -> u8 {
            let alpha = u16::from(a);
            let value = (u16::from(c) * alpha + 255 * (255 - alpha)) / 255;
            u8::try_from(value).unwrap_or(u8::MAX)
        };
        flat.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    flat
}

/// JPEG has no alpha channel: flatten onto white first.
pub(crate) fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let flat = flatten_on_white(img);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&flat)
        .map_err(ImageError::Encode)?;
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    #[test]
    fn test_profile_picture_is_square_png_with_transparent_corners() {
        let out = crop_image(&png(400, 300), CropRect::default(), CropTarget::ProfilePicture, "me")
            .unwrap();
        assert_eq!(out.content_type, "image/png");
        assert_eq!(out.filename, "me.png");

        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.width(), decoded.height());
        assert_eq!(decoded.width(), 300);
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(150, 150)[3], 255);
    }

    #[test]
    fn test_cover_is_sixteen_by_nine() {
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 400,
            height: 300,
        };
        let out = crop_image(&png(400, 300), rect, CropTarget::Cover, "cover").unwrap();
        assert_eq!(out.content_type, "image/jpeg");

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 225));
    }

    #[test]
    fn test_carousel_keeps_shape_and_caps_size() {
        let out = crop_image(&png(2000, 1000), CropRect::default(), CropTarget::Carousel, "c0")
            .unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1600, 800));
    }

    #[test]
    fn test_rect_clamped_to_bounds() {
        let rect = CropRect {
            x: 350,
            y: 10,
            width: 500,
            height: 500,
        };
        assert_eq!(
            rect.clamp_to(400, 300),
            CropRect {
                x: 350,
                y: 10,
                width: 50,
                height: 290
            }
        );
    }

    #[test]
    fn test_fit_aspect_centres() {
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 200,
            height: 100,
        };
        assert_eq!(
            rect.fit_aspect((1, 1)),
            CropRect {
                x: 50,
                y: 0,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn test_rejects_garbage_and_unknown_targets() {
        assert!(matches!(
            crop_image(b"not an image", CropRect::default(), CropTarget::Cover, "x"),
            Err(ImageError::Decode(_))
        ));
        assert!(matches!(
            "banner".parse::<CropTarget>(),
            Err(ImageError::UnknownTarget(_))
        ));
    }
}
