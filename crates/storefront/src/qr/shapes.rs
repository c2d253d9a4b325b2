//! QR matrix to drawable shapes.

use qrcode::{Color, EcLevel, QrCode};

use super::{DotStyle, QrError, QrOptions};

/// Side of a finder pattern, in modules.
const FINDER: usize = 7;

/// Axis-aligned rectangle with per-corner radii (top-left, top-right,
/// bottom-right, bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radii: [f64; 4],
}

impl RoundedRect {
    fn new(x: f64, y: f64, width: f64, height: f64, radii: [f64; 4]) -> Self {
        let max = width.min(height) / 2.0;
        Self {
            x,
            y,
            width,
            height,
            radii: radii.map(|r| r.clamp(0.0, max)),
        }
    }

    /// Whether a point lies inside the rounded outline.
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        if px < x0 || px > x1 || py < y0 || py > y1 {
            return false;
        }
        let [tl, tr, br, bl] = self.radii;
        let corners = [
            (tl, x0 + tl, y0 + tl, px < x0 + tl && py < y0 + tl),
            (tr, x1 - tr, y0 + tr, px > x1 - tr && py < y0 + tr),
            (br, x1 - br, y1 - br, px > x1 - br && py > y1 - br),
            (bl, x0 + bl, y1 - bl, px < x0 + bl && py > y1 - bl),
        ];
        corners
            .iter()
            .filter(|(r, .., in_corner)| *r > 0.0 && *in_corner)
            .all(|(r, cx, cy, _)| (px - cx).hypot(py - cy) <= *r)
    }

    /// SVG path data for the outline, clockwise.
    #[must_use]
    pub fn svg_path(&self) -> String {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.width, self.y + self.height);
        let [tl, tr, br, bl] = self.radii;
        let mut d = format!("M{} {}H{}", num(x0 + tl), num(y0), num(x1 - tr));
        if tr > 0.0 {
            d.push_str(&arc(tr, x1, y0 + tr));
        }
        d.push_str(&format!("V{}", num(y1 - br)));
        if br > 0.0 {
            d.push_str(&arc(br, x1 - br, y1));
        }
        d.push_str(&format!("H{}", num(x0 + bl)));
        if bl > 0.0 {
            d.push_str(&arc(bl, x0, y1 - bl));
        }
        d.push_str(&format!("V{}", num(y0 + tl)));
        if tl > 0.0 {
            d.push_str(&arc(tl, x0 + tl, y0));
        }
        d.push('Z');
        d
    }
}

fn arc(r: f64, x: f64, y: f64) -> String {
    format!("A{} {} 0 0 1 {} {}", num(r), num(r), num(x), num(y))
}

/// Compact number formatting for SVG (at most two decimals).
pub(crate) fn num(v: f64) -> String {
    let s = format!("{v:.2}");
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" => "0".to_string(),
        t => t.to_string(),
    }
}

/// Something to fill with the foreground colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// A data module or a corner dot.
    Solid(RoundedRect),
    /// A corner square: the outer outline minus the inner one.
    Frame {
        outer: RoundedRect,
        inner: RoundedRect,
    },
}

impl Shape {
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        match self {
            Self::Solid(rect) => rect.contains(px, py),
            Self::Frame { outer, inner } => outer.contains(px, py) && !inner.contains(px, py),
        }
    }

    /// Bounding box as `(x, y, width, height)`.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let rect = match self {
            Self::Solid(rect) | Self::Frame { outer: rect, .. } => rect,
        };
        (rect.x, rect.y, rect.width, rect.height)
    }
}

/// Where the logo goes, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoBox {
    pub x: f64,
    pub y: f64,
    pub side: f64,
}

/// A QR code laid out in output pixel space.
#[derive(Debug, Clone)]
pub struct QrLayout {
    pub size: u32,
    /// Modules per side.
    pub modules: usize,
    pub module_size: f64,
    pub shapes: Vec<Shape>,
    pub logo: Option<LogoBox>,
}

impl QrLayout {
    /// Encode the data and lay out every shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not fit a QR code at `level`.
    pub fn build(options: &QrOptions, level: EcLevel) -> Result<Self, QrError> {
        let code = QrCode::with_error_correction_level(options.data.trim().as_bytes(), level)?;
        let n = code.width();
        let colors = code.to_colors();
        let dark = |x: isize, y: isize| -> bool {
            let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
                return false;
            };
            x < n && y < n && colors.get(y * n + x) == Some(&Color::Dark)
        };

        let size = f64::from(options.size);
        let origin = f64::from(options.margin);
        let inner = size - 2.0 * origin;
        #[allow(clippy::cast_precision_loss)]
        let s = inner / n as f64;

        let logo = options.logo.as_ref().map(|_| {
            let side = inner * f64::from(options.logo_size);
            LogoBox {
                x: origin + (inner - side) / 2.0,
                y: origin + (inner - side) / 2.0,
                side,
            }
        });
        let hidden = logo.map(|b| {
            let pad = f64::from(options.logo_margin);
            (b.x - pad, b.y - pad, b.side + 2.0 * pad)
        });

        let mut shapes = Vec::new();
        for (fx, fy) in [(0, 0), (n - FINDER, 0), (0, n - FINDER)] {
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = (origin + fx as f64 * s, origin + fy as f64 * s);
            shapes.push(corner_square(x, y, s, options.corner_square_style));
            shapes.push(corner_dot(x + 2.0 * s, y + 2.0 * s, s, options.corner_dot_style));
        }

        for my in 0..n {
            for mx in 0..n {
                if in_finder(mx, my, n) {
                    continue;
                }
                #[allow(clippy::cast_possible_wrap)]
                let (ix, iy) = (mx as isize, my as isize);
                if !dark(ix, iy) {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let (x, y) = (origin + mx as f64 * s, origin + my as f64 * s);
                if let Some((hx, hy, side)) = hidden
                    && x < hx + side
                    && x + s > hx
                    && y < hy + side
                    && y + s > hy
                {
                    continue;
                }
                let neighbours = Neighbours {
                    top: dark(ix, iy - 1),
                    right: dark(ix + 1, iy),
                    bottom: dark(ix, iy + 1),
                    left: dark(ix - 1, iy),
                };
                shapes.push(Shape::Solid(module(x, y, s, options.dot_style, neighbours)));
            }
        }

        Ok(Self {
            size: options.size,
            modules: n,
            module_size: s,
            shapes,
            logo,
        })
    }
}

fn in_finder(x: usize, y: usize, n: usize) -> bool {
    let near = |v: usize| v < FINDER;
    let far = |v: usize| v >= n - FINDER;
    (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y))
}

#[derive(Debug, Clone, Copy)]
struct Neighbours {
    top: bool,
    right: bool,
    bottom: bool,
    left: bool,
}

fn module(x: f64, y: f64, s: f64, style: DotStyle, n: Neighbours) -> RoundedRect {
    let half = s / 2.0;
    let round = |a: bool, b: bool| if !a && !b { half } else { 0.0 };
    match style {
        DotStyle::Square => RoundedRect::new(x, y, s, s, [0.0; 4]),
        DotStyle::Rounded => RoundedRect::new(
            x,
            y,
            s,
            s,
            [
                round(n.top, n.left),
                round(n.top, n.right),
                round(n.bottom, n.right),
                round(n.bottom, n.left),
            ],
        ),
        DotStyle::Dots => {
            let inset = s * 0.05;
            let d = s - 2.0 * inset;
            RoundedRect::new(x + inset, y + inset, d, d, [d / 2.0; 4])
        }
        DotStyle::Classy => RoundedRect::new(
            x,
            y,
            s,
            s,
            [round(n.top, n.left), 0.0, round(n.bottom, n.right), 0.0],
        ),
    }
}

fn corner_square(x: f64, y: f64, s: f64, style: DotStyle) -> Shape {
    let (outer, inner) = match style {
        DotStyle::Square => ([0.0; 4], [0.0; 4]),
        DotStyle::Rounded => ([2.0 * s; 4], [1.5 * s; 4]),
        DotStyle::Dots => ([3.5 * s; 4], [2.5 * s; 4]),
        DotStyle::Classy => (
            [2.5 * s, 0.0, 2.5 * s, 0.0],
            [1.5 * s, 0.0, 1.5 * s, 0.0],
        ),
    };
    Shape::Frame {
        outer: RoundedRect::new(x, y, 7.0 * s, 7.0 * s, outer),
        inner: RoundedRect::new(x + s, y + s, 5.0 * s, 5.0 * s, inner),
    }
}

fn corner_dot(x: f64, y: f64, s: f64, style: DotStyle) -> Shape {
    let radii = match style {
        DotStyle::Square => [0.0; 4],
        DotStyle::Rounded => [0.75 * s; 4],
        DotStyle::Dots => [1.5 * s; 4],
        DotStyle::Classy => [1.5 * s, 0.0, 1.5 * s, 0.0],
    };
    Shape::Solid(RoundedRect::new(x, y, 3.0 * s, 3.0 * s, radii))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::qr::Logo;

    fn layout(options: &QrOptions) -> QrLayout {
        QrLayout::build(options, EcLevel::H).unwrap()
    }

    fn options() -> QrOptions {
        QrOptions {
            data: "https://pgcards.com/standard/6650a1b2".to_string(),
            ..QrOptions::default()
        }
    }

    #[test]
    fn test_three_finder_patterns() {
        let l = layout(&options());
        let frames = l
            .shapes
            .iter()
            .filter(|s| matches!(s, Shape::Frame { .. }))
            .count();
        assert_eq!(frames, 3);
        assert!(l.modules >= 21);
        assert!((l.module_size * l.modules as f64 - 280.0).abs() < 1e-9);
    }

    #[test]
    fn test_logo_hides_modules_behind_it() {
        let plain = layout(&options());
        let mut with_logo = options();
        with_logo.logo = Some(Logo {
            bytes: Vec::new(),
            content_type: "image/png".to_string(),
        });
        with_logo.logo_size = 0.3;
        let logo = layout(&with_logo);

        assert!(logo.shapes.len() < plain.shapes.len());
        let b = logo.logo.unwrap();
        let centre = (b.x + b.side / 2.0, b.y + b.side / 2.0);
        assert!(!logo.shapes.iter().any(|s| s.contains(centre.0, centre.1)));
    }

    #[test]
    fn test_rounded_rect_corners() {
        let circle = RoundedRect::new(0.0, 0.0, 10.0, 10.0, [5.0; 4]);
        assert!(circle.contains(5.0, 5.0));
        assert!(!circle.contains(0.5, 0.5));
        let square = RoundedRect::new(0.0, 0.0, 10.0, 10.0, [0.0; 4]);
        assert!(square.contains(0.5, 0.5));
    }

    #[test]
    fn test_radii_clamped_to_half_side() {
        let rect = RoundedRect::new(0.0, 0.0, 4.0, 10.0, [9.0; 4]);
        assert_eq!(rect.radii, [2.0; 4]);
    }

    #[test]
    fn test_svg_path_closes() {
        let d = RoundedRect::new(1.0, 2.0, 3.0, 3.0, [0.0; 4]).svg_path();
        assert_eq!(d, "M1 2H4V5H1V2Z");
    }

    #[test]
    fn test_num_trims() {
        assert_eq!(num(3.0), "3");
        assert_eq!(num(2.5), "2.5");
        assert_eq!(num(1.0 / 3.0), "0.33");
        assert_eq!(num(0.0), "0");
        assert_eq!(num(10.0), "10");
    }
}
