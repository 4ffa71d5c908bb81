use std::fmt;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// Integer pixel position, `x` = column, `y` = row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

impl PixelPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// `(row, col)` if the point lies inside an image of `(height, width)`.
    pub fn index_in(&self, (height, width): (usize, usize)) -> Option<(usize, usize)> {
        let row = usize::try_from(self.y).ok()?;
        let col = usize::try_from(self.x).ok()?;
        (row < height && col < width).then_some((row, col))
    }
}

/// Kind of region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoiKind {
    Rectangle,
    Point,
    MultiPoint,
}

impl RoiKind {
    pub fn default_color(&self) -> RoiColor {
        match self {
            Self::Rectangle => RoiColor::RED,
            Self::Point => RoiColor::GREEN,
            Self::MultiPoint => RoiColor::ORANGE,
        }
    }
}

impl fmt::Display for RoiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rectangle => write!(f, "Rectangle"),
            Self::Point => write!(f, "Point"),
            Self::MultiPoint => write!(f, "MultiPoint"),
        }
    }
}

/// RGB display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiColor(pub [u8; 3]);

impl RoiColor {
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const ORANGE: Self = Self([255, 165, 0]);
}

impl fmt::Display for RoiColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Raw click span of a rectangle selection, kept for display only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectangleBoundary {
    /// Inclusive span of the clicked frame.
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
    /// Pixel under the pointer when the drag started.
    pub first_click: PixelPoint,
    /// Pixel under the pointer when the drag ended.
    pub last_click: PixelPoint,
}

/// Interior box of a rectangle selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectangleCoords {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub boundary: Option<RectangleBoundary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoiGeometry {
    Rectangle(RectangleCoords),
    Point(PixelPoint),
    MultiPoint { points: Vec<PixelPoint> },
}

impl RoiGeometry {
    pub fn kind(&self) -> RoiKind {
        match self {
            Self::Rectangle(_) => RoiKind::Rectangle,
            Self::Point(_) => RoiKind::Point,
            Self::MultiPoint { .. } => RoiKind::MultiPoint,
        }
    }
}

/// Half-open pixel box `[x_min, x_max) x [y_min, y_max)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

/// A completed region of interest. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct Roi {
    label: String,
    geometry: RoiGeometry,
    color: RoiColor,
}

/// Flat export form of a ROI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    pub label: String,
    pub kind: RoiKind,
    pub coordinates: RoiGeometry,
    pub color: RoiColor,
}

impl Roi {
    /// Create a ROI with the default color of its kind.
    ///
    /// Rectangles must have a positive width and height; multi-point
    /// selections must hold at least one point.
    pub fn new(label: impl Into<String>, geometry: RoiGeometry) -> Option<Self> {
        let valid = match &geometry {
            RoiGeometry::Rectangle(r) => r.width > 0 && r.height > 0,
            RoiGeometry::Point(_) => true,
            RoiGeometry::MultiPoint { points } => !points.is_empty(),
        };
        if !valid {
            return None;
        }
        let color = geometry.kind().default_color();
        Some(Self {
            label: label.into(),
            geometry,
            color,
        })
    }

    pub fn with_color(mut self, color: RoiColor) -> Self {
        self.color = color;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn geometry(&self) -> &RoiGeometry {
        &self.geometry
    }

    pub fn color(&self) -> RoiColor {
        self.color
    }

    pub fn kind(&self) -> RoiKind {
        self.geometry.kind()
    }

    pub fn bounds(&self) -> Bounds {
        match &self.geometry {
            RoiGeometry::Rectangle(r) => Bounds {
                x_min: r.x,
                y_min: r.y,
                x_max: r.x.saturating_add(r.width),
                y_max: r.y.saturating_add(r.height),
            },
            RoiGeometry::Point(p) => Bounds {
                x_min: p.x,
                y_min: p.y,
                x_max: p.x.saturating_add(1),
                y_max: p.y.saturating_add(1),
            },
            RoiGeometry::MultiPoint { points } => {
                let x_min = points.iter().map(|p| p.x).min().unwrap_or(0);
                let y_min = points.iter().map(|p| p.y).min().unwrap_or(0);
                let x_max = points.iter().map(|p| p.x.saturating_add(1)).max().unwrap_or(0);
                let y_max = points.iter().map(|p| p.y.saturating_add(1)).max().unwrap_or(0);
                Bounds {
                    x_min,
                    y_min,
                    x_max,
                    y_max,
                }
            }
        }
    }

    /// Boolean mask over an image of `(height, width)`.
    ///
    /// Always computed fresh, so a ROI drawn on one image applies to any
    /// image of the same shape.
    pub fn mask(&self, (height, width): (usize, usize)) -> Array2<bool> {
        let mut mask = Array2::from_elem((height, width), false);
        if height == 0 || width == 0 {
            return mask;
        }

        match &self.geometry {
            RoiGeometry::Rectangle(r) => {
                let (h, w) = (height as i64, width as i64);
                let x0 = r.x.clamp(0, w - 1);
                let y0 = r.y.clamp(0, h - 1);
                let x1 = r.x.saturating_add(r.width).clamp(0, w).max(x0);
                let y1 = r.y.saturating_add(r.height).clamp(0, h).max(y0);
                mask.slice_mut(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize])
                    .fill(true);
            }
            RoiGeometry::Point(p) => {
                if let Some(idx) = p.index_in((height, width)) {
                    mask[idx] = true;
                }
            }
            RoiGeometry::MultiPoint { points } => {
                for idx in points.iter().filter_map(|p| p.index_in((height, width))) {
                    mask[idx] = true;
                }
            }
        }
        mask
    }

    /// Every pixel the ROI covers, not clipped to any image.
    ///
    /// Rectangles are enumerated row by row.
    pub fn pixel_coordinates(&self) -> Vec<PixelPoint> {
        match &self.geometry {
            RoiGeometry::Rectangle(_) => {
                let b = self.bounds();
                (b.y_min..b.y_max)
                    .flat_map(|y| (b.x_min..b.x_max).map(move |x| PixelPoint::new(x, y)))
                    .collect()
            }
            RoiGeometry::Point(p) => vec![*p],
            RoiGeometry::MultiPoint { points } => points.clone(),
        }
    }

    /// Rectangle area or number of points, before clipping. Saturates at
    /// `usize::MAX`.
    pub fn pixel_count_hint(&self) -> usize {
        match &self.geometry {
            RoiGeometry::Rectangle(r) => {
                let width = usize::try_from(r.width).unwrap_or(0);
                let height = usize::try_from(r.height).unwrap_or(0);
                width.saturating_mul(height)
            }
            RoiGeometry::Point(_) => 1,
            RoiGeometry::MultiPoint { points } => points.len(),
        }
    }

    pub fn record(&self) -> RoiRecord {
        RoiRecord {
            label: self.label.clone(),
            kind: self.kind(),
            coordinates: self.geometry.clone(),
            color: self.color,
        }
    }
}

