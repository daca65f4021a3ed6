//! Page geometry: sizes, crop boxes, rotations and PDF rectangles.

use lopdf::Object;
use serde::Serialize;

use crate::{PdfWorksError, Result};

/// Smallest side, in points, of a clamped crop box.
pub const MIN_CROP_SIDE: f32 = 1.0;

/// Width and height of a page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
}

impl PageSize {
    /// US Letter, the fallback when a page has no usable media box.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// Create a page size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size after applying a page rotation.
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.is_quarter_turn() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}

/// Crop rectangle in point space, relative to the media box origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CropBox {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl CropBox {
    /// Create a crop box.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clamp the box into `[0, 0, page.width, page.height]`.
    ///
    /// A box with no area left inside the page collapses to a
    /// [`MIN_CROP_SIDE`] strip on the nearest page edge.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCropBox` if any component is not finite.
    pub fn clamp_to(self, page: PageSize) -> Result<Self> {
        let components = [self.x, self.y, self.width, self.height];
        if components.iter().any(|v| !v.is_finite()) {
            return Err(PdfWorksError::invalid_crop_box(format!(
                "non-finite component in {self:?}"
            )));
        }

        let (left, right) = clamp_span(self.x, self.width, page.width);
        let (bottom, top) = clamp_span(self.y, self.height, page.height);
        Ok(Self::new(left, bottom, right - left, top - bottom))
    }

    /// Translate into an absolute PDF rectangle for a media box with the given origin.
    pub fn to_rect(self, origin: (f32, f32)) -> [f32; 4] {
        let (ox, oy) = origin;
        [
            ox + self.x,
            oy + self.y,
            ox + self.x + self.width,
            oy + self.y + self.height,
        ]
    }
}

/// Clamp `[start, start + len]` into `[0, limit]`, keeping at least
/// [`MIN_CROP_SIDE`] when the page allows it.
fn clamp_span(start: f32, len: f32, limit: f32) -> (f32, f32) {
    let low = start.max(0.0).min(limit);
    let high = (start + len).min(limit).max(0.0);
    if high - low >= MIN_CROP_SIDE {
        return (low, high);
    }
    let low = low.min(high).clamp(0.0, (limit - MIN_CROP_SIDE).max(0.0));
    (low, (low + MIN_CROP_SIDE).min(limit))
}

/// Page rotation, always one of 0, 90, 180 or 270 degrees clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u16")]
pub struct Rotation(u16);

impl Rotation {
    /// No rotation.
    pub const NONE: Rotation = Rotation(0);

    /// Normalize any multiple of 90 (negative allowed) into a rotation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRotation` if `degrees` is not a multiple of 90.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(PdfWorksError::InvalidRotation { degrees });
        }
        // rem_euclid keeps the result in 0..360 for negative input
        Ok(Self(degrees.rem_euclid(360) as u16))
    }

    /// Rotation in degrees.
    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Add a delta in degrees.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRotation` if `delta` is not a multiple of 90.
    pub fn rotate(self, delta: i64) -> Result<Self> {
        let delta = Self::from_degrees(delta)?;
        Ok(self.compose(delta))
    }

    /// Combine two rotations.
    pub fn compose(self, other: Rotation) -> Self {
        Self((self.0 + other.0) % 360)
    }

    /// True for 90 and 270.
    pub fn is_quarter_turn(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.0
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Read a number that may be stored as an integer or a real.
pub fn object_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

/// Parse a PDF rectangle array into normalized `[llx, lly, urx, ury]`.
pub fn parse_rect(object: &Object) -> Option<[f32; 4]> {
    let array = object.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let mut values = [0.0f32; 4];
    for (slot, item) in values.iter_mut().zip(array) {
        *slot = object_number(item)?;
    }
    let [x0, y0, x1, y1] = values;
    if !values.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
}

/// Build a PDF rectangle array.
pub fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|v| Object::Real(*v)).collect())
}

/// Intersect two rectangles, returning `None` when they do not overlap.
pub fn intersect_rect(a: [f32; 4], b: [f32; 4]) -> Option<[f32; 4]> {
    let rect = [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])];
    (rect[2] > rect[0] && rect[3] > rect[1]).then_some(rect)
}

/// Size of a rectangle.
pub fn rect_size(rect: [f32; 4]) -> PageSize {
    PageSize::new(rect[2] - rect[0], rect[3] - rect[1])
}
