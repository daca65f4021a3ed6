//! Diagonal text watermark stamped over page content.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use crate::document::copier::{inherited_attribute, resolve};
use crate::error::{PdfWorksError, Result};

const FONT_RESOURCE: &str = "PdfWorksWm";
const STATE_RESOURCE: &str = "PdfWorksWmGs";

/// Appearance of a text watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    /// Text to draw.
    pub text: String,
    /// Font size in points.
    pub font_size: f32,
    /// Gray level of the fill color, `0.0` black to `1.0` white.
    pub gray: f32,
    /// Fill and stroke opacity.
    pub opacity: f32,
    /// Counter-clockwise angle in degrees.
    pub angle: f32,
}

impl WatermarkOptions {
    /// Default appearance for `text`: Helvetica 40pt, light gray, 45°, 30% opaque.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: 40.0,
            gray: 0.75,
            opacity: 0.3,
            angle: 45.0,
        }
    }

    /// Check the options can be drawn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for blank text or out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(PdfWorksError::invalid_operation("Watermark text is empty"));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(PdfWorksError::invalid_operation(format!(
                "Invalid watermark font size: {}",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) || !(0.0..=1.0).contains(&self.gray) {
            return Err(PdfWorksError::invalid_operation(
                "Watermark opacity and gray must lie in 0.0..=1.0",
            ));
        }
        if !self.angle.is_finite() {
            return Err(PdfWorksError::invalid_operation("Watermark angle is not finite"));
        }
        Ok(())
    }

    /// Text origin for a page with media box `[llx, lly, urx, ury]`.
    ///
    /// Roughly centers the run, assuming an average glyph advance of
    /// 0.15 em.
    fn origin(&self, media_box: [f32; 4]) -> (f32, f32) {
        let [llx, lly, urx, ury] = media_box;
        let advance = self.font_size * 3.0 / 20.0;
        let x = llx + (urx - llx) / 2.0 - self.text.chars().count() as f32 * advance;
        let y = lly + (ury - lly) / 2.0;
        (x, y)
    }
}

/// Stamp `options` over the page `page_id` of `doc`.
///
/// Existing content is wrapped in `q`/`Q` so its graphics state cannot leak
/// into the watermark; the existing streams themselves are left untouched.
///
/// # Errors
///
/// Returns `InvalidOperation` for unusable options and `Other` if the page
/// dictionary is missing.
pub fn stamp(doc: &mut Document, page_id: ObjectId, media_box: [f32; 4], options: &WatermarkOptions) -> Result<()> {
    options.validate()?;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(options.opacity),
        "CA" => Object::Real(options.opacity),
    });

    let resources = page_resources(doc, page_id, font_id, state_id);
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let stamp_id = doc.add_object(Stream::new(Dictionary::new(), stamp_content(options, media_box)?));

    let page = doc.get_dictionary_mut(page_id)?;
    let mut contents = vec![Object::Reference(open_id)];
    match page.get(b"Contents") {
        Ok(Object::Array(items)) => contents.extend(items.iter().cloned()),
        Ok(other) => contents.push(other.clone()),
        Err(_) => {}
    }
    contents.push(Object::Reference(stamp_id));

    page.set("Contents", contents);
    page.set("Resources", resources);
    Ok(())
}

/// A private copy of the page's resources with the watermark font and
/// graphics state registered.
fn page_resources(doc: &Document, page_id: ObjectId, font_id: ObjectId, state_id: ObjectId) -> Dictionary {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|r| resolve(doc, r))
        .and_then(|r| r.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let mut register = |category: &[u8], name: &str, id: ObjectId| {
        let mut entries = resources
            .get(category)
            .ok()
            .and_then(|r| resolve(doc, r))
            .and_then(|r| r.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        entries.set(name, id);
        resources.set(category.to_vec(), entries);
    };
    register(b"Font", FONT_RESOURCE, font_id);
    register(b"ExtGState", STATE_RESOURCE, state_id);

    resources
}

fn stamp_content(options: &WatermarkOptions, media_box: [f32; 4]) -> Result<Vec<u8>> {
    let (x, y) = options.origin(media_box);
    let (sin, cos) = options.angle.to_radians().sin_cos();

    let content = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(STATE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("g", vec![Object::Real(options.gray)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    Object::Real(options.font_size),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Tj", vec![Object::string_literal(options.text.as_str())]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|e| PdfWorksError::other(format!("Failed to encode watermark: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn first_page(doc: &Document) -> ObjectId {
        *doc.get_pages().values().next().unwrap()
    }

    #[test]
    fn test_stamp_appends_stream_and_resources() {
        let mut doc = Document::load_mem(&testing::sample_pdf(1)).unwrap();
        let page = first_page(&doc);
        let before = doc.get_page_content(page).unwrap();

        stamp(&mut doc, page, [0.0, 0.0, 612.0, 792.0], &WatermarkOptions::new("DRAFT")).unwrap();

        let dict = doc.get_dictionary(page).unwrap();
        let contents = dict.get(b"Contents").unwrap().as_array().unwrap();
        assert_eq!(contents.len(), 3);

        let resources = dict.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
        assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(FONT_RESOURCE.as_bytes()));
        assert!(resources.get(b"ExtGState").unwrap().as_dict().unwrap().has(STATE_RESOURCE.as_bytes()));

        let after = doc.get_page_content(page).unwrap();
        assert!(after.windows(before.len()).any(|w| w == before.as_slice()));
        let text = String::from_utf8_lossy(&after);
        assert!(text.contains("(DRAFT) Tj"));
    }

    #[test]
    fn test_origin_centers_text() {
        let options = WatermarkOptions::new("ABCD");
        let (x, y) = options.origin([0.0, 0.0, 600.0, 800.0]);
        assert_eq!(x, 300.0 - 4.0 * 6.0);
        assert_eq!(y, 400.0);
    }

    #[test]
    fn test_validate() {
        assert!(WatermarkOptions::new("ok").validate().is_ok());
        assert!(WatermarkOptions::new("  ").validate().is_err());
        let options = WatermarkOptions {
            opacity: 1.5,
            ..WatermarkOptions::new("x")
        };
        assert!(options.validate().is_err());
    }
}
