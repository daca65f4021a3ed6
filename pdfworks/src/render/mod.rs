//! Renderable view of a PDF, used only for page rasterization.
//!
//! A [`RenderableDocument`] is parsed independently from the structural
//! document and never shares state with it. Page geometry (media box, crop
//! box, intrinsic rotation) is resolved once at load time.
//!
//! # Examples
//!
//! ```no_run
//! use pdfworks::render::RenderableDocument;
//!
//! # fn example(bytes: &[u8]) -> pdfworks::Result<()> {
//! let doc = RenderableDocument::load(bytes)?;
//! let image = doc.render_page(1, 0.4)?;
//! println!("{}x{}", image.width(), image.height());
//! # Ok(())
//! # }
//! ```

use image::{RgbaImage, imageops};
use lopdf::{Document, Object, ObjectId};
use mupdf::{Colorspace, Matrix, Pixmap};

use crate::document::copier::inherited_attribute;
use crate::document::geometry::{PageSize, Rotation, intersect_rect, parse_rect, rect_size};
use crate::error::{PdfWorksError, Result};
use crate::io::PdfReader;

/// Largest bitmap side, in pixels, a render may produce.
pub const MAX_BITMAP_SIDE: u32 = 4096;

const PDF_MAGIC: &str = "application/pdf";

/// Resolved geometry of one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page dictionary object id.
    pub object: ObjectId,
    /// Media box `[llx, lly, urx, ury]`.
    pub media_box: [f32; 4],
    /// Visible area: crop box intersected with the media box.
    pub view_box: [f32; 4],
    /// Intrinsic `/Rotate` of the page.
    pub rotation: Rotation,
}

impl PageGeometry {
    /// Unrotated media box size.
    pub fn page_size(&self) -> PageSize {
        rect_size(self.media_box)
    }

    /// Size of the visible area as displayed, rotation applied.
    pub fn display_size(&self) -> PageSize {
        rect_size(self.view_box).rotated(self.rotation)
    }
}

/// Parsed PDF dedicated to rasterization.
///
/// Geometry comes from lopdf; pixels come from MuPDF. MuPDF contexts are
/// bound to a thread, so every render opens its own handle on the retained
/// bytes and the document stays `Send + Sync`.
#[derive(Debug)]
pub struct RenderableDocument {
    doc: Document,
    bytes: Vec<u8>,
    pages: Vec<PageGeometry>,
}

impl RenderableDocument {
    /// Parse bytes into a renderable document.
    ///
    /// # Errors
    ///
    /// Returns `CorruptDocument` or `EncryptedDocument` like
    /// [`crate::document::StructuralDocument::load`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Self::load_named("document.pdf", bytes)
    }

    /// Parse bytes, naming the upload in errors.
    ///
    /// # Errors
    ///
    /// Same as [`RenderableDocument::load`].
    pub fn load_named(name: &str, bytes: &[u8]) -> Result<Self> {
        let doc = PdfReader::new().parse(name, bytes)?;
        let pages = doc
            .get_pages()
            .into_values()
            .map(|object| resolve_geometry(&doc, object))
            .collect();
        Ok(Self {
            doc,
            bytes: bytes.to_vec(),
            pages,
        })
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Geometry of a 1-based page.
    ///
    /// # Errors
    ///
    /// Returns `PageOutOfRange` for unknown pages.
    pub fn geometry(&self, page_number: u32) -> Result<&PageGeometry> {
        page_number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .ok_or(PdfWorksError::PageOutOfRange {
                page: page_number,
                page_count: self.pages.len(),
            })
    }

    /// Unrotated media box sizes of all pages, in page order.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.pages.iter().map(PageGeometry::page_size).collect()
    }

    /// Pixel dimensions a render at `scale` produces, rotation applied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScale` if the scale is not finite, not positive, or
    /// yields a side longer than [`MAX_BITMAP_SIDE`].
    pub fn render_size(&self, page_number: u32, scale: f32) -> Result<(u32, u32)> {
        let geometry = self.geometry(page_number)?;
        bitmap_size(geometry.display_size(), scale)
    }

    /// Rasterize a page at `scale` pixels per point.
    ///
    /// The page's crop box and intrinsic rotation are applied to the bitmap.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `PageOutOfRange` for unknown pages
    /// - `InvalidScale` for unusable scales
    /// - `PageRender` if the content stream is missing or cannot be decoded,
    ///   or MuPDF fails to draw the page
    pub fn render_page(&self, page_number: u32, scale: f32) -> Result<RgbaImage> {
        let geometry = *self.geometry(page_number)?;
        let (width, height) = self.render_size(page_number, scale)?;

        // MuPDF draws a dangling or undecodable content stream as a blank page
        self.check_content(page_number, geometry.object)?;

        let failed = |e: mupdf::error::Error| PdfWorksError::page_render(page_number, e.to_string());
        let doc = mupdf::Document::from_bytes(&self.bytes, PDF_MAGIC).map_err(failed)?;
        let page = doc.load_page(page_number as i32 - 1).map_err(failed)?;

        let display = geometry.display_size();
        let transform = Matrix::new_scale(width as f32 / display.width, height as f32 / display.height);
        let pixmap = page
            .to_pixmap(&transform, &Colorspace::device_rgb(), false, false)
            .map_err(failed)?;

        let image = pixmap_to_rgba(&pixmap).map_err(|reason| PdfWorksError::page_render(page_number, reason))?;
        if image.dimensions() == (width, height) {
            Ok(image)
        } else {
            Ok(imageops::resize(&image, width, height, imageops::FilterType::Triangle))
        }
    }

    /// Verify every content stream of a page resolves and decodes.
    fn check_content(&self, page_number: u32, page: ObjectId) -> Result<()> {
        let dict = self
            .doc
            .get_dictionary(page)
            .map_err(|e| PdfWorksError::page_render(page_number, e.to_string()))?;

        let refs: Vec<&Object> = match dict.get(b"Contents") {
            // a page without content is blank, not broken
            Err(_) => return Ok(()),
            Ok(Object::Array(items)) => items.iter().collect(),
            Ok(other) => vec![other],
        };

        for item in refs {
            let stream = match item {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(Object::Stream(stream)) => stream,
                    Ok(_) => {
                        return Err(PdfWorksError::page_render(
                            page_number,
                            format!("content object {} {} is not a stream", id.0, id.1),
                        ));
                    }
                    Err(_) => {
                        return Err(PdfWorksError::page_render(
                            page_number,
                            format!("missing content stream {} {}", id.0, id.1),
                        ));
                    }
                },
                Object::Stream(stream) => stream,
                _ => {
                    return Err(PdfWorksError::page_render(page_number, "malformed /Contents entry"));
                }
            };

            if stream.dict.has(b"Filter") {
                stream.decompressed_content().map_err(|e| {
                    PdfWorksError::page_render(page_number, format!("undecodable content stream: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

/// Copy an RGB(A) pixmap into an opaque RGBA image, honoring row stride.
fn pixmap_to_rgba(pixmap: &Pixmap) -> std::result::Result<RgbaImage, String> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(format!("unsupported pixmap format: {n} channels"));
    }

    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width as usize * n;
    if row_bytes > stride || samples.len() < stride * height as usize {
        return Err("pixmap buffer size mismatch".to_string());
    }

    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for row in samples.chunks(stride).take(height as usize) {
        for px in row[..row_bytes].chunks_exact(n) {
            out.extend_from_slice(&px[..3]);
            out.push(u8::MAX);
        }
    }
    RgbaImage::from_raw(width, height, out).ok_or_else(|| "pixmap buffer size mismatch".to_string())
}

fn resolve_geometry(doc: &Document, object: ObjectId) -> PageGeometry {
    let letter = [0.0, 0.0, PageSize::LETTER.width, PageSize::LETTER.height];
    let media_box = inherited_attribute(doc, object, b"MediaBox")
        .and_then(parse_rect)
        .filter(|rect| rect[2] > rect[0] && rect[3] > rect[1])
        .unwrap_or(letter);
    let view_box = inherited_attribute(doc, object, b"CropBox")
        .and_then(parse_rect)
        .and_then(|crop| intersect_rect(crop, media_box))
        .unwrap_or(media_box);
    let rotation = inherited_attribute(doc, object, b"Rotate")
        .and_then(|r| r.as_i64().ok())
        .and_then(|degrees| Rotation::from_degrees(degrees).ok())
        .unwrap_or_default();

    PageGeometry {
        object,
        media_box,
        view_box,
        rotation,
    }
}

fn bitmap_size(view: PageSize, scale: f32) -> Result<(u32, u32)> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PdfWorksError::InvalidScale { scale });
    }
    let width = (view.width * scale).ceil().max(1.0);
    let height = (view.height * scale).ceil().max(1.0);
    if width > MAX_BITMAP_SIDE as f32 || height > MAX_BITMAP_SIDE as f32 {
        return Err(PdfWorksError::InvalidScale { scale });
    }
    Ok((width as u32, height as u32))
}
