//! Structural view of a PDF: the object graph used for copying and editing pages.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::debug;

use super::copier::{ObjectCopier, inherited_attribute};
use super::geometry::{CropBox, PageSize, Rotation, parse_rect, rect_object, rect_size};
use crate::error::{PdfWorksError, Result};
use crate::io::{PdfReader, PdfWriter};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one structural document instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque reference to a page object inside one [`StructuralDocument`].
///
/// Handles are only valid for the document that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle {
    document: DocumentId,
    object: ObjectId,
}

impl PageHandle {
    /// Document that issued this handle.
    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// Object id of the page dictionary.
    pub fn object_id(&self) -> ObjectId {
        self.object
    }
}

/// Parsed PDF object graph with page-level editing operations.
pub struct StructuralDocument {
    id: DocumentId,
    doc: Document,
    pages_root: Option<ObjectId>,
    order: Vec<ObjectId>,
    attached: HashSet<ObjectId>,
}

impl fmt::Debug for StructuralDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralDocument")
            .field("id", &self.id)
            .field("pages", &self.order.len())
            .field("objects", &self.doc.objects.len())
            .finish()
    }
}

impl StructuralDocument {
    /// Create an empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Self {
            id: DocumentId::next(),
            doc,
            pages_root: Some(pages_id),
            order: Vec::new(),
            attached: HashSet::new(),
        }
    }

    /// Parse bytes into a structural document.
    ///
    /// # Errors
    ///
    /// Returns `CorruptDocument` for unparsable input or a document without
    /// pages, and `EncryptedDocument` for encrypted input.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Self::load_named("document.pdf", bytes)
    }

    /// Parse bytes, naming the upload in errors.
    ///
    /// # Errors
    ///
    /// Same as [`StructuralDocument::load`].
    pub fn load_named(name: &str, bytes: &[u8]) -> Result<Self> {
        PdfReader::new().parse(name, bytes).map(Self::from_document)
    }

    /// Wrap an already parsed document.
    pub fn from_document(doc: Document) -> Self {
        let order: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let pages_root = doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .ok();

        Self {
            id: DocumentId::next(),
            attached: order.iter().copied().collect(),
            order,
            pages_root,
            doc,
        }
    }

    /// Identity of this document.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Number of pages attached to the page tree.
    pub fn page_count(&self) -> usize {
        self.order.len()
    }

    /// Handles for every attached page, in page order.
    pub fn page_handles(&self) -> Vec<PageHandle> {
        self.order.iter().map(|&object| self.handle_for(object)).collect()
    }

    /// 1-based page numbers, in page order.
    pub fn page_numbers(&self) -> Vec<u32> {
        (1..=self.order.len() as u32).collect()
    }

    /// Handle for a 1-based page number.
    ///
    /// # Errors
    ///
    /// Returns `PageOutOfRange` if the page does not exist.
    pub fn handle(&self, page_number: u32) -> Result<PageHandle> {
        page_number
            .checked_sub(1)
            .and_then(|index| self.order.get(index as usize))
            .map(|&object| self.handle_for(object))
            .ok_or(PdfWorksError::PageOutOfRange {
                page: page_number,
                page_count: self.order.len(),
            })
    }

    /// Copy pages from `source` into this document.
    ///
    /// The copies are not attached; pass the returned handles to
    /// [`StructuralDocument::add_page`] in the desired order. Inherited
    /// attributes are materialized on every copy.
    ///
    /// # Errors
    ///
    /// Returns `PageOutOfRange` if any page number is invalid. Nothing is
    /// copied in that case.
    pub fn copy_pages(&mut self, source: &StructuralDocument, page_numbers: &[u32]) -> Result<Vec<PageHandle>> {
        let source_ids = page_numbers
            .iter()
            .map(|&number| source.handle(number).map(|h| h.object))
            .collect::<Result<Vec<_>>>()?;

        let mut copier = ObjectCopier::new(&source.doc);
        let mut targets = Vec::with_capacity(source_ids.len());
        let mut reserved = HashSet::new();
        for &source_id in &source_ids {
            // a page requested twice gets an independent second copy
            let target = if reserved.insert(source_id) {
                copier.reserve_page(&mut self.doc, source_id)
            } else {
                self.doc.new_object_id()
            };
            targets.push(target);
        }

        for (&source_id, &target) in source_ids.iter().zip(&targets) {
            copier.copy_page(&mut self.doc, source_id, target);
        }

        debug!(pages = targets.len(), "copied pages");
        Ok(targets.into_iter().map(|object| self.handle_for(object)).collect())
    }

    /// Append a page to the end of the page tree.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPageHandle` if the handle belongs to another document,
    /// does not name a page, or is already attached.
    pub fn add_page(&mut self, handle: PageHandle) -> Result<()> {
        self.check_handle(handle)?;
        if self.attached.contains(&handle.object) {
            return Err(PdfWorksError::invalid_page_handle(format!(
                "page {:?} is already attached",
                handle.object
            )));
        }

        let root = self
            .pages_root
            .ok_or_else(|| PdfWorksError::other("Document has no page tree"))?;
        let pages = self.doc.get_dictionary_mut(root)?;

        match pages.get_mut(b"Kids") {
            Ok(Object::Array(kids)) => kids.push(Object::Reference(handle.object)),
            _ => return Err(PdfWorksError::other("Page tree root has no Kids array")),
        }
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages.set("Count", Object::Integer(count + 1));

        self.page_dictionary_mut(handle)?.set("Parent", root);
        self.attached.insert(handle.object);
        self.order.push(handle.object);
        Ok(())
    }

    /// Rotation stored on the page (own or inherited `/Rotate`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidPageHandle` for foreign handles.
    pub fn rotation(&self, handle: PageHandle) -> Result<Rotation> {
        self.check_handle(handle)?;
        let degrees = inherited_attribute(&self.doc, handle.object, b"Rotate")
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(0);
        // malformed values are ignored by viewers too
        Ok(Rotation::from_degrees(degrees).unwrap_or_default())
    }

    /// Set the page rotation. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPageHandle` for foreign handles.
    pub fn set_rotation(&mut self, handle: PageHandle, rotation: Rotation) -> Result<()> {
        self.check_handle(handle)?;
        self.page_dictionary_mut(handle)?
            .set("Rotate", Object::Integer(rotation.degrees() as i64));
        Ok(())
    }

    /// Media box of a page as `[llx, lly, urx, ury]`.
    ///
    /// Pages without a usable media box report US Letter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPageHandle` for foreign handles.
    pub fn media_box(&self, handle: PageHandle) -> Result<[f32; 4]> {
        self.check_handle(handle)?;
        Ok(inherited_attribute(&self.doc, handle.object, b"MediaBox")
            .and_then(parse_rect)
            .unwrap_or([0.0, 0.0, PageSize::LETTER.width, PageSize::LETTER.height]))
    }

    /// Unrotated page size from the media box.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPageHandle` for foreign handles.
    pub fn page_size(&self, handle: PageHandle) -> Result<PageSize> {
        self.media_box(handle).map(rect_size)
    }

    /// Set the crop box, clamped to the page's media box. Last write wins.
    ///
    /// Returns the box that was applied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPageHandle` for foreign handles and `InvalidCropBox`
    /// for non-finite boxes.
    pub fn set_crop_box(&mut self, handle: PageHandle, crop: CropBox) -> Result<CropBox> {
        let media = self.media_box(handle)?;
        let applied = crop.clamp_to(rect_size(media))?;
        self.page_dictionary_mut(handle)?
            .set("CropBox", rect_object(applied.to_rect((media[0], media[1]))));
        Ok(applied)
    }

    /// Serialize with the default writer.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the page tree is inconsistent or
    /// writing fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.serialize_with(&PdfWriter::new())
    }

    /// Serialize with a specific writer.
    ///
    /// The page tree is verified first so a broken tree fails loudly instead
    /// of silently dropping pages.
    ///
    /// # Errors
    ///
    /// Same as [`StructuralDocument::serialize`].
    pub fn serialize_with(&self, writer: &PdfWriter) -> Result<Vec<u8>> {
        self.verify_page_tree()?;
        let (bytes, stats) = writer.to_bytes(&self.doc)?;
        debug!(
            pages = self.order.len(),
            bytes = stats.byte_len,
            compressed = stats.compressed,
            "serialized document"
        );
        Ok(bytes)
    }

    /// Read-only access to the underlying `lopdf` document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn page_dictionary_mut(&mut self, handle: PageHandle) -> Result<&mut Dictionary> {
        self.check_handle(handle)?;
        Ok(self.doc.get_dictionary_mut(handle.object)?)
    }

    fn handle_for(&self, object: ObjectId) -> PageHandle {
        PageHandle {
            document: self.id,
            object,
        }
    }

    fn check_handle(&self, handle: PageHandle) -> Result<()> {
        if handle.document != self.id {
            return Err(PdfWorksError::invalid_page_handle(
                "handle belongs to a different document",
            ));
        }
        let is_page = self
            .doc
            .get_dictionary(handle.object)
            .and_then(|dict| dict.get(b"Type"))
            .and_then(Object::as_name)
            .map(|name| name == b"Page")
            .unwrap_or(false);
        if !is_page {
            return Err(PdfWorksError::invalid_page_handle(format!(
                "object {:?} is not a page",
                handle.object
            )));
        }
        Ok(())
    }

    fn verify_page_tree(&self) -> Result<()> {
        let pages = self.doc.get_pages();
        if pages.len() != self.order.len() {
            return Err(PdfWorksError::serialization(format!(
                "page tree lists {} page(s) but {} are attached",
                pages.len(),
                self.order.len()
            )));
        }
        for ((number, actual), expected) in pages.iter().zip(&self.order) {
            if actual != expected {
                return Err(PdfWorksError::serialization(format!(
                    "page tree is out of order at page {number}"
                )));
            }
        }
        if let Some(root) = self.pages_root {
            let count = self
                .doc
                .get_dictionary(root)
                .and_then(|d| d.get(b"Count"))
                .and_then(Object::as_i64)
                .unwrap_or(-1);
            if count != self.order.len() as i64 {
                return Err(PdfWorksError::serialization(format!(
                    "page tree count {count} does not match {} attached page(s)",
                    self.order.len()
                )));
            }
        }
        Ok(())
    }
}

impl Default for StructuralDocument {
    fn default() -> Self {
        Self::new()
    }
}
