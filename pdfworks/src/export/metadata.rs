//! Info dictionary of exported documents.

use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::config::Metadata;
use crate::error::Result;

/// Name written to `/Producer` and `/Creator`.
pub const PRODUCER: &str = concat!("pdfworks ", env!("CARGO_PKG_VERSION"));

/// Writes and reads the document information dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataManager;

impl MetadataManager {
    /// Create a new metadata manager.
    pub fn new() -> Self {
        Self
    }

    /// Set `/Producer`, `/Creator` and every non-empty field of `metadata`.
    ///
    /// No timestamps are written, so identical inputs serialize to identical
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing `/Info` reference cannot be replaced.
    pub fn apply(&self, doc: &mut Document, metadata: &Metadata) -> Result<()> {
        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) if doc.get_dictionary(id).is_ok() => id,
            _ => {
                let id = doc.add_object(Dictionary::new());
                doc.trailer.set("Info", id);
                id
            }
        };

        let info = doc.get_dictionary_mut(info_id)?;
        let fields = [
            ("Title", &metadata.title),
            ("Author", &metadata.author),
            ("Subject", &metadata.subject),
            ("Keywords", &metadata.keywords),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                info.set(key, text(value));
            }
        }
        info.set("Producer", text(PRODUCER));
        info.set("Creator", text(PRODUCER));
        Ok(())
    }

    /// Read the user-facing fields back.
    pub fn read(&self, doc: &Document) -> Metadata {
        let Some(info) = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .ok()
            .and_then(|id| doc.get_dictionary(id).ok())
        else {
            return Metadata::default();
        };

        let field = |key: &[u8]| match info.get(key) {
            Ok(Object::String(bytes, _)) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        };
        Metadata::new(field(b"Title"), field(b"Author"), field(b"Subject"), field(b"Keywords"))
    }
}

fn text(value: &str) -> Object {
    Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
}
