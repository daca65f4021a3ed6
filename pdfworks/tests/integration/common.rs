//! Shared helpers for the integration tests.

use lopdf::Document;
use pdfworks::LoadedDocument;
use pdfworks::document;
use pdfworks::model::PageModel;

/// Load `bytes` and build a model with page sizes recorded.
pub fn open(name: &str, bytes: &[u8]) -> (LoadedDocument, PageModel) {
    let loaded = document::load(name, bytes).unwrap();
    let model = PageModel::with_page_sizes(&loaded.page_sizes());
    (loaded, model)
}

/// Content streams of every page of `bytes`, in page order.
pub fn page_contents(bytes: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| doc.get_page_content(id).unwrap())
        .collect()
}

/// `/Rotate` of every page of `bytes`, 0 when absent.
pub fn page_rotations(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            doc.get_dictionary(id)
                .unwrap()
                .get(b"Rotate")
                .and_then(|o| o.as_i64())
                .unwrap_or(0)
        })
        .collect()
}
