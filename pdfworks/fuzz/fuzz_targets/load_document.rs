#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfworks::document;
use pdfworks::export::Exporter;
use pdfworks::model::PageModel;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must either load cleanly or fail with an error.
    let Ok(loaded) = document::load("fuzz.pdf", data) else {
        return;
    };

    let model = PageModel::with_page_sizes(&loaded.page_sizes());
    assert_eq!(model.len(), loaded.page_count());

    for page in 1..=loaded.page_count() as u32 {
        let _ = loaded.renderable.render_page(page, 0.05);
    }
    let _ = Exporter::new().execute(&loaded.structural, &model.snapshot());
});
