//! Page model edits carried through to exported documents.

use lopdf::Document;
use pdfworks::config::PageRange;
use pdfworks::document::CropBox;
use pdfworks::document::geometry::parse_rect;
use pdfworks::export::{Exporter, Operation, WatermarkOptions};
use pdfworks::testing;

use crate::common::{open, page_contents, page_rotations};

#[test]
fn test_unchanged_export_is_identical() {
    let (loaded, model) = open("four.pdf", &testing::sample_pdf(4));

    let output = Exporter::new()
        .execute(&loaded.structural, &model.snapshot())
        .unwrap();

    let expected: Vec<Vec<u8>> = (1..=4).map(testing::page_content).collect();
    assert_eq!(page_contents(&output), expected);
    assert_eq!(page_rotations(&output), vec![0, 0, 0, 0]);
}

#[test]
fn test_reorder_is_followed_and_keeps_ids() {
    let (loaded, mut model) = open("five.pdf", &testing::sample_pdf(5));
    let original: Vec<_> = model.ids().to_vec();

    let permutation = vec![original[4], original[0], original[3], original[1], original[2]];
    model.reorder(&permutation).unwrap();

    let mut ids = model.ids().to_vec();
    ids.sort();
    let mut sorted = original.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    let output = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Organize)
        .unwrap();
    let expected: Vec<Vec<u8>> = [5, 1, 4, 2, 3].into_iter().map(testing::page_content).collect();
    assert_eq!(page_contents(&output), expected);
}

#[test]
fn test_four_quarter_turns_restore_the_page() {
    let (loaded, mut model) = open("one.pdf", &testing::sample_pdf(1));
    let id = model.ids()[0];

    for _ in 0..4 {
        model.rotate(id, 90).unwrap();
    }
    assert_eq!(model.get(id).unwrap().rotation.degrees(), 0);

    let output = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Rotate)
        .unwrap();
    assert_eq!(page_rotations(&output), vec![0]);
}

#[test]
fn test_rotation_composes_with_intrinsic_rotation() {
    let (loaded, mut model) = open("turned.pdf", &testing::rotated_pdf(612.0, 792.0, 90));
    model.rotate_all(90).unwrap();

    let output = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Rotate)
        .unwrap();
    assert_eq!(page_rotations(&output), vec![180]);
}

#[test]
fn test_crop_is_clamped_to_the_page() {
    let (loaded, mut model) = open("one.pdf", &testing::sample_pdf(1));
    let id = model.ids()[0];

    let stored = model
        .set_crop(id, CropBox::new(-10.0, 0.0, 612.0 + 100.0, 50.0))
        .unwrap();
    assert_eq!(stored, CropBox::new(0.0, 0.0, 612.0, 50.0));

    let output = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Crop)
        .unwrap();
    let doc = Document::load_mem(&output).unwrap();
    let page = doc.get_pages().into_values().next().unwrap();
    let crop = parse_rect(doc.get_dictionary(page).unwrap().get(b"CropBox").unwrap()).unwrap();
    assert_eq!(crop, [0.0, 0.0, 612.0, 50.0]);
}

#[test]
fn test_extract_range_and_remove() {
    let (loaded, mut model) = open("six.pdf", &testing::sample_pdf(6));

    let selected = model.select_only(&PageRange::parse("1-3,5").unwrap());
    assert_eq!(selected, 4);
    let first = model.ids()[0];
    model.remove(first).unwrap();

    let output = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Extract)
        .unwrap();
    let expected: Vec<Vec<u8>> = [2, 3, 5].into_iter().map(testing::page_content).collect();
    assert_eq!(page_contents(&output), expected);

    // The loaded document itself is untouched.
    assert_eq!(loaded.page_count(), 6);
}

#[test]
fn test_watermark_adds_a_content_stream() {
    let (loaded, model) = open("two.pdf", &testing::sample_pdf(2));

    let output = Exporter::new()
        .execute_with(
            &loaded.structural,
            &model.snapshot(),
            &Operation::Watermark(WatermarkOptions::new("DRAFT")),
        )
        .unwrap();

    for (number, content) in page_contents(&output).into_iter().enumerate() {
        let text = String::from_utf8_lossy(&content);
        assert!(text.contains("DRAFT"), "page {} lacks the stamp", number + 1);
    }
}

#[test]
fn test_output_filenames() {
    assert_eq!(Operation::Rotate.output_filename("report.pdf"), "report_rotated.pdf");
    assert_eq!(Operation::RemovePages.output_filename("a.PDF"), "a_removed_pages.pdf");
    assert_eq!(Operation::Merge.output_filename("ignored.pdf"), "merged.pdf");
}
