//! Integration tests for error handling and edge cases.

use pdfworks::config::EngineConfig;
use pdfworks::document::{self, CropBox};
use pdfworks::export::{Exporter, Operation, WatermarkOptions};
use pdfworks::model::PageModel;
use pdfworks::{PdfWorksError, testing};
use rstest::rstest;

use crate::common::open;

#[test]
fn test_garbage_is_rejected_as_corrupt() {
    let err = document::load("junk.pdf", &testing::garbage_bytes()).unwrap_err();
    assert!(matches!(err, PdfWorksError::CorruptDocument { .. }));
}

#[test]
fn test_encrypted_document_is_rejected() {
    let err = document::load("locked.pdf", &testing::encrypted_pdf()).unwrap_err();
    assert!(matches!(err, PdfWorksError::EncryptedDocument { .. }));
}

#[test]
fn test_document_size_limit() {
    let config = EngineConfig {
        max_document_size: 16,
        ..EngineConfig::default()
    };
    let err = document::load_with_config("big.pdf", &testing::sample_pdf(1), &config).unwrap_err();
    assert!(matches!(err, PdfWorksError::FileTooLarge { max: 16, .. }));
}

#[rstest]
#[case(45)]
#[case(-30)]
#[case(91)]
fn test_rotation_must_be_quarter_turns(#[case] delta: i64) {
    let mut model = PageModel::initialize(1);
    let id = model.ids()[0];
    assert!(matches!(
        model.rotate(id, delta),
        Err(PdfWorksError::InvalidRotation { .. })
    ));
    assert_eq!(model.get(id).unwrap().rotation.degrees(), 0);
}

#[test]
fn test_reorder_rejects_non_permutations() {
    let mut model = PageModel::initialize(3);
    let ids = model.ids().to_vec();

    let duplicate = vec![ids[0], ids[0], ids[1]];
    assert!(matches!(
        model.reorder(&duplicate),
        Err(PdfWorksError::InvalidPermutation { .. })
    ));
    assert!(matches!(
        model.reorder(&ids[..2]),
        Err(PdfWorksError::InvalidPermutation { .. })
    ));
    assert_eq!(model.ids(), ids.as_slice());
}

#[test]
fn test_crop_outside_the_page_is_clamped_to_its_edge() {
    let (loaded, mut model) = open("one.pdf", &testing::sample_pdf(1));
    let id = model.ids()[0];

    let crop = model.set_crop(id, CropBox::new(700.0, 0.0, 50.0, 50.0)).unwrap();
    assert_eq!(crop, CropBox::new(611.0, 0.0, 1.0, 50.0));

    let output = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Crop)
        .unwrap();
    let exported = document::load("out.pdf", &output).unwrap();
    assert_eq!(exported.page_count(), 1);
    assert_eq!(exported.renderable.geometry(1).unwrap().view_box, [611.0, 0.0, 612.0, 50.0]);
}

#[test]
fn test_non_finite_crop_is_rejected() {
    let (_, mut model) = open("one.pdf", &testing::sample_pdf(1));
    let id = model.ids()[0];
    assert!(matches!(
        model.set_crop(id, CropBox::new(f32::NAN, 0.0, 50.0, 50.0)),
        Err(PdfWorksError::InvalidCropBox { .. })
    ));
    assert!(model.get(id).unwrap().crop.is_none());
}

#[test]
fn test_export_without_selection() {
    let (loaded, mut model) = open("two.pdf", &testing::sample_pdf(2));
    for id in model.ids().to_vec() {
        model.deselect(id).unwrap();
    }

    let err = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &Operation::Extract)
        .unwrap_err();
    assert!(matches!(err, PdfWorksError::EmptySelection));
}

#[rstest]
#[case(Operation::Watermark(WatermarkOptions::new("   ")))]
#[case(Operation::Protect { password: String::new() })]
fn test_unusable_operation_parameters(#[case] operation: Operation) {
    let (loaded, model) = open("one.pdf", &testing::sample_pdf(1));
    let err = Exporter::new()
        .execute_with(&loaded.structural, &model.snapshot(), &operation)
        .unwrap_err();
    assert!(matches!(err, PdfWorksError::InvalidOperation { .. }));
}

#[test]
fn test_unknown_page_id() {
    let mut first = PageModel::initialize(1);
    let removed = first.ids()[0];
    first.remove(removed).unwrap();
    assert!(matches!(
        first.remove(removed),
        Err(PdfWorksError::UnknownPage { .. })
    ));
}
