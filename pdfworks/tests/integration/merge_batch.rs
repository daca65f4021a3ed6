//! Batch merging end to end.

use pdfworks::config::{CompressionLevel, MEGABYTE, MergeLimits, Metadata};
use pdfworks::export::MetadataManager;
use pdfworks::io::{PdfWriter, WriteOptions};
use pdfworks::merge::{FileFailure, MergeCoordinator, MergeState, UploadBatch, UploadedFile};
use pdfworks::validation::AdmissionControl;
use pdfworks::{PdfWorksError, StructuralDocument, testing};

use crate::common::page_contents;

fn batch(files: Vec<(&str, Vec<u8>)>) -> UploadBatch {
    files
        .into_iter()
        .map(|(name, bytes)| UploadedFile::new(name, bytes))
        .collect()
}

#[tokio::test]
async fn test_corrupt_middle_file_is_skipped() {
    let outcome = MergeCoordinator::default()
        .merge(batch(vec![
            ("three.pdf", testing::sample_pdf(3)),
            ("five.pdf", testing::corrupt_pdf()),
            ("two.pdf", testing::sample_pdf(2)),
        ]))
        .await
        .unwrap();

    assert_eq!(outcome.total_pages, 5);
    assert_eq!(outcome.files_processed, 2);
    assert_eq!(outcome.state, MergeState::Completed);
    assert_eq!(outcome.failures, vec![FileFailure::invalid("five.pdf")]);

    let expected: Vec<Vec<u8>> = [1, 2, 3, 1, 2].into_iter().map(testing::page_content).collect();
    assert_eq!(page_contents(&outcome.bytes), expected);
}

#[tokio::test]
async fn test_merge_many_files_across_chunks() {
    let files: UploadBatch = (0..12)
        .map(|i| UploadedFile::new(format!("{i}.pdf"), testing::sample_pdf(1 + i % 3)))
        .collect();

    let outcome = MergeCoordinator::default().merge(files).await.unwrap();

    assert_eq!(outcome.files_processed, 12);
    assert_eq!(outcome.total_pages, (0..12).map(|i| 1 + i % 3).sum::<usize>());
    assert_eq!(page_contents(&outcome.bytes).len(), outcome.total_pages);
}

#[tokio::test]
async fn test_merge_writes_metadata_and_compression() {
    let metadata = Metadata::new(Some("Bundle".into()), Some("QA".into()), None, None);
    let coordinator = MergeCoordinator::default()
        .with_writer(PdfWriter::with_options(WriteOptions::from(CompressionLevel::Maximum)))
        .with_metadata(metadata);

    let outcome = coordinator
        .merge(batch(vec![("a.pdf", testing::sample_pdf(1)), ("b.pdf", testing::sample_pdf(1))]))
        .await
        .unwrap();

    let merged = StructuralDocument::load(&outcome.bytes).unwrap();
    let info = MetadataManager::new().read(merged.document());
    assert_eq!(info.title.as_deref(), Some("Bundle"));
    assert_eq!(info.author.as_deref(), Some("QA"));
}

#[tokio::test]
async fn test_too_many_files_are_rejected_before_parsing() {
    let files: UploadBatch = (0..61)
        .map(|i| UploadedFile::new(format!("{i}.pdf"), testing::garbage_bytes()))
        .collect();

    let err = MergeCoordinator::default().merge(files).await.unwrap_err();

    assert!(matches!(err, PdfWorksError::TooManyFiles { count: 61, max: 60 }));
    assert!(err.is_admission_rejection());
}

#[test]
fn test_total_size_boundary() {
    let admission = AdmissionControl::new(MergeLimits::default());
    let names: Vec<String> = (0..60).map(|i| format!("{i}.pdf")).collect();

    // 60 files adding up to exactly 500 MB.
    let mut sizes: Vec<(&str, u64)> = names.iter().map(|n| (n.as_str(), 8 * MEGABYTE)).collect();
    sizes[0].1 = 500 * MEGABYTE - 59 * 8 * MEGABYTE;
    assert!(admission.check_sizes(&sizes).is_ok());

    sizes[0].1 += 1;
    assert!(matches!(
        admission.check_sizes(&sizes),
        Err(PdfWorksError::BatchTooLarge { total, .. }) if total == 500 * MEGABYTE + 1
    ));
}
