//! Thumbnail runs through the async engine.

use std::sync::{Arc, Mutex};

use pdfworks::config::EngineConfig;
use pdfworks::thumbnail::{CancelToken, Progress};
use pdfworks::{Engine, PdfWorksError, testing};

#[tokio::test]
async fn test_cancel_after_three_of_ten() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let (loaded, model) = engine.open("ten.pdf", testing::sample_pdf(10)).await.unwrap();

    let cancel = CancelToken::new();
    let seen: Arc<Mutex<Vec<Progress>>> = Arc::default();
    let callback = {
        let cancel = cancel.clone();
        let seen = Arc::clone(&seen);
        move |progress: Progress| {
            seen.lock().unwrap().push(progress);
            if progress.completed == 3 {
                cancel.cancel();
            }
        }
    };

    let err = engine
        .thumbnails(&loaded, model.snapshot(), cancel, callback)
        .await
        .unwrap_err();
    assert!(matches!(err, PdfWorksError::Cancelled));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|p| p.fraction() <= 0.3));
    assert_eq!(engine.cached_thumbnails(), 3);
}

#[tokio::test]
async fn test_thumbnails_follow_export_order() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let (loaded, mut model) = engine
        .open("mixed.pdf", testing::sized_pdf(&[(100.0, 200.0), (300.0, 100.0), (50.0, 50.0)]))
        .await
        .unwrap();

    let mut order = model.ids().to_vec();
    order.reverse();
    model.reorder(&order).unwrap();
    model.deselect(order[1]).unwrap();

    let summary = engine
        .thumbnails(&loaded, model.snapshot(), CancelToken::new(), |_| {})
        .await
        .unwrap();

    let sources: Vec<u32> = summary.thumbnails.iter().map(|t| t.source_page).collect();
    assert_eq!(sources, vec![3, 1]);
    assert!(summary.thumbnails[1].height() > summary.thumbnails[1].width());
}

#[tokio::test]
async fn test_broken_page_is_reported_not_fatal() {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let (loaded, model) = engine
        .open("broken.pdf", testing::pdf_with_broken_page(4, 2))
        .await
        .unwrap();
    let broken = model.ids()[1];

    let progress = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&progress);
    let err = engine
        .thumbnails(&loaded, model.snapshot(), CancelToken::new(), move |_| {
            *counter.lock().unwrap() += 1;
        })
        .await
        .unwrap_err();

    match err {
        PdfWorksError::PartialRenderFailure { failed } => assert_eq!(failed, vec![broken]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(*progress.lock().unwrap(), 4);
}
