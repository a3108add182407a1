use super::*;
use crate::error::VideoSourceError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_guard_releases_exactly_once() {
    let releases = Arc::new(AtomicUsize::new(0));
    let source = MockVideoSource::new(Duration::from_millis(1))
        .with_release_counter(Arc::clone(&releases));

    let mut guard = SourceGuard::new(Box::new(source));
    assert!(guard.next_frame().await.is_ok());

    guard.release();
    guard.release();
    assert!(guard.is_released());
    drop(guard);

    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_guard_releases_on_drop() {
    let releases = Arc::new(AtomicUsize::new(0));
    {
        let source = MockVideoSource::new(Duration::from_millis(1))
            .with_release_counter(Arc::clone(&releases));
        let _guard = SourceGuard::new(Box::new(source));
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_released_guard_reports_ended() {
    let mut guard = SourceGuard::new(Box::new(MockVideoSource::new(Duration::from_millis(1))));
    guard.release();
    assert_eq!(guard.next_frame().await.unwrap_err(), VideoSourceError::Ended);
}

#[tokio::test]
async fn test_mock_source_fails_after_limit() {
    let mut source = MockVideoSource::new(Duration::from_millis(1)).failing_after(
        2,
        VideoSourceError::Disconnected {
            details: "unplugged".to_string(),
        },
    );

    let first = source.next_frame().await.unwrap();
    assert_eq!(first.id, 0);
    assert!(first.validate_size());
    assert!(source.next_frame().await.is_ok());
    assert!(matches!(
        source.next_frame().await,
        Err(VideoSourceError::Disconnected { .. })
    ));
}

#[tokio::test]
async fn test_mock_provider_scripted_open_error() {
    let provider = MockVideoProvider::new(Duration::from_millis(1));
    provider.fail_next_open(VideoSourceError::PermissionDenied {
        device: "mock".to_string(),
    });

    let denied = provider.open(FacingMode::Rear).await;
    assert!(matches!(denied, Err(VideoSourceError::PermissionDenied { .. })));

    let mut source = provider.open(FacingMode::Front).await.unwrap();
    source.release();
    assert_eq!(provider.opened(), vec![FacingMode::Front]);
    assert_eq!(provider.release_count(), 1);
}

#[test]
fn test_facing_mode_parsing() {
    assert_eq!("environment".parse::<FacingMode>().unwrap(), FacingMode::Rear);
    assert_eq!("USER".parse::<FacingMode>().unwrap(), FacingMode::Front);
    assert!("sideways".parse::<FacingMode>().is_err());
    assert_eq!(FacingMode::default(), FacingMode::Rear);
}

#[cfg(feature = "images")]
mod image_sequence {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &TempDir, name: &str, shade: u8) {
        let image = image::GrayImage::from_pixel(16, 8, image::Luma([shade]));
        image.save(dir.path().join(name)).unwrap();
    }

    #[test]
    fn test_load_frame_is_greyscale() {
        let dir = TempDir::new().unwrap();
        write_png(&dir, "still.png", 200);

        let frame = load_frame(&dir.path().join("still.png"), 7).unwrap();
        assert_eq!(frame.id, 7);
        assert_eq!((frame.width, frame.height), (16, 8));
        assert!(frame.validate_size());
        assert!(frame.data.iter().all(|&p| p == 200));
    }

    #[test]
    fn test_load_frame_rejects_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load_frame(&dir.path().join("missing.png"), 0).is_err());
    }

    #[tokio::test]
    async fn test_sequence_replays_sorted_images_then_ends() {
        let dir = TempDir::new().unwrap();
        write_png(&dir, "b.png", 20);
        write_png(&dir, "a.png", 10);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("c.png"), "not really a png").unwrap();

        let provider = ImageSequenceProvider::new(dir.path(), Duration::from_millis(1));
        let mut source = provider.open(FacingMode::Rear).await.unwrap();

        let first = source.next_frame().await.unwrap();
        assert_eq!(first.data[0], 10);
        let second = source.next_frame().await.unwrap();
        assert_eq!(second.data[0], 20);
        assert_eq!(source.next_frame().await.unwrap_err(), VideoSourceError::Ended);
    }

    #[cfg(feature = "rxing")]
    #[tokio::test]
    async fn test_replayed_image_decodes_to_barcode() {
        use crate::decoder::{render_code, DecodeOutcome, DecoderEngine, RxingEngine, ScanMode, Symbology};

        let dir = TempDir::new().unwrap();
        let drawn = render_code("5449000000996", rxing::BarcodeFormat::EAN_13, 300, 120);
        image::GrayImage::from_raw(drawn.width, drawn.height, drawn.data.as_ref().clone())
            .unwrap()
            .save(dir.path().join("coke.png"))
            .unwrap();

        let provider = ImageSequenceProvider::new(dir.path(), Duration::from_millis(1));
        let mut source = provider.open(FacingMode::Rear).await.unwrap();
        let frame = source.next_frame().await.unwrap();
        assert_eq!((frame.width, frame.height), (drawn.width, drawn.height));

        let outcome = RxingEngine::new(false)
            .decode(&frame, ScanMode::Retail.symbologies())
            .await;
        assert!(matches!(
            outcome,
            DecodeOutcome::Found(ref code)
                if code.payload == "5449000000996" && code.symbology == Some(Symbology::Ean13)
        ));
    }

    #[tokio::test]
    async fn test_missing_or_empty_directory_is_no_device() {
        let dir = TempDir::new().unwrap();

        let empty = ImageSequenceProvider::new(dir.path(), Duration::from_millis(1));
        assert!(matches!(
            empty.open(FacingMode::Rear).await,
            Err(VideoSourceError::NoDevice { .. })
        ));

        let missing = ImageSequenceProvider::new(dir.path().join("nope"), Duration::from_millis(1));
        assert!(matches!(
            missing.open(FacingMode::Rear).await,
            Err(VideoSourceError::NoDevice { .. })
        ));
    }
}
