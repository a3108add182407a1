use super::*;
use crate::classifier::ResultKind;
use crate::config::NutriscanConfig;
use crate::decoder::{DecoderEngine, ScanMode, ScriptedEngine, Symbology};
use crate::error::{NutriscanError, ScanError, VideoSourceError};
use crate::frame::{FrameData, FrameFormat};
use crate::lookup::ProductSource;
use crate::scanner::SessionOutcome;
use crate::source::{FacingMode, MockVideoProvider};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn create_test_config(dir: &TempDir) -> NutriscanConfig {
    let mut config = NutriscanConfig::default();
    config.lookup.remote = false;
    config.scanner.min_interval_ms = 10;
    config.scanner.realtime_interval_ms = 1;
    config.history.path = dir
        .path()
        .join("history.json")
        .to_string_lossy()
        .into_owned();
    config
}

fn test_frame() -> FrameData {
    FrameData::new(1, SystemTime::now(), vec![0u8; 16], 4, 4, FrameFormat::Luma8)
}

#[test]
fn test_app_creation_uses_configured_engines() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir);
    config.decoder.engines = vec!["no-such-engine".to_string()];

    let app = NutriscanApp::new(config).unwrap();
    assert!(app.engine_names().is_empty());
    assert!(app.config().history.path.ends_with("history.json"));
}

#[tokio::test]
async fn test_scan_frame_classifies_marking_code() {
    let dir = TempDir::new().unwrap();
    let engines: Vec<Arc<dyn DecoderEngine>> = vec![
        Arc::new(ScriptedEngine::new("first")),
        Arc::new(ScriptedEngine::always_found(
            "second",
            "0103017620422003211234567890123",
            None,
        )),
    ];
    let app = NutriscanApp::new(create_test_config(&dir))
        .unwrap()
        .with_engines(engines);

    let (code, classified) = app
        .scan_frame(&test_frame(), ScanMode::Marking)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code.engine, "second");
    assert_eq!(classified.kind, ResultKind::MarkingCode);

    let (id, product) = app.resolve(&classified).await.unwrap();
    assert_eq!(id, "03017620422003");
    assert!(product.is_placeholder());
}

#[tokio::test]
async fn test_scan_frame_without_engines_is_terminal() {
    let dir = TempDir::new().unwrap();
    let app = NutriscanApp::new(create_test_config(&dir))
        .unwrap()
        .with_engines(Vec::new());

    let err = app
        .scan_frame(&test_frame(), ScanMode::Retail)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NutriscanError::Scan(ScanError::NoDecoderAvailable { .. })
    ));
}

#[tokio::test]
async fn test_run_live_finds_demo_product() {
    let dir = TempDir::new().unwrap();
    let app = NutriscanApp::new(create_test_config(&dir))
        .unwrap()
        .with_engines(vec![Arc::new(ScriptedEngine::always_found(
            "scripted",
            "3017620422003",
            Some(Symbology::Ean13),
        ))]);
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));

    let report = app
        .run_live(provider.clone(), ScanMode::Retail, FacingMode::Rear)
        .await
        .unwrap();
    assert_eq!(provider.release_count(), 1);

    let classified = match report.outcome {
        SessionOutcome::Found(_, classified) => classified,
        other => panic!("unexpected outcome: {:?}", other),
    };
    let (id, product) = app.resolve(&classified).await.unwrap();
    assert_eq!(product.name, "Nutella");
    assert_eq!(product.source, ProductSource::Demo);

    app.remember(&product, &id).await.unwrap();
    let history = app.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history.recent(1)[0].barcode, "3017620422003");

    assert_eq!(app.clear_history().await.unwrap(), 1);
    assert!(app.history().await.is_empty());
}

#[tokio::test]
async fn test_run_live_reports_open_failure() {
    let dir = TempDir::new().unwrap();
    let app = NutriscanApp::new(create_test_config(&dir)).unwrap();
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    provider.fail_next_open(VideoSourceError::NoDevice {
        device: "/dev/video0".to_string(),
    });

    let err = app
        .run_live(provider, ScanMode::Retail, FacingMode::Rear)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NutriscanError::Scan(ScanError::VideoSource(VideoSourceError::NoDevice { .. }))
    ));
}

#[tokio::test]
async fn test_lookup_manual_validates_input() {
    let dir = TempDir::new().unwrap();
    let app = NutriscanApp::new(create_test_config(&dir)).unwrap();

    assert!(app.lookup_manual("   ").await.is_err());
    assert!(app.lookup_manual("1234567").await.is_err());

    let (id, product) = app.lookup_manual(" 4014400900508 ").await.unwrap();
    assert_eq!(id, "4014400900508");
    assert_eq!(product.name, "Red Bull Energy Drink");
}

#[tokio::test]
async fn test_generic_payload_has_nothing_to_resolve() {
    let dir = TempDir::new().unwrap();
    let app = NutriscanApp::new(create_test_config(&dir)).unwrap();
    let classified = app
        .classifier()
        .classify_payload("https://example.com/x", None);
    assert!(app.resolve(&classified).await.is_none());
}

#[test]
fn test_video_provider_for_frames_dir() {
    let dir = TempDir::new().unwrap();
    let app = NutriscanApp::new(create_test_config(&dir)).unwrap();
    let provider = app.video_provider(Some(dir.path()));
    assert_eq!(provider.is_ok(), cfg!(feature = "images"));
}
