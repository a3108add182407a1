use super::*;
use crate::classifier::{Classifier, Gs1Strategy, ResultKind};
use crate::config::ScannerConfig;
use crate::decoder::{
    Capability, DecodeOutcome, DecoderEngine, EngineCadence, FallbackChain, ScanMode,
    ScriptedEngine, Symbology,
};
use crate::error::{ScanError, VideoSourceError};
use crate::events::EventBus;
use crate::frame::{FrameData, FrameFormat};
use crate::source::{FacingMode, MockVideoProvider, MockVideoSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn fast_config() -> ScannerConfig {
    ScannerConfig {
        min_interval_ms: 20,
        realtime_interval_ms: 1,
        frame_timeout_ms: 1000,
        default_mode: ScanMode::Retail,
    }
}

fn controller_with(
    provider: Arc<MockVideoProvider>,
    engines: Vec<Arc<dyn DecoderEngine>>,
) -> ScanController {
    ScanController::new(
        provider,
        engines,
        Classifier::new(Gs1Strategy::Either),
        fast_config(),
        Arc::new(EventBus::new(32)),
    )
}

fn blank_frame() -> FrameData {
    FrameData::new(0, SystemTime::now(), vec![255u8; 64], 8, 8, FrameFormat::Luma8)
}

#[tokio::test]
async fn test_session_finds_and_classifies_code() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(2)));
    let engine = ScriptedEngine::new("scripted").with_cadence(EngineCadence::Realtime);
    engine.push(DecodeOutcome::NotFound);
    engine.push(DecodeOutcome::NotFound);
    engine.push_found("3017620422003", Some(Symbology::Ean13));

    let controller = controller_with(Arc::clone(&provider), vec![Arc::new(engine)]);
    controller.start(ScanMode::Retail, FacingMode::Rear).await.unwrap();

    let report = controller.wait().await.unwrap();
    match &report.outcome {
        SessionOutcome::Found(code, classified) => {
            assert_eq!(code.payload, "3017620422003");
            assert_eq!(classified.kind, ResultKind::RetailBarcode);
            assert_eq!(classified.product_identifier.as_deref(), Some("3017620422003"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(report.state(), SessionState::Found);
    assert_eq!(report.decode_attempts, 3);
    assert_eq!(provider.release_count(), 1);
    assert!(!controller.is_active().await);
}

#[tokio::test]
async fn test_stop_during_inflight_decode_releases_once() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    let engine = ScriptedEngine::new("slow").with_delay(Duration::from_millis(200));
    let calls = engine.decode_counter();

    let controller = controller_with(Arc::clone(&provider), vec![Arc::new(engine)]);
    controller.start(ScanMode::Retail, FacingMode::Rear).await.unwrap();
    assert!(controller.is_active().await);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = controller.stop().await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.release_count(), 1);
    assert!(!controller.is_active().await);
    assert!(controller.stop().await.is_none());
}

#[tokio::test]
async fn test_source_failure_is_terminal() {
    let provider = Arc::new(
        MockVideoProvider::new(Duration::from_millis(1)).with_sources_failing_after(
            2,
            VideoSourceError::Disconnected {
                details: "unplugged".to_string(),
            },
        ),
    );
    let engine = ScriptedEngine::new("scripted").with_cadence(EngineCadence::Realtime);

    let controller = controller_with(Arc::clone(&provider), vec![Arc::new(engine)]);
    controller.start(ScanMode::Retail, FacingMode::Rear).await.unwrap();

    let report = controller.wait().await.unwrap();
    assert!(matches!(
        report.outcome,
        SessionOutcome::Failed(ScanError::VideoSource(VideoSourceError::Disconnected { .. }))
    ));
    assert_eq!(report.state(), SessionState::SourceError);
    assert_eq!(report.frames_sampled, 2);
    assert!(report.outcome.user_message().unwrap().contains("Retry"));
    assert_eq!(provider.release_count(), 1);
}

#[tokio::test]
async fn test_no_decoder_available_ends_session() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    let engines: Vec<Arc<dyn DecoderEngine>> = vec![
        Arc::new(ScriptedEngine::unavailable("first")),
        Arc::new(
            ScriptedEngine::new("second")
                .with_capability(Capability::NeedsLoad)
                .with_load_error("warm-up failed"),
        ),
    ];

    let controller = controller_with(Arc::clone(&provider), engines);
    controller.start(ScanMode::Marking, FacingMode::Rear).await.unwrap();

    let report = controller.wait().await.unwrap();
    assert_eq!(report.state(), SessionState::Exhausted);
    assert!(report
        .outcome
        .user_message()
        .unwrap()
        .contains("manually"));
    assert_eq!(provider.release_count(), 1);
}

#[tokio::test]
async fn test_open_failure_surfaces_guidance() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    provider.fail_next_open(VideoSourceError::PermissionDenied {
        device: "/dev/video0".to_string(),
    });

    let controller = controller_with(Arc::clone(&provider), vec![Arc::new(ScriptedEngine::new("a"))]);
    let err = controller
        .start(ScanMode::Retail, FacingMode::Rear)
        .await
        .unwrap_err();

    assert!(err.user_message().contains("Grant camera access"));
    assert!(!controller.is_active().await);
    assert_eq!(provider.release_count(), 0);
}

#[tokio::test]
async fn test_switch_camera_releases_previous_source() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(5)));
    let controller = controller_with(Arc::clone(&provider), vec![Arc::new(ScriptedEngine::new("a"))]);

    let first = controller.start(ScanMode::Qr, FacingMode::Rear).await.unwrap();
    let second = controller.switch_camera(FacingMode::Front).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(provider.release_count(), 1);
    assert_eq!(provider.opened(), vec![FacingMode::Rear, FacingMode::Front]);

    let report = controller.stop().await.unwrap();
    assert_eq!(report.mode, ScanMode::Qr);
    assert_eq!(report.session_id, second);
    assert_eq!(provider.release_count(), 2);
}

#[tokio::test]
async fn test_restart_tears_down_prior_session() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(5)));
    let controller = controller_with(Arc::clone(&provider), vec![Arc::new(ScriptedEngine::new("a"))]);

    controller.start(ScanMode::Retail, FacingMode::Rear).await.unwrap();
    controller.start(ScanMode::Marking, FacingMode::Rear).await.unwrap();
    assert_eq!(provider.release_count(), 1);

    controller.stop().await;
    assert_eq!(provider.release_count(), 2);
}

#[tokio::test]
async fn test_throttled_engine_respects_interval_floor() {
    let releases = Arc::new(AtomicUsize::new(0));
    let source = MockVideoSource::new(Duration::ZERO).with_release_counter(Arc::clone(&releases));
    let engine = ScriptedEngine::new("throttled");
    let calls = engine.decode_counter();

    let mut config = fast_config();
    config.min_interval_ms = 50;

    let session = ScanSession::new(ScanMode::Retail, Box::new(source));
    let token = session.cancellation_token();
    let chain = FallbackChain::new(vec![Arc::new(engine)]);
    let task = tokio::spawn(run_session(
        session,
        chain,
        Classifier::new(Gs1Strategy::Either),
        config,
        Arc::new(EventBus::default()),
    ));

    tokio::time::sleep(Duration::from_millis(270)).await;
    token.cancel();
    let report = task.await.unwrap();

    let attempts = calls.load(Ordering::SeqCst);
    assert!(attempts >= 2, "too few attempts: {}", attempts);
    assert!(attempts <= 6, "interval floor ignored: {}", attempts);
    assert_eq!(report.outcome, SessionOutcome::Cancelled);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_publishes_lifecycle_events() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    let events = Arc::new(EventBus::new(32));
    let mut receiver = events.subscribe();

    let controller = ScanController::new(
        provider,
        vec![Arc::new(ScriptedEngine::always_found("a", "https://example.com/x", None))],
        Classifier::new(Gs1Strategy::Either),
        fast_config(),
        Arc::clone(&events),
    );
    controller.start(ScanMode::Qr, FacingMode::Rear).await.unwrap();
    let report = controller.wait().await.unwrap();
    assert_eq!(report.state(), SessionState::Found);

    let mut seen = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        seen.push(event.event_type());
    }
    assert_eq!(seen, vec!["session_started", "code_detected", "session_ended"]);
}

#[tokio::test]
async fn test_decode_still_falls_through_engines() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    let missing = ScriptedEngine::new("missing");
    let missing_calls = missing.decode_counter();
    let engines: Vec<Arc<dyn DecoderEngine>> = vec![
        Arc::new(ScriptedEngine::unavailable("unsupported")),
        Arc::new(missing),
        Arc::new(ScriptedEngine::always_found(
            "finder",
            "0103017620422003211234567890123",
            Some(Symbology::DataMatrix),
        )),
    ];
    let controller = controller_with(provider, engines);

    let code = controller
        .decode_still(&blank_frame(), ScanMode::Marking)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code.engine, "finder");
    assert_eq!(missing_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_decode_still_reports_miss() {
    let provider = Arc::new(MockVideoProvider::new(Duration::from_millis(1)));
    let controller = controller_with(provider, vec![Arc::new(ScriptedEngine::new("a"))]);

    let decoded = controller
        .decode_still(&blank_frame(), ScanMode::Retail)
        .await
        .unwrap();
    assert!(decoded.is_none());
}
