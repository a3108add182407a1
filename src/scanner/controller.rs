use super::session::{run_session, ScanSession};
use super::still::decode_still;
use super::types::SessionReport;
use crate::classifier::Classifier;
use crate::config::ScannerConfig;
use crate::decoder::{DecodedCode, DecoderEngine, FallbackChain, ScanMode};
use crate::error::ScanError;
use crate::events::EventBus;
use crate::frame::FrameData;
use crate::source::{FacingMode, VideoSourceProvider};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

struct RunningSession {
    id: String,
    mode: ScanMode,
    facing: FacingMode,
    token: CancellationToken,
    report: watch::Receiver<Option<SessionReport>>,
    handle: JoinHandle<()>,
}

/// Start/stop surface over scan sessions; at most one session runs at a time
pub struct ScanController {
    provider: Arc<dyn VideoSourceProvider>,
    engines: Vec<Arc<dyn DecoderEngine>>,
    classifier: Classifier,
    config: ScannerConfig,
    events: Arc<EventBus>,
    current: Mutex<Option<RunningSession>>,
}

impl ScanController {
    pub fn new(
        provider: Arc<dyn VideoSourceProvider>,
        engines: Vec<Arc<dyn DecoderEngine>>,
        classifier: Classifier,
        config: ScannerConfig,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            engines,
            classifier,
            config,
            events,
            current: Mutex::new(None),
        }
    }

    /// Start a session, tearing down any prior one first. Returns the session id.
    pub async fn start(&self, mode: ScanMode, facing: FacingMode) -> Result<String, ScanError> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            info!("Tearing down session {} before starting a new one", previous.id);
            Self::teardown(previous).await;
        }

        let source = self.provider.open(facing).await.map_err(|e| {
            error!("Failed to open {} camera: {}", facing, e);
            ScanError::VideoSource(e)
        })?;

        let session = ScanSession::new(mode, source);
        let id = session.id().to_string();
        let token = session.cancellation_token();
        let chain =
            FallbackChain::new(self.engines.clone()).with_events(Arc::clone(&self.events));

        let (report_tx, report_rx) = watch::channel(None);
        let classifier = self.classifier;
        let config = self.config.clone();
        let events = Arc::clone(&self.events);
        let handle = tokio::spawn(async move {
            let report = run_session(session, chain, classifier, config, events).await;
            let _ = report_tx.send(Some(report));
        });

        *current = Some(RunningSession {
            id: id.clone(),
            mode,
            facing,
            token,
            report: report_rx,
            handle,
        });

        Ok(id)
    }

    /// Cancel the current session and wait for its source to be released
    pub async fn stop(&self) -> Option<SessionReport> {
        let running = self.current.lock().await.take()?;
        info!("Stopping scan session {}", running.id);
        Self::teardown(running).await
    }

    /// Restart the current session's mode on another camera
    pub async fn switch_camera(&self, facing: FacingMode) -> Result<String, ScanError> {
        let mode = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(running) => {
                    debug!("Switching session {} from {} to {}", running.id, running.facing, facing);
                    running.mode
                }
                None => self.config.default_mode,
            }
        };
        self.start(mode, facing).await
    }

    /// Wait for the current session to end on its own
    pub async fn wait(&self) -> Option<SessionReport> {
        let mut report = {
            let current = self.current.lock().await;
            current.as_ref()?.report.clone()
        };

        let finished = match report.wait_for(|report| report.is_some()).await {
            Ok(report) => report.clone(),
            Err(_) => {
                error!("Scan session task ended without a report");
                None
            }
        };
        finished
    }

    pub async fn is_active(&self) -> bool {
        let current = self.current.lock().await;
        current
            .as_ref()
            .map(|running| !running.handle.is_finished())
            .unwrap_or(false)
    }

    /// Decode a single still image, giving every engine a go at it
    pub async fn decode_still(
        &self,
        frame: &FrameData,
        mode: ScanMode,
    ) -> Result<Option<DecodedCode>, ScanError> {
        decode_still(self.engines.clone(), Some(Arc::clone(&self.events)), frame, mode).await
    }

    async fn teardown(running: RunningSession) -> Option<SessionReport> {
        running.token.cancel();
        if let Err(e) = running.handle.await {
            error!("Scan session {} task failed: {}", running.id, e);
            return None;
        }
        let report = running.report.borrow().clone();
        report
    }
}
