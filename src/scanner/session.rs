use super::types::{SamplingTiming, SessionOutcome, SessionReport, SessionState};
use crate::classifier::Classifier;
use crate::config::ScannerConfig;
use crate::decoder::{ChainOutcome, EngineCadence, FallbackChain, MissPolicy, ScanMode};
use crate::error::{ScanError, VideoSourceError};
use crate::events::{EventBus, ScanEvent};
use crate::source::{SourceGuard, VideoSource};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// One scan attempt against one video source
pub struct ScanSession {
    id: String,
    mode: ScanMode,
    active: CancellationToken,
    source: SourceGuard,
    last_attempt: Option<Instant>,
    state: SessionState,
}

impl ScanSession {
    pub fn new(mode: ScanMode, source: Box<dyn VideoSource>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            active: CancellationToken::new(),
            source: SourceGuard::new(source),
            last_attempt: None,
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token that deactivates the session when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.active.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.active.is_cancelled()
    }
}

/// Sample frames from the session's source until a code is found, the
/// session is cancelled or a terminal error occurs.
///
/// The source is released before this returns, whatever the outcome.
pub async fn run_session(
    mut session: ScanSession,
    mut chain: FallbackChain,
    classifier: Classifier,
    config: ScannerConfig,
    events: Arc<EventBus>,
) -> SessionReport {
    let timing = SamplingTiming::from(&config);
    let formats = session.mode.symbologies();
    let mut frames_sampled = 0u64;
    let mut decode_attempts = 0u64;

    session.state = SessionState::Sampling;
    info!("Scan session {} started in {} mode", session.id, session.mode);
    publish(
        &events,
        ScanEvent::SessionStarted {
            session_id: session.id.clone(),
            mode: session.mode,
            timestamp: SystemTime::now(),
        },
    )
    .await;

    chain.prepare(formats).await;

    let outcome = 'sampling: loop {
        if session.active.is_cancelled() {
            break 'sampling SessionOutcome::Cancelled;
        }

        let interval = match chain.active_cadence() {
            EngineCadence::Realtime => timing.realtime_interval,
            EngineCadence::Throttled => timing.min_interval,
        };
        if let Some(last) = session.last_attempt {
            let elapsed = last.elapsed();
            if elapsed < interval {
                tokio::select! {
                    _ = session.active.cancelled() => break 'sampling SessionOutcome::Cancelled,
                    _ = tokio::time::sleep(interval - elapsed) => {}
                }
            }
        }

        let grabbed = tokio::select! {
            _ = session.active.cancelled() => break 'sampling SessionOutcome::Cancelled,
            grabbed = tokio::time::timeout(timing.frame_timeout, session.source.next_frame()) => grabbed,
        };

        let frame = match grabbed {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                warn!("Video source failed in session {}: {}", session.id, e);
                break 'sampling SessionOutcome::Failed(ScanError::VideoSource(e));
            }
            Err(_) => {
                warn!(
                    "No frame within {:?} in session {}",
                    timing.frame_timeout, session.id
                );
                break 'sampling SessionOutcome::Failed(ScanError::VideoSource(
                    VideoSourceError::Disconnected {
                        details: format!("no frame within {:?}", timing.frame_timeout),
                    },
                ));
            }
        };
        frames_sampled += 1;

        // Decodes run to completion; only their result is subject to cancellation
        session.last_attempt = Some(Instant::now());
        decode_attempts += 1;
        let attempt = chain
            .attempt(&frame, formats, MissPolicy::RetrySameEngine)
            .await;

        if session.active.is_cancelled() {
            debug!(
                "Session {} cancelled during decode, discarding result",
                session.id
            );
            break 'sampling SessionOutcome::Cancelled;
        }

        match attempt {
            Ok(ChainOutcome::Found(code)) => {
                debug!(
                    "Frame {} decoded by {}, {} ms after capture",
                    frame.id,
                    code.engine,
                    frame.age_ms()
                );
                let classified = classifier.classify(&code);
                publish(
                    &events,
                    ScanEvent::CodeDetected {
                        session_id: session.id.clone(),
                        payload: code.payload.clone(),
                        engine: code.engine.to_string(),
                        timestamp: SystemTime::now(),
                    },
                )
                .await;
                break 'sampling SessionOutcome::Found(code, classified);
            }
            Ok(ChainOutcome::Miss { engine }) => {
                trace!("Frame {} missed by {}", frame.id, engine);
            }
            Err(e) => break 'sampling SessionOutcome::Failed(e),
        }
    };

    session.source.release();
    session.state = outcome.state();

    let report = SessionReport {
        session_id: session.id.clone(),
        mode: session.mode,
        outcome,
        frames_sampled,
        decode_attempts,
        engine_states: chain.engine_states(),
    };

    info!("Scan session {} {}", session.id, report.summary());
    publish(
        &events,
        ScanEvent::SessionEnded {
            session_id: session.id.clone(),
            reason: report.summary(),
        },
    )
    .await;

    report
}

async fn publish(events: &EventBus, event: ScanEvent) {
    if let Err(e) = events.publish(event).await {
        debug!("Scan event not delivered: {}", e);
    }
}
