use crate::classifier::ClassifiedResult;
use crate::config::ScannerConfig;
use crate::decoder::{DecodedCode, EngineState, ScanMode};
use crate::error::ScanError;
use std::time::Duration;

/// Lifecycle of one scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sampling,
    Found,
    Cancelled,
    /// The video source failed or ended mid-session
    SourceError,
    /// No decoder engine could run
    Exhausted,
}

/// How a scan session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Found(DecodedCode, ClassifiedResult),
    Cancelled,
    Failed(ScanError),
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Found(..) => SessionState::Found,
            SessionOutcome::Cancelled => SessionState::Cancelled,
            SessionOutcome::Failed(ScanError::VideoSource(_)) => SessionState::SourceError,
            SessionOutcome::Failed(ScanError::NoDecoderAvailable { .. }) => SessionState::Exhausted,
        }
    }

    /// Guidance for the user when the session failed
    pub fn user_message(&self) -> Option<String> {
        match self {
            SessionOutcome::Failed(e) => Some(e.user_message()),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::Failed(_))
    }

    fn label(&self) -> String {
        match self {
            SessionOutcome::Found(code, _) => format!("found by {}", code.engine),
            SessionOutcome::Cancelled => "cancelled".to_string(),
            SessionOutcome::Failed(e) => format!("failed: {}", e),
        }
    }
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub mode: ScanMode,
    pub outcome: SessionOutcome,
    pub frames_sampled: u64,
    pub decode_attempts: u64,
    pub engine_states: Vec<(&'static str, EngineState)>,
}

impl SessionReport {
    pub fn state(&self) -> SessionState {
        self.outcome.state()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} after {} frames ({} attempts)",
            self.outcome.label(),
            self.frames_sampled,
            self.decode_attempts
        )
    }
}

/// Loop timing derived from `[scanner]` config
#[derive(Debug, Clone, Copy)]
pub(crate) struct SamplingTiming {
    pub min_interval: Duration,
    pub realtime_interval: Duration,
    pub frame_timeout: Duration,
}

impl From<&ScannerConfig> for SamplingTiming {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_interval_ms),
            realtime_interval: Duration::from_millis(config.realtime_interval_ms),
            frame_timeout: Duration::from_millis(config.frame_timeout_ms),
        }
    }
}
