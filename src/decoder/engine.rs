use super::types::{DecodedCode, Symbology};
use crate::error::EngineError;
use crate::frame::FrameData;
use async_trait::async_trait;
use tokio::task::JoinError;
use tracing::{trace, warn};

/// Result of asking an engine whether it can run at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable(String),
    /// Usable after a fallible `load()`
    NeedsLoad,
}

/// Result of one decode attempt on one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Found(DecodedCode),
    /// No code in this frame; retrying later is fine
    NotFound,
    /// The engine cannot run; the chain moves on
    Unavailable(String),
}

/// How often an engine may be polled against a live source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCadence {
    /// Cheap enough to run at display refresh rate
    Realtime,
    /// Bound by the scanner's minimum inter-attempt interval
    Throttled,
}

/// Uniform adapter over one barcode decoding backend
#[async_trait]
pub trait DecoderEngine: Send + Sync {
    /// Name of the engine (for logging and configuration)
    fn name(&self) -> &'static str;

    fn cadence(&self) -> EngineCadence {
        EngineCadence::Throttled
    }

    /// Whether the engine can decode any of `formats` in this build
    fn capability(&self, formats: &[Symbology]) -> Capability;

    /// Prepare an engine that reported `NeedsLoad`
    async fn load(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Attempt to decode a single frame
    async fn decode(&self, frame: &FrameData, formats: &[Symbology]) -> DecodeOutcome;
}

/// Map a finished `spawn_blocking` decode onto an outcome.
///
/// A task that panicked leaves the engine in an unknown state, so it is
/// reported as unavailable and the chain stops calling it.
pub(crate) fn blocking_outcome(
    engine: &'static str,
    frame_id: u64,
    result: Result<Option<(String, Symbology)>, JoinError>,
) -> DecodeOutcome {
    match result {
        Ok(Some((text, symbology))) => {
            DecodeOutcome::Found(DecodedCode::new(text, Some(symbology), engine))
        }
        Ok(None) => {
            trace!("{} found nothing in frame {}", engine, frame_id);
            DecodeOutcome::NotFound
        }
        Err(e) => {
            warn!("{} decode task failed on frame {}: {}", engine, frame_id, e);
            DecodeOutcome::Unavailable(format!("decode task failed: {}", e))
        }
    }
}

/// Restricts `supported` to the requested formats; empty means "anything"
pub(crate) fn overlap(supported: &[Symbology], requested: &[Symbology]) -> Vec<Symbology> {
    if requested.is_empty() {
        return supported.to_vec();
    }
    supported
        .iter()
        .copied()
        .filter(|s| requested.contains(s))
        .collect()
}
