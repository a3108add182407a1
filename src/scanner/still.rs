use crate::decoder::{ChainOutcome, DecodedCode, DecoderEngine, FallbackChain, MissPolicy, ScanMode};
use crate::error::ScanError;
use crate::events::EventBus;
use crate::frame::FrameData;
use std::sync::Arc;
use tracing::debug;

/// Photo mode: run every available engine over one frame until one decodes it
pub async fn decode_still(
    engines: Vec<Arc<dyn DecoderEngine>>,
    events: Option<Arc<EventBus>>,
    frame: &FrameData,
    mode: ScanMode,
) -> Result<Option<DecodedCode>, ScanError> {
    let formats = mode.symbologies();
    let mut chain = FallbackChain::new(engines);
    if let Some(events) = events {
        chain = chain.with_events(events);
    }
    chain.prepare(formats).await;

    match chain.attempt(frame, formats, MissPolicy::FallThrough).await? {
        ChainOutcome::Found(code) => Ok(Some(code)),
        ChainOutcome::Miss { engine } => {
            debug!("No code in frame {} (last engine {})", frame.id, engine);
            Ok(None)
        }
    }
}
