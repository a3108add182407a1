use super::engine::{
    blocking_outcome, overlap, Capability, DecodeOutcome, DecoderEngine, EngineCadence,
};
use super::types::Symbology;
use crate::frame::FrameData;
use async_trait::async_trait;
use tracing::warn;

const SUPPORTED: &[Symbology] = &[Symbology::QrCode];

/// Fast QR-only reader; also tries the inverted image
pub struct RqrrEngine;

impl RqrrEngine {
    pub const NAME: &'static str = "rqrr";

    pub fn new() -> Self {
        Self
    }

    fn scan(luma: &[u8], width: usize, height: usize, inverted: bool) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            let px = luma[y * width + x];
            if inverted {
                255 - px
            } else {
                px
            }
        });

        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| grid.decode().ok().map(|(_meta, content)| content))
    }
}

impl Default for RqrrEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecoderEngine for RqrrEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn cadence(&self) -> EngineCadence {
        EngineCadence::Realtime
    }

    fn capability(&self, formats: &[Symbology]) -> Capability {
        if overlap(SUPPORTED, formats).is_empty() {
            Capability::Unavailable("reads QR codes only".to_string())
        } else {
            Capability::Available
        }
    }

    async fn decode(&self, frame: &FrameData, _formats: &[Symbology]) -> DecodeOutcome {
        let Some(luma) = frame.to_luma() else {
            warn!("Frame {} has an unexpected buffer size, skipping", frame.id);
            return DecodeOutcome::NotFound;
        };
        let (width, height) = (frame.width as usize, frame.height as usize);

        let result = tokio::task::spawn_blocking(move || {
            Self::scan(&luma, width, height, false)
                .or_else(|| Self::scan(&luma, width, height, true))
                .map(|text| (text, Symbology::QrCode))
        })
        .await;

        blocking_outcome(Self::NAME, frame.id, result)
    }
}
