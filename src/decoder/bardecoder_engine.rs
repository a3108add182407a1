use super::engine::{blocking_outcome, overlap, Capability, DecodeOutcome, DecoderEngine};
use super::types::Symbology;
use crate::error::EngineError;
use crate::frame::FrameData;
use async_trait::async_trait;
use image::{DynamicImage, GrayImage};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const SUPPORTED: &[Symbology] = &[Symbology::QrCode];

/// Heaviest reader, loaded on demand and used last
pub struct BardecoderEngine {
    loaded: AtomicBool,
}

impl BardecoderEngine {
    pub const NAME: &'static str = "bardecoder";

    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
        }
    }

    fn decode_image(image: &DynamicImage) -> std::thread::Result<Option<String>> {
        // bardecoder can panic on malformed grids
        catch_unwind(AssertUnwindSafe(|| {
            let decoder = bardecoder::default_decoder();
            decoder.decode(image).into_iter().find_map(|r| r.ok())
        }))
    }
}

impl Default for BardecoderEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecoderEngine for BardecoderEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capability(&self, formats: &[Symbology]) -> Capability {
        if overlap(SUPPORTED, formats).is_empty() {
            Capability::Unavailable("reads QR codes only".to_string())
        } else if self.loaded.load(Ordering::Acquire) {
            Capability::Available
        } else {
            Capability::NeedsLoad
        }
    }

    async fn load(&self) -> Result<(), EngineError> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }

        debug!("Warming up bardecoder pipeline");
        let warm_up = tokio::task::spawn_blocking(|| {
            let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, image::Luma([255u8])));
            Self::decode_image(&blank)
        })
        .await;

        match warm_up {
            Ok(Ok(_)) => {
                self.loaded.store(true, Ordering::Release);
                info!("bardecoder engine loaded");
                Ok(())
            }
            Ok(Err(_)) => Err(EngineError::LoadFailed {
                engine: Self::NAME.to_string(),
                details: "warm-up decode panicked".to_string(),
            }),
            Err(e) => Err(EngineError::LoadFailed {
                engine: Self::NAME.to_string(),
                details: e.to_string(),
            }),
        }
    }

    async fn decode(&self, frame: &FrameData, _formats: &[Symbology]) -> DecodeOutcome {
        if !self.loaded.load(Ordering::Acquire) {
            return DecodeOutcome::Unavailable("engine was not loaded".to_string());
        }

        let Some(luma) = frame.to_luma() else {
            warn!("Frame {} has an unexpected buffer size, skipping", frame.id);
            return DecodeOutcome::NotFound;
        };
        let (width, height) = (frame.width, frame.height);

        let result = tokio::task::spawn_blocking(move || {
            let raster = GrayImage::from_raw(width, height, luma.as_ref().clone())?;
            match Self::decode_image(&DynamicImage::ImageLuma8(raster)) {
                Ok(found) => found.map(|text| (text, Symbology::QrCode)),
                Err(_) => {
                    warn!("bardecoder panicked while decoding, treating frame as empty");
                    None
                }
            }
        })
        .await;

        blocking_outcome(Self::NAME, frame.id, result)
    }
}
