use super::engine::{
    blocking_outcome, overlap, Capability, DecodeOutcome, DecoderEngine, EngineCadence,
};
use super::types::Symbology;
use crate::error::EngineError;
use crate::frame::FrameData;
use async_trait::async_trait;
use rxing::common::{GlobalHistogramBinarizer, HybridBinarizer};
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintType, DecodeHintValue, Luma8LuminanceSource,
    MultiFormatReader, Reader,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const SUPPORTED: &[Symbology] = &[
    Symbology::Ean13,
    Symbology::Ean8,
    Symbology::UpcA,
    Symbology::UpcE,
    Symbology::Code128,
    Symbology::Code39,
    Symbology::QrCode,
    Symbology::DataMatrix,
];

#[derive(Debug, Clone, Copy)]
enum Pass {
    /// Hybrid binarizer, tuned for well-lit frames
    Fast { try_harder: bool },
    /// Global histogram binarizer, try-harder and inverted images
    Deep,
}

fn to_rxing(symbology: Symbology) -> Option<BarcodeFormat> {
    match symbology {
        Symbology::Ean13 => Some(BarcodeFormat::EAN_13),
        Symbology::Ean8 => Some(BarcodeFormat::EAN_8),
        Symbology::UpcA => Some(BarcodeFormat::UPC_A),
        Symbology::UpcE => Some(BarcodeFormat::UPC_E),
        Symbology::Code128 => Some(BarcodeFormat::CODE_128),
        Symbology::Code39 => Some(BarcodeFormat::CODE_39),
        Symbology::QrCode => Some(BarcodeFormat::QR_CODE),
        Symbology::DataMatrix => Some(BarcodeFormat::DATA_MATRIX),
        Symbology::Unknown => None,
    }
}

fn from_rxing(format: &BarcodeFormat) -> Symbology {
    match format {
        BarcodeFormat::EAN_13 => Symbology::Ean13,
        BarcodeFormat::EAN_8 => Symbology::Ean8,
        BarcodeFormat::UPC_A => Symbology::UpcA,
        BarcodeFormat::UPC_E => Symbology::UpcE,
        BarcodeFormat::CODE_128 => Symbology::Code128,
        BarcodeFormat::CODE_39 => Symbology::Code39,
        BarcodeFormat::QR_CODE | BarcodeFormat::MICRO_QR_CODE => Symbology::QrCode,
        BarcodeFormat::DATA_MATRIX => Symbology::DataMatrix,
        _ => Symbology::Unknown,
    }
}

fn support(formats: &[Symbology]) -> Option<HashSet<BarcodeFormat>> {
    let possible: HashSet<BarcodeFormat> = overlap(SUPPORTED, formats)
        .into_iter()
        .filter_map(to_rxing)
        .collect();
    (!possible.is_empty()).then_some(possible)
}

/// Blocking rxing read over a luma plane
fn read(
    luma: Vec<u8>,
    width: u32,
    height: u32,
    possible: HashSet<BarcodeFormat>,
    pass: Pass,
) -> Option<(String, Symbology)> {
    let mut hints = HashMap::new();
    hints.insert(
        DecodeHintType::POSSIBLE_FORMATS,
        DecodeHintValue::PossibleFormats(possible),
    );

    let source = Luma8LuminanceSource::new(luma, width, height);
    let mut reader = MultiFormatReader::default();

    // Every rxing error (not found, checksum, format) means no readable code
    let result = match pass {
        Pass::Fast { try_harder } => {
            if try_harder {
                hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
            }
            let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
            reader.decode_with_hints(&mut bitmap, &hints)
        }
        Pass::Deep => {
            hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
            hints.insert(
                DecodeHintType::ALSO_INVERTED,
                DecodeHintValue::AlsoInverted(true),
            );
            let mut bitmap = BinaryBitmap::new(GlobalHistogramBinarizer::new(source));
            reader.decode_with_hints(&mut bitmap, &hints)
        }
    };

    result
        .ok()
        .map(|r| (r.getText().to_string(), from_rxing(r.getBarcodeFormat())))
}

async fn decode_frame(
    engine: &'static str,
    frame: &FrameData,
    formats: &[Symbology],
    pass: Pass,
) -> DecodeOutcome {
    let Some(luma) = frame.to_luma() else {
        warn!("Frame {} has an unexpected buffer size, skipping", frame.id);
        return DecodeOutcome::NotFound;
    };
    let Some(possible) = support(formats) else {
        return DecodeOutcome::Unavailable("none of the requested symbologies are supported".to_string());
    };
    let (width, height) = (frame.width, frame.height);

    let result = tokio::task::spawn_blocking(move || {
        read(luma.as_ref().clone(), width, height, possible, pass)
    })
    .await;

    blocking_outcome(engine, frame.id, result)
}

/// In-process multi-format reader covering every retail and 2D symbology
pub struct RxingEngine {
    try_harder: bool,
}

impl RxingEngine {
    pub const NAME: &'static str = "rxing";

    pub fn new(try_harder: bool) -> Self {
        Self { try_harder }
    }
}

#[async_trait]
impl DecoderEngine for RxingEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn cadence(&self) -> EngineCadence {
        EngineCadence::Realtime
    }

    fn capability(&self, formats: &[Symbology]) -> Capability {
        match support(formats) {
            Some(_) => Capability::Available,
            None => Capability::Unavailable(
                "none of the requested symbologies are supported".to_string(),
            ),
        }
    }

    async fn decode(&self, frame: &FrameData, formats: &[Symbology]) -> DecodeOutcome {
        let pass = Pass::Fast {
            try_harder: self.try_harder,
        };
        decode_frame(Self::NAME, frame, formats, pass).await
    }
}

/// Slow last-resort rxing pass for damaged, dim or inverted codes.
///
/// Loaded on demand and throttled to the scanner's minimum interval.
pub struct RxingDeepEngine {
    loaded: AtomicBool,
}

impl RxingDeepEngine {
    pub const NAME: &'static str = "rxing-deep";

    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
        }
    }
}

impl Default for RxingDeepEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecoderEngine for RxingDeepEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capability(&self, formats: &[Symbology]) -> Capability {
        if support(formats).is_none() {
            Capability::Unavailable("none of the requested symbologies are supported".to_string())
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

        debug!("Warming up deep rxing reader");
        let warm_up = tokio::task::spawn_blocking(|| {
            let possible = support(&[]).unwrap_or_default();
            read(vec![255u8; 32 * 32], 32, 32, possible, Pass::Deep)
        })
        .await;

        match warm_up {
            Ok(_) => {
                self.loaded.store(true, Ordering::Release);
                info!("{} engine loaded", Self::NAME);
                Ok(())
            }
            Err(e) => Err(EngineError::LoadFailed {
                engine: Self::NAME.to_string(),
                details: e.to_string(),
            }),
        }
    }

    async fn decode(&self, frame: &FrameData, formats: &[Symbology]) -> DecodeOutcome {
        if !self.loaded.load(Ordering::Acquire) {
            return DecodeOutcome::Unavailable("engine was not loaded".to_string());
        }
        decode_frame(Self::NAME, frame, formats, Pass::Deep).await
    }
}
