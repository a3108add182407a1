use super::engine::{Capability, DecodeOutcome, DecoderEngine, EngineCadence};
use super::types::{DecodedCode, Symbology};
use crate::error::EngineError;
use crate::frame::FrameData;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Engine replaying a fixed script of outcomes.
///
/// Used by tests and by hosts that bridge a platform detector living outside
/// the process: the host pushes whatever its detector reported.
pub struct ScriptedEngine {
    name: &'static str,
    cadence: EngineCadence,
    capability: Capability,
    load_error: Option<String>,
    script: Mutex<VecDeque<DecodeOutcome>>,
    fallback: DecodeOutcome,
    delay: Option<Duration>,
    decode_calls: Arc<AtomicUsize>,
    load_calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    /// Available engine that never finds anything until scripted
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cadence: EngineCadence::Throttled,
            capability: Capability::Available,
            load_error: None,
            script: Mutex::new(VecDeque::new()),
            fallback: DecodeOutcome::NotFound,
            delay: None,
            decode_calls: Arc::new(AtomicUsize::new(0)),
            load_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Engine whose capability query reports it cannot run
    pub fn unavailable(name: &'static str) -> Self {
        Self::new(name).with_capability(Capability::Unavailable("scripted".to_string()))
    }

    /// Engine that always decodes `payload`
    pub fn always_found(name: &'static str, payload: &str, symbology: Option<Symbology>) -> Self {
        let mut engine = Self::new(name);
        engine.fallback = DecodeOutcome::Found(DecodedCode::new(payload, symbology, name));
        engine
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_cadence(mut self, cadence: EngineCadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Make `load()` fail with the given details
    pub fn with_load_error(mut self, details: &str) -> Self {
        self.load_error = Some(details.to_string());
        self
    }

    /// Sleep before answering each decode call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Outcome returned once the script runs dry
    pub fn with_fallback(mut self, outcome: DecodeOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Queue outcomes to be returned in order
    pub fn push(&self, outcome: DecodeOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Queue a successful decode
    pub fn push_found(&self, payload: &str, symbology: Option<Symbology>) {
        self.push(DecodeOutcome::Found(DecodedCode::new(payload, symbology, self.name)));
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    /// Shared counter, readable after the engine moved into a chain
    pub fn decode_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.decode_calls)
    }
}

#[async_trait]
impl DecoderEngine for ScriptedEngine {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cadence(&self) -> EngineCadence {
        self.cadence
    }

    fn capability(&self, _formats: &[Symbology]) -> Capability {
        self.capability.clone()
    }

    async fn load(&self) -> Result<(), EngineError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        match &self.load_error {
            Some(details) => Err(EngineError::LoadFailed {
                engine: self.name.to_string(),
                details: details.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn decode(&self, frame: &FrameData, _formats: &[Symbology]) -> DecodeOutcome {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        debug!("Scripted engine {} answered frame {}: {:?}", self.name, frame.id, outcome);
        outcome
    }
}

/// Render `contents` as a real barcode with a white quiet zone around it
#[cfg(all(test, feature = "rxing"))]
pub(crate) fn render_code(
    contents: &str,
    format: rxing::BarcodeFormat,
    width: i32,
    height: i32,
) -> FrameData {
    use rxing::Writer;
    use std::time::SystemTime;

    const QUIET_ZONE: u32 = 20;

    let matrix = rxing::MultiFormatWriter::default()
        .encode(contents, &format, width, height)
        .unwrap();
    let (code_width, code_height) = (matrix.getWidth(), matrix.getHeight());
    let frame_width = code_width + 2 * QUIET_ZONE;
    let frame_height = code_height + 2 * QUIET_ZONE;

    let mut pixels = vec![255u8; (frame_width * frame_height) as usize];
    for y in 0..code_height {
        for x in 0..code_width {
            if matrix.get(x, y) {
                pixels[((y + QUIET_ZONE) * frame_width + x + QUIET_ZONE) as usize] = 0;
            }
        }
    }

    FrameData::new(
        1,
        SystemTime::now(),
        pixels,
        frame_width,
        frame_height,
        crate::frame::FrameFormat::Luma8,
    )
}
