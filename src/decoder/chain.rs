use super::engine::{Capability, DecodeOutcome, DecoderEngine, EngineCadence};
use super::types::{DecodedCode, Symbology};
use crate::error::ScanError;
use crate::events::{EventBus, ScanEvent};
use crate::frame::FrameData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a miss means for the rest of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissPolicy {
    /// Live sampling: report the miss, retry the same engine on the next frame
    RetrySameEngine,
    /// Still images: give every remaining engine a go at the same frame
    FallThrough,
}

/// Per-session view of one engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// Capability not evaluated yet
    Pending,
    /// Must be loaded before first use
    NeedsLoad,
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Found(DecodedCode),
    Miss { engine: &'static str },
}

struct EngineSlot {
    engine: Arc<dyn DecoderEngine>,
    state: EngineState,
}

/// Ranked list of engines tried in priority order.
///
/// An engine that is unavailable (capability query, failed load or a
/// structural failure during decode) is skipped for the rest of the session.
pub struct FallbackChain {
    slots: Vec<EngineSlot>,
    cursor: usize,
    prepared: bool,
    events: Option<Arc<EventBus>>,
}

impl FallbackChain {
    pub fn new(engines: Vec<Arc<dyn DecoderEngine>>) -> Self {
        Self {
            slots: engines
                .into_iter()
                .map(|engine| EngineSlot {
                    engine,
                    state: EngineState::Pending,
                })
                .collect(),
            cursor: 0,
            prepared: false,
            events: None,
        }
    }

    /// Publish `EngineUnavailable` events on the given bus
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Evaluate every engine's capability once for this session.
    ///
    /// Engines that need loading are loaded lazily when the chain reaches them.
    pub async fn prepare(&mut self, formats: &[Symbology]) {
        for idx in 0..self.slots.len() {
            let capability = self.slots[idx].engine.capability(formats);
            match capability {
                Capability::Available => self.slots[idx].state = EngineState::Ready,
                Capability::NeedsLoad => self.slots[idx].state = EngineState::NeedsLoad,
                Capability::Unavailable(reason) => self.mark_unavailable(idx, reason).await,
            }
        }
        self.prepared = true;
        self.cursor = self.first_usable().unwrap_or(self.slots.len());
        debug!("Decoder chain prepared: {:?}", self.engine_states());
    }

    /// Run one frame attempt through the chain
    pub async fn attempt(
        &mut self,
        frame: &FrameData,
        formats: &[Symbology],
        policy: MissPolicy,
    ) -> Result<ChainOutcome, ScanError> {
        if !self.prepared {
            self.prepare(formats).await;
        }

        let mut last_miss = None;
        let mut idx = self.cursor;

        while idx < self.slots.len() {
            match self.slots[idx].state.clone() {
                EngineState::Unavailable(_) => {
                    idx += 1;
                    continue;
                }
                EngineState::NeedsLoad | EngineState::Pending => {
                    if !self.load(idx).await {
                        idx += 1;
                        continue;
                    }
                }
                EngineState::Ready => {}
            }

            let engine = Arc::clone(&self.slots[idx].engine);
            match engine.decode(frame, formats).await {
                DecodeOutcome::Found(code) => {
                    debug!("Engine {} decoded frame {}", engine.name(), frame.id);
                    self.cursor = self.first_usable().unwrap_or(idx);
                    return Ok(ChainOutcome::Found(code));
                }
                DecodeOutcome::NotFound => match policy {
                    MissPolicy::RetrySameEngine => {
                        self.cursor = idx;
                        return Ok(ChainOutcome::Miss {
                            engine: engine.name(),
                        });
                    }
                    MissPolicy::FallThrough => {
                        last_miss = Some(engine.name());
                        idx += 1;
                    }
                },
                DecodeOutcome::Unavailable(reason) => {
                    self.mark_unavailable(idx, reason).await;
                    idx += 1;
                }
            }
        }

        match self.first_usable() {
            Some(first) => {
                self.cursor = first;
                Ok(ChainOutcome::Miss {
                    engine: last_miss.unwrap_or_else(|| self.slots[first].engine.name()),
                })
            }
            None => {
                self.cursor = self.slots.len();
                warn!("No decoder engine is available");
                Err(ScanError::NoDecoderAvailable {
                    tried: self.names().into_iter().map(str::to_string).collect(),
                })
            }
        }
    }

    /// Engine the next live attempt starts with
    pub fn active_engine(&self) -> Option<&'static str> {
        self.slots.get(self.cursor).map(|slot| slot.engine.name())
    }

    /// Cadence of the active engine; throttled when nothing is active
    pub fn active_cadence(&self) -> EngineCadence {
        self.slots
            .get(self.cursor)
            .map(|slot| slot.engine.cadence())
            .unwrap_or(EngineCadence::Throttled)
    }

    pub fn engine_states(&self) -> Vec<(&'static str, EngineState)> {
        self.slots
            .iter()
            .map(|slot| (slot.engine.name(), slot.state.clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|slot| slot.engine.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn first_usable(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| !matches!(slot.state, EngineState::Unavailable(_)))
    }

    async fn load(&mut self, idx: usize) -> bool {
        let engine = Arc::clone(&self.slots[idx].engine);
        info!("Loading decoder engine {}", engine.name());
        match engine.load().await {
            Ok(()) => {
                self.slots[idx].state = EngineState::Ready;
                true
            }
            Err(e) => {
                self.mark_unavailable(idx, e.to_string()).await;
                false
            }
        }
    }

    async fn mark_unavailable(&mut self, idx: usize, reason: String) {
        let name = self.slots[idx].engine.name();
        warn!("Decoder engine {} unavailable: {}", name, reason);
        self.slots[idx].state = EngineState::Unavailable(reason.clone());

        if let Some(events) = &self.events {
            if let Err(e) = events
                .publish(ScanEvent::EngineUnavailable {
                    engine: name.to_string(),
                    reason,
                })
                .await
            {
                debug!("Engine event not delivered: {}", e);
            }
        }
    }
}
