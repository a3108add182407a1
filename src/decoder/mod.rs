mod chain;
mod engine;
mod mock;
mod registry;
mod types;

#[cfg(feature = "bardecoder")]
mod bardecoder_engine;
#[cfg(feature = "rqrr")]
mod rqrr_engine;
#[cfg(feature = "rxing")]
mod rxing_engine;


pub use chain::{ChainOutcome, EngineState, FallbackChain, MissPolicy};
pub use engine::{Capability, DecodeOutcome, DecoderEngine, EngineCadence};
pub use mock::ScriptedEngine;
#[cfg(all(test, feature = "rxing"))]
pub(crate) use mock::render_code;
pub use registry::{build_engines, engine_by_name, KNOWN_ENGINES};
pub use types::{DecodedCode, ScanMode, Symbology};

#[cfg(feature = "bardecoder")]
pub use bardecoder_engine::BardecoderEngine;
#[cfg(feature = "rqrr")]
pub use rqrr_engine::RqrrEngine;
#[cfg(feature = "rxing")]
pub use rxing_engine::{RxingDeepEngine, RxingEngine};
