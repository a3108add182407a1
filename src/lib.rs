pub mod app;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod frame;
pub mod history;
pub mod lookup;
pub mod scanner;
pub mod source;

pub use app::NutriscanApp;
pub use classifier::{classify, ClassifiedResult, Classifier, Gs1Strategy, ResultKind};
pub use config::NutriscanConfig;
pub use decoder::{DecodedCode, DecoderEngine, FallbackChain, ScanMode, Symbology};
pub use error::{NutriscanError, Result, ScanError, VideoSourceError};
pub use events::{EventBus, ScanEvent};
pub use frame::{FrameData, FrameFormat};
pub use history::{HistoryEntry, HistoryStore};
pub use lookup::{LookupChain, LookupOutcome, Product, ProductLookup};
pub use scanner::{ScanController, SessionOutcome, SessionReport, SessionState};
pub use source::{FacingMode, VideoSource, VideoSourceProvider};
