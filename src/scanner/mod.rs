mod controller;
mod session;
mod still;
mod types;

#[cfg(test)]
mod tests;

pub use controller::ScanController;
pub use session::{run_session, ScanSession};
pub use still::decode_still;
pub use types::{SessionOutcome, SessionReport, SessionState};
