use crate::decoder::ScanMode;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Events emitted while scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// A scan session started sampling its video source
    SessionStarted {
        session_id: String,
        mode: ScanMode,
        timestamp: SystemTime,
    },
    /// A decoder engine dropped out of the fallback chain
    EngineUnavailable { engine: String, reason: String },
    /// A code was decoded
    CodeDetected {
        session_id: String,
        payload: String,
        engine: String,
        timestamp: SystemTime,
    },
    /// A scan session ended (found, cancelled or failed)
    SessionEnded { session_id: String, reason: String },
}

impl ScanEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ScanEvent::SessionStarted { session_id, mode, .. } => {
                format!("Session {} started in {} mode", session_id, mode)
            }
            ScanEvent::EngineUnavailable { engine, reason } => {
                format!("Engine {} unavailable: {}", engine, reason)
            }
            ScanEvent::CodeDetected { payload, engine, .. } => {
                format!("Code {} detected by {}", payload, engine)
            }
            ScanEvent::SessionEnded { session_id, reason } => {
                format!("Session {} ended: {}", session_id, reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::SessionStarted { .. } => "session_started",
            ScanEvent::EngineUnavailable { .. } => "engine_unavailable",
            ScanEvent::CodeDetected { .. } => "code_detected",
            ScanEvent::SessionEnded { .. } => "session_ended",
        }
    }
}

/// Async event bus using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<ScanEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it
    pub async fn publish(&self, event: ScanEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            ScanEvent::CodeDetected { payload, engine, .. } => {
                info!("Code {} detected by {}", payload, engine);
            }
            ScanEvent::EngineUnavailable { engine, reason } => {
                debug!("Engine {} unavailable: {}", engine, reason);
            }
            _ => {}
        }

        if self.sender.receiver_count() == 0 {
            return Ok(0);
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
