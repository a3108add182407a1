use crate::error::VideoSourceError;
use crate::frame::FrameData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Which camera the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    Rear,
    Front,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Rear => write!(f, "rear"),
            FacingMode::Front => write!(f, "front"),
        }
    }
}

impl FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rear" | "back" | "environment" => Ok(FacingMode::Rear),
            "front" | "user" => Ok(FacingMode::Front),
            other => Err(format!("unknown facing mode '{}'", other)),
        }
    }
}

/// A live stream of frames owned by exactly one scan session
#[async_trait]
pub trait VideoSource: Send {
    /// Short description for logging
    fn describe(&self) -> String;

    /// Wait for the next frame
    async fn next_frame(&mut self) -> Result<FrameData, VideoSourceError>;

    /// Stop all tracks and free the device
    fn release(&mut self);
}

/// Opens video sources on request
#[async_trait]
pub trait VideoSourceProvider: Send + Sync {
    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoSource>, VideoSourceError>;
}

/// Owns a video source and releases it exactly once, on request or on drop
pub struct SourceGuard {
    source: Option<Box<dyn VideoSource>>,
}

impl SourceGuard {
    pub fn new(source: Box<dyn VideoSource>) -> Self {
        debug!("Acquired video source: {}", source.describe());
        Self {
            source: Some(source),
        }
    }

    pub async fn next_frame(&mut self) -> Result<FrameData, VideoSourceError> {
        match self.source.as_mut() {
            Some(source) => source.next_frame().await,
            None => Err(VideoSourceError::Ended),
        }
    }

    pub fn is_released(&self) -> bool {
        self.source.is_none()
    }

    /// Release the source; later calls are no-ops
    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            info!("Releasing video source: {}", source.describe());
            source.release();
        }
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.release();
    }
}
