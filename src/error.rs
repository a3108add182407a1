use thiserror::Error;

#[derive(Error, Debug)]
pub enum NutriscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl NutriscanError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Terminal conditions of a scan session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    #[error("No barcode decoder available (tried: {})", tried.join(", "))]
    NoDecoderAvailable { tried: Vec<String> },

    #[error("Video source error: {0}")]
    VideoSource(#[from] VideoSourceError),
}

impl ScanError {
    /// One user-facing message with actionable guidance
    pub fn user_message(&self) -> String {
        match self {
            ScanError::NoDecoderAvailable { .. } => {
                "Barcode scanning is not supported here. Enter the code manually instead.".to_string()
            }
            ScanError::VideoSource(e) => e.guidance().to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoSourceError {
    #[error("Permission to use camera {device} was denied")]
    PermissionDenied { device: String },

    #[error("No camera device found: {device}")]
    NoDevice { device: String },

    #[error("Camera {device} is busy")]
    DeviceBusy { device: String },

    #[error("Camera constraints cannot be satisfied: {details}")]
    ConstraintsUnsatisfiable { details: String },

    #[error("Camera disconnected: {details}")]
    Disconnected { details: String },

    #[error("Video source ended")]
    Ended,
}

impl VideoSourceError {
    pub fn guidance(&self) -> &'static str {
        match self {
            VideoSourceError::PermissionDenied { .. } => {
                "Grant camera access and start the scan again, or enter the code manually."
            }
            VideoSourceError::NoDevice { .. } => {
                "No camera was found. Scan a photo of the code or enter it manually."
            }
            VideoSourceError::DeviceBusy { .. } => {
                "The camera is used by another application. Close it and retry."
            }
            VideoSourceError::ConstraintsUnsatisfiable { .. } => {
                "The camera does not support the requested mode. Try the other camera or scan a photo."
            }
            VideoSourceError::Disconnected { .. } => {
                "The camera stopped unexpectedly. Retry the scan."
            }
            VideoSourceError::Ended => {
                "The video ended before a code was found. Retry or enter the code manually."
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Engine {engine} failed to load: {details}")]
    LoadFailed { engine: String, details: String },

    #[error("Engine {engine} is not compiled into this build")]
    NotCompiled { engine: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },
}

pub type Result<T> = std::result::Result<T, NutriscanError>;
