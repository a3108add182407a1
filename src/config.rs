use crate::classifier::Gs1Strategy;
use crate::decoder::ScanMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NutriscanConfig {
    pub camera: CameraConfig,
    pub scanner: ScannerConfig,
    pub decoder: DecoderConfig,
    pub classifier: ClassifierConfig,
    pub lookup: LookupConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Device index used for the rear-facing camera (e.g., 0 for /dev/video0)
    #[serde(default = "default_rear_index")]
    pub rear_index: u32,

    /// Device index used for the front-facing camera
    #[serde(default = "default_front_index")]
    pub front_index: u32,

    /// Requested resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Requested frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScannerConfig {
    /// Minimum interval between decode attempts for throttled engines
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Interval between decode attempts for realtime engines
    #[serde(default = "default_realtime_interval_ms")]
    pub realtime_interval_ms: u64,

    /// Maximum time to wait for a single frame before treating the source as lost
    #[serde(default = "default_frame_timeout_ms")]
    pub frame_timeout_ms: u64,

    /// Scan mode used when none is given
    #[serde(default = "default_scan_mode")]
    pub default_mode: ScanMode,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DecoderConfig {
    /// Engines in priority order
    #[serde(default = "default_engines")]
    pub engines: Vec<String>,

    /// Spend more time per frame in engines that support it
    #[serde(default = "default_try_harder")]
    pub try_harder: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClassifierConfig {
    /// How GS1 marking codes are recognised
    #[serde(default = "default_gs1_strategy")]
    pub gs1_strategy: Gs1Strategy,

    /// Minimum length of a manually entered code
    #[serde(default = "default_manual_min_length")]
    pub manual_min_length: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LookupConfig {
    /// Consult the built-in demo catalog first
    #[serde(default = "default_demo_catalog")]
    pub demo_catalog: bool,

    /// Query the remote food database
    #[serde(default = "default_remote")]
    pub remote: bool,

    /// Base URL of the food database API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    /// History file path
    #[serde(default = "default_history_path")]
    pub path: String,

    /// Maximum number of stored entries
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,

    /// Number of entries shown by default
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
}

impl NutriscanConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("nutriscan.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.rear_index", default_rear_index())?
            .set_default("camera.front_index", default_front_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("scanner.min_interval_ms", default_min_interval_ms())?
            .set_default("scanner.realtime_interval_ms", default_realtime_interval_ms())?
            .set_default("scanner.frame_timeout_ms", default_frame_timeout_ms())?
            .set_default("scanner.default_mode", "retail")?
            .set_default("decoder.engines", default_engines())?
            .set_default("decoder.try_harder", default_try_harder())?
            .set_default("classifier.gs1_strategy", "either")?
            .set_default(
                "classifier.manual_min_length",
                default_manual_min_length() as i64,
            )?
            .set_default("lookup.demo_catalog", default_demo_catalog())?
            .set_default("lookup.remote", default_remote())?
            .set_default("lookup.base_url", default_base_url())?
            .set_default("lookup.timeout_seconds", default_timeout_seconds())?
            .set_default("history.path", default_history_path())?
            .set_default("history.capacity", default_history_capacity() as i64)?
            .set_default("history.display_limit", default_display_limit() as i64)?
            .add_source(File::with_name(&path_str).required(false))
            // NUTRISCAN_SCANNER__MIN_INTERVAL_MS=500
            .add_source(
                Environment::with_prefix("NUTRISCAN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: NutriscanConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.scanner.min_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Scanner min_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.scanner.frame_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Scanner frame_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.scanner.realtime_interval_ms > self.scanner.min_interval_ms {
            return Err(ConfigError::Message(
                "Scanner realtime_interval_ms must not exceed min_interval_ms".to_string(),
            ));
        }

        if self.decoder.engines.is_empty() {
            return Err(ConfigError::Message(
                "At least one decoder engine must be configured".to_string(),
            ));
        }

        if self.history.capacity == 0 {
            return Err(ConfigError::Message(
                "History capacity must be greater than 0".to_string(),
            ));
        }

        if self.lookup.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Lookup timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for NutriscanConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                rear_index: default_rear_index(),
                front_index: default_front_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
            },
            scanner: ScannerConfig {
                min_interval_ms: default_min_interval_ms(),
                realtime_interval_ms: default_realtime_interval_ms(),
                frame_timeout_ms: default_frame_timeout_ms(),
                default_mode: default_scan_mode(),
            },
            decoder: DecoderConfig {
                engines: default_engines(),
                try_harder: default_try_harder(),
            },
            classifier: ClassifierConfig {
                gs1_strategy: default_gs1_strategy(),
                manual_min_length: default_manual_min_length(),
            },
            lookup: LookupConfig {
                demo_catalog: default_demo_catalog(),
                remote: default_remote(),
                base_url: default_base_url(),
                timeout_seconds: default_timeout_seconds(),
            },
            history: HistoryConfig {
                path: default_history_path(),
                capacity: default_history_capacity(),
                display_limit: default_display_limit(),
            },
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        NutriscanConfig::default().scanner
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        NutriscanConfig::default().classifier
    }
}

// Default value functions
fn default_rear_index() -> u32 {
    0
}
fn default_front_index() -> u32 {
    1
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_min_interval_ms() -> u64 {
    300
}
fn default_realtime_interval_ms() -> u64 {
    33
}
fn default_frame_timeout_ms() -> u64 {
    5000
}
fn default_scan_mode() -> ScanMode {
    ScanMode::Retail
}

fn default_engines() -> Vec<String> {
    ["rxing", "rqrr", "rxing-deep", "bardecoder"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_try_harder() -> bool {
    true
}

fn default_gs1_strategy() -> Gs1Strategy {
    Gs1Strategy::Either
}
fn default_manual_min_length() -> usize {
    8
}

fn default_demo_catalog() -> bool {
    true
}
fn default_remote() -> bool {
    true
}
fn default_base_url() -> String {
    "https://world.openfoodfacts.org".to_string()
}
fn default_timeout_seconds() -> u64 {
    10
}

fn default_history_path() -> String {
    "./nutriscan_history.json".to_string()
}
fn default_history_capacity() -> usize {
    50
}
fn default_display_limit() -> usize {
    10
}
