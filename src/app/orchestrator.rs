use crate::classifier::Classifier;
use crate::config::NutriscanConfig;
use crate::decoder::{self, DecoderEngine};
use crate::error::{NutriscanError, Result};
use crate::events::EventBus;
use crate::lookup::LookupChain;
use crate::scanner::ScanController;
use crate::source::VideoSourceProvider;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Wires configuration, decoder engines, video sources, lookup and history
pub struct NutriscanApp {
    pub(super) config: NutriscanConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) engines: Vec<Arc<dyn DecoderEngine>>,
    pub(super) classifier: Classifier,
    pub(super) lookup: LookupChain,
}

impl NutriscanApp {
    /// Create the application with engines and lookup built from `config`
    pub fn new(config: NutriscanConfig) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(64));
        let engines = Self::build_engines(&config);
        let classifier = Classifier::new(config.classifier.gs1_strategy);
        let lookup = LookupChain::from_config(&config.lookup)?;

        info!(
            "Nutriscan ready: {} decoder engines, {} lookup sources",
            engines.len(),
            lookup.len()
        );

        Ok(Self {
            config,
            event_bus,
            engines,
            classifier,
            lookup,
        })
    }

    /// Decoder engines in configured priority order; unknown or
    /// compiled-out names are logged and skipped
    pub fn build_engines(config: &NutriscanConfig) -> Vec<Arc<dyn DecoderEngine>> {
        decoder::build_engines(&config.decoder)
    }

    /// Replace the decoder engines, e.g. with a host-provided detector
    pub fn with_engines(mut self, engines: Vec<Arc<dyn DecoderEngine>>) -> Self {
        self.engines = engines;
        self
    }

    pub fn with_lookup(mut self, lookup: LookupChain) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn config(&self) -> &NutriscanConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn classifier(&self) -> Classifier {
        self.classifier
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Scan controller over the given video source provider
    pub fn controller(&self, provider: Arc<dyn VideoSourceProvider>) -> ScanController {
        ScanController::new(
            provider,
            self.engines.clone(),
            self.classifier,
            self.config.scanner.clone(),
            Arc::clone(&self.event_bus),
        )
    }

    /// Pick the video source: a directory of frames if given, else the camera
    pub fn video_provider(&self, frames_dir: Option<&Path>) -> Result<Arc<dyn VideoSourceProvider>> {
        let frame_interval = Duration::from_millis(1000 / self.config.camera.fps.max(1) as u64);

        if let Some(dir) = frames_dir {
            #[cfg(feature = "images")]
            {
                info!("Replaying frames from {}", dir.display());
                return Ok(Arc::new(crate::source::ImageSequenceProvider::new(
                    dir,
                    frame_interval,
                )));
            }

            #[cfg(not(feature = "images"))]
            return Err(NutriscanError::invalid_input(format!(
                "Cannot replay {}: built without the images feature",
                dir.display()
            )));
        }

        #[cfg(all(feature = "camera", target_os = "linux"))]
        {
            let _ = frame_interval;
            Ok(Arc::new(crate::source::GstCameraProvider::new(
                self.config.camera.clone(),
                Duration::from_millis(self.config.scanner.frame_timeout_ms),
            )))
        }

        #[cfg(not(all(feature = "camera", target_os = "linux")))]
        {
            let _ = frame_interval;
            Err(NutriscanError::system(
                "No camera support in this build; pass a frames directory instead",
            ))
        }
    }
}
