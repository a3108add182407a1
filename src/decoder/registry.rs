use super::engine::DecoderEngine;
use crate::config::DecoderConfig;
use crate::error::EngineError;
use std::sync::Arc;
use tracing::{info, warn};

/// Engine names accepted in `decoder.engines`
pub const KNOWN_ENGINES: &[&str] = &["rxing", "rqrr", "rxing-deep", "bardecoder"];

/// Construct a single engine by name
pub fn engine_by_name(name: &str, config: &DecoderConfig) -> Result<Arc<dyn DecoderEngine>, EngineError> {
    match name {
        #[cfg(feature = "rxing")]
        "rxing" => Ok(Arc::new(super::RxingEngine::new(config.try_harder))),
        #[cfg(feature = "rqrr")]
        "rqrr" => Ok(Arc::new(super::RqrrEngine::new())),
        #[cfg(feature = "rxing")]
        "rxing-deep" => Ok(Arc::new(super::RxingDeepEngine::new())),
        #[cfg(feature = "bardecoder")]
        "bardecoder" => Ok(Arc::new(super::BardecoderEngine::new())),
        _ => {
            let _ = config;
            Err(EngineError::NotCompiled {
                engine: name.to_string(),
            })
        }
    }
}

/// Build the configured engines in priority order, skipping the ones this
/// build cannot provide
pub fn build_engines(config: &DecoderConfig) -> Vec<Arc<dyn DecoderEngine>> {
    let engines: Vec<Arc<dyn DecoderEngine>> = config
        .engines
        .iter()
        .filter_map(|name| match engine_by_name(name, config) {
            Ok(engine) => Some(engine),
            Err(e) => {
                if KNOWN_ENGINES.contains(&name.as_str()) {
                    warn!("{}", e);
                } else {
                    warn!("Unknown decoder engine '{}' in configuration, skipping", name);
                }
                None
            }
        })
        .collect();

    info!(
        "Decoder engines in priority order: [{}]",
        engines.iter().map(|e| e.name()).collect::<Vec<_>>().join(", ")
    );

    engines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_engine_is_skipped() {
        let config = DecoderConfig {
            engines: vec!["zxing-js".to_string()],
            try_harder: false,
        };
        assert!(build_engines(&config).is_empty());
        assert!(matches!(
            engine_by_name("zxing-js", &config),
            Err(EngineError::NotCompiled { .. })
        ));
    }

    #[cfg(all(feature = "rxing", feature = "rqrr"))]
    #[test]
    fn test_configured_order_is_kept() {
        let config = DecoderConfig {
            engines: vec!["rqrr".to_string(), "rxing".to_string()],
            try_harder: true,
        };
        let names: Vec<_> = build_engines(&config).iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["rqrr", "rxing"]);
    }
}
