use super::demo::DemoCatalog;
use super::types::{LookupOutcome, Product, ProductLookup};
use crate::config::LookupConfig;
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Product lookups tried in order until one knows the identifier
pub struct LookupChain {
    sources: Vec<Arc<dyn ProductLookup>>,
}

impl LookupChain {
    pub fn new(sources: Vec<Arc<dyn ProductLookup>>) -> Self {
        Self { sources }
    }

    /// Demo catalog first, then the remote database, as configured
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        let mut sources: Vec<Arc<dyn ProductLookup>> = Vec::new();

        if config.demo_catalog {
            sources.push(Arc::new(DemoCatalog::new()));
        }

        if config.remote {
            #[cfg(feature = "openfoodfacts")]
            sources.push(Arc::new(super::OpenFoodFactsClient::new(config)?));

            #[cfg(not(feature = "openfoodfacts"))]
            tracing::warn!("Remote lookup requested but the openfoodfacts feature is disabled");
        }

        info!(
            "Product lookup chain: [{}]",
            sources
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self::new(sources))
    }

    pub async fn lookup(&self, id: &str) -> LookupOutcome {
        for source in &self.sources {
            match source.lookup(id).await {
                LookupOutcome::Found(product) => return LookupOutcome::Found(product),
                LookupOutcome::NotFound => debug!("{} does not know {}", source.name(), id),
            }
        }
        LookupOutcome::NotFound
    }

    /// Look up `id`, falling back to the placeholder record
    pub async fn resolve(&self, id: &str) -> Product {
        match self.lookup(id).await {
            LookupOutcome::Found(product) => product,
            LookupOutcome::NotFound => Product::placeholder(id),
        }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
