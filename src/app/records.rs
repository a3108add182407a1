use super::NutriscanApp;
use crate::classifier::{validate_manual_entry, ClassifiedResult};
use crate::error::Result;
use crate::history::{HistoryEntry, HistoryStore};
use crate::lookup::Product;
use tracing::{debug, info};

impl NutriscanApp {
    /// Look up the product behind a classified scan.
    ///
    /// Results without a product identifier (plain QR payloads) have nothing
    /// to look up and yield `None`.
    pub async fn resolve(&self, classified: &ClassifiedResult) -> Option<(String, Product)> {
        let id = match &classified.product_identifier {
            Some(id) => id.clone(),
            None => {
                debug!("Nothing to look up for {:?}", classified.kind);
                return None;
            }
        };

        let product = self.lookup.resolve(&id).await;
        Some((id, product))
    }

    /// Validate a manually typed code and look it up
    pub async fn lookup_manual(&self, input: &str) -> Result<(String, Product)> {
        let id = validate_manual_entry(input, self.config.classifier.manual_min_length)?;
        let product = self.lookup.resolve(&id).await;
        Ok((id, product))
    }

    pub async fn history(&self) -> HistoryStore {
        HistoryStore::load(&self.config.history.path, self.config.history.capacity).await
    }

    /// Record a product in the persisted history
    pub async fn remember(&self, product: &Product, id: &str) -> Result<()> {
        let mut history = self.history().await;
        history.upsert(HistoryEntry::from_product(id, product));
        history.save().await?;
        info!("Remembered {} ({})", product.name, id);
        Ok(())
    }

    /// Empty the persisted history, returning how many entries were removed
    pub async fn clear_history(&self) -> Result<usize> {
        let mut history = self.history().await;
        let removed = history.clear();
        history.save().await?;
        Ok(removed)
    }
}
