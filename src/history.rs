use crate::error::{NutriscanError, Result};
use crate::lookup::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// One remembered scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub barcode: String,
    pub name: String,
    pub brand: String,
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carbs: String,
    pub scanned_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_product(barcode: &str, product: &Product) -> Self {
        Self {
            barcode: barcode.to_string(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            calories: product.calories.clone(),
            protein: product.protein.clone(),
            fat: product.fat.clone(),
            carbs: product.carbs.clone(),
            scanned_at: Utc::now(),
        }
    }
}

/// Capped scan history, deduplicated by barcode, persisted as JSON
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    capacity: usize,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Read the history file; a missing or unreadable file starts an empty history
    pub async fn load<P: AsRef<Path>>(path: P, capacity: usize) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Vec<HistoryEntry>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt history file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history file at {}", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("Cannot read history file {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let mut store = Self {
            path,
            capacity: capacity.max(1),
            entries,
        };
        store.trim();
        store
    }

    /// Replace the entry with the same barcode in place, or append
    pub fn upsert(&mut self, entry: HistoryEntry) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.barcode == entry.barcode)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.trim();
    }

    /// The last `n` entries, most recent first
    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop every entry, returning how many there were
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Write the history through a temp file so readers never see a partial file
    pub async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                NutriscanError::component(
                    "history",
                    &format!("Failed to create history directory: {}", e),
                )
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await.map_err(|e| {
            NutriscanError::component("history", &format!("Failed to write history: {}", e))
        })?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            NutriscanError::component("history", &format!("Failed to replace history: {}", e))
        })?;

        info!(
            "Saved {} history entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn trim(&mut self) {
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
    }
}
