use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a product record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSource {
    Demo,
    OpenFoodFacts,
    NotFound,
}

impl fmt::Display for ProductSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductSource::Demo => write!(f, "Demo"),
            ProductSource::OpenFoodFacts => write!(f, "Open Food Facts"),
            ProductSource::NotFound => write!(f, "Not found"),
        }
    }
}

/// Nutrition facts per 100 g/ml, kept as the service reported them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub brand: String,
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carbs: String,
    pub weight: String,
    pub source: ProductSource,
}

impl Product {
    /// Display state for an identifier no database knows
    pub fn placeholder(id: &str) -> Self {
        Self {
            name: format!("Product {}", id),
            brand: "Unknown".to_string(),
            calories: "0".to_string(),
            protein: "0".to_string(),
            fat: "0".to_string(),
            carbs: "0".to_string(),
            weight: "Not specified".to_string(),
            source: ProductSource::NotFound,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ProductSource::NotFound
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Product),
    NotFound,
}

/// Resolves a product identifier to nutrition data.
///
/// Failures (network, parse) are reported as `NotFound`, never as errors.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, id: &str) -> LookupOutcome;
}
