use super::types::{LookupOutcome, Product, ProductLookup, ProductSource};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Built-in products answered without touching the network
pub struct DemoCatalog {
    products: HashMap<&'static str, Product>,
}

impl DemoCatalog {
    pub fn new() -> Self {
        let entries = [
            ("3017620422003", "Nutella", "Ferrero", "530", "6.3", "30.9", "57.5", "400g"),
            ("7622210288257", "Oreo Original", "Mondelez", "474", "5.2", "20", "69", "154g"),
            ("4014400900508", "Red Bull Energy Drink", "Red Bull", "45", "0", "0", "11", "250ml"),
            ("5449000000996", "Coca-Cola Classic", "Coca-Cola", "42", "0", "0", "10.6", "330ml"),
        ];

        let products = entries
            .into_iter()
            .map(|(code, name, brand, calories, protein, fat, carbs, weight)| {
                (
                    code,
                    Product {
                        name: name.to_string(),
                        brand: brand.to_string(),
                        calories: calories.to_string(),
                        protein: protein.to_string(),
                        fat: fat.to_string(),
                        carbs: carbs.to_string(),
                        weight: weight.to_string(),
                        source: ProductSource::Demo,
                    },
                )
            })
            .collect();

        Self { products }
    }

    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<_> = self.products.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductLookup for DemoCatalog {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn lookup(&self, id: &str) -> LookupOutcome {
        match self.products.get(id) {
            Some(product) => {
                debug!("Demo catalog hit for {}", id);
                LookupOutcome::Found(product.clone())
            }
            None => LookupOutcome::NotFound,
        }
    }
}
