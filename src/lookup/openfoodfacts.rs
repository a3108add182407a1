use super::types::{LookupOutcome, Product, ProductLookup, ProductSource};
use crate::config::LookupConfig;
use crate::error::{NutriscanError, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    product: Option<RemoteProduct>,
}

#[derive(Debug, Deserialize)]
struct RemoteProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    nutriments: HashMap<String, Value>,
}

/// Client for the Open Food Facts product API
pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    base_url: Url,
}

impl OpenFoodFactsClient {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("nutriscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NutriscanError::component("openfoodfacts", e.to_string()))?;

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            NutriscanError::component(
                "openfoodfacts",
                format!("Invalid base_url '{}': {}", config.base_url, e),
            )
        })?;
        if base_url.cannot_be_a_base() {
            return Err(NutriscanError::component(
                "openfoodfacts",
                format!("base_url '{}' cannot carry a path", config.base_url),
            ));
        }

        Ok(Self { client, base_url })
    }

    /// Product endpoint for `id`; the identifier is always a single escaped path segment
    pub fn product_url(&self, id: &str) -> Url {
        let document = format!("{}.json", id);
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v0", "product", document.as_str()]);
        }
        url
    }

    async fn fetch(&self, id: &str) -> std::result::Result<String, reqwest::Error> {
        let response = self
            .client
            .get(self.product_url(id))
            .send()
            .await?
            .error_for_status()?;
        response.text().await
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    fn name(&self) -> &'static str {
        "openfoodfacts"
    }

    async fn lookup(&self, id: &str) -> LookupOutcome {
        debug!("Querying {}", self.product_url(id));
        match self.fetch(id).await {
            Ok(body) => {
                let outcome = parse_product_response(&body);
                if let LookupOutcome::Found(product) = &outcome {
                    info!("Open Food Facts knows {} as {}", id, product.name);
                }
                outcome
            }
            Err(e) => {
                warn!("Open Food Facts lookup for {} failed: {}", id, e);
                LookupOutcome::NotFound
            }
        }
    }
}

/// Interpret a product API body; anything unexpected counts as not found
pub(crate) fn parse_product_response(body: &str) -> LookupOutcome {
    let response: ProductResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Unreadable Open Food Facts response: {}", e);
            return LookupOutcome::NotFound;
        }
    };

    let found = response
        .status
        .as_ref()
        .and_then(value_text)
        .map(|status| status == "1")
        .unwrap_or(false);

    match response.product {
        Some(product) if found => {
            let nutrient = |key: &str| {
                product
                    .nutriments
                    .get(key)
                    .and_then(value_text)
                    .unwrap_or_else(|| "0".to_string())
            };

            LookupOutcome::Found(Product {
                name: non_empty(&product.product_name).unwrap_or_else(|| "Product".to_string()),
                brand: non_empty(&product.brands).unwrap_or_else(|| "Unknown".to_string()),
                calories: nutrient("energy-kcal"),
                protein: nutrient("proteins"),
                fat: nutrient("fat"),
                carbs: nutrient("carbohydrates"),
                weight: non_empty(&product.quantity)
                    .unwrap_or_else(|| "Not specified".to_string()),
                source: ProductSource::OpenFoodFacts,
            })
        }
        _ => LookupOutcome::NotFound,
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers and strings both occur in the API's loosely typed fields
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
