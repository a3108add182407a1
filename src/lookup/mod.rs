mod chain;
mod demo;
mod types;

#[cfg(feature = "openfoodfacts")]
mod openfoodfacts;


pub use chain::LookupChain;
pub use demo::DemoCatalog;
pub use types::{LookupOutcome, Product, ProductLookup, ProductSource};

#[cfg(feature = "openfoodfacts")]
pub use openfoodfacts::OpenFoodFactsClient;
