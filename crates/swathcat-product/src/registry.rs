//! A process-wide, immutable-after-populate map from product name to
//! `Product` implementation, mirroring a global product lookup table
//! populated once at startup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use swathcat_core::error::{CatalogError, CatalogResult};

use crate::product::Product;

static PRODUCTS: Lazy<RwLock<HashMap<String, Arc<dyn Product>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers `product` under its own name, overwriting any prior
/// registration with the same name.
pub fn register(product: Arc<dyn Product>) {
    let name = product.name().to_string();
    PRODUCTS.write().expect("product registry lock poisoned").insert(name, product);
}

/// Looks up a previously registered product by name.
pub fn get(name: &str) -> CatalogResult<Arc<dyn Product>> {
    PRODUCTS
        .read()
        .expect("product registry lock poisoned")
        .get(name)
        .cloned()
        .ok_or_else(|| CatalogError::UnknownProduct(name.to_string()))
}

/// Every registered product name, for `config`/`account` CLI listings.
pub fn names() -> Vec<String> {
    PRODUCTS.read().expect("product registry lock poisoned").keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Dataset;
    use swathcat_core::{Geometry, TimeRange};
    use swathcat_granule::FileRecord;

    struct StubProduct(&'static str);

    impl Product for StubProduct {
        fn name(&self) -> &str {
            self.0
        }
        fn matches(&self, _record: &FileRecord) -> bool {
            true
        }
        fn get_temporal_coverage(&self, _record: &FileRecord) -> CatalogResult<TimeRange> {
            Ok(TimeRange::instant(chrono::Utc::now()))
        }
        fn get_spatial_coverage(&self, _record: &FileRecord) -> CatalogResult<Geometry> {
            Ok(Geometry::Point { lon: 0.0, lat: 0.0 })
        }
        fn open(&self, _record: &FileRecord) -> CatalogResult<Dataset> {
            Ok(Box::new(()))
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        register(Arc::new(StubProduct("registry-test.product.v1")));
        let found = get("registry-test.product.v1").unwrap();
        assert_eq!(found.name(), "registry-test.product.v1");
    }

    #[test]
    fn get_unknown_product_errors() {
        let err = get("registry-test.does-not-exist").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownProduct(_)));
    }
}
