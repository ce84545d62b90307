//! Per-product index aggregation, optionally backed by persistent storage.

pub mod catalog;

pub use catalog::{Catalog, GranuleSource};
