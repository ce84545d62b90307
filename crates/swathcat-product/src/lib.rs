//! The product contract, declarative product loading, a global product
//! registry, and download orchestration.

pub mod configparser;
pub mod example;
pub mod product;
pub mod registry;

pub use configparser::{ConfigParserProduct, ProductDescription};
pub use example::{ExampleDataset, ExampleProduct};
pub use product::{download, get, Dataset, Product, ProductGranuleSource};
pub use registry::{names, register};
