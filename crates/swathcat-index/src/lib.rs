//! The per-product granule table (in-memory query) and its persistent
//! SQLite-backed storage, plus Parquet export for interchange.

pub mod db;
pub mod index;
pub mod interchange;

pub use db::IndexDatabase;
pub use index::Index;
