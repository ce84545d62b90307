//! File records and granules: the atomic unit of coverage tracked by the
//! swathcat index.

pub mod file_record;
pub mod granule;

pub use file_record::{FileRecord, RemoteSource};
pub use granule::{get_granules_from_dataset, merge_granules, Granule, IndexRange};
