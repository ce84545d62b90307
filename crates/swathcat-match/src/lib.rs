//! The granule match engine: a divide-and-conquer temporal/spatial join
//! between two indices.

pub mod engine;
pub mod tables;

pub use engine::{find_matches, MatchOptions, MatchPair, DEFAULT_TIME_DIFF};
pub use tables::{matches_to_tables, MatchRow, MatchTables};
