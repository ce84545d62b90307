//! Converts match output into two parallel per-side tables sharing a
//! `match_index` column, suitable for the same kind of export
//! `swathcat-index::interchange` performs for a plain `Index`.

use swathcat_granule::Granule;

use crate::engine::MatchPair;

/// One row of a match table: a granule plus the 0-based id of the pair it
/// belongs to.
#[derive(Debug, Clone)]
pub struct MatchRow {
    pub match_index: usize,
    pub granule: Granule,
}

/// The two aligned tables produced by [`matches_to_tables`]. `left[i]` and
/// `right[i]` always share the same `match_index`.
#[derive(Debug, Clone, Default)]
pub struct MatchTables {
    pub left: Vec<MatchRow>,
    pub right: Vec<MatchRow>,
}

/// Splits `matches` into two parallel, index-aligned tables.
pub fn matches_to_tables(matches: &[MatchPair]) -> MatchTables {
    let mut tables = MatchTables::default();
    for (match_index, (l, r)) in matches.iter().enumerate() {
        tables.left.push(MatchRow { match_index, granule: l.clone() });
        tables.right.push(MatchRow { match_index, granule: r.clone() });
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use swathcat_core::{Geometry, TimeRange};
    use swathcat_granule::FileRecord;

    #[test]
    fn rows_share_match_index_across_both_tables() {
        let l = Granule::new(
            FileRecord::new("l", "a.nc"),
            TimeRange::instant(Utc::now()),
            Geometry::Point { lon: 0.0, lat: 0.0 },
        );
        let r = Granule::new(
            FileRecord::new("r", "b.nc"),
            TimeRange::instant(Utc::now()),
            Geometry::Point { lon: 0.0, lat: 0.0 },
        );
        let tables = matches_to_tables(&[(l, r)]);
        assert_eq!(tables.left[0].match_index, tables.right[0].match_index);
    }
}
