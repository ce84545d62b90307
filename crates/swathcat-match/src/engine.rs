//! The recursive divide-and-conquer join between two granule indices.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::instrument;

use swathcat_core::TimeRange;
use swathcat_granule::{merge_granules, Granule};
use swathcat_index::Index;

/// Default temporal tolerance between a left and right granule for them to
/// be considered for matching.
pub const DEFAULT_TIME_DIFF: Duration = Duration::minutes(5);

/// One matched pair: a granule from the left index and one from the right.
pub type MatchPair = (Granule, Granule);

/// Tuning knobs for [`find_matches`].
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub time_diff: Duration,
    pub merge: bool,
    pub n_workers: Option<usize>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions { time_diff: DEFAULT_TIME_DIFF, merge: false, n_workers: None }
    }
}

/// Runs the match engine over two loaded indices, reporting progress on an
/// `indicatif` bar driven by a `crossbeam-channel` the workers push
/// completed-chunk counts to.
#[instrument(skip(left, right, options), fields(left_rows = left.len(), right_rows = right.len()))]
pub fn find_matches(left: &Index, right: &Index, options: &MatchOptions) -> Vec<MatchPair> {
    let l_rows: Vec<Granule> = left.rows().to_vec();
    let r_rows: Vec<Granule> = right.rows().to_vec();

    if l_rows.is_empty() || r_rows.is_empty() {
        return Vec::new();
    }

    let n_workers = options.n_workers.unwrap_or_else(rayon::current_num_threads).max(1);
    let chunk_size = l_rows.len().div_ceil(n_workers).max(1);
    let chunks: Vec<&[Granule]> = l_rows.chunks(chunk_size).collect();

    let (tx, rx): (Sender<usize>, Receiver<usize>) = bounded(chunks.len().max(1));
    let progress = ProgressBar::new(l_rows.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} granules matched ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let time_diff = options.time_diff;
    let merge = options.merge;
    let r_rows = Arc::new(r_rows);

    let results: Vec<Vec<MatchPair>> = chunks
        .par_iter()
        .map(|chunk| {
            let envelope = chunk_envelope(chunk);
            let candidates = filter_by_envelope(&r_rows, &envelope, time_diff);
            let matches = match_recursive(chunk, &candidates, time_diff, merge);
            let _ = tx.send(chunk.len());
            matches
        })
        .collect();
    drop(tx);

    while let Ok(count) = rx.recv_timeout(StdDuration::from_millis(200)) {
        progress.inc(count as u64);
    }
    progress.finish_and_clear();

    let mut combined: Vec<MatchPair> = Vec::new();
    for chunk_matches in results {
        combined = concat_with_boundary_merge(combined, chunk_matches, merge);
    }
    combined
}

fn chunk_envelope(chunk: &[Granule]) -> TimeRange {
    let start = chunk.iter().map(|g| g.time_range.start).min().expect("chunk is non-empty");
    let end = chunk.iter().map(|g| g.time_range.end).max().expect("chunk is non-empty");
    TimeRange::new(start, end)
}

fn filter_by_envelope(rows: &[Granule], envelope: &TimeRange, time_diff: Duration) -> Vec<Granule> {
    let padded = envelope.expand_symmetric(time_diff);
    rows.iter().filter(|r| padded.covers(&r.time_range)).cloned().collect()
}

fn within_time_diff(l: &Granule, r: &Granule, time_diff: Duration) -> bool {
    l.time_range.time_diff(&r.time_range) <= time_diff
}

/// The core recursive match, operating on one left chunk and its
/// pre-filtered right candidates.
fn match_recursive(l_rows: &[Granule], r_rows: &[Granule], time_diff: Duration, merge: bool) -> Vec<MatchPair> {
    if r_rows.is_empty() {
        return Vec::new();
    }

    if l_rows.len() > 1 {
        let mid = l_rows.len() / 2;
        let (l1, l2) = l_rows.split_at(mid);
        let r1 = filter_by_envelope(r_rows, &chunk_envelope(l1), time_diff);
        let r2 = filter_by_envelope(r_rows, &chunk_envelope(l2), time_diff);
        let m1 = match_recursive(l1, &r1, time_diff, merge);
        let m2 = match_recursive(l2, &r2, time_diff, merge);
        return concat_with_boundary_merge(m1, m2, merge);
    }

    let l = &l_rows[0];
    let mut intersecting: Vec<Granule> = r_rows
        .iter()
        .filter(|r| within_time_diff(l, r, time_diff))
        .filter(|r| l.geometry.intersects(&r.geometry))
        .cloned()
        .collect();

    if merge {
        intersecting = merge_granules(intersecting).unwrap_or_default();
    }

    intersecting.into_iter().map(|r| (l.clone(), r)).collect()
}

/// Concatenates `a` and `b`; if `merge` is set and the last pair of `a` is
/// adjacent (in both components) to the first pair of `b`, fuses them into
/// a single pair instead of two.
fn concat_with_boundary_merge(mut a: Vec<MatchPair>, b: Vec<MatchPair>, merge: bool) -> Vec<MatchPair> {
    if !merge || a.is_empty() || b.is_empty() {
        a.extend(b);
        return a;
    }

    let (last_l, last_r) = a.last().unwrap();
    let (first_l, first_r) = &b[0];

    if last_l.is_adjacent(first_l) && last_r.is_adjacent(first_r) {
        let merged_l = last_l.merge(first_l).expect("adjacency already checked");
        let merged_r = last_r.merge(first_r).expect("adjacency already checked");
        a.pop();
        a.push((merged_l, merged_r));
        a.extend_from_slice(&b[1..]);
    } else {
        a.extend(b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use swathcat_core::Geometry;
    use swathcat_granule::FileRecord;

    fn make_index(name: &str, bands: &[(u32, f64, f64)]) -> Index {
        let mut index = Index::empty(name);
        for (hour, lon_lo, lon_hi) in bands {
            let start = Utc.with_ymd_and_hms(2020, 1, 1, *hour, 0, 0).unwrap();
            let end = start + chrono::Duration::hours(1);
            let fr = FileRecord::new(name, format!("{name}_{hour:02}.nc"));
            let geometry =
                Geometry::LonLatRect { lon_min: *lon_lo, lat_min: -5.0, lon_max: *lon_hi, lat_max: 5.0 };
            index.insert(Granule::new(fr, TimeRange::new(start, end), geometry));
        }
        index
    }

    #[test]
    fn empty_indices_produce_no_matches() {
        let left = Index::empty("l");
        let right = Index::empty("r");
        let matches = find_matches(&left, &right, &MatchOptions::default());
        assert!(matches.is_empty());
    }

    #[test]
    fn overlapping_intersecting_granules_match() {
        let left = make_index("left", &[(0, 0.0, 10.0), (1, 10.0, 20.0), (2, 20.0, 30.0), (3, 30.0, 40.0)]);

        let mut right = Index::empty("right");
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::hours(1);
        let fr = FileRecord::new("right", "swath.nc");
        let geometry = Geometry::LonLatRect { lon_min: 12.0, lat_min: -20.0, lon_max: 14.0, lat_max: 20.0 };
        right.insert(Granule::new(fr, TimeRange::new(start, end), geometry));

        let options = MatchOptions { time_diff: Duration::minutes(60), merge: true, n_workers: Some(1) };
        let matches = find_matches(&left, &right, &options);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn match_is_symmetric_without_merge() {
        let left = make_index("left", &[(0, 0.0, 10.0), (1, 10.0, 20.0)]);
        let mut right = Index::empty("right");
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::hours(1);
        right.insert(Granule::new(
            FileRecord::new("right", "swath.nc"),
            TimeRange::new(start, end),
            Geometry::LonLatRect { lon_min: 5.0, lat_min: -5.0, lon_max: 15.0, lat_max: 5.0 },
        ));

        let options = MatchOptions { time_diff: Duration::minutes(60), merge: false, n_workers: Some(1) };
        let forward = find_matches(&left, &right, &options);
        let backward = find_matches(&right, &left, &options);

        assert_eq!(forward.len(), backward.len());
        for (l, r) in &forward {
            assert!(backward.iter().any(|(br, bl)| br.file_record.filename == r.file_record.filename
                && bl.file_record.filename == l.file_record.filename));
        }
    }
}
