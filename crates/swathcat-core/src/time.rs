//! Closed time intervals used to describe the temporal coverage of a granule.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A closed, inclusive time interval `[start, end]`.
///
/// `start` and `end` may be equal, representing an instantaneous
/// observation. [`TimeRange::new`] swaps the bounds if they arrive reversed
/// rather than erroring; this is a deliberate convenience of this type, not
/// something shared with the range types it otherwise mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Builds a range from two endpoints, swapping them if `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start > end {
            TimeRange { start: end, end: start }
        } else {
            TimeRange { start, end }
        }
    }

    /// A degenerate range covering a single instant.
    pub fn instant(time: DateTime<Utc>) -> Self {
        TimeRange { start: time, end: time }
    }

    /// Returns true if `other` is entirely contained within this range, or
    /// if the single `time` instant falls within it.
    ///
    /// For two ranges this is a closed-interval overlap test, not strict
    /// containment: `a.covers(b)` is true whenever `a` and `b` intersect at
    /// all, matching the reference behavior's `not (a > b.end or a.end < b)`.
    pub fn covers(&self, other: &TimeRange) -> bool {
        !(self.start > other.end || self.end < other.start)
    }

    /// Returns true if `time` falls within `[start, end]`, inclusive.
    pub fn covers_time(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }

    /// Shifts both endpoints forward by `delta`.
    pub fn shift(&self, delta: Duration) -> Self {
        TimeRange { start: self.start + delta, end: self.end + delta }
    }

    /// Grows the range outward by `before` on the left and `after` on the
    /// right. Either delta may be negative to shrink that side instead.
    pub fn expand(&self, before: Duration, after: Duration) -> Self {
        TimeRange::new(self.start - before, self.end + after)
    }

    /// Grows the range symmetrically by `delta` on both sides.
    pub fn expand_symmetric(&self, delta: Duration) -> Self {
        self.expand(delta, delta)
    }

    /// The gap between this range and `other`: zero if they overlap,
    /// otherwise the duration separating the nearer pair of endpoints.
    pub fn time_diff(&self, other: &TimeRange) -> Duration {
        if self.covers(other) {
            Duration::zero()
        } else if self.end < other.start {
            other.start - self.end
        } else {
            self.start - other.end
        }
    }

    /// Length of the interval.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns the subset of `ranges` that overlap `self`. If none overlap,
    /// returns the single closest range by [`TimeRange::time_diff`].
    pub fn find_closest<'a>(&self, ranges: &'a [TimeRange]) -> Vec<&'a TimeRange> {
        let overlapping: Vec<&TimeRange> = ranges.iter().filter(|r| self.covers(r)).collect();
        if !overlapping.is_empty() {
            return overlapping;
        }
        self.find_closest_ind(ranges)
            .into_iter()
            .map(|i| &ranges[i])
            .collect()
    }

    /// Index form of [`TimeRange::find_closest`]; returns at most one index
    /// when nothing overlaps, or all overlapping indices otherwise.
    pub fn find_closest_ind(&self, ranges: &[TimeRange]) -> Vec<usize> {
        let overlapping: Vec<usize> = ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| self.covers(r))
            .map(|(i, _)| i)
            .collect();
        if !overlapping.is_empty() {
            return overlapping;
        }
        if ranges.is_empty() {
            return Vec::new();
        }
        let mut best_ind = 0;
        let mut best_diff = self.time_diff(&ranges[0]);
        for (i, r) in ranges.iter().enumerate().skip(1) {
            let diff = self.time_diff(r);
            if diff < best_diff {
                best_diff = diff;
                best_ind = i;
            }
        }
        vec![best_ind]
    }

    /// Parses an RFC 3339 timestamp pair into a [`TimeRange`].
    pub fn from_rfc3339(start: &str, end: &str) -> CatalogResult<Self> {
        let start = DateTime::parse_from_rfc3339(start)
            .map_err(|e| CatalogError::TimeError(e.to_string()))?
            .with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(end)
            .map_err(|e| CatalogError::TimeError(e.to_string()))?
            .with_timezone(&Utc);
        Ok(TimeRange::new(start, end))
    }
}

impl PartialOrd for TimeRange {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeRange {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.start.cmp(&other.start)
    }
}

impl std::ops::Add<Duration> for TimeRange {
    type Output = TimeRange;
    fn add(self, delta: Duration) -> TimeRange {
        self.shift(delta)
    }
}

impl std::ops::Sub<Duration> for TimeRange {
    type Output = TimeRange;
    fn sub(self, delta: Duration) -> TimeRange {
        self.shift(-delta)
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
