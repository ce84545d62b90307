//! Helpers for providers whose remote listing API can only enumerate one
//! calendar unit (day, month, or year) at a time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use swathcat_core::error::CatalogResult;
use swathcat_core::TimeRange;
use swathcat_granule::FileRecord;

/// A provider that can list files for exactly one day at a time.
///
/// [`DiscreteProviderDay::get_files_in_range`] walks every day in
/// `[start_day - 1, end_day + 1]` rather than just the days the query
/// spans, so that a file whose own coverage straddles midnight (recorded
/// under the previous or next day's listing) is still found.
pub trait DiscreteProviderDay {
    fn get_files_by_day(&self, product_name: &str, day: NaiveDate) -> CatalogResult<Vec<FileRecord>>;

    /// Returns the temporal coverage of a single file, used to filter the
    /// day-by-day listing down to files that actually overlap the query.
    fn record_time_range(&self, record: &FileRecord) -> CatalogResult<TimeRange>;

    fn get_files_in_range(
        &self,
        product_name: &str,
        time_range: &TimeRange,
    ) -> CatalogResult<Vec<FileRecord>> {
        let start_day = time_range.start.date_naive() - Duration::days(1);
        let end_day = time_range.end.date_naive() + Duration::days(1);

        let mut found = Vec::new();
        let mut day = start_day;
        while day <= end_day {
            for record in self.get_files_by_day(product_name, day)? {
                let coverage = self.record_time_range(&record)?;
                if time_range.covers(&coverage) {
                    found.push(record);
                }
            }
            day += Duration::days(1);
        }
        Ok(found)
    }

    fn get_file_by_date(
        &self,
        product_name: &str,
        time: DateTime<Utc>,
    ) -> CatalogResult<Option<FileRecord>> {
        let instant = TimeRange::instant(time);
        Ok(self.get_files_in_range(product_name, &instant)?.into_iter().next())
    }
}

/// A provider that can only enumerate files one calendar month at a time.
pub trait DiscreteProviderMonth {
    fn get_files_by_month(&self, product_name: &str, year: i32, month: u32) -> CatalogResult<Vec<FileRecord>>;

    fn record_time_range(&self, record: &FileRecord) -> CatalogResult<TimeRange>;

    fn get_files_in_range(
        &self,
        product_name: &str,
        time_range: &TimeRange,
    ) -> CatalogResult<Vec<FileRecord>> {
        let mut months = Vec::new();
        let mut y = time_range.start.year();
        let mut m = time_range.start.month();
        // pad one month on each side, matching the day-granularity helper
        (y, m) = prev_month(y, m);
        let (end_y, end_m) = next_month(time_range.end.year(), time_range.end.month());
        loop {
            months.push((y, m));
            if y == end_y && m == end_m {
                break;
            }
            (y, m) = next_month(y, m);
        }

        let mut found = Vec::new();
        for (y, m) in months {
            for record in self.get_files_by_month(product_name, y, m)? {
                let coverage = self.record_time_range(&record)?;
                if time_range.covers(&coverage) {
                    found.push(record);
                }
            }
        }
        Ok(found)
    }
}

/// A provider that can only enumerate files one calendar year at a time.
pub trait DiscreteProviderYear {
    fn get_files_by_year(&self, product_name: &str, year: i32) -> CatalogResult<Vec<FileRecord>>;

    fn record_time_range(&self, record: &FileRecord) -> CatalogResult<TimeRange>;

    fn get_files_in_range(
        &self,
        product_name: &str,
        time_range: &TimeRange,
    ) -> CatalogResult<Vec<FileRecord>> {
        let mut found = Vec::new();
        for year in (time_range.start.year() - 1)..=(time_range.end.year() + 1) {
            for record in self.get_files_by_year(product_name, year)? {
                let coverage = self.record_time_range(&record)?;
                if time_range.covers(&coverage) {
                    found.push(record);
                }
            }
        }
        Ok(found)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn prev_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}
