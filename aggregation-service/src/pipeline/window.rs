use std::collections::BTreeMap;

use daily_client::Measured;
use time::{macros::format_description, macros::time, Date, PrimitiveDateTime};

/// Parse a calendar day written as `YYYY-MM-DD`, with nothing around it.
pub fn parse_day(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
}

/// Timestamp range read for the aggregation window `[start, end]`.
///
/// Both ends are inclusive: `start 00:00:00` through `end 23:59:59`.
pub fn window_bounds(start: Date, end: Date) -> (PrimitiveDateTime, PrimitiveDateTime) {
    (start.midnight(), end.with_time(time!(23:59:59)))
}

/// Partition rows by the date component of their timestamp.
///
/// Iteration over the result is in ascending day order; rows keep their
/// input order inside a bucket.
pub fn bucket_by_day<R: Measured>(rows: Vec<R>) -> BTreeMap<Date, Vec<R>> {
    let mut days: BTreeMap<Date, Vec<R>> = BTreeMap::new();
    for row in rows {
        days.entry(row.ts().date()).or_default().push(row);
    }
    days
}
