//! DateTime parsing and formatting helpers for caller-supplied reference times.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Offset-carrying layouts tried after RFC 3339 / RFC 2822.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Naive layouts, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a datetime string in various common formats into a UTC [`DateTime`].
///
/// Accepted, in order:
/// 1. RFC 3339 / ISO 8601 with offset: `2024-01-15T10:30:00Z`, `2024-01-15T10:30:00+05:00`
/// 2. RFC 2822: `Mon, 15 Jan 2024 10:30:00 +0000`
/// 3. Space-separated with offset: `2024-01-15 10:30:00+05:00`
/// 4. ISO 8601 without offset (assumed UTC), with or without sub-seconds
/// 5. Date only (`2024-01-15`) or US date (`01/15/2024`), midnight UTC
///
/// Surrounding whitespace is ignored. Returns `None` for empty input or
/// unrecognised formats.
pub fn parse_flexible_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ZONED_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|ndt| Utc.from_utc_datetime(&ndt))
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|nd| nd.and_hms_opt(0, 0, 0))
                .map(|ndt| Utc.from_utc_datetime(&ndt))
        })
}

/// Format a [`DateTime<Utc>`] as a Neo4j Cypher datetime literal.
///
/// Output format: `"2024-01-15T10:30:00.000000000Z"` (nanosecond precision, UTC).
pub fn format_neo4j_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string()
}
