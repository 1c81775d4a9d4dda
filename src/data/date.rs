use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Day-precision formats tried in order
const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parse an observation date string into a calendar date.
///
/// Handles the mix of formats found in collection sheets and GBIF exports:
/// ISO dates and datetimes, day-first European dates, month names,
/// `YYYY-MM` and bare `YYYY` (first day of the period), and GBIF
/// `start/end` intervals (start is used). Returns `None` for anything else.
pub fn parse_observation_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // GBIF eventDate intervals: "2001-05-01/2001-05-05"
    if let Some((start, _)) = s.split_once('/') {
        if start.len() >= 4 && start.contains('-') {
            return parse_observation_date(start);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    parse_partial(s)
}

/// `YYYY-MM` or `YYYY`
fn parse_partial(s: &str) -> Option<NaiveDate> {
    let mut parts = s.split('-');
    let year = parts.next()?;
    if year.len() != 4 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}
