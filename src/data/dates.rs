use chrono::{DateTime, NaiveDate, NaiveDateTime};

// ---------------------------------------------------------------------------
// Order-date normalisation
// ---------------------------------------------------------------------------

/// Textual formats tried verbatim, after the numeric sniffing fails.
const TEXT_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses heterogeneous date strings, one value at a time.
///
/// Each value is sniffed on its own, so a column may mix ISO dates, US
/// month-first dates and day-first dates. Ambiguous numeric dates such as
/// `03/04/2017` resolve month-first; day-first is only used when month-first
/// is impossible (`25/12/2016`).
#[derive(Debug, Default)]
pub struct DateNormalizer {
    parsed: usize,
    unparsed: usize,
}

impl DateNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one raw value. Never fails hard: unrecognised text yields `None`.
    pub fn normalize(&mut self, raw: &str) -> Option<NaiveDate> {
        let result = parse_date(raw);
        match result {
            Some(_) => self.parsed += 1,
            None => {
                self.unparsed += 1;
                log::debug!("unparseable order date {raw:?}");
            }
        }
        result
    }

    /// Count a value that arrived already typed as a date.
    pub fn record_parsed(&mut self) {
        self.parsed += 1;
    }

    pub fn parsed_count(&self) -> usize {
        self.parsed
    }

    pub fn unparsed_count(&self) -> usize {
        self.unparsed
    }
}

/// Best-effort parse of a single date string.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Numeric date, possibly followed by a time-of-day we don't need.
    let head = s.split_whitespace().next().unwrap_or(s);
    if let Some(date) = parse_numeric(head) {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    TEXT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// `Y-M-D`, `M/D/Y` or `D/M/Y` with `/`, `-` or `.` separators.
fn parse_numeric(s: &str) -> Option<NaiveDate> {
    let sep = ['/', '-', '.'].into_iter().find(|c| s.contains(*c))?;
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    if !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    if parts[0].len() == 4 {
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let day: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let a: u32 = parts[0].parse().ok()?;
    let b: u32 = parts[1].parse().ok()?;
    let year = expand_year(parts[2])?;

    NaiveDate::from_ymd_opt(year, a, b).or_else(|| NaiveDate::from_ymd_opt(year, b, a))
}

/// Four-digit years pass through; two-digit years pivot at 69 like `%y`.
fn expand_year(s: &str) -> Option<i32> {
    let y: i32 = s.parse().ok()?;
    match s.len() {
        4 => Some(y),
        2 if y < 69 => Some(2000 + y),
        2 => Some(1900 + y),
        _ => None,
    }
}
