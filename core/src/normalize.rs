//! Value and date normalizers.
//!
//! RULE: nothing here may fail. Malformed currency text becomes zero and
//! malformed dates become `None`; callers treat both as "no signal".

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Day-first formats, tried when the text contains a `/`.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];

/// ISO-8601 date-time formats without an offset.
const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Currency markers stripped before parsing. Longer markers first.
const CURRENCY_SYMBOLS: &[&str] = &["R$", "US$", "$", "€", "£"];

/// Convert locale-formatted currency text to a decimal.
///
/// Currency symbols and whitespace are dropped; any other character
/// besides digits, separators and a sign makes the text malformed. When
/// both `.` and `,` appear, the right-most one is the decimal separator
/// and the other is a thousands separator; a lone `,` is a decimal comma.
/// Malformed text yields zero.
pub fn parse_value(text: &str) -> Decimal {
    let mut cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    for symbol in CURRENCY_SYMBOLS {
        cleaned = cleaned.replace(symbol, "");
    }
    let well_formed = cleaned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+'));
    if cleaned.is_empty() || !well_formed {
        return Decimal::ZERO;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();
    let canonical = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if commas > 1 => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        (None, Some(_)) if dots > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    Decimal::from_str(&canonical).unwrap_or(Decimal::ZERO)
}

/// Parse a movement date written as `DD/MM/YYYY` (optionally with a time)
/// or as an ISO-8601 date / date-time. Offsets are folded into UTC.
pub fn parse_event_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.contains('/') {
        if let Some(dt) = DAY_FIRST_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        {
            return Some(dt);
        }
        return NaiveDate::parse_from_str(text, "%d/%m/%Y")
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = ISO_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// True when both instants exist and lie at most `window_hours` apart.
pub fn within_window(
    a: Option<NaiveDateTime>,
    b: Option<NaiveDateTime>,
    window_hours: f64,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let hours = (a - b).num_seconds().abs() as f64 / 3600.0;
            hours <= window_hours
        }
        _ => false,
    }
}

/// String-level variant of [`within_window`]: parses both sides first.
pub fn dates_within(a: Option<&str>, b: Option<&str>, window_hours: f64) -> bool {
    within_window(
        a.and_then(parse_event_date),
        b.and_then(parse_event_date),
        window_hours,
    )
}

/// Round to two decimal places for report fields.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
