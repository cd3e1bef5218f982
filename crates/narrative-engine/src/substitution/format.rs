//! Value formatting shared by substitution and question/answer assembly

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;

/// Parse the date shapes produced by form widgets and imports
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and UK `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            raw.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}

/// Long-form UK date, e.g. `5 March 2010`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Numeric UK date, e.g. `05/03/2010`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Whole years between `birth` and `today`; `None` for future birth dates
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// Names that hold dates by convention
pub fn is_date_name(name: &str) -> bool {
    name.contains("DOB") || name.contains("Date")
}

/// Render a raw answer for direct placeholder lookup
///
/// Booleans become Yes/No, arrays a comma-separated list and date-named
/// fields a long-form date. Unanswered values render as `None`.
pub fn display_value(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(yes_no(*b).to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if is_date_name(name) {
                if let Some(date) = parse_date(trimmed) {
                    return Some(long_date(date));
                }
            }
            Some(trimmed.to_string())
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(yes_no(*b).to_string()),
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Lowercase the first character, leaving the rest untouched
pub fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
