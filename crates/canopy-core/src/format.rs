//! Default cell formatting per column kind

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::Value;

/// Symbol used by currency columns unless one is given
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₱";

const MAX_FRACTION_DIGITS: usize = 3;

/// Render a number with `,` thousands separators and at most three
/// fraction digits, trailing zeros trimmed
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if n < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

/// Currency: symbol followed by the grouped number. Non-numeric values
/// render as their text, null as empty.
pub fn format_currency(value: &Value, symbol: &str) -> String {
    match value {
        Value::Null => String::new(),
        other => match other.as_f64() {
            Some(n) => format!("{symbol}{}", format_number(n)),
            None => other.to_search_text(),
        },
    }
}

/// Parse a value into a calendar date, if it holds one
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date()))
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        }
        _ => None,
    }
}

/// Dates render as `YYYY-MM-DD`; anything unparseable renders blank
pub fn format_date(value: &Value) -> String {
    parse_date(value)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Booleans render as `Yes`/`No` by truthiness; null renders empty
pub fn format_bool(value: &Value) -> &'static str {
    match value {
        Value::Null => "",
        other if other.is_truthy() => "Yes",
        _ => "No",
    }
}
