//! Number-to-display-string conversion: locale grouping, magnitude abbreviation,
//! and percent/currency decoration by statistic category.

use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

use crate::flags::{EVICTION_RATE, FILING_RATE};

/// Statistics displayed with a trailing `%`.
pub const PERCENT_STATS: [&str; 13] = [
    "er", "efr", "pr", "pro", "rb", "paa", "pw", "ph", "pa", "pai", "pnp", "pm", "po",
];
/// Statistics displayed with a leading `$`.
pub const CURRENCY_STATS: [&str; 3] = ["mgr", "mhi", "mpv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCategory {
    Percent,
    Currency,
    Count,
}

pub fn category(stat: &str) -> StatCategory {
    if PERCENT_STATS.contains(&stat) {
        StatCategory::Percent
    } else if CURRENCY_STATS.contains(&stat) {
        StatCategory::Currency
    } else {
        StatCategory::Count
    }
}

/// Map a request language to a `num_format::Locale` and its decimal separator char.
pub fn map_locale(lang: &str) -> (&'static Locale, char) {
    match lang.to_lowercase().as_str() {
        "es" | "es_es" | "es_us" => (&Locale::es, ','),
        _ => (&Locale::en, '.'),
    }
}

/// Group the integer part and keep up to two decimals, trailing zeros trimmed.
pub fn format_number(value: f64, lang: &str) -> String {
    let (locale, dec_sep) = map_locale(lang);
    let rounded = (value * 100.0).round() / 100.0;
    let neg = rounded < 0.0;
    let abs = rounded.abs();
    let int_part = abs.trunc() as u64;
    let frac = ((abs - abs.trunc()) * 100.0).round() as u64;
    let mut out = int_part.to_formatted_string(locale);
    if frac > 0 {
        let digits = format!("{frac:02}");
        out.push(dec_sep);
        out.push_str(digits.trim_end_matches('0'));
    }
    if neg && (int_part > 0 || frac > 0) {
        out.insert(0, '-');
    }
    out
}

/// Abbreviate large magnitudes: `>= 1,000,000` to `m`, `>= 10,000` to `k`.
/// Returns `None` when the value is small enough to print in full.
pub fn abbreviate(value: f64) -> Option<String> {
    let trim = |v: f64| {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    let a = value.abs();
    if a >= 1.0e6 {
        Some(format!("{}m", trim(value / 1.0e6)))
    } else if a >= 1.0e4 {
        Some(format!("{}k", trim(value / 1.0e3)))
    } else {
        None
    }
}

/// Rates above 100 are shown as `>100`.
pub fn cap_rate_value(value: f64, lang: &str) -> String {
    if value > 100.0 {
        ">100".to_string()
    } else {
        format_number(value, lang)
    }
}

/// Decorate an already formatted number according to the statistic's category.
pub fn format_type(stat: &str, text: &str) -> String {
    match category(stat) {
        StatCategory::Percent => format!("{text}%"),
        StatCategory::Currency => format!("${text}"),
        StatCategory::Count => text.to_string(),
    }
}

/// Full display string for a statistic value.
pub fn format_value(stat: &str, value: f64, lang: &str) -> String {
    let text = match abbreviate(value) {
        Some(short) => short,
        None if stat == EVICTION_RATE || stat == FILING_RATE => cap_rate_value(value, lang),
        None => format_number(value, lang),
    };
    format_type(stat, &text)
}

/// Like [`format_value`], but renders missing values as `unavailable`.
pub fn format_optional(stat: &str, value: Option<f64>, lang: &str, unavailable: &str) -> String {
    match value {
        Some(v) => format_value(stat, v, lang),
        None => unavailable.to_string(),
    }
}

pub fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|d| d.ordinal())
        .unwrap_or(365)
}

/// Evictions per day, rounded to two decimals.
pub fn evictions_per_day(total: f64, year: i32) -> f64 {
    (total / days_in_year(year) as f64 * 100.0).round() / 100.0
}

/// Signed difference of the national average from a value, two decimals (`"+1.25"`).
pub fn diff_from_average(average: f64, value: f64) -> String {
    let d = average - value;
    if d < 0.0 {
        format!("{:.2}", d)
    } else {
        format!("+{:.2}", d)
    }
}
