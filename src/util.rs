// Parsing and formatting helpers.
//
// All of the lenient CSV handling lives here so the loader can hand typed
// values to the rest of the pipeline.
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64`, forgiving the formatting noise that
/// shows up in exported spreadsheets.
///
/// - Trims whitespace.
/// - Strips thousands separators before parsing.
/// - Accepts scientific notation (`1.5e-05`).
/// - Returns `None` for placeholders (`NA`, `n/a`) and for `nan`/`inf`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Forecast case counts: anything unparsable or negative becomes zero.
///
/// The second value reports whether the raw text had to be coerced.
pub fn coerce_cases(s: Option<&str>) -> (f64, bool) {
    match parse_f64_safe(s) {
        Some(v) if v >= 0.0 => (v, false),
        _ => (0.0, true),
    }
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Calendar year and ISO week number for a date.
///
/// The year is the calendar year, not the ISO week-numbering year, so
/// 2024-12-30 reports as (2024, 1).
pub fn year_and_week(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.iso_week().week())
}

/// Monday..Sunday span of an ISO week, e.g. `Jan 06, 2025 - Jan 12, 2025`.
pub fn week_date_range(year: i32, week: u32) -> Option<String> {
    let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
    let end = NaiveDate::from_isoywd_opt(year, week, Weekday::Sun)?;
    Some(format!(
        "{} - {}",
        start.format("%b %d, %Y"),
        end.format("%b %d, %Y")
    ))
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Fixed-decimal formatting with locale thousands separators (`1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

/// Like [`format_number`] but with insignificant trailing zeros removed, so
/// `12.50` prints as `12.5` and `135.00` as `135`.
pub fn format_compact(n: f64, decimals: usize) -> String {
    let s = format_number(n, decimals);
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
