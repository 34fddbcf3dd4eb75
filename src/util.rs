// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Accepts scientific notation such as `1.5e5`.
/// - Returns `None` for text, `NaN`, infinities and anything else that
///   cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok().or_else(|| {
        // Integer columns holding nulls come out of some exports as `12.0`.
        parse_f64_safe(Some(s))
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Month columns are named in `YYYY-MM-DD` format.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Left-pad with zeros to `width`, keeping a leading sign in front.
pub fn zfill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let pad = "0".repeat(width - len);
    match s.strip_prefix(['-', '+']) {
        Some(rest) => format!("{}{}{}", &s[..1], pad, rest),
        None => format!("{}{}", pad, s),
    }
}

/// Mean of the present values, or `None` when fewer than `min_count` exist.
pub fn average_present(values: impl IntoIterator<Item = Option<f64>>, min_count: usize) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 || count < min_count {
        return None;
    }
    Some(sum / count as f64)
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and non-empty; `q` is clamped to `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Whole-dollar amount with thousands separators, e.g. `$412,305`.
pub fn format_price(n: i64) -> String {
    if n < 0 {
        format!("-${}", n.unsigned_abs().to_formatted_string(&Locale::en))
    } else {
        format!("${}", n.to_formatted_string(&Locale::en))
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g., `3,142 counties loaded`).
    n.to_formatted_string(&Locale::en)
}
