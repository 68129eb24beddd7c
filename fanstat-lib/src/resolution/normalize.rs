//! Turning scraped count text into integers.

use regex::Regex;
use std::sync::LazyLock;

/// Convert display text such as `"1,234,567"`, `"2.5K"` or `"3.1M"` into an integer.
///
/// Unparseable or empty input yields 0, which callers treat as "no value" through
/// their range checks.
#[must_use]
pub fn normalize(text: &str) -> u64 {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return 0;
    }

    if text.contains(',') {
        return text.replace(',', "").parse().unwrap_or(0);
    }

    let (number, multiplier) = if let Some(number) = text.strip_suffix('k') {
        (number, 1e3)
    } else if let Some(number) = text.strip_suffix('m') {
        (number, 1e6)
    } else if let Some(number) = text.strip_suffix('b') {
        (number, 1e9)
    } else {
        (text.as_str(), 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => scale(value, multiplier),
        _ => 0,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is finite and non-negative, truncation is the intent"
)]
fn scale(value: f64, multiplier: f64) -> u64 {
    let scaled = value * multiplier;
    if multiplier > 1.0 {
        // absorb binary representation error ("4.6M" is 4599999.999...)
        (scaled + 1e-6).trunc() as u64
    } else {
        scaled.trunc() as u64
    }
}

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d(?:[\d,]*\d)?").expect("invalid regex"));

/// The first integer appearing in free text, ignoring thousands separators.
#[must_use]
pub fn first_integer(text: &str) -> Option<u64> {
    INTEGER.find(text).and_then(|m| m.as_str().replace(',', "").parse().ok())
}
