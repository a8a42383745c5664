//! Size and count strings for capped collections ("1000", "10k", "5MB").

use std::sync::LazyLock;

use regex::Regex;

static VALUE_WITH_UNIT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+)(k|MB)?$").ok());

/// Resolve a size or count string to a magnitude.
///
/// - absent → 0
/// - plain integer → that integer
/// - `<n>k` → n × 1000, `<n>MB` → n × 1024 × 1024
/// - anything else → 0
///
/// A digit string too large for a plain integer has no unit, and a missing
/// unit multiplies by zero, so it resolves to 0 as well. Never fails: a bad
/// value means "no limit".
pub fn resolve(value_with_unit: Option<&str>) -> i64 {
    let Some(value) = value_with_unit else {
        return 0;
    };

    if let Ok(plain) = value.parse::<i64>() {
        return plain;
    }

    let Some(captures) = VALUE_WITH_UNIT.as_ref().and_then(|re| re.captures(value)) else {
        return 0;
    };

    let magnitude = captures
        .get(1)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0);
    let multiplier = multiplier(captures.get(2).map_or("", |m| m.as_str()));

    magnitude.checked_mul(multiplier).unwrap_or(0)
}

fn multiplier(unit: &str) -> i64 {
    match unit {
        "k" => 1000,
        "MB" => 1024 * 1024,
        _ => 0,
    }
}
