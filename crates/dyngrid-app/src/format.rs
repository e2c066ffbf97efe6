// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Rewrites an exact `YYYY-MM-DD` value as `MM/DD/YYYY`. Anything else,
/// including timestamps with a time part, comes back unchanged.
pub fn format_date_ymd_to_mdy(value: &str) -> String {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(index, byte)| index == 4 || index == 7 || byte.is_ascii_digit());
    if !shaped {
        return value.to_owned();
    }
    format!("{}/{}/{}", &value[5..7], &value[8..10], &value[0..4])
}

/// Parses `"120px"`, `"120"` or `"120.4px"` into whole pixels.
pub fn parse_px_width(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
    let parsed: f64 = number.parse().ok()?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return None;
    }
    Some(parsed.round() as u32)
}

pub fn format_px_width(width: u32) -> String {
    format!("{width}px")
}

/// Tab and modal titles use the table name with its first letter raised.
pub fn table_title(table: &str) -> String {
    let mut chars = table.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
