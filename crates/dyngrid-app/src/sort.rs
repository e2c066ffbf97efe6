// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::model::{Record, SortDirection};

/// Comparable form of a cell's display text.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Empty,
    Number(f64),
    Timestamp(i128),
    Text(String),
}

impl SortKey {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Ok(number) = trimmed.parse::<f64>()
            && number.is_finite()
        {
            return Self::Number(number);
        }
        if let Some(stamp) = parse_timestamp(trimmed) {
            return Self::Timestamp(stamp);
        }
        Self::Text(trimmed.to_lowercase())
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Number(_) => 1,
            Self::Timestamp(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => left.cmp(right),
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<i128> {
    if let Ok(value) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Some(value.midnight().assume_utc().unix_timestamp_nanos());
    }

    if let Ok(value) = Date::parse(raw, &format_description!("[month]/[day]/[year]")) {
        return Some(value.midnight().assume_utc().unix_timestamp_nanos());
    }

    if let Ok(value) = Date::parse(
        raw,
        &format_description!("[month padding:none]/[day padding:none]/[year]"),
    ) {
        return Some(value.midnight().assume_utc().unix_timestamp_nanos());
    }

    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value.unix_timestamp_nanos());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc().unix_timestamp_nanos());
    }

    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ) {
        return Some(value.assume_utc().unix_timestamp_nanos());
    }

    None
}

pub fn compare_cell_text(left: &str, right: &str) -> Ordering {
    SortKey::parse(left).cmp(&SortKey::parse(right))
}

/// Stable sort of rows by one column. Keys are parsed once per row.
pub fn sort_records(rows: &mut Vec<Record>, column: &str, direction: SortDirection) {
    let mut keyed: Vec<(SortKey, Record)> = rows
        .drain(..)
        .map(|row| (SortKey::parse(&row.text(column)), row))
        .collect();
    keyed.sort_by(|(left, _), (right, _)| match direction {
        SortDirection::Asc => left.cmp(right),
        SortDirection::Desc => right.cmp(left),
    });
    rows.extend(keyed.into_iter().map(|(_, row)| row));
}
