// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Key holding the open tab session.
pub const OPEN_TABS_KEY: &str = "grid_open_tabs";

/// One independently persisted piece of a table's column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayoutSlice {
    VisibleColumns,
    ColumnOrder,
    ColumnWidths,
    ColumnSort,
}

impl LayoutSlice {
    pub const ALL: [Self; 4] = [
        Self::VisibleColumns,
        Self::ColumnOrder,
        Self::ColumnWidths,
        Self::ColumnSort,
    ];

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::VisibleColumns => "grid_visible_columns_",
            Self::ColumnOrder => "grid_column_order_",
            Self::ColumnWidths => "grid_column_widths_",
            Self::ColumnSort => "grid_column_sort_",
        }
    }

    /// Older clients wrote the sort slice under a different prefix.
    pub const fn legacy_prefix(self) -> Option<&'static str> {
        match self {
            Self::ColumnSort => Some("grid_sort_state_"),
            _ => None,
        }
    }

    pub fn key(self, table: &str) -> String {
        format!("{}{table}", self.prefix())
    }

    pub fn legacy_key(self, table: &str) -> Option<String> {
        self.legacy_prefix().map(|prefix| format!("{prefix}{table}"))
    }
}

/// String key/value persistence for layout state.
pub trait LayoutStorage {
    fn get_raw(&self, key: &str) -> Result<Option<String>>;
    fn put_raw(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_raw(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryLayoutStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LayoutStorage for MemoryLayoutStorage {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_raw(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_raw(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Reads a JSON value. Undecodable content is logged and treated as absent.
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn LayoutStorage,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = storage.get_raw(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            log::warn!("ignoring corrupt layout state under {key}: {error}");
            Ok(None)
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    storage: &mut dyn LayoutStorage,
    key: &str,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_string(value).with_context(|| format!("encode {key}"))?;
    storage.put_raw(key, &encoded)
}
