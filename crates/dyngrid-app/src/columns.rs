// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde_json::Value;

use crate::interaction::clamp_width;
use crate::model::{ColumnSort, column_sort_from_value, width_map_from_value};
use crate::storage::{LayoutSlice, LayoutStorage, load_json, save_json};

/// Drops saved names the schema no longer has, then appends schema columns
/// the saved order never saw. The result is always a permutation of `schema`.
pub fn reconcile_order(saved: &[String], schema: &[String]) -> Vec<String> {
    let known: BTreeSet<&str> = schema.iter().map(String::as_str).collect();
    let mut seen = BTreeSet::new();
    let mut order = Vec::with_capacity(schema.len());
    for name in saved {
        if known.contains(name.as_str()) && seen.insert(name.as_str()) {
            order.push(name.clone());
        }
    }
    for name in schema {
        if seen.insert(name.as_str()) {
            order.push(name.clone());
        }
    }
    order
}

/// Persists column widths in pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnResizer {
    table: String,
}

impl ColumnResizer {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_owned(),
        }
    }

    pub fn set_table(&mut self, table: &str) {
        self.table = table.to_owned();
    }

    pub fn key(&self) -> String {
        LayoutSlice::ColumnWidths.key(&self.table)
    }

    pub fn save(&self, storage: &mut dyn LayoutStorage, widths: &BTreeMap<String, u32>) -> Result<()> {
        save_json(storage, &self.key(), widths)
    }

    /// Saved widths, each floored at the minimum. Nothing saved reads as empty.
    pub fn load(&self, storage: &dyn LayoutStorage) -> Result<BTreeMap<String, u32>> {
        let raw: Option<Value> = load_json(storage, &self.key())?;
        Ok(width_map_from_value(raw.as_ref())
            .into_iter()
            .map(|(name, width)| (name, clamp_width(i64::from(width))))
            .collect())
    }

    pub fn reset(&self, storage: &mut dyn LayoutStorage) -> Result<()> {
        storage.remove_raw(&self.key())
    }
}

/// Persists column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDragger {
    table: String,
}

impl ColumnDragger {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_owned(),
        }
    }

    pub fn set_table(&mut self, table: &str) {
        self.table = table.to_owned();
    }

    pub fn key(&self) -> String {
        LayoutSlice::ColumnOrder.key(&self.table)
    }

    pub fn save(&self, storage: &mut dyn LayoutStorage, order: &[String]) -> Result<()> {
        save_json(storage, &self.key(), order)
    }

    /// Saved order reconciled against the current schema.
    pub fn load(&self, storage: &dyn LayoutStorage, schema: &[String]) -> Result<Option<Vec<String>>> {
        let saved: Option<Vec<String>> = load_json(storage, &self.key())?;
        Ok(saved.map(|saved| reconcile_order(&saved, schema)))
    }

    pub fn reset(&self, storage: &mut dyn LayoutStorage) -> Result<()> {
        storage.remove_raw(&self.key())
    }
}

/// Persists the set of visible columns. An absent set means every column shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnVisibility {
    table: String,
}

impl ColumnVisibility {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_owned(),
        }
    }

    pub fn set_table(&mut self, table: &str) {
        self.table = table.to_owned();
    }

    pub fn key(&self) -> String {
        LayoutSlice::VisibleColumns.key(&self.table)
    }

    pub fn save(&self, storage: &mut dyn LayoutStorage, visible: &BTreeSet<String>) -> Result<()> {
        save_json(storage, &self.key(), visible)
    }

    pub fn load(&self, storage: &dyn LayoutStorage) -> Result<Option<BTreeSet<String>>> {
        let saved: Option<Vec<String>> = load_json(storage, &self.key())?;
        Ok(saved
            .map(|names| names.into_iter().collect::<BTreeSet<_>>())
            .filter(|names| !names.is_empty()))
    }

    pub fn reset(&self, storage: &mut dyn LayoutStorage) -> Result<()> {
        storage.remove_raw(&self.key())
    }
}

/// Persists the client-side sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSorter {
    table: String,
}

impl ColumnSorter {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_owned(),
        }
    }

    pub fn set_table(&mut self, table: &str) {
        self.table = table.to_owned();
    }

    pub fn key(&self) -> String {
        LayoutSlice::ColumnSort.key(&self.table)
    }

    pub fn save(&self, storage: &mut dyn LayoutStorage, sort: &ColumnSort) -> Result<()> {
        save_json(storage, &self.key(), sort)
    }

    pub fn load(&self, storage: &dyn LayoutStorage) -> Result<Option<ColumnSort>> {
        let mut raw: Option<Value> = load_json(storage, &self.key())?;
        if raw.is_none()
            && let Some(legacy) = LayoutSlice::ColumnSort.legacy_key(&self.table)
        {
            raw = load_json(storage, &legacy)?;
        }
        Ok(raw.as_ref().and_then(column_sort_from_value))
    }

    pub fn reset(&self, storage: &mut dyn LayoutStorage) -> Result<()> {
        storage.remove_raw(&self.key())?;
        if let Some(legacy) = LayoutSlice::ColumnSort.legacy_key(&self.table) {
            storage.remove_raw(&legacy)?;
        }
        Ok(())
    }
}

/// The four managers of one grid, all bound to the same table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnManagers {
    pub resizer: ColumnResizer,
    pub dragger: ColumnDragger,
    pub visibility: ColumnVisibility,
    pub sorter: ColumnSorter,
}

impl ColumnManagers {
    pub fn new(table: &str) -> Self {
        Self {
            resizer: ColumnResizer::new(table),
            dragger: ColumnDragger::new(table),
            visibility: ColumnVisibility::new(table),
            sorter: ColumnSorter::new(table),
        }
    }

    pub fn set_table(&mut self, table: &str) {
        self.resizer.set_table(table);
        self.dragger.set_table(table);
        self.visibility.set_table(table);
        self.sorter.set_table(table);
    }

    pub fn reset_all(&self, storage: &mut dyn LayoutStorage) -> Result<()> {
        self.resizer.reset(storage)?;
        self.dragger.reset(storage)?;
        self.visibility.reset(storage)?;
        self.sorter.reset(storage)
    }
}
