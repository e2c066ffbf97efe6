// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use dyngrid_api::Client;
use dyngrid_app::{
    BundleId, BundleKind, BundlePayload, CreateOutcome, DeleteOutcome, FieldConfig, GridLayoutData,
    GridPage, LayoutStorage, Record, RecordId, SavedBundle, SearchPatternData, SearchRequest,
    TabLayoutData, UpdateOutcome, find_by_name,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Backend calls go through the HTTP client; layout state goes to `S`
/// (SQLite normally, memory under `--demo`).
pub struct ApiRuntime<S> {
    client: Client,
    storage: S,
}

impl<S: LayoutStorage> ApiRuntime<S> {
    pub fn new(client: Client, storage: S) -> Self {
        Self { client, storage }
    }

    fn list_as<T: DeserializeOwned>(
        &self,
        kind: BundleKind,
        table: &str,
        wrap: fn(T) -> BundlePayload,
    ) -> Result<Vec<SavedBundle<BundlePayload>>> {
        let bundles = self.client.list_bundles::<T>(kind, table)?;
        Ok(bundles
            .into_iter()
            .map(|bundle| SavedBundle {
                id: bundle.id,
                name: bundle.name,
                is_default: bundle.is_default,
                updated_at: bundle.updated_at,
                data: bundle.data.map(wrap),
            })
            .collect())
    }

    fn load_as<T: DeserializeOwned>(
        &self,
        kind: BundleKind,
        table: &str,
        id: BundleId,
        wrap: fn(T) -> BundlePayload,
    ) -> Result<BundlePayload> {
        let bundle = self.client.load_bundle::<T>(kind, table, id)?;
        bundle
            .data
            .map(wrap)
            .with_context(|| format!("{} {id} came back without data", kind.as_str()))
    }

    /// Saves unless a bundle of the same name already holds identical data.
    fn save_if_changed<T: Serialize + DeserializeOwned>(
        &self,
        kind: BundleKind,
        table: &str,
        name: &str,
        data: &T,
        is_default: bool,
    ) -> Result<String> {
        let existing = self.client.list_bundles::<serde_json::Value>(kind, table)?;
        if let Some(current) = find_by_name(&existing, name)
            && current.is_default == is_default
        {
            let stored = match &current.data {
                Some(stored) => stored.clone(),
                None => self
                    .client
                    .load_bundle::<serde_json::Value>(kind, table, current.id)?
                    .data
                    .unwrap_or_default(),
            };
            let incoming = serde_json::to_value(data)
                .with_context(|| format!("encode {} data", kind.as_str()))?;
            // Re-encode the stored blob so "150px" and 150 compare equal.
            let stored = match serde_json::from_value::<T>(stored) {
                Ok(decoded) => serde_json::to_value(&decoded)
                    .with_context(|| format!("encode {} data", kind.as_str()))?,
                Err(_) => serde_json::Value::Null,
            };
            if dyngrid_db::json_digest(&stored)? == dyngrid_db::json_digest(&incoming)? {
                log::debug!("{} {name:?} unchanged, skipping save", kind.as_str());
                return Ok(format!("{} unchanged", kind.as_str()));
            }
        }
        self.client.save_bundle(kind, table, name, data, is_default)
    }
}

impl<S: LayoutStorage> dyngrid_tui::GridRuntime for ApiRuntime<S> {
    fn load_fields(&mut self, table: &str) -> Result<Vec<FieldConfig>> {
        self.client.fields(table)
    }

    fn load_page(&mut self, table: &str) -> Result<GridPage> {
        self.client.reset_grid(table)
    }

    fn search(&mut self, table: &str, request: &SearchRequest) -> Result<Option<GridPage>> {
        self.client.search_records(table, request)
    }

    fn load_record(&mut self, table: &str, id: RecordId) -> Result<Record> {
        self.client.record(table, id)
    }

    fn create_record(
        &mut self,
        table: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<CreateOutcome> {
        self.client.create_record(table, data)
    }

    fn update_record(
        &mut self,
        table: &str,
        id: RecordId,
        data: &BTreeMap<String, String>,
    ) -> UpdateOutcome {
        self.client.update_record(table, id, data)
    }

    fn delete_records(&mut self, table: &str, ids: &[RecordId]) -> Result<DeleteOutcome> {
        self.client.delete_records(table, ids)
    }

    fn load_options(&mut self, table: &str, field: &str) -> Result<Vec<String>> {
        self.client.options(table, field)
    }

    fn global_search(&mut self, table: &str, field: &str, query: &str) -> Result<Vec<String>> {
        self.client.gsearch(table, field, query)
    }

    fn list_bundles(
        &mut self,
        kind: BundleKind,
        table: &str,
    ) -> Result<Vec<SavedBundle<BundlePayload>>> {
        match kind {
            BundleKind::Layout => {
                self.list_as::<GridLayoutData>(kind, table, BundlePayload::Layout)
            }
            BundleKind::SearchPattern => {
                self.list_as::<SearchPatternData>(kind, table, BundlePayload::SearchPattern)
            }
            BundleKind::TabLayout => {
                self.list_as::<TabLayoutData>(kind, table, BundlePayload::TabLayout)
            }
        }
    }

    fn save_bundle(
        &mut self,
        table: &str,
        name: &str,
        payload: &BundlePayload,
        is_default: bool,
    ) -> Result<String> {
        let kind = payload.kind();
        match payload {
            BundlePayload::Layout(data) => {
                self.save_if_changed(kind, table, name, data, is_default)
            }
            BundlePayload::SearchPattern(data) => {
                self.save_if_changed(kind, table, name, data, is_default)
            }
            BundlePayload::TabLayout(data) => {
                self.save_if_changed(kind, table, name, data, is_default)
            }
        }
    }

    fn load_bundle(
        &mut self,
        kind: BundleKind,
        table: &str,
        id: BundleId,
    ) -> Result<BundlePayload> {
        match kind {
            BundleKind::Layout => {
                self.load_as::<GridLayoutData>(kind, table, id, BundlePayload::Layout)
            }
            BundleKind::SearchPattern => {
                self.load_as::<SearchPatternData>(kind, table, id, BundlePayload::SearchPattern)
            }
            BundleKind::TabLayout => {
                self.load_as::<TabLayoutData>(kind, table, id, BundlePayload::TabLayout)
            }
        }
    }

    fn delete_bundle(&mut self, kind: BundleKind, table: &str, id: BundleId) -> Result<String> {
        self.client.delete_bundle(kind, table, id)
    }

    fn set_default_bundle(
        &mut self,
        kind: BundleKind,
        table: &str,
        id: BundleId,
    ) -> Result<String> {
        self.client.set_default_bundle(kind, table, id)
    }

    fn storage(&mut self) -> &mut dyn LayoutStorage {
        &mut self.storage
    }
}
