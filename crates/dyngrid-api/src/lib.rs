// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use dyngrid_app::{
    BundleId, BundleKind, CreateOutcome, DeleteOutcome, FieldConfig, GridColumn, GridPage,
    Record, RecordId, SavedBundle, SearchRequest, UpdateOutcome, parse_wire_id, value_text,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Blocking client for the grid backend's JSON API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))
    }

    /// Sends and requires a 2xx, turning anything else into a readable error.
    fn send_ok(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.send(request)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    pub fn fields(&self, table: &str) -> Result<Vec<FieldConfig>> {
        let response = self.send_ok(self.http.get(self.url(&format!("/api/fields/{table}/"))))?;
        let parsed: FieldsResponse = response.json().context("decode field list")?;
        Ok(parsed.fields)
    }

    pub fn options(&self, table: &str, field: &str) -> Result<Vec<String>> {
        let response =
            self.send_ok(self.http.get(self.url(&format!("/api/options/{table}/{field}/"))))?;
        let parsed: OptionsResponse = response.json().context("decode option list")?;
        Ok(parsed.into_texts())
    }

    /// Server-side suggestions for a `GSearch` filter.
    pub fn gsearch(&self, table: &str, field: &str, query: &str) -> Result<Vec<String>> {
        let mut url = Url::parse(&self.url(&format!("/api/gsearch/{table}/{field}/")))
            .with_context(|| format!("build gsearch url for {table}.{field}"))?;
        url.query_pairs_mut().append_pair("q", query);
        let response = self.send_ok(self.http.get(url))?;
        let parsed: OptionsResponse = response.json().context("decode gsearch results")?;
        Ok(parsed.into_texts())
    }

    pub fn record(&self, table: &str, id: RecordId) -> Result<Record> {
        let response =
            self.send_ok(self.http.get(self.url(&format!("/api/record/{table}/{id}/"))))?;
        response.json().context("decode record")
    }

    pub fn create_record(
        &self,
        table: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<CreateOutcome> {
        let response = self.send(
            self.http
                .post(self.url(&format!("/api/create/{table}/")))
                .json(data),
        )?;
        let status = response.status();
        let body = response.text().context("read create response")?;
        let parsed: CreateResponse = decode_body(status, &body, "create response")?;
        let mut errors: BTreeMap<String, String> = parsed
            .errors
            .iter()
            .map(|(field, value)| (field.clone(), error_text(value)))
            .collect();
        if !status.is_success() && errors.is_empty() {
            let message = parsed
                .error
                .unwrap_or_else(|| status_text(status));
            errors.insert("__all__".to_owned(), message);
        }
        Ok(CreateOutcome {
            success: parsed.success && status.is_success(),
            errors,
        })
    }

    /// Never fails: transport problems come back as an unsuccessful outcome.
    pub fn update_record(
        &self,
        table: &str,
        id: RecordId,
        data: &BTreeMap<String, String>,
    ) -> UpdateOutcome {
        let request = self
            .http
            .post(self.url(&format!("/api/update/{table}/{id}/")))
            .json(data);
        let response = match self.send(request) {
            Ok(response) => response,
            Err(error) => return UpdateOutcome::failed(format!("network error: {error}")),
        };
        let status = response.status();
        let body = response.text().unwrap_or_default();
        let parsed = serde_json::from_str::<UpdateResponse>(&body).ok();

        if !status.is_success() {
            let error = parsed
                .and_then(|parsed| parsed.error)
                .filter(|error| !error.trim().is_empty())
                .unwrap_or_else(|| status_text(status));
            return UpdateOutcome::failed(error);
        }

        match parsed {
            Some(parsed) => UpdateOutcome {
                success: parsed.success,
                error: parsed.error.filter(|error| !error.trim().is_empty()),
            },
            None => UpdateOutcome::failed("unreadable update response"),
        }
    }

    pub fn delete_records(&self, table: &str, ids: &[RecordId]) -> Result<DeleteOutcome> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let response = self.send(
            self.http
                .post(self.url(&format!("/api/delete/{table}/")))
                .json(&json!({ "ids": ids })),
        )?;
        let status = response.status();
        let body = response.text().context("read delete response")?;
        let parsed: DeleteResponse = decode_body(status, &body, "delete response")?;
        let success = parsed.success && status.is_success();
        let error = parsed
            .error
            .filter(|error| !error.trim().is_empty())
            .or_else(|| (!success).then(|| status_text(status)));
        Ok(DeleteOutcome {
            success,
            deleted: parsed
                .deleted
                .iter()
                .filter_map(parse_wire_id)
                .map(RecordId::new)
                .collect(),
            error,
        })
    }

    /// `None` when the response carries no `data`, the backend's way of
    /// saying nothing matched.
    pub fn search_records(&self, table: &str, request: &SearchRequest) -> Result<Option<GridPage>> {
        let response = self.send_ok(
            self.http
                .post(self.url(&format!("/api/search/{table}/")))
                .json(request),
        )?;
        let parsed: PageResponse = response.json().context("decode search results")?;
        Ok(parsed.into_page())
    }

    pub fn reset_grid(&self, table: &str) -> Result<GridPage> {
        let response =
            self.send_ok(self.http.get(self.url(&format!("/api/reset-grid/{table}/"))))?;
        let parsed: PageResponse = response.json().context("decode grid page")?;
        Ok(parsed.into_page().unwrap_or_default())
    }

    pub fn list_bundles<T: DeserializeOwned>(
        &self,
        kind: BundleKind,
        table: &str,
    ) -> Result<Vec<SavedBundle<T>>> {
        let wire = BundleWire::of(kind);
        let response = self.send_ok(self.http.get(self.url(&bundle_base(kind, table))))?;
        let body: Value = response
            .json()
            .with_context(|| format!("decode {} list", kind.as_str()))?;
        let items = match body.get(wire.list_key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        };
        Ok(items
            .iter()
            .filter_map(|item| {
                let bundle = wire.bundle_from_value(item, None);
                if bundle.is_none() {
                    log::warn!("skipping unreadable {} entry: {item}", kind.as_str());
                }
                bundle
            })
            .collect())
    }

    /// Saves (or overwrites by name) a bundle. Returns the server's message.
    pub fn save_bundle<T: Serialize>(
        &self,
        kind: BundleKind,
        table: &str,
        name: &str,
        data: &T,
        is_default: bool,
    ) -> Result<String> {
        let wire = BundleWire::of(kind);
        let data = serde_json::to_value(data)
            .with_context(|| format!("encode {} data", kind.as_str()))?;
        let mut body = serde_json::Map::new();
        body.insert(wire.name_key.to_owned(), Value::from(name));
        body.insert(wire.data_key.to_owned(), data);
        body.insert("is_default".to_owned(), Value::from(is_default));
        let response = self.send_ok(
            self.http
                .post(self.url(&format!("{}save/", bundle_base(kind, table))))
                .json(&body),
        )?;
        message_of(response, kind, "saved")
    }

    pub fn load_bundle<T: DeserializeOwned>(
        &self,
        kind: BundleKind,
        table: &str,
        id: BundleId,
    ) -> Result<SavedBundle<T>> {
        let wire = BundleWire::of(kind);
        let response = self.send_ok(
            self.http
                .get(self.url(&format!("{}{id}/load/", bundle_base(kind, table)))),
        )?;
        let body: Value = response
            .json()
            .with_context(|| format!("decode {}", kind.as_str()))?;
        let raw_data = body
            .get(wire.data_key)
            .map(unwrap_embedded_json)
            .ok_or_else(|| anyhow!("{} {id} has no {}", kind.as_str(), wire.data_key))?;
        let data: T = serde_json::from_value(raw_data)
            .with_context(|| format!("decode {} data", kind.as_str()))?;
        let mut bundle = wire
            .bundle_from_value(&body, Some(id))
            .ok_or_else(|| anyhow!("decode {} {id}", kind.as_str()))?;
        bundle.data = Some(data);
        Ok(bundle)
    }

    pub fn delete_bundle(&self, kind: BundleKind, table: &str, id: BundleId) -> Result<String> {
        let response = self.send_ok(
            self.http
                .delete(self.url(&format!("{}{id}/delete/", bundle_base(kind, table)))),
        )?;
        message_of(response, kind, "deleted")
    }

    pub fn set_default_bundle(
        &self,
        kind: BundleKind,
        table: &str,
        id: BundleId,
    ) -> Result<String> {
        let response = self.send_ok(
            self.http
                .post(self.url(&format!("{}{id}/set-default/", bundle_base(kind, table)))),
        )?;
        message_of(response, kind, "set as default")
    }
}

/// Path prefix of a bundle kind. Tab layouts are not scoped to a table.
pub fn bundle_base(kind: BundleKind, table: &str) -> String {
    match kind {
        BundleKind::Layout => format!("/api/layouts/{table}/"),
        BundleKind::SearchPattern => format!("/api/search-patterns/{table}/"),
        BundleKind::TabLayout => "/api/tab-layouts/".to_owned(),
    }
}

struct BundleWire {
    name_key: &'static str,
    data_key: &'static str,
    list_key: &'static str,
}

impl BundleWire {
    const fn of(kind: BundleKind) -> Self {
        match kind {
            BundleKind::Layout => Self {
                name_key: "layout_name",
                data_key: "layout_json",
                list_key: "layouts",
            },
            BundleKind::SearchPattern => Self {
                name_key: "searchname",
                data_key: "searchdata",
                list_key: "patterns",
            },
            BundleKind::TabLayout => Self {
                name_key: "tabs_name",
                data_key: "tabs_data",
                list_key: "layouts",
            },
        }
    }

    /// Reads the shared bundle fields. Inline data is decoded when present
    /// and dropped with a warning when it does not fit `T`.
    fn bundle_from_value<T: DeserializeOwned>(
        &self,
        item: &Value,
        fallback_id: Option<BundleId>,
    ) -> Option<SavedBundle<T>> {
        let id = item
            .get("id")
            .and_then(parse_wire_id)
            .map(BundleId::new)
            .or(fallback_id)?;
        let name = item.get(self.name_key).map(value_text).unwrap_or_default();
        let is_default = item
            .get("is_default")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let updated_at = item.get("updated_at").map(value_text).unwrap_or_default();
        let data = item
            .get(self.data_key)
            .map(unwrap_embedded_json)
            .and_then(|raw| match serde_json::from_value(raw) {
                Ok(data) => Some(data),
                Err(error) => {
                    log::warn!("ignoring unreadable {} of {name:?}: {error}", self.data_key);
                    None
                }
            });
        Some(SavedBundle {
            id,
            name,
            is_default,
            updated_at,
            data,
        })
    }
}

/// Some backends store bundle data as a JSON string rather than an object.
fn unwrap_embedded_json(value: &Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn message_of(response: Response, kind: BundleKind, verb: &str) -> Result<String> {
    let parsed: MessageResponse = response
        .json()
        .with_context(|| format!("decode {} response", kind.as_str()))?;
    Ok(parsed
        .message
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("{} {verb}", kind.as_str())))
}

fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str, what: &str) -> Result<T> {
    match serde_json::from_str(body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(clean_error_response(status, body)),
        Err(error) => Err(anyhow!("decode {what}: {error}")),
    }
}

/// Django form errors arrive as a string or a list of strings.
fn error_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(" "),
        other => value_text(other),
    }
}

fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- start the grid backend or fix [server].base_url ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error);
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') && !body.contains('<') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status_text(status))
}

#[derive(Debug, Deserialize)]
struct FieldsResponse {
    fields: Vec<FieldConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OptionRow {
    Tagged { text: String },
    Plain(String),
}

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    #[serde(default)]
    options: Vec<OptionRow>,
}

impl OptionsResponse {
    fn into_texts(self) -> Vec<String> {
        self.options
            .into_iter()
            .map(|row| match row {
                OptionRow::Tagged { text } | OptionRow::Plain(text) => text,
            })
            .filter(|text| !text.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnWire {
    Pair(String, String),
    Named { label: String, field: String },
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    columns: Vec<ColumnWire>,
    #[serde(default)]
    data: Option<Vec<Record>>,
    #[serde(default)]
    total_count: Option<u64>,
}

impl PageResponse {
    fn into_page(self) -> Option<GridPage> {
        let rows = self.data?;
        let columns = self
            .columns
            .into_iter()
            .map(|column| match column {
                ColumnWire::Pair(label, field) | ColumnWire::Named { label, field } => {
                    GridColumn { label, field }
                }
            })
            .collect();
        Some(GridPage {
            columns,
            rows,
            total_count: self.total_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: BTreeMap<String, Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    deleted: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{
        BundleWire, PageResponse, bundle_base, clean_error_response, error_text,
        unwrap_embedded_json,
    };
    use anyhow::Result;
    use dyngrid_app::{BundleId, BundleKind, GridLayoutData, SavedBundle};
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn bundle_bases_follow_kind() {
        assert_eq!(bundle_base(BundleKind::Layout, "t"), "/api/layouts/t/");
        assert_eq!(
            bundle_base(BundleKind::SearchPattern, "t"),
            "/api/search-patterns/t/"
        );
        assert_eq!(bundle_base(BundleKind::TabLayout, "t"), "/api/tab-layouts/");
    }

    #[test]
    fn page_without_data_means_no_results() -> Result<()> {
        let parsed: PageResponse = serde_json::from_value(json!({"columns": []}))?;
        assert!(parsed.into_page().is_none());

        let parsed: PageResponse = serde_json::from_value(json!({
            "columns": [["Name", "name"], {"label": "Age", "field": "age"}],
            "data": [],
        }))?;
        let page = parsed.into_page();
        assert_eq!(page.map(|page| page.columns.len()), Some(2));
        Ok(())
    }

    #[test]
    fn embedded_json_strings_are_unwrapped() {
        let raw = json!("{\"columnOrder\":[\"a\"]}");
        assert_eq!(unwrap_embedded_json(&raw), json!({"columnOrder": ["a"]}));
        assert_eq!(unwrap_embedded_json(&json!("plain")), json!("plain"));
    }

    #[test]
    fn bundle_entries_decode_with_wire_keys() {
        let wire = BundleWire::of(BundleKind::Layout);
        let item = json!({
            "id": "3",
            "layout_name": "Wide",
            "is_default": true,
            "updated_at": "2026-02-19T12:34:56Z",
            "layout_json": {"columnOrder": ["age", "name"]},
        });
        let bundle: Option<SavedBundle<GridLayoutData>> = wire.bundle_from_value(&item, None);
        let Some(bundle) = bundle else {
            panic!("entry should decode");
        };
        assert_eq!(bundle.id, BundleId::new(3));
        assert_eq!(bundle.name, "Wide");
        assert!(bundle.is_default);
        assert_eq!(
            bundle.data.map(|data| data.column_order),
            Some(vec!["age".to_owned(), "name".to_owned()]),
        );

        let missing_id: Option<SavedBundle<GridLayoutData>> =
            wire.bundle_from_value(&json!({"layout_name": "x"}), None);
        assert!(missing_id.is_none());
    }

    #[test]
    fn error_bodies_become_readable_messages() {
        let error = clean_error_response(StatusCode::BAD_REQUEST, r#"{"error":"bad table"}"#);
        assert_eq!(error.to_string(), "server error (400): bad table");

        let error = clean_error_response(StatusCode::NOT_FOUND, "<html>nope</html>");
        assert_eq!(error.to_string(), "server returned 404 Not Found");
    }

    #[test]
    fn form_error_lists_are_joined() {
        assert_eq!(
            error_text(&json!(["Required.", "Too short."])),
            "Required. Too short."
        );
        assert_eq!(error_text(&json!("Bad")), "Bad");
    }
}
