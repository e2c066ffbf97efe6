// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::format::{format_px_width, parse_px_width};
use crate::ids::*;
use crate::interaction::MAX_COLUMN_WIDTH;

/// Column name that identifies a record. Never rendered, never edited.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Autocomplete,
    Dropdown,
}

impl FieldType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Autocomplete => "autocomplete",
            Self::Dropdown => "dropdown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            "select" => Some(Self::Select),
            "autocomplete" => Some(Self::Autocomplete),
            "dropdown" => Some(Self::Dropdown),
            _ => None,
        }
    }

    /// Choice fields take their values from the backend option list.
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::Select | Self::Autocomplete | Self::Dropdown)
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(raw.trim()).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_tags: Option<String>,
}

impl FieldConfig {
    pub fn new(name: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_owned(),
            label: label.to_owned(),
            field_type,
            mandatory: false,
            operator_tags: None,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_operators(mut self, tags: &str) -> Self {
        self.operator_tags = Some(tags.to_owned());
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn operators(&self) -> Vec<String> {
        self.operator_tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn is_id(&self) -> bool {
        self.name == ID_FIELD
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(text)) => matches!(text.trim(), "true" | "True" | "1" | "yes"),
        _ => false,
    })
}

/// One row of a table: its id plus every other column as raw JSON.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: Option<RecordId>,
    pub values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(RecordId::new(id)),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_owned(), value.into());
        self
    }

    pub fn text(&self, field: &str) -> String {
        if field == ID_FIELD {
            return self.id.map(|id| id.to_string()).unwrap_or_default();
        }
        self.values.get(field).map(value_text).unwrap_or_default()
    }
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serde_json::Map::new();
        if let Some(id) = self.id {
            map.insert(ID_FIELD.to_owned(), Value::from(id.get()));
        }
        for (key, value) in &self.values {
            map.insert(key.clone(), value.clone());
        }
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut values = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let id = values
            .remove(ID_FIELD)
            .as_ref()
            .and_then(parse_wire_id)
            .map(RecordId::new);
        Ok(Self { id, values })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

pub const MAX_SORTS: usize = 2;

/// Body of a search call: filters keyed by field name next to a `sort` list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub filters: BTreeMap<String, SearchFilter>,
    pub sort: Vec<SortSpec>,
}

/// Client-side sort applied to rendered rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSort {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridColumn {
    pub label: String,
    pub field: String,
}

impl GridColumn {
    pub fn new(label: &str, field: &str) -> Self {
        Self {
            label: label.to_owned(),
            field: field.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridPage {
    pub columns: Vec<GridColumn>,
    pub rows: Vec<Record>,
    pub total_count: Option<u64>,
}

/// Saved grid layout blob. Widths travel as CSS pixel strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayoutData {
    #[serde(default, deserialize_with = "names_or_empty")]
    pub column_visibility: Vec<String>,
    #[serde(
        default,
        serialize_with = "serialize_px_widths",
        deserialize_with = "deserialize_px_widths"
    )]
    pub column_widths: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "names_or_empty")]
    pub column_order: Vec<String>,
    #[serde(default, deserialize_with = "sort_or_none")]
    pub sort_state: Option<ColumnSort>,
}

fn names_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn serialize_px_widths<S: Serializer>(
    widths: &BTreeMap<String, u32>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let rendered: BTreeMap<&str, String> = widths
        .iter()
        .map(|(name, width)| (name.as_str(), format_px_width(*width)))
        .collect();
    rendered.serialize(serializer)
}

fn deserialize_px_widths<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(width_map_from_value(value.as_ref()))
}

/// Reads `{name: "120px" | 120}`; entries that are neither are skipped.
pub fn width_map_from_value(value: Option<&Value>) -> BTreeMap<String, u32> {
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(name, raw)| {
            let width = match raw {
                Value::Number(number) => number
                    .as_f64()
                    .filter(|n| n.is_finite() && *n > 0.0)
                    .map(|n| n.min(f64::from(MAX_COLUMN_WIDTH)).round() as u32),
                Value::String(text) => parse_px_width(text),
                _ => None,
            }?;
            Some((name.clone(), width.min(MAX_COLUMN_WIDTH)))
        })
        .collect()
}

fn sort_or_none<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ColumnSort>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(column_sort_from_value))
}

/// Accepts `{column, direction}`; a null or partial object means "no sort".
pub fn column_sort_from_value(value: &Value) -> Option<ColumnSort> {
    let column = value.get("column")?.as_str()?.trim();
    let direction = SortDirection::parse(value.get("direction")?.as_str()?)?;
    if column.is_empty() {
        return None;
    }
    Some(ColumnSort {
        column: column.to_owned(),
        direction,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchPatternData {
    #[serde(default)]
    pub filters: BTreeMap<String, SearchFilter>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabLayoutData {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub tab_texts: Vec<String>,
    #[serde(default)]
    pub selected_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateOutcome {
    pub success: bool,
    pub errors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl UpdateOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub success: bool,
    pub deleted: Vec<RecordId>,
    pub error: Option<String>,
}

/// A named bundle as listed or loaded from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedBundle<T> {
    pub id: BundleId,
    pub name: String,
    pub is_default: bool,
    pub updated_at: String,
    pub data: Option<T>,
}

pub type SavedLayout = SavedBundle<GridLayoutData>;
pub type SavedSearchPattern = SavedBundle<SearchPatternData>;
pub type SavedTabLayout = SavedBundle<TabLayoutData>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Warning,
    Danger,
}

impl ToastKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Warning,
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Danger,
        }
    }
}
