// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};

use crate::format::table_title;
use crate::ids::RecordId;
use crate::model::{
    FieldConfig, FieldType, MAX_SORTS, Record, SearchFilter, SearchPatternData, SearchRequest,
    SortDirection, SortSpec,
};

/// Field that gets free-text suggestions, matched case-insensitively.
pub const AUTOCOMPLETE_FIELD: &str = "job";

/// Search operator that swaps a text input to server-side suggestions.
pub const GLOBAL_SEARCH_OPERATOR: &str = "GSearch";

pub const REQUIRED_MESSAGE: &str = "This field is required.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub config: FieldConfig,
    pub value: String,
    pub error: Option<String>,
}

impl FormField {
    fn new(config: FieldConfig, value: String) -> Self {
        Self {
            config,
            value,
            error: None,
        }
    }

    pub fn has_autocomplete(&self) -> bool {
        self.config.name.eq_ignore_ascii_case(AUTOCOMPLETE_FIELD)
    }

    pub fn is_choice(&self) -> bool {
        self.config.field_type.is_choice()
    }

    pub fn accepts(&self, ch: char) -> bool {
        match self.config.field_type {
            FieldType::Number => ch.is_ascii_digit() || matches!(ch, '-' | '.'),
            FieldType::Date => ch.is_ascii_digit() || ch == '-',
            _ => !ch.is_control(),
        }
    }

    fn submitted_value(&self) -> String {
        if self.is_choice() {
            self.value.trim().to_owned()
        } else {
            self.value.clone()
        }
    }
}

/// Create/edit form state built from a table's field config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordForm {
    table: String,
    mode: FormMode,
    fields: Vec<FormField>,
    focus: usize,
    pub suggestions: Autocomplete,
}

impl RecordForm {
    pub fn create(table: &str, configs: &[FieldConfig]) -> Self {
        let fields = configs
            .iter()
            .filter(|config| !config.is_id())
            .map(|config| FormField::new(config.clone(), String::new()))
            .collect();
        Self {
            table: table.to_owned(),
            mode: FormMode::Create,
            fields,
            focus: 0,
            suggestions: Autocomplete::default(),
        }
    }

    pub fn edit(table: &str, configs: &[FieldConfig], record: &Record) -> Result<Self> {
        let id = record
            .id
            .ok_or_else(|| anyhow!("record has no id -- reload the grid and try again"))?;
        let fields = configs
            .iter()
            .filter(|config| !config.is_id())
            .map(|config| FormField::new(config.clone(), record.text(&config.name)))
            .collect();
        Ok(Self {
            table: table.to_owned(),
            mode: FormMode::Edit(id),
            fields,
            focus: 0,
            suggestions: Autocomplete::default(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => format!("New {}", table_title(&self.table)),
            FormMode::Edit(id) => format!("Edit {} #{id}", table_title(&self.table)),
        }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.config.name == name)
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused_field(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    pub fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
        self.suggestions.hide();
    }

    pub fn focus_prev(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
        self.suggestions.hide();
    }

    pub fn set_value(&mut self, name: &str, value: &str) -> bool {
        match self.fields.iter_mut().find(|field| field.config.name == name) {
            Some(field) => {
                field.value = value.to_owned();
                true
            }
            None => false,
        }
    }

    /// Replaces the focused value, e.g. with an accepted suggestion.
    pub fn set_focused_value(&mut self, value: &str) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value = value.to_owned();
        }
    }

    /// Types into the focused field. Characters the field type rejects are dropped.
    pub fn insert_char(&mut self, ch: char) -> bool {
        let Some(field) = self.fields.get_mut(self.focus) else {
            return false;
        };
        if !field.accepts(ch) {
            return false;
        }
        field.value.push(ch);
        true
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    pub fn clear_errors(&mut self) {
        for field in &mut self.fields {
            field.error = None;
        }
    }

    /// Marks blank mandatory fields and focuses the first one. True when
    /// nothing is missing.
    pub fn validate(&mut self) -> bool {
        self.clear_errors();
        let mut first_invalid = None;
        for (index, field) in self.fields.iter_mut().enumerate() {
            if field.config.mandatory && field.value.trim().is_empty() {
                field.error = Some(REQUIRED_MESSAGE.to_owned());
                first_invalid.get_or_insert(index);
            }
        }
        match first_invalid {
            Some(index) => {
                self.focus = index;
                false
            }
            None => true,
        }
    }

    pub fn invalid_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.error.is_some())
            .map(|field| field.config.name.as_str())
            .collect()
    }

    /// Places server field errors in the matching slots. Errors for unknown
    /// fields are returned so they can be surfaced some other way.
    pub fn apply_server_errors(&mut self, errors: &BTreeMap<String, String>) -> Vec<String> {
        self.clear_errors();
        let mut unmatched = Vec::new();
        let mut first = None;
        for (name, message) in errors {
            match self
                .fields
                .iter()
                .position(|field| field.config.name == *name)
            {
                Some(index) => {
                    self.fields[index].error = Some(message.clone());
                    first = Some(first.map_or(index, |current: usize| current.min(index)));
                }
                None => unmatched.push(format!("{name}: {message}")),
            }
        }
        if let Some(index) = first {
            self.focus = index;
        }
        unmatched
    }

    pub fn payload(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|field| (field.config.name.clone(), field.submitted_value()))
            .collect()
    }
}

/// Suggestion list with a keyboard cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Autocomplete {
    source: Vec<String>,
    matches: Vec<String>,
    selected: Option<usize>,
}

impl Autocomplete {
    pub fn set_source(&mut self, options: Vec<String>) {
        self.source = options;
    }

    /// Case-insensitive substring matches. A blank query hides the list.
    pub fn filter(&mut self, query: &str) {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            self.hide();
            return;
        }
        self.matches = self
            .source
            .iter()
            .filter(|option| option.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        self.selected = None;
    }

    /// Like [`filter`](Self::filter) but a blank query lists every option.
    pub fn browse(&mut self, query: &str) {
        if query.trim().is_empty() {
            self.matches = self.source.clone();
            self.selected = None;
        } else {
            self.filter(query);
        }
    }

    /// Shows results that were already filtered elsewhere.
    pub fn show(&mut self, matches: Vec<String>) {
        self.matches = matches;
        self.selected = None;
    }

    pub fn is_visible(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn select_next(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        let last = self.matches.len() - 1;
        self.selected = Some(self.selected.map_or(0, |index| (index + 1).min(last)));
    }

    /// Moving up from the first entry clears the selection.
    pub fn select_prev(&mut self) {
        self.selected = match self.selected {
            Some(0) | None => None,
            Some(index) => Some(index - 1),
        };
    }

    pub fn accept(&mut self) -> Option<String> {
        let choice = self
            .selected
            .and_then(|index| self.matches.get(index))
            .cloned()?;
        self.hide();
        Some(choice)
    }

    pub fn hide(&mut self) {
        self.matches.clear();
        self.selected = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRow {
    pub config: FieldConfig,
    pub operators: Vec<String>,
    operator: Option<usize>,
    pub value: String,
}

impl SearchRow {
    fn new(config: FieldConfig) -> Self {
        Self {
            operators: config.operators(),
            config,
            operator: None,
            value: String::new(),
        }
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator
            .and_then(|index| self.operators.get(index))
            .map(String::as_str)
    }

    pub fn set_operator(&mut self, operator: &str) -> bool {
        match self.operators.iter().position(|known| known == operator) {
            Some(index) => {
                self.operator = Some(index);
                true
            }
            None => false,
        }
    }

    /// Steps through the operators with an unset slot between the ends.
    pub fn cycle_operator(&mut self, delta: isize) {
        self.operator = cycle_index(self.operator, self.operators.len(), delta);
    }

    pub fn is_global_search(&self) -> bool {
        self.config.field_type == FieldType::Text && self.operator() == Some(GLOBAL_SEARCH_OPERATOR)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortRow {
    pub field: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortRow {
    fn spec(&self) -> Option<SortSpec> {
        Some(SortSpec {
            field: self.field.clone()?,
            direction: self.direction?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSlot {
    Operator(usize),
    Value(usize),
    SortField(usize),
    SortDirection(usize),
}

/// Search modal state: one operator and value per field plus two sort rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    table: String,
    rows: Vec<SearchRow>,
    sorts: [SortRow; MAX_SORTS],
    focus: usize,
    pub suggestions: Autocomplete,
}

impl SearchForm {
    pub fn new(table: &str, configs: &[FieldConfig]) -> Self {
        Self {
            table: table.to_owned(),
            rows: configs
                .iter()
                .filter(|config| !config.is_id())
                .cloned()
                .map(SearchRow::new)
                .collect(),
            sorts: Default::default(),
            focus: 0,
            suggestions: Autocomplete::default(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rows(&self) -> &[SearchRow] {
        &self.rows
    }

    pub fn sorts(&self) -> &[SortRow] {
        &self.sorts
    }

    fn slot_count(&self) -> usize {
        self.rows.len() * 2 + MAX_SORTS * 2
    }

    pub fn focused_slot(&self) -> SearchSlot {
        let row_slots = self.rows.len() * 2;
        if self.focus < row_slots {
            let row = self.focus / 2;
            if self.focus % 2 == 0 {
                SearchSlot::Operator(row)
            } else {
                SearchSlot::Value(row)
            }
        } else {
            let rest = self.focus - row_slots;
            let sort = rest / 2;
            if rest % 2 == 0 {
                SearchSlot::SortField(sort)
            } else {
                SearchSlot::SortDirection(sort)
            }
        }
    }

    pub fn focused_row(&self) -> Option<&SearchRow> {
        match self.focused_slot() {
            SearchSlot::Operator(row) | SearchSlot::Value(row) => self.rows.get(row),
            _ => None,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.slot_count();
        self.suggestions.hide();
    }

    pub fn focus_prev(&mut self) {
        let count = self.slot_count();
        self.focus = (self.focus + count - 1) % count;
        self.suggestions.hide();
    }

    /// Changes the selector under focus. Value slots are left alone.
    pub fn cycle(&mut self, delta: isize) {
        let field_names: Vec<String> = self
            .rows
            .iter()
            .map(|row| row.config.name.clone())
            .collect();
        match self.focused_slot() {
            SearchSlot::Operator(row) => {
                if let Some(row) = self.rows.get_mut(row) {
                    row.cycle_operator(delta);
                }
                self.suggestions.hide();
            }
            SearchSlot::Value(_) => {}
            SearchSlot::SortField(sort) => {
                let slot = &mut self.sorts[sort];
                let current = slot
                    .field
                    .as_ref()
                    .and_then(|field| field_names.iter().position(|name| name == field));
                slot.field = cycle_index(current, field_names.len(), delta)
                    .map(|index| field_names[index].clone());
            }
            SearchSlot::SortDirection(sort) => {
                const DIRECTIONS: [SortDirection; 2] = [SortDirection::Asc, SortDirection::Desc];
                let slot = &mut self.sorts[sort];
                let current = slot
                    .direction
                    .and_then(|direction| DIRECTIONS.iter().position(|known| *known == direction));
                slot.direction = cycle_index(current, DIRECTIONS.len(), delta).map(|index| DIRECTIONS[index]);
            }
        }
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let SearchSlot::Value(row) = self.focused_slot() else {
            return false;
        };
        match self.rows.get_mut(row) {
            Some(row) if !ch.is_control() => {
                row.value.push(ch);
                true
            }
            _ => false,
        }
    }

    pub fn backspace(&mut self) {
        if let SearchSlot::Value(row) = self.focused_slot()
            && let Some(row) = self.rows.get_mut(row)
        {
            row.value.pop();
        }
    }

    /// Overwrites the value under focus, e.g. with an accepted suggestion.
    pub fn set_focused_value(&mut self, value: &str) {
        if let SearchSlot::Value(row) = self.focused_slot()
            && let Some(row) = self.rows.get_mut(row)
        {
            row.value = value.to_owned();
        }
    }

    pub fn set_filter(&mut self, field: &str, operator: &str, value: &str) -> bool {
        let Some(row) = self.rows.iter_mut().find(|row| row.config.name == field) else {
            return false;
        };
        if !row.set_operator(operator) {
            return false;
        }
        row.value = value.to_owned();
        true
    }

    pub fn set_sort(&mut self, index: usize, field: &str, direction: SortDirection) -> bool {
        if index >= MAX_SORTS || !self.rows.iter().any(|row| row.config.name == field) {
            return false;
        }
        self.sorts[index] = SortRow {
            field: Some(field.to_owned()),
            direction: Some(direction),
        };
        true
    }

    fn filters(&self) -> BTreeMap<String, SearchFilter> {
        self.rows
            .iter()
            .filter_map(|row| {
                let operator = row.operator()?;
                let value = row.value.trim();
                if value.is_empty() {
                    return None;
                }
                Some((
                    row.config.name.clone(),
                    SearchFilter {
                        operator: operator.to_owned(),
                        value: value.to_owned(),
                    },
                ))
            })
            .collect()
    }

    fn sort_specs(&self) -> Vec<SortSpec> {
        self.sorts.iter().filter_map(SortRow::spec).collect()
    }

    /// Filters with both an operator and a value, and complete sort rows.
    pub fn collect(&self) -> SearchRequest {
        SearchRequest {
            filters: self.filters(),
            sort: self.sort_specs(),
        }
    }

    pub fn pattern_data(&self) -> SearchPatternData {
        SearchPatternData {
            filters: self.filters(),
            sorts: self.sort_specs(),
        }
    }

    /// Replaces the form contents with a saved pattern. Entries naming
    /// fields or operators this table does not have are skipped.
    pub fn apply_pattern(&mut self, data: &SearchPatternData) {
        self.reset();
        for (field, filter) in &data.filters {
            if !self.set_filter(field, &filter.operator, &filter.value) {
                log::debug!("search pattern filter on {field:?} does not apply to {}", self.table);
            }
        }
        for (index, sort) in data.sorts.iter().take(MAX_SORTS).enumerate() {
            if !self.set_sort(index, &sort.field, sort.direction) {
                log::debug!("search pattern sort on {:?} does not apply to {}", sort.field, self.table);
            }
        }
    }

    pub fn reset(&mut self) {
        for row in &mut self.rows {
            row.operator = None;
            row.value.clear();
        }
        self.sorts = Default::default();
        self.suggestions.hide();
    }
}

fn cycle_index(current: Option<usize>, len: usize, delta: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    // Position 0 is "unset"; 1..=len map to entries.
    let span = len as isize + 1;
    let position = current.map_or(0, |index| index as isize + 1);
    let next = (position + delta).rem_euclid(span);
    if next == 0 { None } else { Some(next as usize - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> Vec<FieldConfig> {
        vec![
            FieldConfig::new("id", "ID", FieldType::Number),
            FieldConfig::new("name", "Name", FieldType::Text)
                .mandatory()
                .with_operators("Contains,Equals,GSearch"),
            FieldConfig::new("age", "Age", FieldType::Number).with_operators("Equals,Greater"),
            FieldConfig::new("birthday", "Birthday", FieldType::Date).mandatory(),
            FieldConfig::new("Job", "Job", FieldType::Select),
        ]
    }

    #[test]
    fn create_form_skips_id() {
        let form = RecordForm::create("customers", &configs());
        let names: Vec<&str> = form
            .fields()
            .iter()
            .map(|field| field.config.name.as_str())
            .collect();
        assert_eq!(names, vec!["name", "age", "birthday", "Job"]);
        assert_eq!(form.title(), "New Customers");
    }

    #[test]
    fn blank_mandatory_field_is_the_only_error() {
        let mut form = RecordForm::create("customers", &configs());
        form.set_value("name", "   ");
        form.set_value("birthday", "2000-01-01");
        assert!(!form.validate());
        assert_eq!(form.invalid_fields(), vec!["name"]);
        assert_eq!(
            form.field("name").and_then(|field| field.error.clone()),
            Some(REQUIRED_MESSAGE.to_owned()),
        );
        assert_eq!(form.focus(), 0);

        form.set_value("name", "Ada");
        assert!(form.validate());
        assert!(form.invalid_fields().is_empty());
    }

    #[test]
    fn first_invalid_field_gets_focus() {
        let mut form = RecordForm::create("customers", &configs());
        form.set_value("name", "Ada");
        form.focus_next();
        assert!(!form.validate());
        assert_eq!(
            form.focused_field().map(|field| field.config.name.as_str()),
            Some("birthday"),
        );
    }

    #[test]
    fn edit_prefills_and_trims_choice_values() -> Result<()> {
        let record = Record::new(9)
            .with("name", "Ada")
            .with("age", 36)
            .with("Job", "  pilot ");
        let form = RecordForm::edit("customers", &configs(), &record)?;
        assert_eq!(form.mode(), FormMode::Edit(RecordId::new(9)));
        let payload = form.payload();
        assert_eq!(payload.get("age").map(String::as_str), Some("36"));
        assert_eq!(payload.get("Job").map(String::as_str), Some("pilot"));
        assert!(!payload.contains_key("id"));
        assert!(RecordForm::edit("customers", &configs(), &Record::default()).is_err());
        Ok(())
    }

    #[test]
    fn number_fields_reject_letters() {
        let mut form = RecordForm::create("customers", &configs());
        form.focus_next();
        assert!(form.insert_char('4'));
        assert!(!form.insert_char('x'));
        assert!(form.insert_char('2'));
        assert_eq!(form.field("age").map(|field| field.value.as_str()), Some("42"));
        form.backspace();
        assert_eq!(form.field("age").map(|field| field.value.as_str()), Some("4"));
    }

    #[test]
    fn server_errors_fill_matching_slots() {
        let mut form = RecordForm::create("customers", &configs());
        let errors = BTreeMap::from([
            ("birthday".to_owned(), "Enter a valid date.".to_owned()),
            ("__all__".to_owned(), "Duplicate".to_owned()),
        ]);
        let unmatched = form.apply_server_errors(&errors);
        assert_eq!(form.invalid_fields(), vec!["birthday"]);
        assert_eq!(unmatched, vec!["__all__: Duplicate".to_owned()]);
        assert_eq!(form.focus(), 2);
    }

    #[test]
    fn autocomplete_field_matches_case_insensitively() {
        let form = RecordForm::create("customers", &configs());
        assert!(form.field("Job").is_some_and(FormField::has_autocomplete));
        assert!(!form.field("name").is_some_and(FormField::has_autocomplete));
    }

    #[test]
    fn autocomplete_navigation() {
        let mut list = Autocomplete::default();
        list.set_source(vec![
            "Pilot".to_owned(),
            "Copilot".to_owned(),
            "Chef".to_owned(),
        ]);
        list.filter("PIL");
        assert_eq!(list.matches(), ["Pilot".to_owned(), "Copilot".to_owned()]);

        list.select_next();
        list.select_next();
        list.select_next();
        assert_eq!(list.selected(), Some(1));
        list.select_prev();
        list.select_prev();
        assert_eq!(list.selected(), None);
        assert_eq!(list.accept(), None);

        list.select_next();
        assert_eq!(list.accept(), Some("Pilot".to_owned()));
        assert!(!list.is_visible());

        list.filter("  ");
        assert!(!list.is_visible());
        list.browse("");
        assert_eq!(list.matches().len(), 3);
    }

    #[test]
    fn search_collects_complete_entries_only() {
        let mut form = SearchForm::new("customers", &configs());
        assert!(form.set_filter("name", "Contains", " ad "));
        assert!(form.set_filter("age", "Greater", ""));
        assert!(!form.set_filter("age", "Bogus", "3"));
        assert!(form.set_sort(0, "age", SortDirection::Desc));
        form.sorts[1].field = Some("name".to_owned());

        let request = form.collect();
        assert_eq!(request.filters.len(), 1);
        assert_eq!(
            request.filters.get("name"),
            Some(&SearchFilter {
                operator: "Contains".to_owned(),
                value: "ad".to_owned(),
            }),
        );
        assert_eq!(
            request.sort,
            vec![SortSpec {
                field: "age".to_owned(),
                direction: SortDirection::Desc,
            }],
        );

        form.reset();
        assert_eq!(form.collect(), SearchRequest::default());
    }

    #[test]
    fn gsearch_operator_marks_global_search() {
        let mut form = SearchForm::new("customers", &configs());
        assert!(form.set_filter("name", GLOBAL_SEARCH_OPERATOR, "a"));
        assert!(form.rows()[0].is_global_search());
        assert!(!form.rows()[1].is_global_search());
    }

    #[test]
    fn focus_walks_operator_value_and_sort_slots() {
        let mut form = SearchForm::new("customers", &configs());
        assert_eq!(form.focused_slot(), SearchSlot::Operator(0));
        form.cycle(1);
        assert_eq!(form.rows()[0].operator(), Some("Contains"));
        form.cycle(-1);
        assert_eq!(form.rows()[0].operator(), None);
        form.cycle(-1);
        assert_eq!(form.rows()[0].operator(), Some("GSearch"));

        form.focus_next();
        assert_eq!(form.focused_slot(), SearchSlot::Value(0));
        assert!(form.insert_char('x'));

        for _ in 0..7 {
            form.focus_next();
        }
        assert_eq!(form.focused_slot(), SearchSlot::SortField(0));
        form.cycle(1);
        form.focus_next();
        form.cycle(1);
        assert_eq!(
            form.sorts()[0],
            SortRow {
                field: Some("name".to_owned()),
                direction: Some(SortDirection::Asc),
            },
        );
        form.focus_prev();
        form.focus_prev();
        assert_eq!(form.focused_slot(), SearchSlot::Value(3));
    }

    #[test]
    fn patterns_round_trip_through_the_form() {
        let mut form = SearchForm::new("customers", &configs());
        form.set_filter("age", "Equals", "36");
        form.set_sort(0, "name", SortDirection::Asc);
        let data = form.pattern_data();

        let mut other = SearchForm::new("customers", &configs());
        other.set_filter("name", "Contains", "zz");
        other.apply_pattern(&data);
        assert_eq!(other.pattern_data(), data);
        assert_eq!(other.rows()[0].operator(), None);
    }
}
