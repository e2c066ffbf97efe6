// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};

use crate::columns::{ColumnManagers, reconcile_order};
use crate::format::format_date_ymd_to_mdy;
use crate::ids::RecordId;
use crate::interaction::{
    ColumnInteraction, ColumnMove, DEFAULT_COLUMN_WIDTH, DropPlacement, DropTarget, HeaderSpan,
    apply_column_move, clamp_width,
};
use crate::model::{
    ColumnSort, FieldConfig, FieldType, GridColumn, GridLayoutData, GridPage, ID_FIELD, Record,
    SortDirection,
};
use crate::restore::{RestoreCoordinator, RestoreReport, RestoreStep, RestoreTarget};
use crate::sort::sort_records;
use crate::storage::LayoutStorage;

/// Live column layout of one grid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnLayoutState {
    /// `None` means every column is visible.
    pub visible_columns: Option<BTreeSet<String>>,
    pub column_order: Vec<String>,
    pub column_widths: BTreeMap<String, u32>,
    pub column_sort: Option<ColumnSort>,
}

/// Emitted by [`GridInstance::render_page`] once rows and headers are in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridReady {
    pub table: String,
    pub row_count: usize,
}

/// One rendered table with its own column managers, gesture state and
/// restore queue.
#[derive(Debug, Clone)]
pub struct GridInstance {
    table: String,
    fields: Vec<FieldConfig>,
    columns: Vec<GridColumn>,
    rows: Vec<Record>,
    total_count: u64,
    layout: ColumnLayoutState,
    selection: BTreeSet<RecordId>,
    interaction: ColumnInteraction,
    managers: ColumnManagers,
    restore: RestoreCoordinator,
}

impl GridInstance {
    pub fn new(table: &str) -> Self {
        let mut restore = RestoreCoordinator::new();
        restore.arm();
        Self {
            table: table.to_owned(),
            fields: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            total_count: 0,
            layout: ColumnLayoutState::default(),
            selection: BTreeSet::new(),
            interaction: ColumnInteraction::new(),
            managers: ColumnManagers::new(table),
            restore,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Rebinds the grid to another table and forgets everything rendered.
    pub fn set_table(&mut self, table: &str) {
        self.table = table.to_owned();
        self.managers.set_table(table);
        self.fields.clear();
        self.columns.clear();
        self.rows.clear();
        self.total_count = 0;
        self.layout = ColumnLayoutState::default();
        self.selection.clear();
        self.interaction.cancel();
        self.restore.arm();
    }

    pub fn set_fields(&mut self, fields: Vec<FieldConfig>) {
        self.fields = fields;
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn render_page(&mut self, page: GridPage) -> GridReady {
        self.columns = page
            .columns
            .into_iter()
            .filter(|column| column.field != ID_FIELD)
            .collect();
        self.total_count = page.total_count.unwrap_or(page.rows.len() as u64);
        self.rows = page.rows;
        self.selection.clear();
        self.interaction.cancel();
        self.restore.arm();
        GridReady {
            table: self.table.clone(),
            row_count: self.rows.len(),
        }
    }

    /// Runs whatever restoration is armed against persisted state.
    pub fn on_grid_ready(&mut self, storage: &mut dyn LayoutStorage) -> Option<RestoreReport> {
        // The coordinator steps aside while the restore borrows the grid.
        let mut restore = std::mem::take(&mut self.restore);
        let report = restore.on_grid_ready(&mut GridRestore {
            grid: self,
            storage,
        });
        self.restore = restore;
        report
    }

    pub fn restore_pending(&self) -> bool {
        self.restore.is_armed()
    }

    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn layout(&self) -> &ColumnLayoutState {
        &self.layout
    }

    pub fn interaction(&self) -> &ColumnInteraction {
        &self.interaction
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.field == name)
    }

    fn schema_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.field.clone())
            .collect()
    }

    pub fn effective_order(&self) -> Vec<String> {
        reconcile_order(&self.layout.column_order, &self.schema_names())
    }

    pub fn is_visible(&self, name: &str) -> bool {
        self.layout
            .visible_columns
            .as_ref()
            .is_none_or(|visible| visible.contains(name))
    }

    /// Visible columns in effective order.
    pub fn visible_columns(&self) -> Vec<&GridColumn> {
        self.effective_order()
            .iter()
            .filter(|name| self.is_visible(name))
            .filter_map(|name| self.columns.iter().find(|column| column.field == **name))
            .collect()
    }

    pub fn column_width(&self, name: &str) -> u32 {
        self.layout
            .column_widths
            .get(name)
            .copied()
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    /// Header extents in pixels, laid out left to right from `origin`.
    pub fn header_spans(&self, origin: i32, gap: u32) -> Vec<HeaderSpan> {
        let mut left = origin;
        self.visible_columns()
            .into_iter()
            .map(|column| {
                let width = self.column_width(&column.field);
                let span = HeaderSpan::new(&column.field, left, width);
                let step = i32::try_from(width.saturating_add(gap)).unwrap_or(i32::MAX);
                left = left.saturating_add(step);
                span
            })
            .collect()
    }

    /// Cell text as displayed. Date columns render as `MM/DD/YYYY`.
    pub fn display_text(&self, row: &Record, field: &str) -> String {
        let raw = row.text(field);
        match self.field(field) {
            Some(config) if config.field_type == FieldType::Date => format_date_ymd_to_mdy(&raw),
            _ => raw,
        }
    }

    pub fn begin_resize(&mut self, column: &str, x: i32) -> bool {
        if !self.has_column(column) {
            return false;
        }
        let width = self.column_width(column);
        self.interaction.begin_resize(column, x, width)
    }

    pub fn resize_to(&mut self, x: i32) -> Option<u32> {
        let (column, width) = self.interaction.resize_to(x)?;
        self.layout.column_widths.insert(column, width);
        Some(width)
    }

    /// Ends a resize and persists the width of every column.
    pub fn finish_resize(&mut self, storage: &mut dyn LayoutStorage) -> Result<Option<u32>> {
        let Some((column, width)) = self.interaction.finish_resize() else {
            return Ok(None);
        };
        self.layout.column_widths.insert(column, width);
        self.save_widths(storage)?;
        Ok(Some(width))
    }

    /// Keyboard resize: one complete gesture by `delta` pixels.
    pub fn resize_column_by(
        &mut self,
        storage: &mut dyn LayoutStorage,
        column: &str,
        delta: i32,
    ) -> Result<Option<u32>> {
        if !self.begin_resize(column, 0) {
            return Ok(None);
        }
        self.resize_to(delta);
        self.finish_resize(storage)
    }

    fn save_widths(&mut self, storage: &mut dyn LayoutStorage) -> Result<()> {
        let widths: BTreeMap<String, u32> = self
            .columns
            .iter()
            .map(|column| (column.field.clone(), self.column_width(&column.field)))
            .collect();
        self.managers.resizer.save(storage, &widths)?;
        self.layout.column_widths = widths;
        Ok(())
    }

    pub fn begin_drag(&mut self, column: &str, x: i32) -> bool {
        self.has_column(column) && self.interaction.begin_drag(column, x)
    }

    pub fn drag_to(&mut self, x: i32) -> bool {
        self.interaction.drag_to(x)
    }

    /// Ends a drag. A drop with no target leaves the order untouched.
    pub fn finish_drag(
        &mut self,
        storage: &mut dyn LayoutStorage,
        headers: &[HeaderSpan],
    ) -> Result<Option<ColumnMove>> {
        let Some(column_move) = self.interaction.finish_drag(headers) else {
            return Ok(None);
        };
        self.apply_move(storage, &column_move)?;
        Ok(Some(column_move))
    }

    pub fn cancel_interaction(&mut self) {
        self.interaction.cancel();
    }

    /// Keyboard reorder: swaps `column` with its visible neighbour.
    pub fn move_column(
        &mut self,
        storage: &mut dyn LayoutStorage,
        column: &str,
        offset: isize,
    ) -> Result<bool> {
        if !self.interaction.is_idle() {
            return Ok(false);
        }
        let visible: Vec<String> = self
            .visible_columns()
            .iter()
            .map(|column| column.field.clone())
            .collect();
        let Some(index) = visible.iter().position(|name| name == column) else {
            return Ok(false);
        };
        let target = index as isize + offset;
        if offset == 0 || target < 0 || target >= visible.len() as isize {
            return Ok(false);
        }
        let placement = if offset < 0 {
            DropPlacement::Before
        } else {
            DropPlacement::After
        };
        let column_move = ColumnMove {
            source: column.to_owned(),
            target: DropTarget {
                column: visible[target as usize].clone(),
                placement,
            },
        };
        self.apply_move(storage, &column_move)?;
        Ok(true)
    }

    fn apply_move(&mut self, storage: &mut dyn LayoutStorage, column_move: &ColumnMove) -> Result<()> {
        let order = apply_column_move(&self.effective_order(), column_move);
        self.managers.dragger.save(storage, &order)?;
        self.layout.column_order = order;
        Ok(())
    }

    /// Applies and persists a visibility set, then re-saves the order.
    pub fn set_visible_columns(
        &mut self,
        storage: &mut dyn LayoutStorage,
        visible: BTreeSet<String>,
    ) -> Result<()> {
        let visible: BTreeSet<String> = visible
            .into_iter()
            .filter(|name| self.has_column(name))
            .collect();
        if visible.is_empty() {
            bail!("no columns selected -- keep at least one column visible");
        }
        self.managers.visibility.save(storage, &visible)?;
        self.layout.visible_columns = Some(visible);
        let order = self.effective_order();
        self.managers.dragger.save(storage, &order)?;
        self.layout.column_order = order;
        Ok(())
    }

    pub fn reset_visibility(&mut self, storage: &mut dyn LayoutStorage) -> Result<()> {
        self.managers.visibility.reset(storage)?;
        self.layout.visible_columns = None;
        Ok(())
    }

    pub fn sort_by(
        &mut self,
        storage: &mut dyn LayoutStorage,
        column: &str,
        direction: SortDirection,
    ) -> Result<()> {
        if !self.has_column(column) {
            bail!("unknown column {column:?} -- pick a column shown in the grid");
        }
        let sort = ColumnSort {
            column: column.to_owned(),
            direction,
        };
        self.managers.sorter.save(storage, &sort)?;
        self.layout.column_sort = Some(sort);
        self.apply_sort();
        Ok(())
    }

    /// Ascending on a new column, flipped on the current one.
    pub fn toggle_sort(&mut self, storage: &mut dyn LayoutStorage, column: &str) -> Result<SortDirection> {
        let direction = match &self.layout.column_sort {
            Some(sort) if sort.column == column => sort.direction.toggled(),
            _ => SortDirection::Asc,
        };
        self.sort_by(storage, column, direction)?;
        Ok(direction)
    }

    pub fn clear_sort(&mut self, storage: &mut dyn LayoutStorage) -> Result<()> {
        self.managers.sorter.reset(storage)?;
        self.layout.column_sort = None;
        Ok(())
    }

    fn apply_sort(&mut self) {
        let Some(sort) = self.layout.column_sort.clone() else {
            return;
        };
        if !self.has_column(&sort.column) {
            return;
        }
        sort_records(&mut self.rows, &sort.column, sort.direction);
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.selection.contains(&id)
    }

    pub fn toggle_selected(&mut self, id: RecordId) -> bool {
        if !self.rows.iter().any(|row| row.id == Some(id)) {
            return false;
        }
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        self.selection.contains(&id)
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        self.selection = if selected {
            self.rows.iter().filter_map(|row| row.id).collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn all_selected(&self) -> bool {
        let ids: Vec<RecordId> = self.rows.iter().filter_map(|row| row.id).collect();
        !ids.is_empty() && ids.iter().all(|id| self.selection.contains(id))
    }

    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.selection.iter().copied().collect()
    }

    /// Drops deleted rows and lowers the total by the deleted count.
    pub fn remove_records(&mut self, deleted: &[RecordId]) -> usize {
        let deleted: BTreeSet<RecordId> = deleted.iter().copied().collect();
        let before = self.rows.len();
        self.rows
            .retain(|row| row.id.is_none_or(|id| !deleted.contains(&id)));
        for id in &deleted {
            self.selection.remove(id);
        }
        self.total_count = self.total_count.saturating_sub(deleted.len() as u64);
        before - self.rows.len()
    }

    /// Snapshot of the live layout as a saveable bundle.
    pub fn layout_data(&self) -> GridLayoutData {
        let order = self.effective_order();
        let column_visibility = order
            .iter()
            .filter(|name| self.is_visible(name))
            .cloned()
            .collect();
        let column_widths = self
            .columns
            .iter()
            .map(|column| (column.field.clone(), self.column_width(&column.field)))
            .collect();
        GridLayoutData {
            column_visibility,
            column_widths,
            column_order: order,
            sort_state: self.layout.column_sort.clone(),
        }
    }

    /// Persists every slice of a loaded layout and arms a restore.
    pub fn apply_layout_data(
        &mut self,
        storage: &mut dyn LayoutStorage,
        data: &GridLayoutData,
    ) -> Result<()> {
        let managers = &self.managers;
        if data.column_visibility.is_empty() {
            managers.visibility.reset(storage)?;
        } else {
            let visible: BTreeSet<String> = data.column_visibility.iter().cloned().collect();
            managers.visibility.save(storage, &visible)?;
        }

        if data.column_widths.is_empty() {
            managers.resizer.reset(storage)?;
        } else {
            let widths: BTreeMap<String, u32> = data
                .column_widths
                .iter()
                .map(|(name, width)| (name.clone(), clamp_width(i64::from(*width))))
                .collect();
            managers.resizer.save(storage, &widths)?;
        }

        if data.column_order.is_empty() {
            managers.dragger.reset(storage)?;
        } else {
            managers.dragger.save(storage, &data.column_order)?;
        }

        match &data.sort_state {
            Some(sort) => managers.sorter.save(storage, sort)?,
            None => managers.sorter.reset(storage)?,
        }

        self.restore.arm();
        Ok(())
    }

    /// Forgets every persisted slice for this table.
    pub fn reset_layout(&mut self, storage: &mut dyn LayoutStorage) -> Result<()> {
        self.managers.reset_all(storage)?;
        self.layout = ColumnLayoutState::default();
        Ok(())
    }
}

struct GridRestore<'a> {
    grid: &'a mut GridInstance,
    storage: &'a mut dyn LayoutStorage,
}

impl RestoreTarget for GridRestore<'_> {
    fn restore_step(&mut self, step: RestoreStep) -> Result<()> {
        let grid = &mut *self.grid;
        let storage = &*self.storage;
        match step {
            RestoreStep::Order => {
                let schema = grid.schema_names();
                grid.layout.column_order = grid
                    .managers
                    .dragger
                    .load(storage, &schema)?
                    .unwrap_or_default();
            }
            RestoreStep::Widths => {
                grid.layout.column_widths = grid.managers.resizer.load(storage)?;
            }
            RestoreStep::Visibility => {
                let saved = grid.managers.visibility.load(storage)?;
                grid.layout.visible_columns = saved
                    .map(|names| {
                        names
                            .into_iter()
                            .filter(|name| grid.has_column(name))
                            .collect::<BTreeSet<_>>()
                    })
                    .filter(|names| !names.is_empty());
            }
            RestoreStep::Sort => {
                grid.layout.column_sort = grid.managers.sorter.load(storage)?;
                grid.apply_sort();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::MAX_COLUMN_WIDTH;
    use crate::storage::{LayoutSlice, MemoryLayoutStorage};
    use anyhow::anyhow;

    fn page() -> GridPage {
        GridPage {
            columns: vec![
                GridColumn::new("ID", "id"),
                GridColumn::new("Name", "name"),
                GridColumn::new("Age", "age"),
                GridColumn::new("Birthday", "birthday"),
                GridColumn::new("Job", "job"),
            ],
            rows: (1..=5)
                .map(|id| {
                    Record::new(id)
                        .with("name", format!("person {id}"))
                        .with("age", format!("{}", 20 + id))
                        .with("birthday", format!("2000-01-0{id}"))
                        .with("job", "pilot")
                })
                .collect(),
            total_count: Some(5),
        }
    }

    fn grid() -> GridInstance {
        let mut grid = GridInstance::new("customers");
        grid.set_fields(vec![
            FieldConfig::new("name", "Name", FieldType::Text).mandatory(),
            FieldConfig::new("age", "Age", FieldType::Number),
            FieldConfig::new("birthday", "Birthday", FieldType::Date),
            FieldConfig::new("job", "Job", FieldType::Text),
        ]);
        grid.render_page(page());
        grid
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn visible(grid: &GridInstance) -> Vec<String> {
        grid.visible_columns()
            .iter()
            .map(|column| column.field.clone())
            .collect()
    }

    #[test]
    fn render_drops_id_column_and_fires_ready() {
        let mut grid = GridInstance::new("customers");
        let ready = grid.render_page(page());
        assert_eq!(
            ready,
            GridReady {
                table: "customers".to_owned(),
                row_count: 5,
            },
        );
        assert_eq!(visible(&grid), names(&["name", "age", "birthday", "job"]));
        assert!(grid.restore_pending());
    }

    #[test]
    fn date_columns_display_as_mdy() {
        let grid = grid();
        let row = &grid.rows()[0];
        assert_eq!(grid.display_text(row, "birthday"), "01/01/2000");
        assert_eq!(grid.display_text(row, "age"), "21");
    }

    #[test]
    fn restore_reapplies_persisted_slices() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        storage.put_raw(
            &LayoutSlice::ColumnOrder.key("customers"),
            r#"["job","ghost","age"]"#,
        )?;
        storage.put_raw(
            &LayoutSlice::ColumnWidths.key("customers"),
            r#"{"name": 220}"#,
        )?;
        storage.put_raw(
            &LayoutSlice::VisibleColumns.key("customers"),
            r#"["job","age","name"]"#,
        )?;
        storage.put_raw(
            &LayoutSlice::ColumnSort.key("customers"),
            r#"{"column":"age","direction":"desc"}"#,
        )?;

        let mut grid = grid();
        let report = grid.on_grid_ready(&mut storage);
        assert!(report.is_some_and(|report| report.is_clean()));
        assert_eq!(visible(&grid), names(&["job", "age", "name"]));
        assert_eq!(grid.column_width("name"), 220);
        assert_eq!(grid.column_width("age"), DEFAULT_COLUMN_WIDTH);
        let first = grid.rows().first().and_then(|row| row.id);
        assert_eq!(first, Some(RecordId::new(5)));
        assert_eq!(grid.on_grid_ready(&mut storage), None);
        Ok(())
    }

    #[test]
    fn oversized_saved_width_keeps_headers_ordered() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        storage.put_raw(
            &LayoutSlice::ColumnWidths.key("customers"),
            r#"{"name": "5000000000px", "age": 9e12}"#,
        )?;
        let mut grid = grid();
        grid.on_grid_ready(&mut storage);
        assert_eq!(grid.column_width("name"), MAX_COLUMN_WIDTH);
        assert_eq!(grid.column_width("age"), MAX_COLUMN_WIDTH);

        let spans = grid.header_spans(0, 10);
        for pair in spans.windows(2) {
            assert!(pair[1].left > pair[0].left, "{spans:?}");
            assert_eq!(pair[1].left, pair[0].right() + 10);
        }
        Ok(())
    }

    #[test]
    fn ready_signal_runs_restore_once_per_render() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        assert!(grid.restore_pending());
        assert!(grid.on_grid_ready(&mut storage).is_some());
        assert!(!grid.restore_pending());
        assert_eq!(grid.on_grid_ready(&mut storage), None);

        storage.put_raw(&LayoutSlice::ColumnOrder.key("customers"), r#"["job"]"#)?;
        grid.render_page(page());
        let report = grid.on_grid_ready(&mut storage);
        assert!(report.is_some_and(|report| report.completed.len() == 4));
        assert_eq!(visible(&grid), names(&["job", "name", "age", "birthday"]));
        Ok(())
    }

    struct FailingStorage;

    impl LayoutStorage for FailingStorage {
        fn get_raw(&self, key: &str) -> Result<Option<String>> {
            if key.starts_with("grid_column_widths_") {
                return Err(anyhow!("disk gone"));
            }
            Ok(None)
        }

        fn put_raw(&mut self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }

        fn remove_raw(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn restore_failure_is_isolated() {
        let mut grid = grid();
        let Some(report) = grid.on_grid_ready(&mut FailingStorage) else {
            panic!("render arms a restore");
        };
        assert_eq!(
            report.completed,
            vec![RestoreStep::Order, RestoreStep::Visibility, RestoreStep::Sort],
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, RestoreStep::Widths);
    }

    #[test]
    fn resize_clamps_and_persists_every_width() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        assert!(grid.begin_resize("age", 300));
        assert_eq!(grid.resize_to(100), Some(100));
        assert_eq!(grid.finish_resize(&mut storage)?, Some(100));

        let saved = storage
            .get_raw(&LayoutSlice::ColumnWidths.key("customers"))?
            .unwrap_or_default();
        let widths: BTreeMap<String, u32> = serde_json::from_str(&saved)?;
        assert_eq!(widths.len(), 4);
        assert_eq!(widths.get("age"), Some(&100));
        assert_eq!(widths.get("name"), Some(&DEFAULT_COLUMN_WIDTH));
        Ok(())
    }

    #[test]
    fn resize_blocked_while_dragging() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        assert!(grid.begin_drag("name", 10));
        assert!(!grid.begin_resize("age", 200));
        assert_eq!(grid.resize_column_by(&mut storage, "age", 20)?, None);
        grid.cancel_interaction();
        assert_eq!(grid.resize_column_by(&mut storage, "age", 20)?, Some(170));
        Ok(())
    }

    #[test]
    fn drag_reorders_and_persists() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        let spans = grid.header_spans(0, 0);
        assert!(grid.begin_drag("name", 10));
        assert!(grid.drag_to(560));
        assert!(grid.finish_drag(&mut storage, &spans)?.is_some());
        assert_eq!(visible(&grid), names(&["age", "birthday", "job", "name"]));

        let mut fresh = GridInstance::new("customers");
        fresh.render_page(page());
        fresh.on_grid_ready(&mut storage);
        assert_eq!(visible(&fresh), names(&["age", "birthday", "job", "name"]));
        Ok(())
    }

    #[test]
    fn keyboard_move_swaps_neighbours() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        assert!(grid.move_column(&mut storage, "age", -1)?);
        assert_eq!(visible(&grid), names(&["age", "name", "birthday", "job"]));
        assert!(!grid.move_column(&mut storage, "age", -1)?);
        assert!(grid.move_column(&mut storage, "age", 1)?);
        assert_eq!(visible(&grid), names(&["name", "age", "birthday", "job"]));
        Ok(())
    }

    #[test]
    fn visibility_apply_persists_set_and_order() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        let set: BTreeSet<String> = names(&["name", "job"]).into_iter().collect();
        grid.set_visible_columns(&mut storage, set)?;
        assert_eq!(visible(&grid), names(&["name", "job"]));
        assert!(storage
            .get_raw(&LayoutSlice::ColumnOrder.key("customers"))?
            .is_some());

        assert!(grid.set_visible_columns(&mut storage, BTreeSet::new()).is_err());
        grid.reset_visibility(&mut storage)?;
        assert_eq!(visible(&grid).len(), 4);
        Ok(())
    }

    #[test]
    fn sort_toggle_flips_direction() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        assert_eq!(grid.toggle_sort(&mut storage, "age")?, SortDirection::Asc);
        assert_eq!(grid.toggle_sort(&mut storage, "age")?, SortDirection::Desc);
        let first = grid.rows().first().and_then(|row| row.id);
        assert_eq!(first, Some(RecordId::new(5)));
        assert!(grid.sort_by(&mut storage, "ghost", SortDirection::Asc).is_err());
        grid.clear_sort(&mut storage)?;
        assert_eq!(grid.layout().column_sort, None);
        Ok(())
    }

    #[test]
    fn deleting_two_of_five_rows() {
        let mut grid = grid();
        grid.set_all_selected(true);
        assert!(grid.all_selected());

        let removed = grid.remove_records(&[RecordId::new(2), RecordId::new(3)]);
        assert_eq!(removed, 2);
        assert_eq!(grid.rows().len(), 3);
        assert_eq!(grid.total_count(), 3);
        assert_eq!(
            grid.selected_ids(),
            vec![RecordId::new(1), RecordId::new(4), RecordId::new(5)],
        );
    }

    #[test]
    fn repeated_deleted_ids_count_once() {
        let mut grid = grid();
        let removed = grid.remove_records(&[RecordId::new(2), RecordId::new(2)]);
        assert_eq!(removed, 1);
        assert_eq!(grid.rows().len(), 4);
        assert_eq!(grid.total_count(), 4);
    }

    #[test]
    fn total_never_goes_negative() {
        let mut grid = GridInstance::new("t");
        grid.render_page(GridPage {
            columns: vec![GridColumn::new("Name", "name")],
            rows: vec![Record::new(1)],
            total_count: Some(1),
        });
        grid.remove_records(&[RecordId::new(1), RecordId::new(9)]);
        assert_eq!(grid.total_count(), 0);
        assert!(grid.rows().is_empty());
    }

    #[test]
    fn toggling_selection_ignores_unknown_rows() {
        let mut grid = grid();
        assert!(grid.toggle_selected(RecordId::new(2)));
        assert!(grid.is_selected(RecordId::new(2)));
        assert!(!grid.toggle_selected(RecordId::new(2)));
        assert!(!grid.toggle_selected(RecordId::new(99)));
        assert!(!grid.all_selected());
    }

    #[test]
    fn layout_data_round_trips_through_a_fresh_grid() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut source = grid();
        source.move_column(&mut storage, "job", -3)?;
        source.resize_column_by(&mut storage, "name", 60)?;
        source.sort_by(&mut storage, "age", SortDirection::Desc)?;
        let data = source.layout_data();

        let mut other_storage = MemoryLayoutStorage::new();
        let mut target = grid();
        target.apply_layout_data(&mut other_storage, &data)?;
        target.on_grid_ready(&mut other_storage);
        assert_eq!(target.layout_data(), data);
        Ok(())
    }

    #[test]
    fn reset_layout_forgets_everything() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        grid.resize_column_by(&mut storage, "name", 40)?;
        grid.sort_by(&mut storage, "age", SortDirection::Asc)?;
        grid.reset_layout(&mut storage)?;
        assert!(storage.is_empty());
        assert_eq!(grid.layout(), &ColumnLayoutState::default());
        Ok(())
    }

    #[test]
    fn table_change_rebinds_managers() -> Result<()> {
        let mut storage = MemoryLayoutStorage::new();
        let mut grid = grid();
        grid.on_grid_ready(&mut storage);
        grid.resize_column_by(&mut storage, "name", 40)?;

        grid.set_table("orders");
        assert!(grid.columns().is_empty());
        assert!(grid.restore_pending());
        grid.render_page(page());
        grid.on_grid_ready(&mut storage);
        assert_eq!(grid.column_width("name"), DEFAULT_COLUMN_WIDTH);
        Ok(())
    }
}
