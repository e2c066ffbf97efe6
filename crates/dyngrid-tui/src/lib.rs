// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use dyngrid_app::{
    AppCommand, AppEvent, AppMode, AppState, Autocomplete, BundleId, BundleKind, BundlePayload,
    CreateOutcome, DeleteOutcome, FieldConfig, FormMode, GridColumn, GridInstance, GridPage,
    HeaderSpan, InteractionState, LayoutStorage, OPEN_TABS_KEY, Overlay, Record, RecordForm,
    RecordId, SavedBundle, SearchForm, SearchRequest, SearchSlot, SortDirection, TabSession,
    Toast, ToastKind, UpdateOutcome, find_by_name, resolve_default, save_json, table_title,
    validate_bundle_name,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

pub const DEFAULT_PX_PER_CELL: u32 = 10;
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(4);
const RESIZE_STEP_PX: i32 = 10;
const CHECKBOX_WIDTH: u16 = 3;
const COLUMN_SPACING: u16 = 1;
const EMPTY_GRID_TEXT: &str = "No data found.";
const NON_FIELD_ERRORS: &str = "__all__";

/// Everything the UI needs from the outside world: the backend API and
/// local layout persistence.
pub trait GridRuntime {
    fn load_fields(&mut self, table: &str) -> Result<Vec<FieldConfig>>;
    fn load_page(&mut self, table: &str) -> Result<GridPage>;
    fn search(&mut self, table: &str, request: &SearchRequest) -> Result<Option<GridPage>>;
    fn load_record(&mut self, table: &str, id: RecordId) -> Result<Record>;
    fn create_record(
        &mut self,
        table: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<CreateOutcome>;
    fn update_record(
        &mut self,
        table: &str,
        id: RecordId,
        data: &BTreeMap<String, String>,
    ) -> UpdateOutcome;
    fn delete_records(&mut self, table: &str, ids: &[RecordId]) -> Result<DeleteOutcome>;
    fn load_options(&mut self, table: &str, field: &str) -> Result<Vec<String>>;
    fn global_search(&mut self, table: &str, field: &str, query: &str) -> Result<Vec<String>>;
    fn list_bundles(
        &mut self,
        kind: BundleKind,
        table: &str,
    ) -> Result<Vec<SavedBundle<BundlePayload>>>;
    fn save_bundle(
        &mut self,
        table: &str,
        name: &str,
        payload: &BundlePayload,
        is_default: bool,
    ) -> Result<String>;
    fn load_bundle(&mut self, kind: BundleKind, table: &str, id: BundleId)
    -> Result<BundlePayload>;
    fn delete_bundle(&mut self, kind: BundleKind, table: &str, id: BundleId) -> Result<String>;
    fn set_default_bundle(&mut self, kind: BundleKind, table: &str, id: BundleId)
    -> Result<String>;
    fn storage(&mut self) -> &mut dyn LayoutStorage;
    fn save_session(&mut self, session: &TabSession) -> Result<()> {
        save_json(self.storage(), OPEN_TABS_KEY, session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    /// Pixel width of one terminal cell, used to map saved pixel widths
    /// onto the terminal grid.
    pub px_per_cell: u32,
    pub toast_duration: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            px_per_cell: DEFAULT_PX_PER_CELL,
            toast_duration: DEFAULT_TOAST_DURATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GridCursor {
    row: usize,
    col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnChoice {
    field: String,
    label: String,
    checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ColumnPickerUiState {
    choices: Vec<ColumnChoice>,
    cursor: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct NameInput {
    text: String,
    as_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BundleUiState {
    kind: BundleKind,
    entries: Vec<SavedBundle<BundlePayload>>,
    default_id: Option<BundleId>,
    cursor: usize,
    naming: Option<NameInput>,
}

impl Default for BundleUiState {
    fn default() -> Self {
        Self::new(BundleKind::Layout, Vec::new())
    }
}

impl BundleUiState {
    fn new(kind: BundleKind, entries: Vec<SavedBundle<BundlePayload>>) -> Self {
        let default_id = resolve_default(&entries).map(|bundle| bundle.id);
        Self {
            kind,
            entries,
            default_id,
            cursor: 0,
            naming: None,
        }
    }

    fn selected(&self) -> Option<&SavedBundle<BundlePayload>> {
        self.entries.get(self.cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSave {
    name: String,
    payload: BundlePayload,
    is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BundleRef {
    kind: BundleKind,
    id: BundleId,
    name: String,
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    options: UiOptions,
    grids: BTreeMap<String, GridInstance>,
    searches: BTreeMap<String, SearchForm>,
    option_cache: BTreeMap<(String, String), Vec<String>>,
    cursor: GridCursor,
    record_form: Option<RecordForm>,
    column_picker: ColumnPickerUiState,
    bundles: BundleUiState,
    pending_save: Option<PendingSave>,
    pending_delete: Vec<RecordId>,
    pending_bundle_delete: Option<BundleRef>,
    open_table_input: String,
    table_area: Rect,
    status_token: u64,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

pub fn run_app<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();

    start_session(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        match terminal.size() {
            Ok(size) => {
                let (_, body, _) = screen_layout(Rect::new(0, 0, size.width, size.height));
                view_data.table_area = body;
            }
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        }

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        match event::poll(Duration::from_millis(120)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(error) => {
                result = Err(error).context("poll event");
                break;
            }
        }
        match event::read() {
            Ok(Event::Key(key)) => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => {
                handle_mouse_event(state, runtime, &mut view_data, &internal_tx, mouse);
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error).context("read event");
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    toast: Toast,
) {
    match toast.kind {
        ToastKind::Danger => log::warn!("{}", toast.message),
        ToastKind::Success | ToastKind::Warning => log::info!("{}", toast.message),
    }
    state.dispatch(AppCommand::Notify(toast));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(
        internal_tx,
        view_data.status_token,
        view_data.options.toast_duration,
    );
}

/// Loads the first grid. A default tab layout only applies when nothing
/// beyond the initial tab was restored.
fn start_session<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.tabs.len() <= 1 {
        apply_default_tab_layout(state, runtime);
    }
    activate_table(state, runtime, view_data, internal_tx);
}

fn apply_default_tab_layout<R: GridRuntime>(state: &mut AppState, runtime: &mut R) {
    let table = state.active_table().to_owned();
    let layouts = match runtime.list_bundles(BundleKind::TabLayout, &table) {
        Ok(layouts) => layouts,
        Err(error) => {
            log::warn!("cannot list tab layouts: {error:#}");
            return;
        }
    };
    let Some(default) = resolve_default(&layouts) else {
        return;
    };
    match runtime.load_bundle(BundleKind::TabLayout, &table, default.id) {
        Ok(BundlePayload::TabLayout(data)) => {
            log::info!("applying default tab layout {:?}", default.name);
            state.dispatch(AppCommand::ApplyTabLayout(data));
        }
        Ok(other) => log::warn!(
            "default tab layout {} holds a {}",
            default.id,
            other.kind().as_str()
        ),
        Err(error) => log::warn!("cannot load default tab layout {}: {error:#}", default.id),
    }
}

fn activate_table<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    view_data.cursor = GridCursor::default();
    let table = state.active_table().to_owned();
    if !view_data.grids.contains_key(&table) {
        match open_grid(runtime, &table) {
            Ok(grid) => {
                view_data.grids.insert(table.clone(), grid);
            }
            Err(error) => emit_status(
                state,
                view_data,
                internal_tx,
                Toast::danger(format!("cannot load {table}: {error:#}")),
            ),
        }
    }
    persist_session(state, runtime);
}

fn open_grid<R: GridRuntime>(runtime: &mut R, table: &str) -> Result<GridInstance> {
    let mut grid = GridInstance::new(table);
    grid.set_fields(runtime.load_fields(table)?);
    let page = runtime.load_page(table)?;
    let ready = grid.render_page(page);
    log::debug!("{} ready with {} rows", ready.table, ready.row_count);
    apply_default_layout(runtime, &mut grid);
    settle_grid(runtime, &mut grid);
    Ok(grid)
}

fn apply_default_layout<R: GridRuntime>(runtime: &mut R, grid: &mut GridInstance) {
    let table = grid.table().to_owned();
    let layouts = match runtime.list_bundles(BundleKind::Layout, &table) {
        Ok(layouts) => layouts,
        Err(error) => {
            log::warn!("cannot list layouts for {table}: {error:#}");
            return;
        }
    };
    let Some(default) = resolve_default(&layouts) else {
        return;
    };
    match runtime.load_bundle(BundleKind::Layout, &table, default.id) {
        Ok(BundlePayload::Layout(data)) => {
            if let Err(error) = grid.apply_layout_data(runtime.storage(), &data) {
                log::warn!("cannot apply default layout {:?}: {error:#}", default.name);
            }
        }
        Ok(other) => log::warn!(
            "default layout {} holds a {}",
            default.id,
            other.kind().as_str()
        ),
        Err(error) => log::warn!("cannot load default layout {}: {error:#}", default.id),
    }
}

/// Fires the grid-ready signal: whatever restoration is armed runs now.
fn settle_grid<R: GridRuntime>(runtime: &mut R, grid: &mut GridInstance) {
    if let Some(report) = grid.on_grid_ready(runtime.storage()) {
        log::debug!(
            "{}: restored {} of {} layout steps",
            grid.table(),
            report.completed.len(),
            report.completed.len() + report.failed.len()
        );
    }
}

fn show_page<R: GridRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    table: &str,
    page: GridPage,
) {
    if let Some(grid) = view_data.grids.get_mut(table) {
        let ready = grid.render_page(page);
        log::debug!("{} ready with {} rows", ready.table, ready.row_count);
        settle_grid(runtime, grid);
    }
    clamp_cursor(view_data, table);
}

fn reload_active_grid<R: GridRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    let table = state.active_table().to_owned();
    let page = runtime
        .load_page(&table)
        .with_context(|| format!("reload {table}"))?;
    show_page(runtime, view_data, &table, page);
    Ok(())
}

fn persist_session<R: GridRuntime>(state: &AppState, runtime: &mut R) {
    if let Err(error) = runtime.save_session(&state.session()) {
        log::warn!("cannot save open tabs: {error:#}");
    }
}

fn dispatch_and_refresh<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    let tabs_changed = events
        .iter()
        .any(|event| matches!(event, AppEvent::TabsChanged));
    if tabs_changed {
        let open: BTreeSet<String> = state.tabs.iter().map(|tab| tab.tag.clone()).collect();
        view_data.grids.retain(|table, _| open.contains(table));
        view_data.searches.retain(|table, _| open.contains(table));
    }

    if events
        .iter()
        .any(|event| matches!(event, AppEvent::TableChanged(_)))
    {
        activate_table(state, runtime, view_data, internal_tx);
    } else if tabs_changed {
        persist_session(state, runtime);
    }

    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(
            internal_tx,
            view_data.status_token,
            view_data.options.toast_duration,
        );
    }
}

fn active_grid<'a>(state: &AppState, view_data: &'a ViewData) -> Option<&'a GridInstance> {
    view_data.grids.get(state.active_table())
}

fn with_active_grid<R: GridRuntime, T>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    action: impl FnOnce(&mut GridInstance, &mut dyn LayoutStorage) -> Result<T>,
) -> Option<Result<T>> {
    let grid = view_data.grids.get_mut(state.active_table())?;
    Some(action(grid, runtime.storage()))
}

fn cursor_column(state: &AppState, view_data: &ViewData) -> Option<String> {
    active_grid(state, view_data)?
        .visible_columns()
        .get(view_data.cursor.col)
        .map(|column| column.field.clone())
}

fn cursor_record_id(state: &AppState, view_data: &ViewData) -> Option<RecordId> {
    active_grid(state, view_data)?
        .rows()
        .get(view_data.cursor.row)?
        .id
}

fn clamp_cursor(view_data: &mut ViewData, table: &str) {
    let Some(grid) = view_data.grids.get(table) else {
        view_data.cursor = GridCursor::default();
        return;
    };
    let rows = grid.rows().len();
    let cols = grid.visible_columns().len();
    view_data.cursor.row = view_data.cursor.row.min(rows.saturating_sub(1));
    view_data.cursor.col = view_data.cursor.col.min(cols.saturating_sub(1));
}

fn move_cursor(view_data: &mut ViewData, table: &str, rows: isize, cols: isize) {
    view_data.cursor.row = view_data.cursor.row.saturating_add_signed(rows);
    view_data.cursor.col = view_data.cursor.col.saturating_add_signed(cols);
    clamp_cursor(view_data, table);
}

fn handle_key_event<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match state.mode {
        AppMode::Grid => {
            if let Some(command) = grid_command_for_key(key) {
                apply_grid_command(state, runtime, view_data, internal_tx, command);
            }
        }
        AppMode::Overlay(overlay) => {
            handle_overlay_key(state, runtime, view_data, internal_tx, overlay, key);
        }
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridCommand {
    MoveRow(isize),
    MoveCol(isize),
    FirstRow,
    LastRow,
    ToggleRow,
    ToggleAll,
    NewRecord,
    EditRecord,
    DeleteSelected,
    OpenSearch,
    ReloadGrid,
    ToggleSort,
    ClearSort,
    MoveColumn(isize),
    ResizeColumn(i32),
    OpenColumns,
    OpenBundles(BundleKind),
    OpenTable,
    CloseTab,
    NextTab,
    PrevTab,
    ResetLayout,
    Help,
}

fn grid_command_for_key(key: KeyEvent) -> Option<GridCommand> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('j') | KeyCode::Down => GridCommand::MoveRow(1),
        KeyCode::Char('k') | KeyCode::Up => GridCommand::MoveRow(-1),
        KeyCode::Char('h') | KeyCode::Left => GridCommand::MoveCol(-1),
        KeyCode::Char('l') | KeyCode::Right => GridCommand::MoveCol(1),
        KeyCode::Char('g') | KeyCode::Home => GridCommand::FirstRow,
        KeyCode::Char('G') | KeyCode::End => GridCommand::LastRow,
        KeyCode::Char(' ') => GridCommand::ToggleRow,
        KeyCode::Char('A') => GridCommand::ToggleAll,
        KeyCode::Char('a') => GridCommand::NewRecord,
        KeyCode::Char('e') | KeyCode::Enter => GridCommand::EditRecord,
        KeyCode::Char('d') | KeyCode::Delete => GridCommand::DeleteSelected,
        KeyCode::Char('/') => GridCommand::OpenSearch,
        KeyCode::Char('r') => GridCommand::ReloadGrid,
        KeyCode::Char('s') => GridCommand::ToggleSort,
        KeyCode::Char('S') => GridCommand::ClearSort,
        KeyCode::Char('<') => GridCommand::MoveColumn(-1),
        KeyCode::Char('>') => GridCommand::MoveColumn(1),
        KeyCode::Char('-') => GridCommand::ResizeColumn(-RESIZE_STEP_PX),
        KeyCode::Char('+' | '=') => GridCommand::ResizeColumn(RESIZE_STEP_PX),
        KeyCode::Char('c') => GridCommand::OpenColumns,
        KeyCode::Char('L') => GridCommand::OpenBundles(BundleKind::Layout),
        KeyCode::Char('P') => GridCommand::OpenBundles(BundleKind::SearchPattern),
        KeyCode::Char('T') => GridCommand::OpenBundles(BundleKind::TabLayout),
        KeyCode::Char('o') => GridCommand::OpenTable,
        KeyCode::Char('x') => GridCommand::CloseTab,
        KeyCode::Char('f') | KeyCode::Tab => GridCommand::NextTab,
        KeyCode::Char('b') | KeyCode::BackTab => GridCommand::PrevTab,
        KeyCode::Char('R') => GridCommand::ResetLayout,
        KeyCode::Char('?') => GridCommand::Help,
        _ => return None,
    };
    Some(command)
}

fn apply_grid_command<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: GridCommand,
) {
    let table = state.active_table().to_owned();
    match command {
        GridCommand::MoveRow(delta) => move_cursor(view_data, &table, delta, 0),
        GridCommand::MoveCol(delta) => move_cursor(view_data, &table, 0, delta),
        GridCommand::FirstRow => view_data.cursor.row = 0,
        GridCommand::LastRow => {
            view_data.cursor.row = usize::MAX;
            clamp_cursor(view_data, &table);
        }
        GridCommand::ToggleRow => {
            if let Some(id) = cursor_record_id(state, view_data)
                && let Some(grid) = view_data.grids.get_mut(&table)
            {
                grid.toggle_selected(id);
            }
        }
        GridCommand::ToggleAll => {
            if let Some(grid) = view_data.grids.get_mut(&table) {
                let all = grid.all_selected();
                grid.set_all_selected(!all);
            }
        }
        GridCommand::NewRecord => open_record_form(state, runtime, view_data, internal_tx, None),
        GridCommand::EditRecord => match cursor_record_id(state, view_data) {
            Some(id) => open_record_form(state, runtime, view_data, internal_tx, Some(id)),
            None => emit_status(
                state,
                view_data,
                internal_tx,
                Toast::warning("no record under the cursor"),
            ),
        },
        GridCommand::DeleteSelected => request_record_delete(state, view_data, internal_tx),
        GridCommand::OpenSearch => open_search(state, view_data),
        GridCommand::ReloadGrid => {
            let toast = match reload_active_grid(state, runtime, view_data) {
                Ok(()) => Toast::success("grid reloaded"),
                Err(error) => Toast::danger(format!("{error:#}")),
            };
            emit_status(state, view_data, internal_tx, toast);
        }
        GridCommand::ToggleSort => {
            let Some(column) = cursor_column(state, view_data) else {
                return;
            };
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.toggle_sort(storage, &column)
            });
            if let Some(result) = result {
                let toast = match result {
                    Ok(direction) => {
                        Toast::success(format!("sorted by {column} ({})", direction.as_str()))
                    }
                    Err(error) => Toast::danger(format!("{error:#}")),
                };
                emit_status(state, view_data, internal_tx, toast);
            }
        }
        GridCommand::ClearSort => {
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.clear_sort(storage)
            });
            if let Some(Err(error)) = result {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    Toast::danger(format!("{error:#}")),
                );
            }
        }
        GridCommand::MoveColumn(offset) => {
            let Some(column) = cursor_column(state, view_data) else {
                return;
            };
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.move_column(storage, &column, offset)
            });
            match result {
                Some(Ok(true)) => move_cursor(view_data, &table, 0, offset),
                Some(Err(error)) => emit_status(
                    state,
                    view_data,
                    internal_tx,
                    Toast::danger(format!("{error:#}")),
                ),
                Some(Ok(false)) | None => {}
            }
        }
        GridCommand::ResizeColumn(delta) => {
            let Some(column) = cursor_column(state, view_data) else {
                return;
            };
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.resize_column_by(storage, &column, delta)
            });
            if let Some(Err(error)) = result {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    Toast::danger(format!("{error:#}")),
                );
            }
        }
        GridCommand::OpenColumns => open_column_picker(state, view_data),
        GridCommand::OpenBundles(kind) => {
            open_bundle_overlay(state, runtime, view_data, internal_tx, kind);
        }
        GridCommand::OpenTable => {
            view_data.open_table_input.clear();
            state.dispatch(AppCommand::OpenOverlay(Overlay::OpenTable));
        }
        GridCommand::CloseTab => {
            dispatch_and_refresh(state, runtime, view_data, internal_tx, AppCommand::CloseTab);
        }
        GridCommand::NextTab => {
            dispatch_and_refresh(state, runtime, view_data, internal_tx, AppCommand::NextTab);
        }
        GridCommand::PrevTab => {
            dispatch_and_refresh(state, runtime, view_data, internal_tx, AppCommand::PrevTab);
        }
        GridCommand::ResetLayout => {
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.reset_layout(storage)
            });
            if let Some(result) = result {
                let toast = match result {
                    Ok(()) => Toast::success("layout reset"),
                    Err(error) => Toast::danger(format!("{error:#}")),
                };
                clamp_cursor(view_data, &table);
                emit_status(state, view_data, internal_tx, toast);
            }
        }
        GridCommand::Help => {
            state.dispatch(AppCommand::OpenOverlay(Overlay::Help));
        }
    }
}

fn handle_overlay_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    overlay: Overlay,
    key: KeyEvent,
) {
    match overlay {
        Overlay::RecordForm => handle_record_form_key(state, runtime, view_data, internal_tx, key),
        Overlay::Search => handle_search_key(state, runtime, view_data, internal_tx, key),
        Overlay::Columns => handle_columns_key(state, runtime, view_data, internal_tx, key),
        Overlay::Layouts | Overlay::SearchPatterns | Overlay::TabLayouts => {
            handle_bundle_key(state, runtime, view_data, internal_tx, key);
        }
        Overlay::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                confirm_record_delete(state, runtime, view_data, internal_tx);
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                view_data.pending_delete.clear();
                state.dispatch(AppCommand::CloseOverlay);
            }
            _ => {}
        },
        Overlay::ConfirmOverwrite => {
            let back = AppCommand::OpenOverlay(bundle_overlay(view_data.bundles.kind));
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    state.dispatch(back);
                    if let Some(pending) = view_data.pending_save.take() {
                        perform_bundle_save(state, runtime, view_data, internal_tx, pending);
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    view_data.pending_save = None;
                    state.dispatch(back);
                }
                _ => {}
            }
        }
        Overlay::ConfirmBundleDelete => {
            let back = AppCommand::OpenOverlay(bundle_overlay(view_data.bundles.kind));
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    state.dispatch(back);
                    if let Some(target) = view_data.pending_bundle_delete.take() {
                        confirm_bundle_delete(state, runtime, view_data, internal_tx, target);
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    view_data.pending_bundle_delete = None;
                    state.dispatch(back);
                }
                _ => {}
            }
        }
        Overlay::OpenTable => match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => {
                state.dispatch(AppCommand::CloseOverlay);
            }
            (KeyCode::Enter, _) => {
                let table = std::mem::take(&mut view_data.open_table_input);
                state.dispatch(AppCommand::CloseOverlay);
                dispatch_and_refresh(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    AppCommand::OpenTable(table),
                );
            }
            (KeyCode::Backspace, _) => {
                view_data.open_table_input.pop();
            }
            (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
                view_data.open_table_input.push(ch);
            }
            _ => {}
        },
        Overlay::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?' | 'q')) {
                state.dispatch(AppCommand::CloseOverlay);
            }
        }
    }
}

fn open_record_form<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    id: Option<RecordId>,
) {
    let table = state.active_table().to_owned();
    let Some(grid) = view_data.grids.get(&table) else {
        return;
    };
    let fields = grid.fields().to_vec();
    let form = match id {
        None => RecordForm::create(&table, &fields),
        Some(id) => match runtime
            .load_record(&table, id)
            .and_then(|record| RecordForm::edit(&table, &fields, &record))
        {
            Ok(form) => form,
            Err(error) => {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    Toast::danger(format!("cannot open record {id}: {error:#}")),
                );
                return;
            }
        },
    };
    view_data.record_form = Some(form);
    prepare_form_focus(runtime, view_data);
    state.dispatch(AppCommand::OpenOverlay(Overlay::RecordForm));
}

fn cached_options<R: GridRuntime>(
    runtime: &mut R,
    cache: &mut BTreeMap<(String, String), Vec<String>>,
    table: &str,
    field: &str,
) -> Vec<String> {
    let key = (table.to_owned(), field.to_owned());
    if let Some(options) = cache.get(&key) {
        return options.clone();
    }
    match runtime.load_options(table, field) {
        Ok(options) => {
            cache.insert(key, options.clone());
            options
        }
        Err(error) => {
            log::warn!("cannot load options for {table}.{field}: {error:#}");
            Vec::new()
        }
    }
}

/// Fetches suggestion sources when focus lands on a choice or
/// autocomplete field.
fn prepare_form_focus<R: GridRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    let Some(form) = view_data.record_form.as_mut() else {
        return;
    };
    let Some(field) = form.focused_field() else {
        return;
    };
    let choice = field.is_choice();
    if !choice && !field.has_autocomplete() {
        return;
    }
    let name = field.config.name.clone();
    let value = field.value.clone();
    let table = form.table().to_owned();
    let options = cached_options(runtime, &mut view_data.option_cache, &table, &name);
    form.suggestions.set_source(options);
    if choice {
        form.suggestions.browse(&value);
    }
}

fn refresh_form_suggestions(view_data: &mut ViewData) {
    let Some(form) = view_data.record_form.as_mut() else {
        return;
    };
    let Some(field) = form.focused_field() else {
        return;
    };
    let value = field.value.clone();
    let (autocomplete, choice) = (field.has_autocomplete(), field.is_choice());
    if autocomplete {
        form.suggestions.filter(&value);
    } else if choice {
        form.suggestions.browse(&value);
    }
}

fn handle_record_form_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.record_form.as_mut() else {
        state.dispatch(AppCommand::CloseOverlay);
        return;
    };
    let suggesting = form.suggestions.is_visible();
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) if suggesting => form.suggestions.hide(),
        (KeyCode::Esc, _) => {
            view_data.record_form = None;
            state.dispatch(AppCommand::CloseOverlay);
        }
        (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            submit_record_form(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Down, _) if suggesting => form.suggestions.select_next(),
        (KeyCode::Up, _) if suggesting => form.suggestions.select_prev(),
        (KeyCode::Tab | KeyCode::Down, _) => {
            form.focus_next();
            prepare_form_focus(runtime, view_data);
        }
        (KeyCode::BackTab | KeyCode::Up, _) => {
            form.focus_prev();
            prepare_form_focus(runtime, view_data);
        }
        (KeyCode::Enter, _) => match form.suggestions.accept() {
            Some(choice) => form.set_focused_value(&choice),
            None => submit_record_form(state, runtime, view_data, internal_tx),
        },
        (KeyCode::Backspace, _) => {
            form.backspace();
            refresh_form_suggestions(view_data);
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            if form.insert_char(ch) {
                refresh_form_suggestions(view_data);
            }
        }
        _ => {}
    }
}

fn submit_record_form<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(form) = view_data.record_form.as_mut() else {
        return;
    };
    if !form.validate() {
        let missing = form.invalid_fields().join(", ");
        emit_status(
            state,
            view_data,
            internal_tx,
            Toast::warning(format!("required: {missing}")),
        );
        return;
    }

    let table = form.table().to_owned();
    let payload = form.payload();
    match form.mode() {
        FormMode::Create => match runtime.create_record(&table, &payload) {
            Ok(outcome) if outcome.success => {
                finish_record_form(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    "Record created successfully!",
                );
            }
            Ok(outcome) => {
                let unmatched = view_data
                    .record_form
                    .as_mut()
                    .map(|form| form.apply_server_errors(&outcome.errors))
                    .unwrap_or_default();
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    Toast::danger(server_error_summary(&unmatched)),
                );
            }
            Err(error) => emit_status(
                state,
                view_data,
                internal_tx,
                Toast::danger(format!("create failed: {error:#}")),
            ),
        },
        FormMode::Edit(id) => {
            let outcome = runtime.update_record(&table, id, &payload);
            if outcome.success {
                finish_record_form(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    "Record updated successfully!",
                );
            } else {
                let message = outcome
                    .error
                    .unwrap_or_else(|| "update failed".to_owned());
                emit_status(state, view_data, internal_tx, Toast::danger(message));
            }
        }
    }
}

fn server_error_summary(unmatched: &[String]) -> String {
    if unmatched.is_empty() {
        return "fix the highlighted fields".to_owned();
    }
    let prefix = format!("{NON_FIELD_ERRORS}: ");
    unmatched
        .iter()
        .map(|entry| entry.strip_prefix(&prefix).unwrap_or(entry))
        .collect::<Vec<_>>()
        .join("; ")
}

fn finish_record_form<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: &str,
) {
    view_data.record_form = None;
    state.dispatch(AppCommand::CloseOverlay);
    let toast = match reload_active_grid(state, runtime, view_data) {
        Ok(()) => Toast::success(message),
        Err(error) => Toast::danger(format!("{message} Reload failed: {error:#}")),
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn request_record_delete(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let ids = active_grid(state, view_data)
        .map(GridInstance::selected_ids)
        .unwrap_or_default();
    if ids.is_empty() {
        emit_status(
            state,
            view_data,
            internal_tx,
            Toast::warning("select at least one record to delete"),
        );
        return;
    }
    view_data.pending_delete = ids;
    state.dispatch(AppCommand::OpenOverlay(Overlay::ConfirmDelete));
}

fn confirm_record_delete<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let ids = std::mem::take(&mut view_data.pending_delete);
    state.dispatch(AppCommand::CloseOverlay);
    let table = state.active_table().to_owned();
    let toast = match runtime.delete_records(&table, &ids) {
        Ok(outcome) if outcome.success => {
            let deleted = if outcome.deleted.is_empty() {
                ids
            } else {
                outcome.deleted
            };
            if let Some(grid) = view_data.grids.get_mut(&table) {
                grid.remove_records(&deleted);
                grid.set_all_selected(false);
            }
            clamp_cursor(view_data, &table);
            Toast::success("Records deleted successfully!")
        }
        Ok(outcome) => Toast::danger(
            outcome
                .error
                .unwrap_or_else(|| "delete failed".to_owned()),
        ),
        Err(error) => Toast::danger(format!("delete failed: {error:#}")),
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn open_search(state: &mut AppState, view_data: &mut ViewData) {
    let table = state.active_table().to_owned();
    let Some(grid) = view_data.grids.get(&table) else {
        return;
    };
    if !view_data.searches.contains_key(&table) {
        let form = SearchForm::new(&table, grid.fields());
        view_data.searches.insert(table, form);
    }
    state.dispatch(AppCommand::OpenOverlay(Overlay::Search));
}

fn handle_search_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let table = state.active_table().to_owned();
    let Some(form) = view_data.searches.get_mut(&table) else {
        state.dispatch(AppCommand::CloseOverlay);
        return;
    };
    let suggesting = form.suggestions.is_visible();
    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) if suggesting => form.suggestions.hide(),
        (KeyCode::Esc, _) => {
            state.dispatch(AppCommand::CloseOverlay);
        }
        (KeyCode::Char('r'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            form.reset();
            emit_status(
                state,
                view_data,
                internal_tx,
                Toast::success("search form cleared"),
            );
        }
        (KeyCode::Down, _) if suggesting => form.suggestions.select_next(),
        (KeyCode::Up, _) if suggesting => form.suggestions.select_prev(),
        (KeyCode::Tab | KeyCode::Down, _) => form.focus_next(),
        (KeyCode::BackTab | KeyCode::Up, _) => form.focus_prev(),
        (KeyCode::Left, _) => form.cycle(-1),
        (KeyCode::Right, _) => form.cycle(1),
        (KeyCode::Enter, _) => match form.suggestions.accept() {
            Some(choice) => form.set_focused_value(&choice),
            None => run_search(state, runtime, view_data, internal_tx),
        },
        (KeyCode::Backspace, _) => {
            form.backspace();
            refresh_search_suggestions(runtime, view_data, &table);
        }
        (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
            if form.insert_char(ch) {
                refresh_search_suggestions(runtime, view_data, &table);
            }
        }
        _ => {}
    }
}

/// `GSearch` value inputs ask the backend for matches as the user types.
fn refresh_search_suggestions<R: GridRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    table: &str,
) {
    let Some(form) = view_data.searches.get_mut(table) else {
        return;
    };
    if !matches!(form.focused_slot(), SearchSlot::Value(_)) {
        return;
    }
    let Some(row) = form.focused_row().filter(|row| row.is_global_search()) else {
        return;
    };
    let field = row.config.name.clone();
    let query = row.value.trim().to_owned();
    if query.is_empty() {
        form.suggestions.hide();
        return;
    }
    match runtime.global_search(table, &field, &query) {
        Ok(matches) => form.suggestions.show(matches),
        Err(error) => {
            log::warn!("global search on {table}.{field} failed: {error:#}");
            form.suggestions.hide();
        }
    }
}

fn run_search<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let table = state.active_table().to_owned();
    let Some(form) = view_data.searches.get(&table) else {
        return;
    };
    let request = form.collect();
    let toast = match runtime.search(&table, &request) {
        Ok(Some(page)) => {
            let found = !page.rows.is_empty();
            show_page(runtime, view_data, &table, page);
            if found {
                state.dispatch(AppCommand::CloseOverlay);
                Toast::success("Search complete")
            } else {
                Toast::warning("No results found")
            }
        }
        Ok(None) => Toast::warning("No results found"),
        Err(error) => Toast::danger(format!("Search failed: {error:#}")),
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn open_column_picker(state: &mut AppState, view_data: &mut ViewData) {
    let Some(grid) = active_grid(state, view_data) else {
        return;
    };
    let choices = grid
        .effective_order()
        .iter()
        .filter_map(|name| grid.columns().iter().find(|column| column.field == *name))
        .map(|column| ColumnChoice {
            field: column.field.clone(),
            label: column.label.clone(),
            checked: grid.is_visible(&column.field),
        })
        .collect();
    view_data.column_picker = ColumnPickerUiState { choices, cursor: 0 };
    state.dispatch(AppCommand::OpenOverlay(Overlay::Columns));
}

fn handle_columns_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let picker = &mut view_data.column_picker;
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::CloseOverlay);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            picker.cursor = (picker.cursor + 1).min(picker.choices.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            picker.cursor = picker.cursor.saturating_sub(1);
        }
        KeyCode::Char(' ') => {
            if let Some(choice) = picker.choices.get_mut(picker.cursor) {
                choice.checked = !choice.checked;
            }
        }
        KeyCode::Char('a') => picker.choices.iter_mut().for_each(|choice| choice.checked = true),
        KeyCode::Char('n') => picker
            .choices
            .iter_mut()
            .for_each(|choice| choice.checked = false),
        KeyCode::Char('r') => {
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.reset_visibility(storage)
            });
            let toast = match result {
                Some(Err(error)) => Toast::danger(format!("{error:#}")),
                _ => Toast::success("all columns shown"),
            };
            state.dispatch(AppCommand::CloseOverlay);
            emit_status(state, view_data, internal_tx, toast);
        }
        KeyCode::Enter => {
            let visible: BTreeSet<String> = picker
                .choices
                .iter()
                .filter(|choice| choice.checked)
                .map(|choice| choice.field.clone())
                .collect();
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.set_visible_columns(storage, visible)
            });
            let toast = match result {
                Some(Err(error)) => Toast::warning(format!("{error:#}")),
                _ => {
                    state.dispatch(AppCommand::CloseOverlay);
                    let table = state.active_table().to_owned();
                    clamp_cursor(view_data, &table);
                    Toast::success("columns updated")
                }
            };
            emit_status(state, view_data, internal_tx, toast);
        }
        _ => {}
    }
}

const fn bundle_overlay(kind: BundleKind) -> Overlay {
    match kind {
        BundleKind::Layout => Overlay::Layouts,
        BundleKind::SearchPattern => Overlay::SearchPatterns,
        BundleKind::TabLayout => Overlay::TabLayouts,
    }
}

fn open_bundle_overlay<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: BundleKind,
) {
    let table = state.active_table().to_owned();
    match runtime.list_bundles(kind, &table) {
        Ok(entries) => {
            view_data.bundles = BundleUiState::new(kind, entries);
            state.dispatch(AppCommand::OpenOverlay(bundle_overlay(kind)));
        }
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            Toast::danger(format!("cannot list {}s: {error:#}", kind.as_str())),
        ),
    }
}

fn refresh_bundle_list<R: GridRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    let kind = view_data.bundles.kind;
    let entries = runtime.list_bundles(kind, state.active_table())?;
    let cursor = view_data.bundles.cursor;
    view_data.bundles = BundleUiState::new(kind, entries);
    view_data.bundles.cursor = cursor.min(view_data.bundles.entries.len().saturating_sub(1));
    Ok(())
}

fn handle_bundle_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if let Some(input) = view_data.bundles.naming.as_mut() {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => view_data.bundles.naming = None,
            (KeyCode::Enter, _) => request_bundle_save(state, runtime, view_data, internal_tx),
            (KeyCode::Tab, _) => input.as_default = !input.as_default,
            (KeyCode::Backspace, _) => {
                input.text.pop();
            }
            (KeyCode::Char(ch), modifiers) if !modifiers.contains(KeyModifiers::CONTROL) => {
                input.text.push(ch);
            }
            _ => {}
        }
        return;
    }

    let bundles = &mut view_data.bundles;
    match key.code {
        KeyCode::Esc => {
            state.dispatch(AppCommand::CloseOverlay);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            bundles.cursor = (bundles.cursor + 1).min(bundles.entries.len().saturating_sub(1));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            bundles.cursor = bundles.cursor.saturating_sub(1);
        }
        KeyCode::Char('s') => {
            bundles.naming = Some(NameInput::default());
        }
        KeyCode::Char('S') => {
            bundles.naming = Some(NameInput {
                text: String::new(),
                as_default: true,
            });
        }
        KeyCode::Enter => load_selected_bundle(state, runtime, view_data, internal_tx),
        KeyCode::Char('d') | KeyCode::Delete => {
            let Some(entry) = bundles.selected() else {
                return;
            };
            view_data.pending_bundle_delete = Some(BundleRef {
                kind: bundles.kind,
                id: entry.id,
                name: entry.name.clone(),
            });
            state.dispatch(AppCommand::OpenOverlay(Overlay::ConfirmBundleDelete));
        }
        KeyCode::Char('*') => set_selected_default(state, runtime, view_data, internal_tx),
        _ => {}
    }
}

fn current_payload(
    kind: BundleKind,
    state: &AppState,
    view_data: &ViewData,
) -> Option<BundlePayload> {
    match kind {
        BundleKind::Layout => {
            active_grid(state, view_data).map(|grid| BundlePayload::Layout(grid.layout_data()))
        }
        BundleKind::SearchPattern => view_data
            .searches
            .get(state.active_table())
            .map(|form| BundlePayload::SearchPattern(form.pattern_data())),
        BundleKind::TabLayout => Some(BundlePayload::TabLayout(state.tab_layout_data())),
    }
}

/// Validates the typed name and asks before overwriting an existing bundle.
fn request_bundle_save<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(input) = view_data.bundles.naming.clone() else {
        return;
    };
    let kind = view_data.bundles.kind;
    let name = match validate_bundle_name(kind, &input.text) {
        Ok(name) => name,
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                Toast::warning(format!("{error:#}")),
            );
            return;
        }
    };
    let Some(payload) = current_payload(kind, state, view_data) else {
        emit_status(
            state,
            view_data,
            internal_tx,
            Toast::warning(format!("nothing to save as a {}", kind.as_str())),
        );
        return;
    };
    let pending = PendingSave {
        name,
        payload,
        is_default: input.as_default,
    };
    if find_by_name(&view_data.bundles.entries, &pending.name).is_some() {
        view_data.pending_save = Some(pending);
        state.dispatch(AppCommand::OpenOverlay(Overlay::ConfirmOverwrite));
        return;
    }
    perform_bundle_save(state, runtime, view_data, internal_tx, pending);
}

fn perform_bundle_save<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    pending: PendingSave,
) {
    let table = state.active_table().to_owned();
    let toast = match runtime.save_bundle(
        &table,
        &pending.name,
        &pending.payload,
        pending.is_default,
    ) {
        Ok(message) => {
            view_data.bundles.naming = None;
            if let Err(error) = refresh_bundle_list(state, runtime, view_data) {
                log::warn!("cannot refresh {} list: {error:#}", pending.payload.kind().as_str());
            }
            Toast::success(message)
        }
        Err(error) => Toast::danger(format!(
            "cannot save {} {:?}: {error:#}",
            pending.payload.kind().as_str(),
            pending.name
        )),
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn load_selected_bundle<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let kind = view_data.bundles.kind;
    let Some((id, name)) = view_data
        .bundles
        .selected()
        .map(|entry| (entry.id, entry.name.clone()))
    else {
        return;
    };
    let table = state.active_table().to_owned();
    let payload = match runtime.load_bundle(kind, &table, id) {
        Ok(payload) => payload,
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                Toast::danger(format!("cannot load {} {name:?}: {error:#}", kind.as_str())),
            );
            return;
        }
    };

    let toast = match payload {
        BundlePayload::Layout(data) => {
            state.dispatch(AppCommand::CloseOverlay);
            let result = with_active_grid(state, runtime, view_data, |grid, storage| {
                grid.apply_layout_data(storage, &data)
            });
            if let Some(grid) = view_data.grids.get_mut(&table) {
                settle_grid(runtime, grid);
            }
            clamp_cursor(view_data, &table);
            match result {
                Some(Err(error)) => Toast::danger(format!("{error:#}")),
                _ => Toast::success(format!("Layout {name:?} loaded")),
            }
        }
        BundlePayload::SearchPattern(data) => {
            open_search(state, view_data);
            if let Some(form) = view_data.searches.get_mut(&table) {
                form.apply_pattern(&data);
            }
            Toast::success(format!("Search pattern {name:?} loaded"))
        }
        BundlePayload::TabLayout(data) => {
            state.dispatch(AppCommand::CloseOverlay);
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                internal_tx,
                AppCommand::ApplyTabLayout(data),
            );
            Toast::success(format!("Tab layout {name:?} loaded"))
        }
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn confirm_bundle_delete<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    target: BundleRef,
) {
    let table = state.active_table().to_owned();
    let toast = match runtime.delete_bundle(target.kind, &table, target.id) {
        Ok(message) => {
            if let Err(error) = refresh_bundle_list(state, runtime, view_data) {
                log::warn!("cannot refresh {} list: {error:#}", target.kind.as_str());
            }
            Toast::success(message)
        }
        Err(error) => Toast::danger(format!(
            "cannot delete {} {:?}: {error:#}",
            target.kind.as_str(),
            target.name
        )),
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn set_selected_default<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let kind = view_data.bundles.kind;
    let Some(id) = view_data.bundles.selected().map(|entry| entry.id) else {
        return;
    };
    let table = state.active_table().to_owned();
    let toast = match runtime.set_default_bundle(kind, &table, id) {
        Ok(message) => {
            if let Err(error) = refresh_bundle_list(state, runtime, view_data) {
                log::warn!("cannot refresh {} list: {error:#}", kind.as_str());
            }
            Toast::success(message)
        }
        Err(error) => Toast::danger(format!("cannot set default {}: {error:#}", kind.as_str())),
    };
    emit_status(state, view_data, internal_tx, toast);
}

fn px_per_cell(view_data: &ViewData) -> i32 {
    i32::try_from(view_data.options.px_per_cell.max(1)).unwrap_or(i32::MAX)
}

/// Pixel x of the first data header: border, checkbox column, spacing.
fn header_origin_px(view_data: &ViewData) -> i32 {
    let cells = i32::from(view_data.table_area.x)
        + 1
        + i32::from(CHECKBOX_WIDTH)
        + i32::from(COLUMN_SPACING);
    cells * px_per_cell(view_data)
}

fn width_cells(width_px: u32, px_per_cell: i32) -> u16 {
    let cells = width_px / px_per_cell.max(1).unsigned_abs();
    u16::try_from(cells.max(1)).unwrap_or(u16::MAX)
}

/// The last cell of a header and the gap after it grab a resize.
fn resize_handle_at(spans: &[HeaderSpan], x: i32, px: i32) -> Option<&HeaderSpan> {
    spans
        .iter()
        .find(|span| x >= span.right() - px && x < span.right() + px)
}

fn handle_mouse_event<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    if state.mode != AppMode::Grid {
        return;
    }
    let px = px_per_cell(view_data);
    let x = i32::from(mouse.column) * px;
    let origin = header_origin_px(view_data);
    let gap = u32::from(COLUMN_SPACING) * px.unsigned_abs();
    let header_row = view_data.table_area.y.saturating_add(1);
    let table = state.active_table().to_owned();
    let Some(grid) = view_data.grids.get_mut(&table) else {
        return;
    };
    let spans = grid.header_spans(origin, gap);

    let outcome = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if mouse.row == header_row => {
            if let Some(span) = resize_handle_at(&spans, x, px) {
                grid.begin_resize(&span.column, x);
            } else if let Some(span) = spans
                .iter()
                .find(|span| x >= span.left && x < span.right())
            {
                grid.begin_drag(&span.column, x);
            }
            Ok(())
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if grid.interaction().is_resizing() {
                grid.resize_to(x);
            } else {
                grid.drag_to(x);
            }
            Ok(())
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if grid.interaction().is_resizing() {
                grid.finish_resize(runtime.storage()).map(|_| ())
            } else if grid.interaction().is_dragging() {
                grid.finish_drag(runtime.storage(), &spans).map(|column_move| {
                    if let Some(column_move) = column_move {
                        log::debug!(
                            "moved {} next to {}",
                            column_move.source,
                            column_move.target.column
                        );
                    }
                })
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    };

    if let Err(error) = outcome {
        emit_status(
            state,
            view_data,
            internal_tx,
            Toast::danger(format!("{error:#}")),
        );
    }
}

fn screen_layout(area: Rect) -> (Rect, Rect, Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area);
    (layout[0], layout[1], layout[2])
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let (tabs_area, body_area, status_area) = screen_layout(frame.area());

    let tab_titles = state
        .tabs
        .iter()
        .map(|tab| tab.title.clone())
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("dyngrid").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(state.active_tab);
    frame.render_widget(tabs, tabs_area);

    render_grid(frame, body_area, state, view_data);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(status_color(state)))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, status_area);

    if let AppMode::Overlay(overlay) = state.mode {
        let (percent_x, percent_y) = overlay_size(overlay);
        let area = centered_rect(percent_x, percent_y, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(overlay_text(overlay, state, view_data)).block(
            Block::default()
                .title(overlay_title(overlay, view_data))
                .borders(Borders::ALL),
        );
        frame.render_widget(body, area);
    }
}

fn render_grid(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let Some(grid) = active_grid(state, view_data) else {
        let empty = Paragraph::new(String::new()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(table_title(state.active_table())),
        );
        frame.render_widget(empty, area);
        return;
    };

    let px = px_per_cell(view_data);
    let columns = grid.visible_columns();
    let mut widths = Vec::with_capacity(columns.len() + 1);
    widths.push(Constraint::Length(CHECKBOX_WIDTH));
    widths.extend(
        columns
            .iter()
            .map(|column| Constraint::Length(width_cells(grid.column_width(&column.field), px))),
    );

    let gesture_column = match grid.interaction().state() {
        InteractionState::Resizing { column, .. } | InteractionState::Dragging { column, .. } => {
            Some(column.as_str())
        }
        InteractionState::Idle => None,
    };
    let mut header_cells = vec![Cell::from(checkbox(grid.all_selected()))];
    header_cells.extend(columns.iter().map(|column| {
        let mut style = Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD);
        if gesture_column == Some(column.field.as_str()) {
            style = style.fg(Color::Cyan);
        }
        Cell::from(header_label(grid, column)).style(style)
    }));
    let header = Row::new(header_cells);

    let rows: Vec<Row<'_>> = if grid.rows().is_empty() {
        vec![Row::new(vec![
            Cell::from(""),
            Cell::from(EMPTY_GRID_TEXT).style(Style::default().fg(Color::DarkGray)),
        ])]
    } else {
        grid.rows()
            .iter()
            .enumerate()
            .map(|(row_index, record)| {
                let cursor_row = row_index == view_data.cursor.row;
                let selected = record.id.is_some_and(|id| grid.is_selected(id));
                let mut cells = vec![Cell::from(checkbox(selected))];
                cells.extend(columns.iter().enumerate().map(|(column_index, column)| {
                    let mut style = Style::default();
                    if cursor_row {
                        style = style.bg(Color::DarkGray);
                    }
                    if cursor_row && column_index == view_data.cursor.col {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                    Cell::from(grid.display_text(record, &column.field)).style(style)
                }));
                Row::new(cells)
            })
            .collect()
    };

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .block(
            Block::default()
                .title(grid_title(grid))
                .borders(Borders::ALL),
        );
    let mut table_state = TableState::default().with_selected(Some(view_data.cursor.row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

const fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

fn header_label(grid: &GridInstance, column: &GridColumn) -> String {
    let mut label = column.label.clone();
    if let Some(sort) = &grid.layout().column_sort
        && sort.column == column.field
    {
        label.push_str(match sort.direction {
            SortDirection::Asc => " ↑",
            SortDirection::Desc => " ↓",
        });
    }
    label
}

fn grid_title(grid: &GridInstance) -> String {
    let mut title = format!(
        "{} | {} total",
        table_title(grid.table()),
        grid.total_count()
    );
    let selected = grid.selected_ids().len();
    if selected > 0 {
        title.push_str(&format!(" | {selected} selected"));
    }
    title
}

fn status_color(state: &AppState) -> Color {
    match state.status.as_ref().map(|toast| toast.kind) {
        Some(ToastKind::Success) => Color::Green,
        Some(ToastKind::Danger) => Color::Red,
        Some(ToastKind::Warning) | None => Color::Yellow,
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let mode = match state.mode {
        AppMode::Grid => "GRID",
        AppMode::Overlay(_) => "MODAL",
    };
    let hints = match state.mode {
        AppMode::Grid => grid_hint(state, view_data),
        AppMode::Overlay(overlay) => overlay_hint(overlay, view_data).to_owned(),
    };
    match &state.status {
        Some(toast) => format!("{mode} | {} | {hints}", toast.message),
        None => format!("{mode} | {hints}"),
    }
}

fn grid_hint(state: &AppState, view_data: &ViewData) -> String {
    let gesture = active_grid(state, view_data).map(|grid| grid.interaction().state());
    match gesture {
        Some(InteractionState::Resizing { column, width, .. }) => {
            format!("resizing {column}: {width}px")
        }
        Some(InteractionState::Dragging { column, .. }) => format!("moving {column}"),
        _ => "j/k/h/l move | space select | a add | e edit | d delete | / search | s sort | \
              c columns | L/P/T saved | o open | ? help | ctrl+q quit"
            .to_owned(),
    }
}

fn overlay_hint(overlay: Overlay, view_data: &ViewData) -> &'static str {
    match overlay {
        Overlay::RecordForm => {
            "tab/shift+tab field | up/down suggestions | enter submit | ctrl+s submit | esc close"
        }
        Overlay::Search => {
            "tab field | left/right choose | enter search | ctrl+r reset | esc close"
        }
        Overlay::Columns => "j/k move | space toggle | a all | n none | r reset | enter apply | esc",
        Overlay::Layouts | Overlay::SearchPatterns | Overlay::TabLayouts => {
            if view_data.bundles.naming.is_some() {
                "type a name | tab default | enter save | esc cancel"
            } else {
                "j/k move | enter load | s save | S save default | * default | d delete | esc"
            }
        }
        Overlay::ConfirmDelete | Overlay::ConfirmOverwrite | Overlay::ConfirmBundleDelete => {
            "y confirm | n cancel"
        }
        Overlay::OpenTable => "type a table name | enter open | esc cancel",
        Overlay::Help => "esc close",
    }
}

fn overlay_size(overlay: Overlay) -> (u16, u16) {
    match overlay {
        Overlay::RecordForm | Overlay::Search => (70, 70),
        Overlay::Columns => (40, 60),
        Overlay::Layouts | Overlay::SearchPatterns | Overlay::TabLayouts => (60, 60),
        Overlay::ConfirmDelete | Overlay::ConfirmOverwrite | Overlay::ConfirmBundleDelete => {
            (50, 20)
        }
        Overlay::OpenTable => (40, 20),
        Overlay::Help => (70, 60),
    }
}

fn overlay_title(overlay: Overlay, view_data: &ViewData) -> String {
    match (&view_data.record_form, overlay) {
        (Some(form), Overlay::RecordForm) => form.title(),
        _ => overlay.title().to_owned(),
    }
}

fn overlay_text(overlay: Overlay, state: &AppState, view_data: &ViewData) -> String {
    match overlay {
        Overlay::RecordForm => view_data
            .record_form
            .as_ref()
            .map(render_record_form_text)
            .unwrap_or_default(),
        Overlay::Search => view_data
            .searches
            .get(state.active_table())
            .map(render_search_text)
            .unwrap_or_default(),
        Overlay::Columns => render_columns_text(&view_data.column_picker),
        Overlay::Layouts | Overlay::SearchPatterns | Overlay::TabLayouts => {
            render_bundles_text(&view_data.bundles)
        }
        Overlay::ConfirmDelete => delete_confirm_text(view_data.pending_delete.len()),
        Overlay::ConfirmOverwrite => view_data
            .pending_save
            .as_ref()
            .map(|pending| {
                format!(
                    "A {} named {:?} already exists. Overwrite it?",
                    pending.payload.kind().as_str(),
                    pending.name
                )
            })
            .unwrap_or_default(),
        Overlay::ConfirmBundleDelete => view_data
            .pending_bundle_delete
            .as_ref()
            .map(|target| format!("Delete {} {:?}?", target.kind.as_str(), target.name))
            .unwrap_or_default(),
        Overlay::OpenTable => format!("table: {}_", view_data.open_table_input),
        Overlay::Help => help_overlay_text().to_owned(),
    }
}

fn push_suggestions(lines: &mut Vec<String>, suggestions: &Autocomplete) {
    if !suggestions.is_visible() {
        return;
    }
    lines.push(String::new());
    for (index, option) in suggestions.matches().iter().enumerate() {
        let marker = if suggestions.selected() == Some(index) {
            "»"
        } else {
            " "
        };
        lines.push(format!("  {marker} {option}"));
    }
}

fn render_record_form_text(form: &RecordForm) -> String {
    let mut lines = Vec::new();
    for (index, field) in form.fields().iter().enumerate() {
        let marker = if index == form.focus() { ">" } else { " " };
        let required = if field.config.mandatory { "*" } else { "" };
        lines.push(format!(
            "{marker} {}{required} ({}): {}",
            field.config.display_label(),
            field.config.field_type.as_str(),
            field.value
        ));
        if let Some(error) = &field.error {
            lines.push(format!("    ! {error}"));
        }
    }
    push_suggestions(&mut lines, &form.suggestions);
    lines.join("\n")
}

fn render_search_text(form: &SearchForm) -> String {
    let focused = form.focused_slot();
    let marker = |slot: SearchSlot| if focused == slot { ">" } else { " " };
    let mut lines = Vec::new();
    for (index, row) in form.rows().iter().enumerate() {
        lines.push(format!(
            "{:<14} {}[{}] {}{}",
            row.config.display_label(),
            marker(SearchSlot::Operator(index)),
            row.operator().unwrap_or("-"),
            marker(SearchSlot::Value(index)),
            row.value
        ));
    }
    lines.push(String::new());
    for (index, sort) in form.sorts().iter().enumerate() {
        lines.push(format!(
            "{:<14} {}[{}] {}[{}]",
            format!("Sort{}", index + 1),
            marker(SearchSlot::SortField(index)),
            sort.field.as_deref().unwrap_or("-"),
            marker(SearchSlot::SortDirection(index)),
            sort.direction.map(SortDirection::as_str).unwrap_or("-")
        ));
    }
    push_suggestions(&mut lines, &form.suggestions);
    lines.join("\n")
}

fn render_columns_text(picker: &ColumnPickerUiState) -> String {
    picker
        .choices
        .iter()
        .enumerate()
        .map(|(index, choice)| {
            let marker = if index == picker.cursor { ">" } else { " " };
            format!("{marker} {} {}", checkbox(choice.checked), choice.label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_bundles_text(bundles: &BundleUiState) -> String {
    let mut lines = Vec::new();
    if bundles.entries.is_empty() {
        lines.push(format!("no saved {}s yet", bundles.kind.as_str()));
    }
    for (index, entry) in bundles.entries.iter().enumerate() {
        let marker = if index == bundles.cursor { ">" } else { " " };
        let badge = if bundles.default_id == Some(entry.id) {
            " [default]"
        } else {
            ""
        };
        let updated = if entry.updated_at.is_empty() {
            String::new()
        } else {
            format!("  {}", entry.updated_at)
        };
        lines.push(format!("{marker} {}{badge}{updated}", entry.name));
    }
    if let Some(input) = &bundles.naming {
        lines.push(String::new());
        lines.push(format!("name: {}_", input.text));
        lines.push(format!(
            "default: {}",
            if input.as_default { "yes" } else { "no" }
        ));
    }
    lines.join("\n")
}

fn delete_confirm_text(count: usize) -> String {
    format!("Are you sure you want to permanently delete {count} selected record(s)?")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit\n\
grid: j/k/h/l move | g/G first/last | space select row | A select all\n\
grid: a add | e/enter edit | d delete selected | r reload | / search\n\
columns: s sort | S clear sort | </> move | -/+ width | c visibility | R reset layout\n\
mouse: drag a header to move it | drag a header's right edge to resize\n\
saved: L layouts | P search patterns | T tab layouts\n\
tabs: f/b or tab/shift+tab switch | o open table | x close tab\n\
form: tab/shift+tab field | up/down suggestions | enter accept or submit | esc close\n\
search: left/right operator or sort | type value | enter search | ctrl+r reset"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        GridCommand, GridRuntime, InternalEvent, UiOptions, ViewData, delete_confirm_text,
        emit_status, grid_command_for_key, handle_key_event, handle_mouse_event, header_label,
        process_internal_events, render, render_bundles_text, start_session, status_text,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
    use dyngrid_app::{
        AppMode, AppState, BundleId, BundleKind, BundlePayload, CreateOutcome, DeleteOutcome,
        FieldConfig, GridLayoutData, GridPage, LayoutSlice, LayoutStorage, MemoryLayoutStorage,
        Overlay, Record, RecordId, SavedBundle, SearchRequest, TabLayoutData, TabSession, Toast,
        ToastKind, UpdateOutcome,
    };
    use dyngrid_testkit::{sample_fields, sample_page};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Rect;
    use std::collections::BTreeMap;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        storage: MemoryLayoutStorage,
        fields: Vec<FieldConfig>,
        page: GridPage,
        search_result: Option<GridPage>,
        search_error: Option<String>,
        search_requests: Vec<SearchRequest>,
        create_outcome: CreateOutcome,
        create_requests: Vec<BTreeMap<String, String>>,
        update_requests: Vec<(RecordId, BTreeMap<String, String>)>,
        delete_requests: Vec<Vec<RecordId>>,
        options: Vec<String>,
        gsearch_results: Vec<String>,
        bundles: Vec<SavedBundle<BundlePayload>>,
        saved: Vec<(String, BundlePayload, bool)>,
        sessions: Vec<TabSession>,
        loaded_tables: Vec<String>,
    }

    impl TestRuntime {
        fn customers() -> Self {
            Self {
                fields: sample_fields(),
                page: sample_page(5),
                options: vec!["Pilot".to_owned(), "Copilot".to_owned(), "Chef".to_owned()],
                ..Self::default()
            }
        }

        fn with_bundle(
            mut self,
            id: i64,
            name: &str,
            is_default: bool,
            updated_at: &str,
            payload: BundlePayload,
        ) -> Self {
            self.bundles.push(SavedBundle {
                id: BundleId::new(id),
                name: name.to_owned(),
                is_default,
                updated_at: updated_at.to_owned(),
                data: Some(payload),
            });
            self
        }
    }

    impl GridRuntime for TestRuntime {
        fn load_fields(&mut self, _table: &str) -> Result<Vec<FieldConfig>> {
            Ok(self.fields.clone())
        }

        fn load_page(&mut self, table: &str) -> Result<GridPage> {
            self.loaded_tables.push(table.to_owned());
            Ok(self.page.clone())
        }

        fn search(&mut self, _table: &str, request: &SearchRequest) -> Result<Option<GridPage>> {
            self.search_requests.push(request.clone());
            if let Some(error) = &self.search_error {
                return Err(anyhow!(error.clone()));
            }
            Ok(self.search_result.clone())
        }

        fn load_record(&mut self, _table: &str, id: RecordId) -> Result<Record> {
            self.page
                .rows
                .iter()
                .find(|record| record.id == Some(id))
                .cloned()
                .ok_or_else(|| anyhow!("no record {id}"))
        }

        fn create_record(
            &mut self,
            _table: &str,
            data: &BTreeMap<String, String>,
        ) -> Result<CreateOutcome> {
            self.create_requests.push(data.clone());
            Ok(self.create_outcome.clone())
        }

        fn update_record(
            &mut self,
            _table: &str,
            id: RecordId,
            data: &BTreeMap<String, String>,
        ) -> UpdateOutcome {
            self.update_requests.push((id, data.clone()));
            UpdateOutcome {
                success: true,
                error: None,
            }
        }

        fn delete_records(&mut self, _table: &str, ids: &[RecordId]) -> Result<DeleteOutcome> {
            self.delete_requests.push(ids.to_vec());
            Ok(DeleteOutcome {
                success: true,
                deleted: ids.to_vec(),
                error: None,
            })
        }

        fn load_options(&mut self, _table: &str, _field: &str) -> Result<Vec<String>> {
            Ok(self.options.clone())
        }

        fn global_search(&mut self, _table: &str, _field: &str, query: &str) -> Result<Vec<String>> {
            let needle = query.to_lowercase();
            Ok(self
                .gsearch_results
                .iter()
                .filter(|option| option.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        fn list_bundles(
            &mut self,
            kind: BundleKind,
            _table: &str,
        ) -> Result<Vec<SavedBundle<BundlePayload>>> {
            Ok(self
                .bundles
                .iter()
                .filter(|bundle| bundle.data.as_ref().is_some_and(|data| data.kind() == kind))
                .cloned()
                .collect())
        }

        fn save_bundle(
            &mut self,
            _table: &str,
            name: &str,
            payload: &BundlePayload,
            is_default: bool,
        ) -> Result<String> {
            self.saved
                .push((name.to_owned(), payload.clone(), is_default));
            Ok(format!("{} saved", payload.kind().as_str()))
        }

        fn load_bundle(
            &mut self,
            _kind: BundleKind,
            _table: &str,
            id: BundleId,
        ) -> Result<BundlePayload> {
            self.bundles
                .iter()
                .find(|bundle| bundle.id == id)
                .and_then(|bundle| bundle.data.clone())
                .ok_or_else(|| anyhow!("no bundle {id}"))
        }

        fn delete_bundle(&mut self, _kind: BundleKind, _table: &str, id: BundleId) -> Result<String> {
            self.bundles.retain(|bundle| bundle.id != id);
            Ok("deleted".to_owned())
        }

        fn set_default_bundle(
            &mut self,
            _kind: BundleKind,
            _table: &str,
            id: BundleId,
        ) -> Result<String> {
            for bundle in &mut self.bundles {
                bundle.is_default = bundle.id == id;
            }
            Ok("default set".to_owned())
        }

        fn storage(&mut self) -> &mut dyn LayoutStorage {
            &mut self.storage
        }

        fn save_session(&mut self, session: &TabSession) -> Result<()> {
            self.sessions.push(session.clone());
            Ok(())
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
    }

    impl Harness {
        fn start(runtime: TestRuntime) -> Self {
            let (tx, _rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::new("customers"),
                runtime,
                view_data: ViewData::new(UiOptions::default()),
                tx,
            };
            harness.view_data.table_area = Rect::new(0, 3, 120, 30);
            start_session(
                &mut harness.state,
                &mut harness.runtime,
                &mut harness.view_data,
                &harness.tx,
            );
            harness
        }

        fn key(&mut self, code: KeyCode) -> bool {
            self.key_with(code, KeyModifiers::NONE)
        }

        fn key_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
            )
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.key(KeyCode::Char(ch));
            }
        }

        fn mouse(&mut self, kind: MouseEventKind, column: u16, row: u16) {
            handle_mouse_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                MouseEvent {
                    kind,
                    column,
                    row,
                    modifiers: KeyModifiers::NONE,
                },
            );
        }

        fn grid(&self) -> &dyngrid_app::GridInstance {
            self.view_data
                .grids
                .get(self.state.active_table())
                .expect("active grid is loaded")
        }

        fn visible(&self) -> Vec<String> {
            self.grid()
                .visible_columns()
                .iter()
                .map(|column| column.field.clone())
                .collect()
        }

        fn status(&self) -> Option<(ToastKind, String)> {
            self.state
                .status
                .as_ref()
                .map(|toast| (toast.kind, toast.message.clone()))
        }

        fn form_value(&self, field: &str) -> String {
            self.view_data
                .record_form
                .as_ref()
                .and_then(|form| form.field(field))
                .map(|field| field.value.clone())
                .unwrap_or_default()
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn layout(order: &[&str]) -> BundlePayload {
        BundlePayload::Layout(GridLayoutData {
            column_order: names(order),
            ..GridLayoutData::default()
        })
    }

    #[test]
    fn startup_applies_the_resolved_default_layout() {
        let runtime = TestRuntime::customers()
            .with_bundle(
                1,
                "Old",
                true,
                "2026-01-01T00:00:00Z",
                layout(&["job", "name", "age", "birthday"]),
            )
            .with_bundle(
                2,
                "New",
                true,
                "2026-02-01T00:00:00Z",
                layout(&["age", "name", "birthday", "job"]),
            );
        let harness = Harness::start(runtime);

        assert_eq!(harness.visible(), names(&["age", "name", "birthday", "job"]));
        assert_eq!(harness.grid().rows().len(), 5);
        assert_eq!(
            harness.runtime.sessions.last().map(|session| session.active.as_str()),
            Some("customers")
        );
    }

    #[test]
    fn blank_mandatory_field_blocks_the_request() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.runtime.create_outcome = CreateOutcome {
            success: true,
            errors: BTreeMap::new(),
        };

        harness.key(KeyCode::Char('a'));
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::RecordForm));
        harness.type_text("Kai");
        harness.key(KeyCode::Enter);

        assert!(harness.runtime.create_requests.is_empty());
        let form = harness.view_data.record_form.as_ref().expect("form stays open");
        assert_eq!(form.invalid_fields(), vec!["birthday"]);
        assert_eq!(form.focused_field().map(|field| field.config.name.as_str()), Some("birthday"));
        assert_eq!(harness.status().map(|status| status.0), Some(ToastKind::Warning));

        harness.type_text("1990-05-01");
        harness.key(KeyCode::Enter);
        assert_eq!(harness.runtime.create_requests.len(), 1);
        assert_eq!(
            harness.runtime.create_requests[0].get("birthday").map(String::as_str),
            Some("1990-05-01")
        );
        assert_eq!(harness.state.mode, AppMode::Grid);
        assert_eq!(
            harness.status(),
            Some((ToastKind::Success, "Record created successfully!".to_owned()))
        );
    }

    #[test]
    fn server_field_errors_land_in_their_slots() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.runtime.create_outcome = CreateOutcome {
            success: false,
            errors: BTreeMap::from([
                ("age".to_owned(), "Enter a whole number.".to_owned()),
                ("__all__".to_owned(), "Duplicate person.".to_owned()),
            ]),
        };
        harness.key(KeyCode::Char('a'));
        harness.type_text("Kai");
        harness.key(KeyCode::Tab);
        harness.key(KeyCode::Tab);
        harness.type_text("1990-05-01");
        harness.key(KeyCode::Enter);

        let form = harness.view_data.record_form.as_ref().expect("form stays open");
        assert_eq!(form.invalid_fields(), vec!["age"]);
        assert_eq!(
            harness.status(),
            Some((ToastKind::Danger, "Duplicate person.".to_owned()))
        );
    }

    #[test]
    fn job_field_autocomplete_navigates_and_accepts() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('a'));
        for _ in 0..3 {
            harness.key(KeyCode::Tab);
        }
        harness.type_text("pi");
        let matches = |harness: &Harness| {
            harness
                .view_data
                .record_form
                .as_ref()
                .map(|form| form.suggestions.matches().to_vec())
                .unwrap_or_default()
        };
        assert_eq!(matches(&harness), names(&["Pilot", "Copilot"]));

        harness.key(KeyCode::Down);
        harness.key(KeyCode::Up);
        let selected = harness
            .view_data
            .record_form
            .as_ref()
            .and_then(|form| form.suggestions.selected());
        assert_eq!(selected, None);

        harness.key(KeyCode::Down);
        harness.key(KeyCode::Down);
        harness.key(KeyCode::Enter);
        assert_eq!(harness.form_value("job"), "Copilot");
        assert!(matches(&harness).is_empty());
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::RecordForm));
    }

    #[test]
    fn deleting_two_selected_rows_updates_grid_and_total() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('j'));
        harness.key(KeyCode::Char(' '));
        harness.key(KeyCode::Char('j'));
        harness.key(KeyCode::Char(' '));
        harness.key(KeyCode::Char('d'));
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::ConfirmDelete));
        assert_eq!(
            delete_confirm_text(harness.view_data.pending_delete.len()),
            "Are you sure you want to permanently delete 2 selected record(s)?"
        );

        harness.key(KeyCode::Char('y'));
        assert_eq!(
            harness.runtime.delete_requests,
            vec![vec![RecordId::new(2), RecordId::new(3)]]
        );
        assert_eq!(harness.grid().rows().len(), 3);
        assert_eq!(harness.grid().total_count(), 3);
        assert!(harness.grid().selected_ids().is_empty());
        assert_eq!(
            harness.status(),
            Some((ToastKind::Success, "Records deleted successfully!".to_owned()))
        );
    }

    #[test]
    fn delete_without_selection_only_warns() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('d'));
        assert_eq!(harness.state.mode, AppMode::Grid);
        assert_eq!(harness.status().map(|status| status.0), Some(ToastKind::Warning));
    }

    #[test]
    fn search_collects_filters_and_reports_outcomes() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('/'));
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::Search));

        harness.key(KeyCode::Enter);
        assert_eq!(
            harness.status(),
            Some((ToastKind::Warning, "No results found".to_owned()))
        );
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::Search));

        harness.key(KeyCode::Right);
        harness.key(KeyCode::Tab);
        harness.type_text("Av");
        harness.runtime.search_result = Some(sample_page(2));
        harness.key(KeyCode::Enter);

        let request = harness.runtime.search_requests.last().cloned().unwrap_or_default();
        let filter = request.filters.get("name").expect("name filter");
        assert_eq!(filter.operator, "Contains");
        assert_eq!(filter.value, "Av");
        assert!(request.sort.is_empty());
        assert_eq!(harness.state.mode, AppMode::Grid);
        assert_eq!(harness.grid().rows().len(), 2);
        assert_eq!(
            harness.status(),
            Some((ToastKind::Success, "Search complete".to_owned()))
        );

        harness.runtime.search_error = Some("boom".to_owned());
        harness.key(KeyCode::Char('/'));
        harness.key(KeyCode::Enter);
        let status = harness.status().unwrap_or((ToastKind::Success, String::new()));
        assert_eq!(status.0, ToastKind::Danger);
        assert!(status.1.starts_with("Search failed"), "{}", status.1);
    }

    #[test]
    fn global_search_operator_fetches_suggestions() {
        let mut runtime = TestRuntime::customers();
        runtime.gsearch_results = names(&["Avery Walker", "Avery Reed", "Kai Ward"]);
        let mut harness = Harness::start(runtime);
        harness.key(KeyCode::Char('/'));
        for _ in 0..3 {
            harness.key(KeyCode::Right);
        }
        harness.key(KeyCode::Tab);
        harness.type_text("av");
        harness.key(KeyCode::Down);
        harness.key(KeyCode::Enter);

        let form = harness.view_data.searches.get("customers").expect("search form");
        assert_eq!(form.rows()[0].operator(), Some("GSearch"));
        assert_eq!(form.rows()[0].value, "Avery Walker");
    }

    #[test]
    fn sort_key_toggles_direction_and_persists() -> Result<()> {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('l'));
        harness.key(KeyCode::Char('s'));

        let age = |harness: &Harness| {
            let grid = harness.grid();
            let column = grid
                .columns()
                .iter()
                .find(|column| column.field == "age")
                .cloned()
                .expect("age column");
            header_label(grid, &column)
        };
        assert_eq!(age(&harness), "Age ↑");
        let ages: Vec<i64> = harness
            .grid()
            .rows()
            .iter()
            .map(|row| row.text("age").parse().unwrap_or_default())
            .collect();
        let mut sorted = ages.clone();
        sorted.sort_unstable();
        assert_eq!(ages, sorted);

        harness.key(KeyCode::Char('s'));
        assert_eq!(age(&harness), "Age ↓");
        assert!(
            harness
                .runtime
                .storage
                .get_raw(&LayoutSlice::ColumnSort.key("customers"))?
                .is_some()
        );

        harness.key(KeyCode::Char('S'));
        assert_eq!(age(&harness), "Age");
        Ok(())
    }

    #[test]
    fn keyboard_moves_and_resizes_columns() -> Result<()> {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('>'));
        assert_eq!(harness.visible(), names(&["age", "name", "birthday", "job"]));
        assert_eq!(harness.view_data.cursor.col, 1);

        for _ in 0..6 {
            harness.key(KeyCode::Char('-'));
        }
        assert_eq!(harness.grid().column_width("name"), 100);
        assert!(
            harness
                .runtime
                .storage
                .get_raw(&LayoutSlice::ColumnOrder.key("customers"))?
                .is_some()
        );
        Ok(())
    }

    #[test]
    fn column_picker_rejects_hiding_everything() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('c'));
        harness.key(KeyCode::Char('n'));
        harness.key(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::Columns));
        assert_eq!(harness.status().map(|status| status.0), Some(ToastKind::Warning));

        harness.key(KeyCode::Char('a'));
        harness.key(KeyCode::Char(' '));
        harness.key(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Grid);
        assert_eq!(harness.visible(), names(&["age", "birthday", "job"]));
    }

    #[test]
    fn saving_over_an_existing_name_asks_first() {
        let runtime = TestRuntime::customers().with_bundle(
            3,
            "Wide",
            false,
            "",
            layout(&["name", "age", "birthday", "job"]),
        );
        let mut harness = Harness::start(runtime);
        harness.key(KeyCode::Char('L'));
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::Layouts));

        harness.key(KeyCode::Char('s'));
        harness.key(KeyCode::Enter);
        assert_eq!(harness.status().map(|status| status.0), Some(ToastKind::Warning));
        assert!(harness.runtime.saved.is_empty());

        harness.type_text("Wide");
        harness.key(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::ConfirmOverwrite));
        assert!(harness.runtime.saved.is_empty());

        harness.key(KeyCode::Char('y'));
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::Layouts));
        assert_eq!(harness.runtime.saved.len(), 1);
        assert_eq!(harness.runtime.saved[0].0, "Wide");
        assert!(harness.view_data.bundles.naming.is_none());
    }

    #[test]
    fn bundle_list_marks_only_the_resolved_default() {
        let runtime = TestRuntime::customers()
            .with_bundle(1, "Old", true, "2026-01-01", layout(&["name"]))
            .with_bundle(2, "New", true, "2026-03-01", layout(&["age"]));
        let mut harness = Harness::start(runtime);
        harness.key(KeyCode::Char('L'));
        let text = render_bundles_text(&harness.view_data.bundles);
        assert_eq!(text.matches("[default]").count(), 1);
        assert!(text.contains("New [default]"), "{text}");
    }

    #[test]
    fn tab_layout_switches_table_only_when_needed() {
        let tabs = |tags: &[&str], selected: &str| {
            BundlePayload::TabLayout(TabLayoutData {
                tags: names(tags),
                tab_texts: Vec::new(),
                selected_tag: selected.to_owned(),
            })
        };
        let runtime =
            TestRuntime::customers().with_bundle(9, "Pair", false, "", tabs(&["customers", "orders"], "customers"));
        let mut harness = Harness::start(runtime);
        let loads = harness.runtime.loaded_tables.len();

        harness.key(KeyCode::Char('T'));
        harness.key(KeyCode::Enter);
        assert_eq!(harness.state.tabs.len(), 2);
        assert_eq!(harness.state.active_table(), "customers");
        assert_eq!(harness.runtime.loaded_tables.len(), loads);

        let runtime =
            TestRuntime::customers().with_bundle(4, "Orders first", true, "", tabs(&["orders", "customers"], "orders"));
        let harness = Harness::start(runtime);
        assert_eq!(harness.state.active_table(), "orders");
        assert!(harness.view_data.grids.contains_key("orders"));
    }

    #[test]
    fn opening_and_closing_tabs() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('o'));
        harness.type_text("orders");
        harness.key(KeyCode::Enter);
        assert_eq!(harness.state.active_table(), "orders");
        assert!(harness.view_data.grids.contains_key("orders"));

        harness.key(KeyCode::Char('x'));
        assert_eq!(harness.state.active_table(), "customers");
        assert!(!harness.view_data.grids.contains_key("orders"));

        harness.key(KeyCode::Char('x'));
        assert_eq!(
            harness.status(),
            Some((ToastKind::Warning, "cannot close the last tab".to_owned()))
        );
    }

    #[test]
    fn edit_prefills_and_updates() {
        let mut harness = Harness::start(TestRuntime::customers());
        let name = harness.grid().rows()[0].text("name");
        harness.key(KeyCode::Char('e'));
        assert_eq!(harness.form_value("name"), name);
        harness.key(KeyCode::Enter);
        assert_eq!(harness.runtime.update_requests.len(), 1);
        assert_eq!(harness.runtime.update_requests[0].0, RecordId::new(1));
        assert_eq!(
            harness.status(),
            Some((ToastKind::Success, "Record updated successfully!".to_owned()))
        );
    }

    #[test]
    fn mouse_resizes_then_drags_headers() -> Result<()> {
        let mut harness = Harness::start(TestRuntime::customers());
        // Header row sits under the table border; name spans px 50..200.
        harness.mouse(MouseEventKind::Down(MouseButton::Left), 19, 4);
        assert!(harness.grid().interaction().is_resizing());
        harness.mouse(MouseEventKind::Drag(MouseButton::Left), 24, 4);
        assert_eq!(harness.grid().column_width("name"), 200);
        harness.mouse(MouseEventKind::Up(MouseButton::Left), 24, 4);
        assert!(harness.grid().interaction().is_idle());
        assert!(
            harness
                .runtime
                .storage
                .get_raw(&LayoutSlice::ColumnWidths.key("customers"))?
                .is_some()
        );

        harness.mouse(MouseEventKind::Down(MouseButton::Left), 10, 4);
        assert!(harness.grid().interaction().is_dragging());
        harness.mouse(MouseEventKind::Drag(MouseButton::Left), 36, 4);
        harness.mouse(MouseEventKind::Up(MouseButton::Left), 36, 4);
        assert_eq!(harness.visible(), names(&["age", "name", "birthday", "job"]));
        Ok(())
    }

    #[test]
    fn stale_clear_tokens_are_ignored() {
        let mut harness = Harness::start(TestRuntime::customers());
        emit_status(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            Toast::success("first"),
        );
        emit_status(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            Toast::success("second"),
        );
        let (tx, rx) = mpsc::channel();
        let stale = harness.view_data.status_token - 1;
        tx.send(InternalEvent::ClearStatus { token: stale })
            .expect("send stale token");
        process_internal_events(&mut harness.state, &mut harness.view_data, &rx);
        assert!(harness.state.status.is_some());

        tx.send(InternalEvent::ClearStatus {
            token: harness.view_data.status_token,
        })
        .expect("send current token");
        process_internal_events(&mut harness.state, &mut harness.view_data, &rx);
        assert!(harness.state.status.is_none());
    }

    #[test]
    fn empty_grid_renders_placeholder_row() -> Result<()> {
        let mut runtime = TestRuntime::customers();
        runtime.page.rows.clear();
        runtime.page.total_count = Some(0);
        let harness = Harness::start(runtime);

        let mut terminal = Terminal::new(TestBackend::new(120, 30))?;
        terminal.draw(|frame| render(frame, &harness.state, &harness.view_data))?;
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("No data found."));
        assert!(screen.contains("Customers | 0 total"));
        assert!(status_text(&harness.state, &harness.view_data).starts_with("GRID |"));
        Ok(())
    }

    #[test]
    fn control_chords_do_not_map_to_grid_commands() {
        assert_eq!(
            grid_command_for_key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(
            grid_command_for_key(KeyEvent::new(KeyCode::Char('L'), KeyModifiers::SHIFT)),
            Some(GridCommand::OpenBundles(BundleKind::Layout))
        );
    }

    #[test]
    fn ctrl_q_quits_from_any_mode() {
        let mut harness = Harness::start(TestRuntime::customers());
        harness.key(KeyCode::Char('?'));
        assert_eq!(harness.state.mode, AppMode::Overlay(Overlay::Help));
        assert!(harness.key_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }
}
