// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::format::table_title;
use crate::model::{TabLayoutData, Toast};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    RecordForm,
    Search,
    Columns,
    Layouts,
    SearchPatterns,
    TabLayouts,
    ConfirmDelete,
    ConfirmOverwrite,
    ConfirmBundleDelete,
    OpenTable,
    Help,
}

impl Overlay {
    pub const fn title(self) -> &'static str {
        match self {
            Self::RecordForm => "Record",
            Self::Search => "Search",
            Self::Columns => "Columns",
            Self::Layouts => "Layouts",
            Self::SearchPatterns => "Search patterns",
            Self::TabLayouts => "Tab layouts",
            Self::ConfirmDelete => "Delete records",
            Self::ConfirmOverwrite => "Overwrite",
            Self::ConfirmBundleDelete => "Delete",
            Self::OpenTable => "Open table",
            Self::Help => "Help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Grid,
    Overlay(Overlay),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTab {
    pub tag: String,
    pub title: String,
}

impl OpenTab {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            title: table_title(tag),
        }
    }
}

/// Persisted set of open tabs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TabSession {
    pub tabs: Vec<OpenTab>,
    pub active: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub tabs: Vec<OpenTab>,
    pub active_tab: usize,
    pub status: Option<Toast>,
}

impl AppState {
    pub fn new(table: &str) -> Self {
        Self {
            mode: AppMode::Grid,
            tabs: vec![OpenTab::new(table)],
            active_tab: 0,
            status: None,
        }
    }

    /// Restores a saved session. Falls back to `table` when the session is empty.
    pub fn from_session(session: &TabSession, table: &str) -> Self {
        let tabs: Vec<OpenTab> = session
            .tabs
            .iter()
            .filter(|tab| !tab.tag.trim().is_empty())
            .cloned()
            .collect();
        if tabs.is_empty() {
            return Self::new(table);
        }
        let active_tab = tabs
            .iter()
            .position(|tab| tab.tag == session.active)
            .unwrap_or(0);
        Self {
            mode: AppMode::Grid,
            tabs,
            active_tab,
            status: None,
        }
    }

    pub fn active_table(&self) -> &str {
        self.tabs
            .get(self.active_tab)
            .map(|tab| tab.tag.as_str())
            .unwrap_or_default()
    }

    pub fn session(&self) -> TabSession {
        TabSession {
            tabs: self.tabs.clone(),
            active: self.active_table().to_owned(),
        }
    }

    pub fn tab_layout_data(&self) -> TabLayoutData {
        TabLayoutData {
            tags: self.tabs.iter().map(|tab| tab.tag.clone()).collect(),
            tab_texts: self.tabs.iter().map(|tab| tab.title.clone()).collect(),
            selected_tag: self.active_table().to_owned(),
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::OpenTable(tag) => self.open_table(&tag),
            AppCommand::CloseTab => self.close_tab(),
            AppCommand::ApplyTabLayout(data) => self.apply_tab_layout(&data),
            AppCommand::OpenOverlay(overlay) => {
                self.mode = AppMode::Overlay(overlay);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::CloseOverlay => {
                self.mode = AppMode::Grid;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::Notify(toast) => vec![self.set_status(toast)],
            AppCommand::ClearStatus => {
                self.status = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        if self.tabs.len() < 2 {
            return Vec::new();
        }
        let len = self.tabs.len() as isize;
        self.active_tab = (self.active_tab as isize + delta).rem_euclid(len) as usize;
        vec![AppEvent::TableChanged(self.active_table().to_owned())]
    }

    fn open_table(&mut self, tag: &str) -> Vec<AppEvent> {
        let tag = tag.trim();
        if tag.is_empty() {
            return vec![self.set_status(Toast::warning("enter a table name"))];
        }
        let mut events = Vec::new();
        match self.tabs.iter().position(|tab| tab.tag == tag) {
            Some(index) => self.active_tab = index,
            None => {
                self.tabs.push(OpenTab::new(tag));
                self.active_tab = self.tabs.len() - 1;
                events.push(AppEvent::TabsChanged);
            }
        }
        events.push(AppEvent::TableChanged(tag.to_owned()));
        events
    }

    fn close_tab(&mut self) -> Vec<AppEvent> {
        if self.tabs.len() < 2 {
            return vec![self.set_status(Toast::warning("cannot close the last tab"))];
        }
        self.tabs.remove(self.active_tab);
        self.active_tab = self.active_tab.min(self.tabs.len() - 1);
        vec![
            AppEvent::TabsChanged,
            AppEvent::TableChanged(self.active_table().to_owned()),
        ]
    }

    /// Replaces the tabs. Switches tables only if the selected tab differs
    /// from the one currently shown.
    fn apply_tab_layout(&mut self, data: &TabLayoutData) -> Vec<AppEvent> {
        let tabs: Vec<OpenTab> = data
            .tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| !tag.trim().is_empty())
            .map(|(index, tag)| OpenTab {
                tag: tag.clone(),
                title: data
                    .tab_texts
                    .get(index)
                    .filter(|title| !title.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| table_title(tag)),
            })
            .collect();
        if tabs.is_empty() {
            return vec![self.set_status(Toast::warning("tab layout has no tabs"))];
        }

        let previous = self.active_table().to_owned();
        let active_tab = tabs
            .iter()
            .position(|tab| tab.tag == data.selected_tag)
            .unwrap_or(0);
        self.tabs = tabs;
        self.active_tab = active_tab;

        let mut events = vec![AppEvent::TabsChanged];
        if self.active_table() != previous {
            events.push(AppEvent::TableChanged(self.active_table().to_owned()));
        }
        events
    }

    fn set_status(&mut self, toast: Toast) -> AppEvent {
        self.status = Some(toast.clone());
        AppEvent::StatusUpdated(toast)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    OpenTable(String),
    CloseTab,
    ApplyTabLayout(TabLayoutData),
    OpenOverlay(Overlay),
    CloseOverlay,
    Notify(Toast),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TableChanged(String),
    TabsChanged,
    StatusUpdated(Toast),
    StatusCleared,
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppMode, AppState, OpenTab, Overlay, TabSession};
    use crate::model::{TabLayoutData, Toast};

    fn layout(tags: &[&str], selected: &str) -> TabLayoutData {
        TabLayoutData {
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
            tab_texts: Vec::new(),
            selected_tag: selected.to_owned(),
        }
    }

    #[test]
    fn tab_rotation_wraps() {
        let mut state = AppState::new("customers");
        state.dispatch(AppCommand::OpenTable("orders".to_owned()));
        assert_eq!(state.active_table(), "orders");

        let events = state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_table(), "customers");
        assert_eq!(events, vec![AppEvent::TableChanged("customers".to_owned())]);
    }

    #[test]
    fn opening_a_known_table_switches_without_adding() {
        let mut state = AppState::new("customers");
        state.dispatch(AppCommand::OpenTable("orders".to_owned()));
        let events = state.dispatch(AppCommand::OpenTable("customers".to_owned()));
        assert_eq!(state.tabs.len(), 2);
        assert_eq!(events, vec![AppEvent::TableChanged("customers".to_owned())]);
    }

    #[test]
    fn last_tab_cannot_close() {
        let mut state = AppState::new("customers");
        let events = state.dispatch(AppCommand::CloseTab);
        assert_eq!(state.tabs.len(), 1);
        assert_eq!(
            events,
            vec![AppEvent::StatusUpdated(Toast::warning(
                "cannot close the last tab"
            ))],
        );
    }

    #[test]
    fn tab_layout_navigates_only_when_active_tab_differs() {
        let mut state = AppState::new("customers");

        let same = state.dispatch(AppCommand::ApplyTabLayout(layout(
            &["orders", "customers"],
            "customers",
        )));
        assert_eq!(same, vec![AppEvent::TabsChanged]);
        assert_eq!(state.active_tab, 1);
        assert_eq!(state.tabs[0].title, "Orders");

        let moved = state.dispatch(AppCommand::ApplyTabLayout(layout(
            &["orders", "customers"],
            "orders",
        )));
        assert_eq!(
            moved,
            vec![
                AppEvent::TabsChanged,
                AppEvent::TableChanged("orders".to_owned()),
            ],
        );
    }

    #[test]
    fn tab_layout_round_trips_titles() {
        let mut state = AppState::new("customers");
        state.dispatch(AppCommand::OpenTable("orders".to_owned()));
        let data = state.tab_layout_data();
        assert_eq!(data.tab_texts, vec!["Customers", "Orders"]);
        assert_eq!(data.selected_tag, "orders");

        let mut other = AppState::new("orders");
        other.dispatch(AppCommand::ApplyTabLayout(data));
        assert_eq!(other.tabs, state.tabs);
    }

    #[test]
    fn session_restores_active_tab() {
        let session = TabSession {
            tabs: vec![OpenTab::new("customers"), OpenTab::new("orders")],
            active: "orders".to_owned(),
        };
        let state = AppState::from_session(&session, "fallback");
        assert_eq!(state.active_table(), "orders");
        assert_eq!(state.session(), session);

        let empty = AppState::from_session(&TabSession::default(), "fallback");
        assert_eq!(empty.active_table(), "fallback");
    }

    #[test]
    fn overlays_switch_mode() {
        let mut state = AppState::new("customers");
        state.dispatch(AppCommand::OpenOverlay(Overlay::Search));
        assert_eq!(state.mode, AppMode::Overlay(Overlay::Search));
        state.dispatch(AppCommand::CloseOverlay);
        assert_eq!(state.mode, AppMode::Grid);
    }

    #[test]
    fn status_set_and_cleared() {
        let mut state = AppState::new("customers");
        state.dispatch(AppCommand::Notify(Toast::success("saved")));
        assert_eq!(state.status, Some(Toast::success("saved")));
        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status, None);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
    }
}
