//! Core application state and logic.
//!
//! This module contains the main [`App`] struct behind the terminal UI. The
//! app never touches proxy settings itself: every action becomes a request to
//! the background worker, and the view re-renders from the state broadcasts
//! the worker emits after each save.

use std::sync::mpsc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::TableState;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::constants;
use crate::core::manager::ToggleStatus;
use crate::core::router::{ConnectionReport, Request, Response};
use crate::core::WorkerHandle;
use crate::state::{
    ApplicationState, EditorForm, FocusedPanel, InputMode, Toast, ToastType,
};

/// What a pending worker reply answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Refresh,
    Toggle,
    Save,
    Delete,
    Test,
}

/// Main application state container.
pub struct App {
    /// Flag indicating the application should exit.
    pub should_quit: bool,

    /// Last state received from the worker.
    pub state: ApplicationState,

    // === UI State ===
    pub focused_panel: FocusedPanel,
    pub input_mode: InputMode,
    pub show_help: bool,
    pub profile_list_state: TableState,
    pub toast: Option<Toast>,
    pub terminal_size: (u16, u16),
    pub logs_scroll: u16,
    pub logs_auto_scroll: bool,
    /// Result of the last `t` connection test.
    pub last_test: Option<ConnectionReport>,
    /// A `TEST_CONNECTION` is in flight.
    pub testing: bool,
    /// Saved profile to select once its state arrives.
    pending_selection: Option<String>,

    // === Worker ===
    worker: WorkerHandle,
    runtime: Handle,
    updates: broadcast::Receiver<ApplicationState>,
    replies_tx: mpsc::Sender<(Action, Response)>,
    replies_rx: mpsc::Receiver<(Action, Response)>,
}

impl App {
    /// Creates the app and requests the initial state.
    pub fn new(worker: WorkerHandle, runtime: Handle) -> Self {
        let (replies_tx, replies_rx) = mpsc::channel();
        let updates = worker.subscribe();
        let mut app = Self {
            should_quit: false,
            state: ApplicationState::default(),
            focused_panel: FocusedPanel::Profiles,
            input_mode: InputMode::Normal,
            show_help: false,
            profile_list_state: TableState::default(),
            toast: None,
            terminal_size: (80, 24),
            logs_scroll: 0,
            logs_auto_scroll: true,
            last_test: None,
            testing: false,
            pending_selection: None,
            worker,
            runtime,
            updates,
            replies_tx,
            replies_rx,
        };
        app.send(Action::Refresh, Request::GetProxyData);
        app
    }

    /// Sends a request without blocking the UI; the reply is picked up by
    /// [`process_external`](Self::process_external).
    fn send(&self, action: Action, request: Request) {
        let worker = self.worker.clone();
        let replies = self.replies_tx.clone();
        self.runtime.spawn(async move {
            let response = worker.request(request).await;
            let _ = replies.send((action, response));
        });
    }

    /// Drains state broadcasts and worker replies.
    pub fn process_external(&mut self) {
        loop {
            match self.updates.try_recv() {
                Ok(state) => self.apply_state(state),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        while let Ok((action, response)) = self.replies_rx.try_recv() {
            self.handle_reply(action, response);
        }
    }

    fn apply_state(&mut self, state: ApplicationState) {
        let selected_id = self
            .pending_selection
            .take()
            .or_else(|| self.selected_profile().map(|p| p.id.clone()));
        self.state = state;

        let index = selected_id
            .and_then(|id| self.state.profiles.iter().position(|p| p.id == id))
            .or_else(|| {
                let len = self.state.profiles.len();
                (len > 0).then(|| self.profile_list_state.selected().unwrap_or(0).min(len - 1))
            });
        self.profile_list_state.select(index);
    }

    fn handle_reply(&mut self, action: Action, response: Response) {
        if let Some(message) = response.error_message() {
            if action == Action::Save {
                if let InputMode::Editor(form) = &mut self.input_mode {
                    form.saving = false;
                }
            }
            if action == Action::Test {
                self.testing = false;
            }
            self.show_toast(message.to_string(), ToastType::Error);
            return;
        }

        match (action, response) {
            (Action::Refresh, Response::State(state)) => self.apply_state(state),
            (Action::Toggle, Response::Toggled { status }) => {
                let message = match status {
                    ToggleStatus::Enabled => "Proxy enabled",
                    ToggleStatus::Disabled => "Proxy disabled",
                };
                self.show_toast(message.to_string(), ToastType::Success);
            }
            (Action::Save, Response::Saved { profile_id, .. }) => {
                self.input_mode = InputMode::Normal;
                match self.state.profiles.iter().position(|p| p.id == profile_id) {
                    Some(index) => self.profile_list_state.select(Some(index)),
                    None => self.pending_selection = Some(profile_id),
                }
                self.show_toast("Profile saved".to_string(), ToastType::Success);
            }
            (Action::Delete, Response::Deleted { .. }) => {
                self.show_toast("Profile deleted".to_string(), ToastType::Info);
            }
            (Action::Test, Response::Connection(report)) => {
                self.testing = false;
                let toast = match &report {
                    ConnectionReport::Connected { ping } => {
                        (format!("Connection OK ({ping} ms)"), ToastType::Success)
                    }
                    ConnectionReport::Error { error } => {
                        (format!("Connection test failed: {error}"), ToastType::Error)
                    }
                };
                self.last_test = Some(report);
                self.show_toast(toast.0, toast.1);
            }
            (action, response) => {
                log::warn!("[ui] Unexpected reply to {action:?}: {response:?}");
            }
        }
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match &self.input_mode {
            InputMode::Normal => self.handle_normal_keys(key),
            InputMode::Editor(_) => self.handle_editor_keys(key),
            InputMode::ConfirmDelete { id, .. } => {
                let id = id.clone();
                self.handle_confirm_delete_keys(key, id);
            }
        }
    }

    fn handle_normal_keys(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab | KeyCode::BackTab => self.next_panel(),
            KeyCode::Char(' ') => self.global_toggle(),
            KeyCode::Char('n') => self.input_mode = InputMode::Editor(EditorForm::default()),
            KeyCode::Char('e') => {
                if let Some(profile) = self.selected_profile() {
                    self.input_mode = InputMode::Editor(EditorForm::from_profile(profile));
                } else {
                    self.show_toast(constants::MSG_SELECT_PROFILE.to_string(), ToastType::Info);
                }
            }
            KeyCode::Char('t') => {
                if !self.testing {
                    self.testing = true;
                    self.show_toast("Testing connection...".to_string(), ToastType::Info);
                    self.send(Action::Test, Request::TestConnection);
                }
            }
            _ => self.handle_panel_keys(key),
        }
    }

    fn handle_panel_keys(&mut self, key: KeyEvent) {
        match self.focused_panel {
            FocusedPanel::Profiles => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.profile_previous(),
                KeyCode::Down | KeyCode::Char('j') => self.profile_next(),
                KeyCode::Enter => {
                    if let Some(id) = self.selected_profile().map(|p| p.id.clone()) {
                        self.send(Action::Toggle, Request::ToggleProxy { profile_id: id });
                    }
                }
                KeyCode::Char('x') | KeyCode::Delete => {
                    if let Some(profile) = self.selected_profile() {
                        self.input_mode = InputMode::ConfirmDelete {
                            id: profile.id.clone(),
                            name: profile.name.clone(),
                        };
                    }
                }
                _ => {}
            },
            FocusedPanel::Logs => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.logs_auto_scroll = false;
                    self.logs_scroll = self.logs_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.logs_scroll = self.logs_scroll.saturating_add(1);
                }
                KeyCode::End | KeyCode::Char('G') => self.logs_auto_scroll = true,
                _ => {}
            },
        }
    }

    fn handle_editor_keys(&mut self, key: KeyEvent) {
        let InputMode::Editor(form) = &mut self.input_mode else {
            return;
        };
        if form.saving {
            return;
        }

        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Tab | KeyCode::Down => form.focused = form.focused.next(),
            KeyCode::BackTab | KeyCode::Up => form.focused = form.focused.previous(),
            KeyCode::Backspace => form.pop_char(),
            KeyCode::Enter => {
                form.submitted = true;
                if form.is_valid() {
                    form.saving = true;
                    let draft = form.to_draft();
                    self.send(Action::Save, Request::SaveProfile { profile: draft });
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                form.push_char(c);
            }
            _ => {}
        }
    }

    fn handle_confirm_delete_keys(&mut self, key: KeyEvent, id: String) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.send(Action::Delete, Request::DeleteProfile { profile_id: id });
            }
            KeyCode::Char('n') | KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }

    /// Connect/disconnect button: the active profile if any, else the selection.
    fn global_toggle(&mut self) {
        let target = self
            .state
            .active_profile_id
            .clone()
            .or_else(|| self.selected_profile().map(|p| p.id.clone()));
        match target {
            Some(profile_id) => self.send(Action::Toggle, Request::ToggleProxy { profile_id }),
            None => self.show_toast(constants::MSG_SELECT_PROFILE.to_string(), ToastType::Info),
        }
    }

    pub fn selected_profile(&self) -> Option<&crate::state::ProxyProfile> {
        self.profile_list_state
            .selected()
            .and_then(|i| self.state.profiles.get(i))
    }

    fn next_panel(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Profiles => FocusedPanel::Logs,
            FocusedPanel::Logs => FocusedPanel::Profiles,
        };
    }

    fn profile_next(&mut self) {
        let len = self.state.profiles.len();
        if len == 0 {
            return;
        }
        let i = match self.profile_list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.profile_list_state.select(Some(i));
    }

    fn profile_previous(&mut self) {
        let len = self.state.profiles.len();
        if len == 0 {
            return;
        }
        let i = match self.profile_list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.profile_list_state.select(Some(i));
    }

    /// Show a toast notification and log it
    fn show_toast(&mut self, message: String, toast_type: ToastType) {
        match toast_type {
            ToastType::Error => log::warn!("[ui] {message}"),
            ToastType::Info | ToastType::Success => log::info!("[ui] {message}"),
        }
        self.toast = Some(Toast::new(message, toast_type));
    }

    /// Called on each tick
    pub fn on_tick(&mut self) {
        self.process_external();
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    /// Called when terminal is resized
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
    }
}
