//! UI rendering module

mod dashboard;
mod editor;
mod overlays;
mod widgets;

use crate::app::App;
use crate::state::InputMode;
use ratatui::Frame;

/// Main render function - dispatches to appropriate view
pub fn render(frame: &mut Frame, app: &mut App) {
    // The editor replaces the list view while open
    if matches!(app.input_mode, InputMode::Editor(_)) {
        editor::render(frame, app);
    } else {
        dashboard::render(frame, app);
    }

    if app.show_help {
        overlays::help::render(frame);
    }

    if app.toast.is_some() {
        overlays::toast::render(frame, app);
    }
}
