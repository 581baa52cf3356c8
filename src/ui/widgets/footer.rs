//! Footer widget with keybinding hints

use crate::app::App;
use crate::state::{ConnectionStatus, EditorForm, FocusedPanel};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Render list view footer
pub fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let mut hints = vec![
        ("Enter", "Toggle"),
        ("Space", "Connect"),
        ("n", "New"),
        ("e", "Edit"),
        ("x", "Delete"),
        ("t", "Test"),
        ("Tab", "Switch Panel"),
        ("?", "Help"),
        ("q", "Quit"),
    ];

    if app.state.connection_status != ConnectionStatus::Disconnected {
        hints[1] = ("Space", "Disconnect");
    }
    if app.focused_panel == FocusedPanel::Logs {
        hints = vec![
            ("j/k", "Scroll"),
            ("G", "Follow"),
            ("Tab", "Switch Panel"),
            ("?", "Help"),
            ("q", "Quit"),
        ];
    }

    render_hints(frame, area, &hints);
}

/// Render editor footer
pub fn render_editor(frame: &mut Frame, form: &EditorForm, area: Rect) {
    let hints: &[(&str, &str)] = if form.saving {
        &[("", "Saving...")]
    } else {
        &[
            ("Tab/↓", "Next Field"),
            ("Shift+Tab/↑", "Previous"),
            ("Enter", "Save"),
            ("Esc", "Cancel"),
        ]
    };
    render_hints(frame, area, hints);
}

fn render_hints(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = Vec::new();
    spans.push(Span::raw(" "));

    for (i, (key, action)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", Style::default().fg(Color::DarkGray)));
        }
        if !key.is_empty() {
            spans.push(Span::styled(
                "[",
                Style::default().fg(Color::Rgb(60, 60, 60)),
            ));
            spans.push(Span::styled(
                *key,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                "]",
                Style::default().fg(Color::Rgb(60, 60, 60)),
            ));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(*action, Style::default().fg(Color::DarkGray)));
    }

    let line = Line::from(spans);
    let area_width = area.width as usize;
    let line_width = line.width();

    frame.render_widget(Paragraph::new(line), area);

    let version = format!("v{} ", crate::constants::APP_VERSION);
    if area_width > line_width + version.len() + 2 {
        #[allow(clippy::cast_possible_truncation)]
        let version_area = Rect::new(
            area.x + area.width - version.len() as u16,
            area.y,
            version.len() as u16,
            1,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                version,
                Style::default().fg(Color::Rgb(60, 60, 60)),
            )),
            version_area,
        );
    }
}
