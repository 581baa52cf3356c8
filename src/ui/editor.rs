//! Profile editor view.

use crate::app::App;
use crate::state::{EditorField, EditorForm, InputMode};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::widgets;
use crate::theme;
use crate::utils;

/// Render the editor view in place of the profile list
pub fn render(frame: &mut Frame, app: &App) {
    let InputMode::Editor(form) = &app.input_mode else {
        return;
    };

    let chunks = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(frame.area());
    widgets::footer::render_editor(frame, form, chunks[1]);

    // Each field takes a label row, an input row, an error row and a spacer.
    #[allow(clippy::cast_possible_truncation)]
    let height = (EditorField::ALL.len() as u16) * 4 + 3;
    let [column] = Layout::horizontal([Constraint::Max(64)])
        .flex(Flex::Center)
        .areas(chunks[0]);
    let [area] = Layout::vertical([Constraint::Max(height)])
        .flex(Flex::Center)
        .areas(column);

    let title = if form.id.is_some() {
        " Edit Profile "
    } else {
        " New Profile "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ACCENT_PRIMARY))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical(EditorField::ALL.map(|_| Constraint::Length(4))).split(inner);
    for (field, row) in EditorField::ALL.into_iter().zip(rows.iter()) {
        render_field(frame, form, field, *row);
    }
}

fn render_field(frame: &mut Frame, form: &EditorForm, field: EditorField, area: Rect) {
    let focused = form.focused == field;
    let value = form.value(field);
    let shown = if field.is_secret() {
        utils::mask(value)
    } else {
        value.to_string()
    };

    let label_style = if focused {
        Style::default()
            .fg(theme::ACCENT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme::TEXT_SECONDARY)
    };

    let mut input = vec![
        Span::styled(" > ", Style::default().fg(theme::NORD_POLAR_NIGHT_4)),
        Span::styled(shown, Style::default().fg(theme::TEXT_PRIMARY)),
    ];
    if focused && !form.saving {
        input.push(Span::styled(
            "█",
            Style::default()
                .fg(theme::ACCENT_PRIMARY)
                .add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    let error = form.visible_error(field).map_or_else(
        || Line::from(""),
        |message| Line::from(Span::styled(format!("   {message}"), Style::default().fg(theme::ERROR))),
    );

    let lines = vec![
        Line::from(Span::styled(format!(" {}", field.label()), label_style)),
        Line::from(input),
        error,
    ];
    frame.render_widget(Paragraph::new(lines), area);
}
