use crate::app::App;
use crate::logger;
use crate::state::{ConnectionStatus, FocusedPanel, InputMode};
use log::Level;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::widgets;
use crate::theme;
use crate::utils;

/// Render the profile list view
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // 1. Status Header (1 row)
    // 2. Main Content (Flexible)
    // 3. Command Footer (1 row)
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(area);

    render_status_header(frame, app, chunks[0]);
    widgets::footer::render_dashboard(frame, app, chunks[2]);

    // Main Content: Left (Profiles + Details) | Right (Activity Log)
    let main_layout = Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    let sidebar_layout = Layout::vertical([Constraint::Min(0), Constraint::Length(9)])
        .split(main_layout[0]);

    render_profiles(frame, app, sidebar_layout[0]);
    render_connection_details(frame, app, sidebar_layout[1]);
    render_activity_log(frame, app, main_layout[1]);

    if let InputMode::ConfirmDelete { name, .. } = &app.input_mode {
        render_delete_confirm(frame, name);
    }
}

fn status_style(status: ConnectionStatus) -> (&'static str, ratatui::style::Color) {
    match status {
        ConnectionStatus::Disconnected => ("○", theme::INACTIVE),
        ConnectionStatus::Connecting => ("◐", theme::WARNING),
        ConnectionStatus::Connected => ("●", theme::SUCCESS),
        ConnectionStatus::Error => ("✖", theme::ERROR),
    }
}

fn render_status_header(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.state.connection_status;
    let (icon, color) = status_style(status);
    let profile_name = app
        .state
        .active_profile()
        .map_or("None", |p| p.name.as_str());

    let line = Line::from(vec![
        Span::styled(
            format!(" PROXYFLOW v{} ", env!("CARGO_PKG_VERSION")),
            Style::default()
                .fg(theme::ACCENT_SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(" │ ", Style::default().fg(theme::NORD_POLAR_NIGHT_4)),
        Span::raw("Status: "),
        Span::styled(
            format!("{icon} {}", status.label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" ({profile_name})")),
        Span::styled(" │ ", Style::default().fg(theme::NORD_POLAR_NIGHT_4)),
        Span::raw("Ping: "),
        Span::styled(
            utils::format_ping(app.state.last_ping_ms),
            Style::default().fg(theme::TEXT_PRIMARY),
        ),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn render_profiles(frame: &mut Frame, app: &mut App, area: Rect) {
    let is_focused = app.focused_panel == FocusedPanel::Profiles;
    let border_style = if is_focused {
        Style::default().fg(theme::BORDER_FOCUSED)
    } else {
        Style::default().fg(theme::BORDER_DEFAULT)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" Profiles ({}) ", app.state.profiles.len()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.state.profiles.is_empty() {
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(""),
                Line::from("No profiles yet"),
                Line::from(Span::styled(
                    "Press [n] to add one",
                    Style::default().fg(theme::INACTIVE),
                )),
            ])
            .alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let (_, active_color) = status_style(app.state.connection_status);
    let items: Vec<Row> = app
        .state
        .profiles
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let is_selected = app.profile_list_state.selected() == Some(i);
            let is_active = app.state.is_active(&p.id);
            let status_char = if is_active { "●" } else { " " };

            let name = Line::from(vec![
                Span::styled(
                    format!("{:>3}. ", i + 1),
                    Style::default().fg(theme::NORD_POLAR_NIGHT_4),
                ),
                Span::styled(
                    status_char,
                    if is_active {
                        Style::default().fg(active_color)
                    } else {
                        Style::default()
                    },
                ),
                Span::raw(" "),
                Span::raw(utils::truncate(&p.name, 24)),
            ]);

            let style = if is_selected {
                Style::default()
                    .bg(theme::ROW_SELECTED_BG)
                    .fg(theme::ROW_SELECTED_FG)
                    .add_modifier(Modifier::BOLD)
            } else if is_active {
                Style::default().fg(active_color)
            } else {
                Style::default().fg(theme::INACTIVE)
            };

            Row::new(vec![
                Cell::from(name),
                Cell::from(Span::styled(
                    p.endpoint_summary(),
                    Style::default().fg(theme::TEXT_SECONDARY),
                )),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(items, [Constraint::Percentage(50), Constraint::Percentage(50)]);
    frame.render_stateful_widget(table, inner, &mut app.profile_list_state);
}

fn render_connection_details(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT))
        .title(" Connection Details ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(profile) = app.state.active_profile() else {
        frame.render_widget(
            Paragraph::new(vec![
                Line::from(""),
                Line::from("Direct connection"),
                Line::from(Span::styled(
                    "Select a profile & [Enter] to route through it.",
                    Style::default().fg(theme::INACTIVE),
                )),
            ])
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme::TEXT_SECONDARY)),
            inner,
        );
        return;
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(theme::TEXT_SECONDARY));
    let (icon, color) = status_style(app.state.connection_status);
    let mut text = vec![
        Line::from(vec![
            label("Profile : "),
            Span::styled(
                &profile.name,
                Style::default()
                    .fg(theme::ACCENT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            label("Proxy   : "),
            Span::styled(
                format!("{}:{}", profile.host, profile.port),
                Style::default().fg(theme::TEXT_PRIMARY),
            ),
        ]),
        Line::from(vec![
            label("Auth    : "),
            Span::styled(
                profile.username.as_deref().unwrap_or("none"),
                Style::default().fg(theme::TEXT_PRIMARY),
            ),
        ]),
        Line::from(vec![
            label("Status  : "),
            Span::styled(
                format!("{icon} {}", app.state.connection_status.label()),
                Style::default().fg(color),
            ),
        ]),
        Line::from(vec![
            label("Ping    : "),
            Span::styled(
                utils::format_ping(app.state.last_ping_ms),
                Style::default().fg(theme::ACCENT_SECONDARY),
            ),
        ]),
    ];

    if app.testing {
        text.push(Line::from(Span::styled(
            "Testing connection...",
            Style::default().fg(theme::WARNING),
        )));
    }

    frame.render_widget(Paragraph::new(text), inner);
}

fn render_activity_log(frame: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focused_panel == FocusedPanel::Logs;
    let border_style = if is_focused {
        Style::default().fg(theme::BORDER_FOCUSED)
    } else {
        Style::default().fg(theme::BORDER_DEFAULT)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(" Activity Log ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let entries = logger::get_logs();
    if entries.is_empty() {
        frame.render_widget(
            Paragraph::new("No activity yet").alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let logs: Vec<Line> = entries
        .iter()
        .map(|entry| {
            let style = match entry.level {
                Level::Error => Style::default().fg(theme::ERROR),
                Level::Warn => Style::default().fg(theme::WARNING),
                Level::Info => Style::default().fg(theme::TEXT_PRIMARY),
                Level::Debug | Level::Trace => Style::default().fg(theme::INACTIVE),
            };

            Line::from(vec![
                Span::styled(
                    format!("[{}] ", utils::format_clock(entry.timestamp)),
                    Style::default().fg(theme::TEXT_SECONDARY),
                ),
                Span::styled(
                    format!("{}: ", entry.category),
                    Style::default().fg(theme::ACCENT_SECONDARY),
                ),
                Span::styled(entry.message.as_str(), style),
            ])
        })
        .collect();

    #[allow(clippy::cast_possible_truncation)]
    let scroll_offset = if app.logs_auto_scroll {
        logs.len().saturating_sub(inner.height as usize) as u16
    } else {
        app.logs_scroll
    };

    frame.render_widget(
        Paragraph::new(logs)
            .wrap(ratatui::widgets::Wrap { trim: true })
            .scroll((scroll_offset, 0)),
        inner,
    );
}

fn render_delete_confirm(frame: &mut Frame, name: &str) {
    let area = frame.area();
    let popup_layout = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Percentage(20),
        Constraint::Percentage(40),
    ])
    .split(area);

    let popup_area = Layout::horizontal([
        Constraint::Percentage(25),
        Constraint::Percentage(50),
        Constraint::Percentage(25),
    ])
    .split(popup_layout[1])[1];

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ERROR))
        .title(" Confirm Deletion ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("Delete profile "),
            Span::styled(
                name,
                Style::default()
                    .fg(theme::ACCENT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("?"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                " [Y] Yes, Delete ",
                Style::default()
                    .fg(theme::ERROR)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled(
                " [N] Cancel ",
                Style::default().fg(theme::NORD_POLAR_NIGHT_4),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
}
