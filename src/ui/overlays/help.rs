//! Help overlay

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "GLOBAL CONTROLS",
        &[
            ("Tab", "Switch focus (Profiles/Logs)"),
            ("?", "Toggle help"),
            ("q", "Quit application"),
        ],
    ),
    (
        "PROFILES",
        &[
            ("j/k", "Navigate list"),
            ("Enter", "Activate or deactivate selected"),
            ("Space", "Connect selected / disconnect active"),
            ("n", "New profile"),
            ("e", "Edit selected profile"),
            ("x", "Delete selected profile"),
            ("t", "Test connection through active proxy"),
        ],
    ),
    (
        "PROFILE EDITOR",
        &[
            ("Tab/↓", "Next field"),
            ("Enter", "Save profile"),
            ("Esc", "Discard changes"),
        ],
    ),
    (
        "ACTIVITY LOG",
        &[("j/k", "Scroll logs"), ("G", "Follow newest entries")],
    ),
];

/// Render help overlay
pub fn render(frame: &mut Frame) {
    let area = centered_rect(70, 80, frame.area());

    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" proxyflow Help ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);
    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let subtle_style = Style::default().fg(Color::DarkGray);

    let mut lines = vec![
        Line::from(vec![
            Span::raw("  "),
            Span::styled("PROXYFLOW", key_style),
            Span::raw(" - HTTP proxy profile manager "),
            Span::styled(format!("v{}", env!("CARGO_PKG_VERSION")), subtle_style),
        ]),
        Line::from(""),
    ];

    for (header, keys) in SECTIONS {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(*header, header_style),
        ]));
        for (key, desc) in *keys {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{key:<10}"), key_style),
                Span::styled(*desc, desc_style),
            ]));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "  Press any key to close",
        subtle_style,
    )));

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);

    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
