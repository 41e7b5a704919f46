use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::format_session_date;
use super::key_span;
use crate::app::{MenuFocus, MenuState};
use crate::auth::AuthContext;
use crate::db::attempt::AttemptSummary;
use crate::utils::truncate_string;

fn format_attempt_item(attempt: &AttemptSummary) -> String {
    format!(
        "{} - {} [{}] ({}/{} answered, {})",
        format_session_date(attempt.finished_at),
        truncate_string(&attempt.quiz_title, 40),
        attempt.quiz_id,
        attempt.answered,
        attempt.questions_total,
        attempt.outcome.label()
    )
}

fn panel_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_panel_header(area: Rect, title: &str, focused: bool, f: &mut Frame) {
    let style = if focused {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(Paragraph::new(title).style(style), area);
}

pub fn draw_menu(f: &mut Frame, menu: &MenuState, auth: &AuthContext) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    let title = Paragraph::new(concat!("HackQuiz v", env!("CARGO_PKG_VERSION")))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let input_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(chunks[1]);
    let input_focused = menu.focus == MenuFocus::Input;
    draw_panel_header(input_chunks[0], "Quiz ID", input_focused, f);

    let input = Paragraph::new(if menu.input.is_empty() && !input_focused {
        "[Type a quiz id...]"
    } else {
        menu.input.as_str()
    })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(panel_style(input_focused)),
    );
    f.render_widget(input, input_chunks[1]);
    if input_focused {
        f.set_cursor_position((
            input_chunks[1].x + 1 + menu.cursor_position as u16,
            input_chunks[1].y + 1,
        ));
    }
    if let Some(error) = &menu.error {
        f.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            input_chunks[2],
        );
    }

    let history_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(chunks[2]);
    let history_focused = menu.focus == MenuFocus::History;
    draw_panel_header(history_chunks[0], "Past attempts", history_focused, f);

    let items: Vec<ListItem> = if menu.attempts.is_empty() {
        vec![ListItem::new("No past attempts").style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]
    } else {
        menu.attempts
            .iter()
            .enumerate()
            .map(|(i, attempt)| {
                let style = if i == menu.selected_attempt && history_focused {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format_attempt_item(attempt)).style(style)
            })
            .collect()
    };
    let history = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(panel_style(history_focused)),
    );
    f.render_widget(history, history_chunks[1]);

    let footer_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[3]);

    let (who, color) = match auth.active_identity() {
        Some(identity) => (format!("Signed in: {}", identity.display_name), Color::Green),
        None => ("Signed out".to_string(), Color::Yellow),
    };
    let identity = Paragraph::new(truncate_string(&who, 40))
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(identity, footer_chunks[0]);

    let help = Paragraph::new(Line::from(vec![
        key_span("Tab"),
        Span::from(" Switch Panel  "),
        key_span("↑/↓"),
        Span::from(" Navigate  "),
        key_span("Enter"),
        Span::from(" Open Quiz  "),
        key_span("Ctrl+L"),
        Span::from(" Log Out  "),
        key_span("Esc/Ctrl+C"),
        Span::from(" Quit"),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, footer_chunks[1]);
}
