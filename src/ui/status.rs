use super::key_span;
use crate::ui::layout::centered_rect;
use ratatui::{
    Frame,
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub fn draw_loading(f: &mut Frame, quiz_id: &str) {
    let area = centered_rect(50, 5, f.area());
    let text = Text::from(vec![
        Line::from(format!("Loading quiz {}...", quiz_id)),
        Line::from(vec![key_span("Esc"), Span::from(" Cancel")]),
    ]);
    let loading = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(loading, area);
}

/// Terminal screen for a quiz that could not be loaded. No retry from here.
pub fn draw_not_found(f: &mut Frame, quiz_id: &str, error: Option<&str>) {
    let area = centered_rect(60, 9, f.area());
    let mut text = Text::default();
    text.push_line(Line::from(Span::styled(
        "Quiz not found",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    )));
    text.push_line(Line::from(""));
    text.push_line(Line::from(format!(
        "Quiz {} could not be loaded.",
        quiz_id
    )));
    if let Some(error) = error {
        text.push_line(Line::from(Span::styled(
            error,
            Style::default().fg(Color::DarkGray),
        )));
    }
    text.push_line(Line::from(""));
    text.push_line(Line::from(vec![key_span("Enter/Esc"), Span::from(" Back to Menu")]));

    let body = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(body, area);
}
