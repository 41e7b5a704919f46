use super::key_span;
use crate::models::{QuizSession, SessionPhase};
use crate::ui::layout::calculate_summary_chunks;
use crate::utils::truncate_string;
use ratatui::{
    Frame,
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Confirmation after the attempt ends. Shows what was sent, never how it scored.
pub fn draw_summary(f: &mut Frame, session: &QuizSession) {
    let layout = calculate_summary_chunks(f.area());

    let (heading, color) = match session.phase {
        SessionPhase::Abandoned => ("Attempt Abandoned", Color::Red),
        SessionPhase::Submitted { forced: true } => ("Submitted (time ran out)", Color::Yellow),
        _ => ("Answers Submitted", Color::Green),
    };
    let title = Paragraph::new(format!("{} - {}", heading, session.quiz.title))
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, layout.header_area);

    let mut text = Text::default();
    if let Some(notice) = &session.notice {
        text.push_line(Line::from(notice.message.as_str()));
        text.push_line(Line::from(""));
    }
    text.push_line(Line::from(format!(
        "Answered: {} / {}",
        session.answered_count(),
        session.question_count()
    )));
    if let SessionPhase::Submitted { .. } = session.phase {
        let available = match session.quiz.ends_at {
            Some(ends_at) => format!(
                "Results will be available after {}.",
                ends_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "Results will be available once the quiz closes.".to_string(),
        };
        text.push_line(Line::from(available));
    }
    text.push_line(Line::from(""));

    for (i, question) in session.quiz.questions.iter().enumerate() {
        let answered = session.answer_for(&question.id).is_some();
        let mark = if answered { "[✓]" } else { "[ ]" };
        text.push_line(Line::from(vec![
            Span::styled(
                mark,
                Style::default().fg(if answered { Color::Green } else { Color::DarkGray }),
            ),
            Span::from(format!(" {}. {}", i + 1, truncate_string(&question.prompt, 60))),
        ]));
    }

    let summary = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(summary, layout.content_area);

    let help = Paragraph::new(Line::from(vec![
        key_span("m/Enter"),
        Span::from(" Main Menu  "),
        key_span("q"),
        Span::from(" Quit"),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, layout.footer_area);
}
