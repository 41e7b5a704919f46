use super::key_span;
use crate::models::{NoticeLevel, QuestionType, QuizSession, SessionPhase};
use crate::ui::layout::{calculate_quiz_chunks, centered_rect};
use crate::utils::{calculate_wrapped_cursor_position, format_remaining};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Below this many seconds the countdown turns red.
const LOW_TIME_SECS: u64 = 30;

pub fn draw_quiz(f: &mut Frame, session: &mut QuizSession) {
    match session.phase {
        SessionPhase::NotStarted | SessionPhase::Starting => draw_intro(f, session),
        _ => draw_question(f, session),
    }
}

fn draw_intro(f: &mut Frame, session: &QuizSession) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    let quiz = &session.quiz;
    let title = Paragraph::new(quiz.title.as_str())
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut text = Text::default();
    if let Some(protocol) = &session.protocol_name {
        text.push_line(Line::from(vec![
            Span::styled("Protocol: ", label),
            Span::from(protocol.as_str()),
        ]));
    }
    text.push_line(Line::from(vec![
        Span::styled("Difficulty: ", label),
        Span::from(quiz.difficulty.as_str()),
    ]));
    text.push_line(Line::from(vec![
        Span::styled("Questions: ", label),
        Span::from(quiz.questions.len().to_string()),
        Span::styled("   Points: ", label),
        Span::from(quiz.total_points().to_string()),
    ]));
    text.push_line(Line::from(vec![
        Span::styled("Time limit: ", label),
        Span::from(format_remaining(quiz.duration_secs)),
        Span::styled("   Reward: ", label),
        Span::from(format!("{}", quiz.reward)),
    ]));
    if let Some(ends_at) = quiz.ends_at {
        text.push_line(Line::from(vec![
            Span::styled("Closes: ", label),
            Span::from(ends_at.format("%Y-%m-%d %H:%M UTC").to_string()),
        ]));
    }
    text.push_line(Line::from(""));
    text.push_line(Line::from(quiz.description.as_str()));
    text.push_line(Line::from(""));
    text.push_line(Line::from(Span::styled(
        if session.phase == SessionPhase::Starting {
            "Starting..."
        } else {
            "The timer starts as soon as you begin. Press s to start."
        },
        Style::default().fg(Color::Yellow),
    )));

    let body = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Quiz"));
    f.render_widget(body, chunks[1]);

    draw_notice(f, session, chunks[2]);

    let help = Paragraph::new(Line::from(vec![
        key_span("s/Enter"),
        Span::from(" Start  "),
        key_span("Esc"),
        Span::from(" Back to Menu  "),
        key_span("Ctrl+C"),
        Span::from(" Exit App"),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn draw_notice(f: &mut Frame, session: &QuizSession, area: ratatui::layout::Rect) {
    let Some(notice) = &session.notice else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Warning => Color::Yellow,
        NoticeLevel::Error => Color::Red,
    };
    let line = Paragraph::new(notice.message.as_str())
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
    f.render_widget(line, area);
}

fn draw_question(f: &mut Frame, session: &mut QuizSession) {
    let layout = calculate_quiz_chunks(f.area());
    let Some(question) = session.current_question().cloned() else {
        return;
    };
    let index = session.current_index.unwrap_or(0);

    let timer_color = if session.remaining_secs <= LOW_TIME_SECS {
        Color::Red
    } else {
        Color::Cyan
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "Question {} / {} - {}",
                index + 1,
                session.question_count(),
                session.quiz.title
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::from("   "),
        Span::styled(
            format!("⏱ {}", format_remaining(session.remaining_secs)),
            Style::default()
                .fg(timer_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::from(format!(
            "   Answered {}/{}",
            session.answered_count(),
            session.question_count()
        )),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, layout.header_area);

    let prompt = Paragraph::new(question.prompt.as_str())
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ({} pts)", question.kind.label(), question.points)),
        );
    f.render_widget(prompt, layout.question_area);

    if question.kind.is_choice() {
        let mut text = Text::default();
        for (i, option) in question.options.iter().enumerate() {
            let selected = session.is_option_selected(&question, &option.id);
            let marker = match (question.kind, selected) {
                (QuestionType::MultipleChoice, true) => "[x]",
                (QuestionType::MultipleChoice, false) => "[ ]",
                (_, true) => "(•)",
                (_, false) => "( )",
            };
            let style = if i == session.option_cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            text.push_line(Line::from(Span::styled(
                format!("{} {}. {}", marker, i + 1, option.text),
                style,
            )));
        }
        let title = if question.kind == QuestionType::MultipleChoice {
            "Choose all that apply"
        } else {
            "Choose one"
        };
        let options = Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(options, layout.answer_area);
    } else {
        let visible_height = layout.answer_area.height.saturating_sub(2) as usize;
        let text_width = layout.answer_area.width.saturating_sub(2).max(1) as usize;
        let (cursor_line, cursor_col) = calculate_wrapped_cursor_position(
            &session.input_buffer,
            session.cursor_position,
            text_width,
        );

        let mut scroll = session.input_scroll_y as usize;
        if cursor_line < scroll {
            scroll = cursor_line;
        } else if visible_height > 0 && cursor_line >= scroll + visible_height {
            scroll = cursor_line + 1 - visible_height;
        }
        session.input_scroll_y = scroll as u16;

        let content = if session.input_buffer.is_empty() {
            Text::from("[Type your answer here...]")
        } else {
            Text::from(session.input_buffer.as_str())
        };
        let answer = Paragraph::new(content)
            .wrap(Wrap { trim: true })
            .scroll((session.input_scroll_y, 0))
            .block(Block::default().borders(Borders::ALL).title("Your Answer"));
        f.render_widget(answer, layout.answer_area);

        if session.accepts_input() {
            let cursor_x = layout.answer_area.x + 1 + cursor_col as u16;
            let cursor_y = layout.answer_area.y
                + 1
                + (cursor_line as u16).saturating_sub(session.input_scroll_y);
            f.set_cursor_position((cursor_x, cursor_y));
        }
    }

    draw_notice(f, session, layout.notice_area);

    let mut help_text = Vec::new();
    if question.kind.is_choice() {
        help_text.push(Line::from(vec![
            key_span("↑/↓"),
            Span::from(" Highlight  "),
            key_span("Space/1-9"),
            Span::from(" Choose  "),
            key_span("←/→ Tab"),
            Span::from(" Prev/Next Question"),
        ]));
    } else {
        help_text.push(Line::from(vec![
            key_span("Tab/Shift+Tab"),
            Span::from(" Prev/Next Question  "),
            key_span("Enter"),
            Span::from(if session.is_last_question() {
                " Submit"
            } else {
                " Next"
            }),
        ]));
    }
    let mut second = Vec::new();
    if session.is_last_question() {
        second.extend([key_span("Ctrl+S"), Span::from(" Submit  ")]);
    }
    second.extend([
        key_span("Esc"),
        Span::from(" Quit to Menu  "),
        key_span("Ctrl+C"),
        Span::from(" Exit App"),
    ]);
    help_text.push(Line::from(second));

    let help = Paragraph::new(help_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, layout.help_area);
}

pub fn draw_quit_confirmation(f: &mut Frame) {
    let area = centered_rect(60, 11, f.area());
    f.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(area);

    let title = Paragraph::new("Leave Quiz")
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let message = Paragraph::new("Return to the menu? Unsubmitted answers are discarded.")
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, chunks[1]);

    let help = Paragraph::new(Line::from(vec![
        Span::styled(
            "y",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Span::from(" Yes  "),
        Span::styled(
            "n",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::from(" No (Continue Quiz)"),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}
