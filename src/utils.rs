use unicode_width::UnicodeWidthChar;

/// Shortens `s` to at most `max_len` chars, ending in "..." when cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Countdown display, `mm:ss`. Hours roll into the minutes column.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Lays `text` out the way `Wrap { trim: true }` does and returns one
/// `(line_text, start_char, end_char)` per visual line.
fn simulate_wrapped_lines(text: &str, max_width: usize) -> Vec<(String, usize, usize)> {
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;
    let mut line_start = 0;
    let mut total = 0;

    for (idx, ch) in text.chars().enumerate() {
        total = idx + 1;
        if ch == '\n' {
            lines.push((current_line.trim_end().to_string(), line_start, idx));
            current_line.clear();
            current_width = 0;
            line_start = idx + 1;
            continue;
        }

        let char_width = ch.width().unwrap_or(1);
        if current_width + char_width > max_width && current_width > 0 {
            lines.push((current_line.trim_end().to_string(), line_start, idx));
            current_line = ch.to_string();
            current_width = char_width;
            line_start = idx;
        } else {
            current_line.push(ch);
            current_width += char_width;
        }
    }

    if !current_line.is_empty() || text.ends_with('\n') {
        lines.push((current_line.trim_end().to_string(), line_start, total));
    }

    lines
}

/// (line, column) of a char-indexed cursor inside wrapped text.
pub fn calculate_wrapped_cursor_position(
    text: &str,
    cursor_index: usize,
    max_width: usize,
) -> (usize, usize) {
    if text.is_empty() || cursor_index == 0 {
        return (0, 0);
    }

    let wrapped_lines = simulate_wrapped_lines(text, max_width);

    for (line_idx, (_, start, end)) in wrapped_lines.iter().enumerate() {
        if cursor_index >= *start && cursor_index <= *end {
            return (line_idx, cursor_index - start);
        }
    }

    match wrapped_lines.last() {
        Some((last_text, _, last_end)) if cursor_index >= *last_end => {
            (wrapped_lines.len() - 1, last_text.chars().count())
        }
        _ => (0, 0),
    }
}
