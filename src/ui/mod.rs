pub mod layout;
mod menu;
mod quiz;
mod sessions;
mod status;
mod summary;

pub use layout::{calculate_quiz_chunks, calculate_summary_chunks, centered_rect};
pub use menu::draw_menu;
pub use quiz::{draw_quit_confirmation, draw_quiz};
pub use sessions::format_session_date;
pub use status::{draw_loading, draw_not_found};
pub use summary::draw_summary;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

pub(crate) fn key_span(label: &str) -> Span<'_> {
    Span::styled(
        label,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}
