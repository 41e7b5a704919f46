pub mod api;
pub mod api_worker;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod logger;
pub mod models;
pub mod session;
pub mod ui;
pub mod utils;


// Re-exports for convenience
pub use api::{HttpQuizApi, QuizApi};
pub use app::App;
pub use auth::{AuthContext, Identity};
pub use config::Config;
pub use error::{ApiError, ConfigError, ParseError, SessionError, ValidationError};
pub use forms::QuizId;
pub use models::{Answer, AnswerValue, AppState, Question, QuestionType, Quiz, QuizSession};
pub use session::handle_quiz_input;
pub use ui::{draw_menu, draw_quit_confirmation, draw_quiz, draw_summary};
pub use utils::calculate_wrapped_cursor_position;
