pub mod adapter;
pub mod client;

// Public API exports
pub use adapter::{parse_protocol, parse_quiz, parse_user};
pub use client::{HttpQuizApi, QuizApi};
