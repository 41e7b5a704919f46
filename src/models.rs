use crate::auth::AuthContext;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    FillBlank,
}

impl QuestionType {
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::TrueFalse
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true/false",
            QuestionType::ShortAnswer => "short-answer",
            QuestionType::FillBlank => "fill-in-the-blank",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    /// Carried from the backend but never rendered while a session is running.
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionType,
    pub options: Vec<QuizOption>,
    pub points: u32,
    pub explanation: Option<String>,
}

impl Question {
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

/// A quiz as fetched for one session. Never mutated after the fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub protocol_id: Option<String>,
    pub questions: Vec<Question>,
    pub duration_secs: u64,
    pub difficulty: String,
    pub reward: f64,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn question_position(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }

    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multiple(Vec<String>),
    Text(String),
}

impl AnswerValue {
    /// True when the value carries nothing worth submitting.
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Single(id) => id.is_empty(),
            AnswerValue::Multiple(ids) => ids.is_empty(),
            AnswerValue::Text(text) => text.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub question_id: String,
    #[serde(rename = "answer")]
    pub value: AnswerValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub points: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message; the terminal stand-in for a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Lifecycle of one quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    /// Start recorded locally, waiting for the backend to acknowledge it.
    Starting,
    InProgress,
    Submitting { forced: bool },
    Submitted { forced: bool },
    /// A forced submission failed twice; the attempt is lost.
    Abandoned,
}

impl SessionPhase {
    pub fn name(self) -> &'static str {
        match self {
            SessionPhase::NotStarted => "not started",
            SessionPhase::Starting => "starting",
            SessionPhase::InProgress => "in progress",
            SessionPhase::Submitting { .. } => "submitting",
            SessionPhase::Submitted { .. } => "submitted",
            SessionPhase::Abandoned => "abandoned",
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SessionPhase::Submitted { .. } | SessionPhase::Abandoned
        )
    }
}

/// One user's timed attempt at a quiz. Owned by the event loop; nothing else mutates it.
#[derive(Debug)]
pub struct QuizSession {
    /// Unique per session in this process; ties backend replies to this attempt.
    pub attempt: u64,
    pub quiz: Quiz,
    pub protocol_name: Option<String>,
    pub phase: SessionPhase,
    pub current_index: Option<usize>,
    pub answers: Vec<Answer>,
    pub remaining_secs: u64,
    pub submit_in_flight: bool,
    pub forced_retry_used: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_buffer: String,
    /// Cursor in the free-text input, counted in chars.
    pub cursor_position: usize,
    pub option_cursor: usize,
    pub input_scroll_y: u16,
    pub notice: Option<Notice>,
    pub auth: AuthContext,
    pub api_tx: Option<mpsc::UnboundedSender<ApiRequest>>,
}

#[derive(Debug)]
pub enum ApiRequest {
    FetchQuiz {
        quiz_id: String,
    },
    FetchProtocol {
        quiz_id: String,
        protocol_id: String,
    },
    RecordStart {
        quiz_id: String,
        attempt: u64,
    },
    Submit {
        quiz_id: String,
        attempt: u64,
        answers: Vec<Answer>,
    },
    FetchCurrentUser,
}

#[derive(Debug)]
pub enum ApiResponse {
    QuizLoaded {
        quiz_id: String,
        result: Result<Quiz, ApiError>,
    },
    ProtocolLoaded {
        quiz_id: String,
        result: Result<Protocol, ApiError>,
    },
    StartRecorded {
        quiz_id: String,
        attempt: u64,
        result: Result<(), ApiError>,
    },
    Submitted {
        quiz_id: String,
        attempt: u64,
        result: Result<(), ApiError>,
    },
    CurrentUser {
        result: Result<UserProfile, ApiError>,
    },
}

impl ApiResponse {
    /// The quiz this response belongs to, if any.
    pub fn quiz_id(&self) -> Option<&str> {
        match self {
            ApiResponse::QuizLoaded { quiz_id, .. }
            | ApiResponse::ProtocolLoaded { quiz_id, .. }
            | ApiResponse::StartRecorded { quiz_id, .. }
            | ApiResponse::Submitted { quiz_id, .. } => Some(quiz_id),
            ApiResponse::CurrentUser { .. } => None,
        }
    }

    /// The attempt this response answers, for replies to attempt-scoped requests.
    pub fn attempt(&self) -> Option<u64> {
        match self {
            ApiResponse::StartRecorded { attempt, .. }
            | ApiResponse::Submitted { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum AppState {
    Menu,
    Loading,
    NotFound,
    Quiz,
    QuizQuitConfirm,
    Summary,
}
