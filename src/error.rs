use thiserror::Error;

/// Failure converting a backend payload into domain types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty payload")]
    Empty,

    #[error("malformed payload at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("payload does not match the expected shape: {0}")]
    Schema(String),

    #[error("invalid payload: {0}")]
    Invalid(String),
}

impl ParseError {
    pub(crate) fn from_json(e: serde_json::Error) -> Self {
        match e.classify() {
            serde_json::error::Category::Data => ParseError::Schema(e.to_string()),
            _ => ParseError::Syntax {
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("no active identity, sign in first")]
    Unauthorized,

    #[error("server responded with {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Network(e.to_string())
    }
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("action not allowed while {0}")]
    WrongPhase(&'static str),

    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(String),

    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("answer does not fit a {0} question")]
    AnswerTypeMismatch(&'static str),

    #[error("submit is only available on the last question")]
    NotOnLastQuestion,

    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains invalid character {found:?}")]
    InvalidCharacter { field: &'static str, found: char },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}
