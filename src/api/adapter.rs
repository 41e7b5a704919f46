//! Converts backend payloads into domain types.
//!
//! Strict JSON is accepted as-is. Anything else is treated as the legacy struct-like
//! dialect (unquoted keys, bareword enum variants, `=`/`;` separators, trailing commas)
//! and normalised to JSON first. Both paths then go through the same serde shape check
//! and a validation pass, and every failure comes back as a [`ParseError`].

use crate::error::ParseError;
use crate::models::{Protocol, Question, QuestionType, Quiz, QuizOption, UserProfile};
use chrono::{DateTime, TimeZone, Utc};
use regex::{Captures, Regex};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

lazy_static::lazy_static! {
    static ref STRING_LITERAL: Regex = Regex::new(r#""(?:[^"\\]|\\.)*""#).unwrap();
    static ref UNQUOTED_KEY: Regex =
        Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*[:=]").unwrap();
    static ref BAREWORD_VALUE: Regex =
        Regex::new(r"([\[:,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*[,\]}])").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

const JSON_LITERALS: [&str; 3] = ["true", "false", "null"];

pub fn parse_quiz(input: &str) -> Result<Quiz, ParseError> {
    let raw: RawQuiz = decode(input)?;
    raw.validate()
}

pub fn parse_protocol(input: &str) -> Result<Protocol, ParseError> {
    let raw: RawProtocol = decode(input)?;
    let id = raw.id.into_id("protocol id")?;
    if id.is_empty() {
        return Err(ParseError::Invalid("protocol id is empty".to_string()));
    }
    Ok(Protocol {
        id,
        name: raw.name,
        description: raw.description.filter(|d| !d.trim().is_empty()),
    })
}

pub fn parse_user(input: &str) -> Result<UserProfile, ParseError> {
    let raw: RawUser = decode(input)?;
    let id = raw.id.into_id("user id")?;
    if id.is_empty() {
        return Err(ParseError::Invalid("user id is empty".to_string()));
    }
    let points = match raw.points {
        Some(points) => points.as_u64("points")?,
        None => 0,
    };
    Ok(UserProfile {
        id,
        username: raw.username,
        points,
    })
}

fn decode<T: DeserializeOwned>(input: &str) -> Result<T, ParseError> {
    let value = to_json_value(input)?;
    serde_json::from_value(value).map_err(ParseError::from_json)
}

/// Parses `input` as JSON, falling back to the legacy dialect.
pub fn to_json_value(input: &str) -> Result<Value, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let normalized = normalize_legacy(trimmed);
    serde_json::from_str::<Value>(&normalized).map_err(ParseError::from_json)
}

/// Rewrites the legacy dialect into JSON text. String literals are copied verbatim;
/// only the text between them is rewritten.
pub fn normalize_legacy(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    let mut last = 0;
    for literal in STRING_LITERAL.find_iter(input) {
        out.push_str(&normalize_segment(&input[last..literal.start()]));
        out.push_str(literal.as_str());
        last = literal.end();
    }
    out.push_str(&normalize_segment(&input[last..]));
    out
}

fn normalize_segment(segment: &str) -> String {
    if segment.is_empty() {
        return String::new();
    }

    let separated = segment.replace(';', ",");
    let keyed = UNQUOTED_KEY.replace_all(&separated, "$1\"$2\":").into_owned();

    // A match consumes its trailing delimiter, so `[A, B, C]` needs a second pass for B.
    let mut current = keyed;
    loop {
        let next = BAREWORD_VALUE
            .replace_all(&current, |caps: &Captures| {
                let word = &caps[2];
                if JSON_LITERALS.contains(&word) {
                    format!("{}{}{}", &caps[1], word, &caps[3])
                } else {
                    format!("{}\"{}\"{}", &caps[1], word, &caps[3])
                }
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }

    TRAILING_COMMA.replace_all(&current, "$1").into_owned()
}

/// Scalars the legacy dialect emits without telling numbers and strings apart.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    /// Identifiers may be numbers, but only integers survive the trip through `f64`.
    fn into_id(self, field: &str) -> Result<String, ParseError> {
        match self {
            Scalar::Number(n) if n.is_f64() => Err(ParseError::Invalid(format!(
                "{} {} is not an integer or a string",
                field, n
            ))),
            Scalar::Number(n) => Ok(n.to_string()),
            Scalar::Text(s) => Ok(s.trim().to_string()),
        }
    }

    fn as_u64(&self, field: &str) -> Result<u64, ParseError> {
        let parsed = match self {
            Scalar::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| f as u64)
            }),
            Scalar::Text(s) => s.trim().parse::<u64>().ok(),
        };
        parsed.ok_or_else(|| {
            ParseError::Invalid(format!("{} is not a non-negative integer", field))
        })
    }

    fn as_f64(&self, field: &str) -> Result<f64, ParseError> {
        let parsed = match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
        };
        parsed
            .filter(|f| f.is_finite())
            .ok_or_else(|| ParseError::Invalid(format!("{} is not a number", field)))
    }
}

#[derive(Debug, Deserialize)]
struct RawQuiz {
    id: Scalar,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "protocolId", alias = "protocol")]
    protocol_id: Option<Scalar>,
    questions: Vec<RawQuestion>,
    #[serde(alias = "duration", alias = "durationSecs", alias = "duration_seconds")]
    duration_secs: Scalar,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default, alias = "rewardAmount", alias = "reward_amount")]
    reward: Option<Scalar>,
    #[serde(default, alias = "endsAt", alias = "end_time", alias = "endTime")]
    ends_at: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: Scalar,
    #[serde(alias = "question", alias = "text")]
    prompt: String,
    #[serde(rename = "type", alias = "kind", alias = "questionType", alias = "question_type")]
    kind: String,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default, alias = "point", alias = "score")]
    points: Option<Scalar>,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    id: Scalar,
    #[serde(alias = "label", alias = "value")]
    text: String,
    #[serde(default, alias = "isCorrect", alias = "correct")]
    is_correct: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawProtocol {
    id: Scalar,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: Scalar,
    #[serde(alias = "name", alias = "displayName", alias = "display_name")]
    username: String,
    #[serde(default)]
    points: Option<Scalar>,
}

impl RawQuiz {
    fn validate(self) -> Result<Quiz, ParseError> {
        let id = self.id.into_id("quiz id")?;
        if id.is_empty() {
            return Err(ParseError::Invalid("quiz id is empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(ParseError::Invalid(format!("quiz {} has no title", id)));
        }
        if self.questions.is_empty() {
            return Err(ParseError::Invalid(format!("quiz {} has no questions", id)));
        }

        let duration_secs = self.duration_secs.as_u64("duration")?;
        if duration_secs == 0 {
            return Err(ParseError::Invalid(format!("quiz {} has no duration", id)));
        }

        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(self.questions.len());
        for raw in self.questions {
            let question = raw.validate()?;
            if !seen.insert(question.id.clone()) {
                return Err(ParseError::Invalid(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
            questions.push(question);
        }

        let reward = match &self.reward {
            Some(reward) => reward.as_f64("reward")?,
            None => 0.0,
        };
        let ends_at = match &self.ends_at {
            Some(raw) => Some(parse_timestamp(raw)?),
            None => None,
        };
        let protocol_id = match self.protocol_id {
            Some(raw) => Some(raw.into_id("protocol id")?).filter(|p| !p.is_empty()),
            None => None,
        };

        Ok(Quiz {
            id,
            title: self.title.trim().to_string(),
            description: self.description.unwrap_or_default(),
            protocol_id,
            questions,
            duration_secs,
            difficulty: self
                .difficulty
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "Unrated".to_string()),
            reward,
            ends_at,
        })
    }
}

impl RawQuestion {
    fn validate(self) -> Result<Question, ParseError> {
        let id = self.id.into_id("question id")?;
        if id.is_empty() {
            return Err(ParseError::Invalid("question id is empty".to_string()));
        }
        let kind = parse_question_type(&self.kind)?;
        let points = match &self.points {
            Some(points) => u32::try_from(points.as_u64("points")?).map_err(|_| {
                ParseError::Invalid(format!("question {} has out-of-range points", id))
            })?,
            None => 1,
        };

        let mut options = self
            .options
            .into_iter()
            .map(|o| {
                Ok(QuizOption {
                    id: o.id.into_id("option id")?,
                    text: o.text,
                    is_correct: o.is_correct.unwrap_or(false),
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        if kind == QuestionType::TrueFalse && options.is_empty() {
            options = ["True", "False"]
                .iter()
                .map(|label| QuizOption {
                    id: label.to_lowercase(),
                    text: label.to_string(),
                    is_correct: false,
                })
                .collect();
        }

        if kind.is_choice() && options.is_empty() {
            return Err(ParseError::Invalid(format!(
                "{} question {} has no options",
                kind.label(),
                id
            )));
        }

        let mut seen = HashSet::new();
        for option in &options {
            if option.id.is_empty() || !seen.insert(option.id.as_str()) {
                return Err(ParseError::Invalid(format!(
                    "question {} has an empty or duplicate option id",
                    id
                )));
            }
        }

        Ok(Question {
            id,
            prompt: self.prompt,
            kind,
            options,
            points,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
        })
    }
}

/// Matches enum labels in any of the casings the backend has been seen to use.
pub fn parse_question_type(label: &str) -> Result<QuestionType, ParseError> {
    let key: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match key.as_str() {
        "singlechoice" | "single" | "choice" => Ok(QuestionType::SingleChoice),
        "multiplechoice" | "multiple" | "multichoice" => Ok(QuestionType::MultipleChoice),
        "truefalse" | "boolean" | "bool" => Ok(QuestionType::TrueFalse),
        "shortanswer" | "short" | "text" => Ok(QuestionType::ShortAnswer),
        "fillblank" | "fillintheblank" | "fill" | "blank" => Ok(QuestionType::FillBlank),
        _ => Err(ParseError::Invalid(format!(
            "unknown question type {:?}",
            label
        ))),
    }
}

fn parse_timestamp(raw: &Scalar) -> Result<DateTime<Utc>, ParseError> {
    if let Scalar::Text(text) = raw
        && let Ok(parsed) = DateTime::parse_from_rfc3339(text.trim())
    {
        return Ok(parsed.with_timezone(&Utc));
    }

    // Numeric timestamps arrive as seconds, milliseconds or nanoseconds.
    let value = raw.as_u64("end time")?;
    let (secs, nanos) = if value >= 1_000_000_000_000_000 {
        (value / 1_000_000_000, (value % 1_000_000_000) as u32)
    } else if value >= 1_000_000_000_000 {
        (value / 1_000, ((value % 1_000) * 1_000_000) as u32)
    } else {
        (value, 0)
    };
    Utc.timestamp_opt(secs as i64, nanos)
        .single()
        .ok_or_else(|| ParseError::Invalid(format!("end time {} is out of range", value)))
}
