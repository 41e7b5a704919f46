use crate::error::ValidationError;
use std::fmt;

pub const QUIZ_ID_MAX_LEN: usize = 64;

/// A quiz id that passed menu validation and is safe to put in a URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizId(String);

impl QuizId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty("quiz id"));
        }
        if trimmed.chars().count() > QUIZ_ID_MAX_LEN {
            return Err(ValidationError::TooLong {
                field: "quiz id",
                max: QUIZ_ID_MAX_LEN,
            });
        }
        if let Some(found) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ValidationError::InvalidCharacter {
                field: "quiz id",
                found,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert_eq!(QuizId::parse("quiz-1").unwrap().as_str(), "quiz-1");
        assert_eq!(QuizId::parse("  abc_DEF9 ").unwrap().as_str(), "abc_DEF9");
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(QuizId::parse("   "), Err(ValidationError::Empty("quiz id")));
    }

    #[test]
    fn test_inner_whitespace_and_path_characters() {
        assert_eq!(
            QuizId::parse("quiz 1"),
            Err(ValidationError::InvalidCharacter {
                field: "quiz id",
                found: ' '
            })
        );
        assert!(matches!(
            QuizId::parse("../admin"),
            Err(ValidationError::InvalidCharacter { found: '.', .. })
        ));
    }

    #[test]
    fn test_length_limit() {
        assert!(QuizId::parse(&"a".repeat(QUIZ_ID_MAX_LEN)).is_ok());
        assert!(matches!(
            QuizId::parse(&"a".repeat(QUIZ_ID_MAX_LEN + 1)),
            Err(ValidationError::TooLong { max: 64, .. })
        ));
    }
}
