//! Receipts of finished attempts. Only submitted or abandoned attempts are written;
//! an attempt in progress never touches the database.

use crate::models::{QuizSession, SessionPhase};
use rusqlite::{Connection, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Submitted,
    AutoSubmitted,
    Abandoned,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Submitted => "submitted",
            AttemptOutcome::AutoSubmitted => "auto_submitted",
            AttemptOutcome::Abandoned => "abandoned",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "submitted" => Some(AttemptOutcome::Submitted),
            "auto_submitted" => Some(AttemptOutcome::AutoSubmitted),
            "abandoned" => Some(AttemptOutcome::Abandoned),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttemptOutcome::Submitted => "SUBMITTED",
            AttemptOutcome::AutoSubmitted => "TIME UP",
            AttemptOutcome::Abandoned => "ABANDONED",
        }
    }

    pub fn from_phase(phase: SessionPhase) -> Option<Self> {
        match phase {
            SessionPhase::Submitted { forced: false } => Some(AttemptOutcome::Submitted),
            SessionPhase::Submitted { forced: true } => Some(AttemptOutcome::AutoSubmitted),
            SessionPhase::Abandoned => Some(AttemptOutcome::Abandoned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSummary {
    pub id: u64,
    pub quiz_id: String,
    pub quiz_title: String,
    pub started_at: Option<u64>,
    pub finished_at: u64,
    pub answered: usize,
    pub questions_total: usize,
    pub outcome: AttemptOutcome,
}

/// Stores the receipt for a finished session. Returns `Ok(None)` for a session that
/// has not finished yet.
pub fn record_attempt(conn: &Connection, session: &QuizSession) -> Result<Option<u64>> {
    let Some(outcome) = AttemptOutcome::from_phase(session.phase) else {
        return Ok(None);
    };
    let started_at = session.started_at.map(|t| t.timestamp().max(0) as u64);
    let finished_at = session
        .finished_at
        .unwrap_or_else(chrono::Utc::now)
        .timestamp()
        .max(0) as u64;

    conn.execute(
        "INSERT INTO attempts (quiz_id, quiz_title, started_at, finished_at, answered, questions_total, outcome)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            session.quiz.id,
            session.quiz.title,
            started_at,
            finished_at,
            session.answered_count(),
            session.question_count(),
            outcome.as_str()
        ],
    )?;

    Ok(Some(conn.last_insert_rowid() as u64))
}

pub fn recent_attempts(conn: &Connection, limit: usize) -> Result<Vec<AttemptSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, quiz_id, quiz_title, started_at, finished_at, answered, questions_total, outcome
         FROM attempts ORDER BY finished_at DESC, id DESC LIMIT ?",
    )?;

    let rows = stmt.query_map([limit], |row| {
        let outcome: String = row.get(7)?;
        Ok(AttemptSummary {
            id: row.get(0)?,
            quiz_id: row.get(1)?,
            quiz_title: row.get(2)?,
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            answered: row.get(5)?,
            questions_total: row.get(6)?,
            outcome: AttemptOutcome::parse(&outcome).unwrap_or(AttemptOutcome::Abandoned),
        })
    })?;

    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_test_db;
    use crate::error::ApiError;
    use crate::models::AnswerValue;
    use crate::session::tests::started_session;

    #[test]
    fn test_unfinished_session_is_not_recorded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let conn = open_test_db(temp_dir.path());
        let (session, _rx) = started_session(3, 60);

        assert_eq!(record_attempt(&conn, &session).unwrap(), None);
        assert!(recent_attempts(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn test_record_submitted_attempt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let conn = open_test_db(temp_dir.path());
        let (mut session, _rx) = started_session(3, 60);
        session
            .record_answer("q1", AnswerValue::Single("a".to_string()))
            .unwrap();
        session.next_question();
        session.next_question();
        session.submit().unwrap();
        session.on_submission_result(Ok(()));

        let id = record_attempt(&conn, &session).unwrap();
        assert_eq!(id, Some(1));

        let attempts = recent_attempts(&conn, 10).unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].quiz_id, "quiz-1");
        assert_eq!(attempts[0].answered, 1);
        assert_eq!(attempts[0].questions_total, 3);
        assert_eq!(attempts[0].outcome, AttemptOutcome::Submitted);
        assert!(attempts[0].started_at.is_some());
    }

    #[test]
    fn test_forced_and_abandoned_outcomes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let conn = open_test_db(temp_dir.path());

        let (mut forced, _rx) = started_session(2, 1);
        forced.tick();
        forced.on_submission_result(Ok(()));
        record_attempt(&conn, &forced).unwrap();

        let (mut lost, _rx2) = started_session(2, 1);
        lost.tick();
        lost.on_submission_result(Err(ApiError::Network("down".to_string())));
        lost.on_submission_result(Err(ApiError::Network("down".to_string())));
        record_attempt(&conn, &lost).unwrap();

        let outcomes: Vec<AttemptOutcome> = recent_attempts(&conn, 10)
            .unwrap()
            .into_iter()
            .map(|a| a.outcome)
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&AttemptOutcome::AutoSubmitted));
        assert!(outcomes.contains(&AttemptOutcome::Abandoned));
    }

    #[test]
    fn test_recent_attempts_respects_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let conn = open_test_db(temp_dir.path());
        for _ in 0..5 {
            let (mut session, _rx) = started_session(1, 1);
            session.tick();
            session.on_submission_result(Ok(()));
            record_attempt(&conn, &session).unwrap();
        }
        let attempts = recent_attempts(&conn, 3).unwrap();
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[0].id, 5);
    }

    #[test]
    fn test_outcome_round_trip_labels() {
        for outcome in [
            AttemptOutcome::Submitted,
            AttemptOutcome::AutoSubmitted,
            AttemptOutcome::Abandoned,
        ] {
            assert_eq!(AttemptOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(AttemptOutcome::parse("graded"), None);
    }
}
