use crate::auth::AuthContext;
use crate::error::{ApiError, SessionError};
use crate::logger;
use crate::models::{
    Answer, AnswerValue, ApiRequest, AppState, Notice, Question, QuestionType, Quiz, QuizSession,
    SessionPhase,
};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;

pub const FORCED_SUBMIT_NOTICE: &str = "Time is up! Submitting your answers automatically...";
pub const FORCED_SUBMITTED_NOTICE: &str =
    "Time ran out, so your answers were submitted automatically.";
pub const SUBMITTED_NOTICE: &str = "Your answers were submitted.";

static NEXT_ATTEMPT: AtomicU64 = AtomicU64::new(1);

pub fn handle_quiz_input(
    session: &mut QuizSession,
    key: KeyEvent,
    app_state: &mut AppState,
) -> io::Result<()> {
    if key.code == KeyCode::Esc {
        *app_state = AppState::QuizQuitConfirm;
        return Ok(());
    }

    match session.phase {
        SessionPhase::NotStarted => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char('s')) {
                session.begin_or_explain();
            }
            Ok(())
        }
        SessionPhase::InProgress => {
            handle_in_progress_input(session, key);
            Ok(())
        }
        SessionPhase::Submitted { .. } | SessionPhase::Abandoned => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char('m')) {
                *app_state = AppState::Summary;
            }
            Ok(())
        }
        // Nothing is accepted while a request is outstanding.
        SessionPhase::Starting | SessionPhase::Submitting { .. } => Ok(()),
    }
}

fn handle_in_progress_input(session: &mut QuizSession, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if key.code == KeyCode::Char('s') {
            session.submit_or_explain();
        }
        return;
    }

    let Some(question) = session.current_question() else {
        return;
    };
    let kind = question.kind;
    let option_count = question.options.len();

    match key.code {
        KeyCode::Tab => {
            session.next_question();
        }
        KeyCode::BackTab => {
            session.previous_question();
        }
        _ if kind.is_choice() => match key.code {
            KeyCode::Up => {
                session.option_cursor = session.option_cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                if session.option_cursor + 1 < option_count {
                    session.option_cursor += 1;
                }
            }
            KeyCode::Left => {
                session.previous_question();
            }
            KeyCode::Right => {
                session.next_question();
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                session.choose_highlighted();
            }
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                let index = c as usize - '1' as usize;
                if index < option_count {
                    session.option_cursor = index;
                    session.choose_highlighted();
                }
            }
            _ => {}
        },
        _ => match key.code {
            KeyCode::Enter => {
                if session.is_last_question() {
                    session.submit_or_explain();
                } else {
                    session.next_question();
                }
            }
            KeyCode::Left => {
                session.cursor_position = session.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                let len = session.input_buffer.chars().count();
                session.cursor_position = (session.cursor_position + 1).min(len);
            }
            KeyCode::Home => {
                session.cursor_position = 0;
            }
            KeyCode::End => {
                session.cursor_position = session.input_buffer.chars().count();
            }
            KeyCode::Backspace => {
                session.delete_before_cursor();
            }
            KeyCode::Char(c) => {
                session.insert_at_cursor(c);
            }
            _ => {}
        },
    }
}

impl QuizSession {
    pub fn new(
        quiz: Quiz,
        auth: AuthContext,
        api_tx: Option<UnboundedSender<ApiRequest>>,
    ) -> Self {
        let remaining_secs = quiz.duration_secs;
        Self {
            attempt: NEXT_ATTEMPT.fetch_add(1, Ordering::Relaxed),
            quiz,
            protocol_name: None,
            phase: SessionPhase::NotStarted,
            current_index: None,
            answers: Vec::new(),
            remaining_secs,
            submit_in_flight: false,
            forced_retry_used: false,
            started_at: None,
            finished_at: None,
            input_buffer: String::new(),
            cursor_position: 0,
            option_cursor: 0,
            input_scroll_y: 0,
            notice: None,
            auth,
            api_tx,
        }
    }

    pub fn question_count(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index.and_then(|i| self.quiz.questions.get(i))
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index == Some(self.question_count().saturating_sub(1))
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers
            .iter()
            .find(|a| a.question_id == question_id)
            .map(|a| &a.value)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Answers and navigation are only taken while the clock is running.
    pub fn accepts_input(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.remaining_secs > 0
    }

    fn ensure_accepting(&self) -> Result<(), SessionError> {
        if self.accepts_input() {
            Ok(())
        } else {
            Err(SessionError::WrongPhase(self.phase.name()))
        }
    }

    fn send(&self, request: ApiRequest) {
        match &self.api_tx {
            Some(tx) => {
                if tx.send(request).is_err() {
                    logger::log("API worker is gone, request dropped");
                }
            }
            None => logger::log("No API channel attached, request dropped"),
        }
    }

    /// Asks the backend to record the start of this attempt.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::WrongPhase(self.phase.name()));
        }
        if !self.auth.is_active() {
            logger::log("Start refused: no active identity");
            self.notice = Some(Notice::error(
                "Sign in to start this quiz (set HACKQUIZ_TOKEN and HACKQUIZ_USER_ID), then press s.",
            ));
            return Ok(());
        }

        self.phase = SessionPhase::Starting;
        self.notice = Some(Notice::info("Starting quiz..."));
        self.send(ApiRequest::RecordStart {
            quiz_id: self.quiz.id.clone(),
            attempt: self.attempt,
        });
        Ok(())
    }

    fn begin_or_explain(&mut self) {
        if let Err(e) = self.begin() {
            self.notice = Some(Notice::warning(e.to_string()));
        }
    }

    pub fn on_start_recorded(&mut self, result: Result<(), ApiError>) {
        if self.phase != SessionPhase::Starting {
            logger::log(&format!(
                "Ignoring start acknowledgement while {}",
                self.phase.name()
            ));
            return;
        }

        match result {
            Ok(()) => {
                self.phase = SessionPhase::InProgress;
                self.current_index = Some(0);
                self.remaining_secs = self.quiz.duration_secs;
                self.started_at = Some(Utc::now());
                self.notice = None;
                self.load_current_input();
                logger::log(&format!(
                    "Quiz {} in progress, {}s on the clock",
                    self.quiz.id, self.remaining_secs
                ));
            }
            Err(ApiError::Unauthorized) => {
                self.phase = SessionPhase::NotStarted;
                self.notice = Some(Notice::error(
                    "Your sign-in was rejected. Sign in again, then press s to retry.",
                ));
            }
            Err(e) => {
                self.phase = SessionPhase::NotStarted;
                self.notice = Some(Notice::error(format!(
                    "Could not start the quiz: {}. Press s to retry.",
                    e
                )));
            }
        }
    }

    /// Upserts the answer for `question_id`. A blank value clears the answer.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<(), SessionError> {
        self.ensure_accepting()?;
        let question = self
            .quiz
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        validate_answer(question, &value)?;

        if value.is_blank() {
            self.answers.retain(|a| a.question_id != question_id);
            return Ok(());
        }

        match self.answers.iter_mut().find(|a| a.question_id == question_id) {
            Some(existing) => existing.value = value,
            None => self.answers.push(Answer {
                question_id: question_id.to_string(),
                value,
            }),
        }
        Ok(())
    }

    /// Selects `option_id` on the current question; toggles it for multiple-choice.
    pub fn choose_option(&mut self, option_id: &str) -> Result<(), SessionError> {
        self.ensure_accepting()?;
        let question = self
            .current_question()
            .cloned()
            .ok_or(SessionError::WrongPhase(self.phase.name()))?;

        match question.kind {
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                self.record_answer(&question.id, AnswerValue::Single(option_id.to_string()))
            }
            QuestionType::MultipleChoice => {
                let mut selected = match self.answer_for(&question.id) {
                    Some(AnswerValue::Multiple(ids)) => ids.clone(),
                    _ => Vec::new(),
                };
                if let Some(pos) = selected.iter().position(|id| id == option_id) {
                    selected.remove(pos);
                } else {
                    selected.push(option_id.to_string());
                }
                selected.sort_by_key(|id| question.options.iter().position(|o| &o.id == id));
                self.record_answer(&question.id, AnswerValue::Multiple(selected))
            }
            kind => Err(SessionError::AnswerTypeMismatch(kind.label())),
        }
    }

    fn choose_highlighted(&mut self) {
        let Some(option_id) = self
            .current_question()
            .and_then(|q| q.options.get(self.option_cursor))
            .map(|o| o.id.clone())
        else {
            return;
        };
        if let Err(e) = self.choose_option(&option_id) {
            self.notice = Some(Notice::error(e.to_string()));
        }
    }

    pub fn is_option_selected(&self, question: &Question, option_id: &str) -> bool {
        match self.answer_for(&question.id) {
            Some(AnswerValue::Single(id)) => id == option_id,
            Some(AnswerValue::Multiple(ids)) => ids.iter().any(|id| id == option_id),
            _ => false,
        }
    }

    pub fn insert_at_cursor(&mut self, c: char) {
        if !self.accepts_input() {
            return;
        }
        let byte_idx = byte_offset(&self.input_buffer, self.cursor_position);
        self.input_buffer.insert(byte_idx, c);
        self.cursor_position += 1;
        self.commit_text();
    }

    pub fn delete_before_cursor(&mut self) {
        if !self.accepts_input() {
            return;
        }
        let len = self.input_buffer.chars().count();
        self.cursor_position = self.cursor_position.min(len);
        if self.cursor_position == 0 {
            return;
        }
        let byte_idx = byte_offset(&self.input_buffer, self.cursor_position - 1);
        self.input_buffer.remove(byte_idx);
        self.cursor_position -= 1;
        self.commit_text();
    }

    /// Writes the input buffer as the current free-text answer. Called on every
    /// keystroke, so a forced submission always carries what is on screen.
    pub fn commit_text(&mut self) {
        let Some(question) = self.current_question() else {
            return;
        };
        if question.kind.is_choice() {
            return;
        }
        let question_id = question.id.clone();
        if let Err(e) =
            self.record_answer(&question_id, AnswerValue::Text(self.input_buffer.clone()))
        {
            logger::log(&format!("Text answer not recorded: {}", e));
        }
    }

    fn load_current_input(&mut self) {
        let (buffer, option_cursor) = match self.current_question() {
            Some(question) => {
                let buffer = match self.answer_for(&question.id) {
                    Some(AnswerValue::Text(text)) => text.clone(),
                    _ => String::new(),
                };
                let option_cursor = match self.answer_for(&question.id) {
                    Some(AnswerValue::Single(id)) => {
                        question.options.iter().position(|o| &o.id == id).unwrap_or(0)
                    }
                    _ => 0,
                };
                (buffer, option_cursor)
            }
            None => (String::new(), 0),
        };
        self.cursor_position = buffer.chars().count();
        self.input_buffer = buffer;
        self.option_cursor = option_cursor;
        self.input_scroll_y = 0;
    }

    /// Moves forward one question. Returns false when nothing moved.
    pub fn next_question(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        match self.current_index {
            Some(index) if index + 1 < self.question_count() => {
                self.commit_text();
                self.current_index = Some(index + 1);
                self.load_current_input();
                true
            }
            _ => false,
        }
    }

    pub fn previous_question(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        match self.current_index {
            Some(index) if index > 0 => {
                self.commit_text();
                self.current_index = Some(index - 1);
                self.load_current_input();
                true
            }
            _ => false,
        }
    }

    /// One second of wall time. Returns true when this tick forced the submission.
    pub fn tick(&mut self) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            logger::log(&format!(
                "Time is up on quiz {}, forcing submission of {} answers",
                self.quiz.id,
                self.answers.len()
            ));
            self.start_submission(true);
            return true;
        }
        false
    }

    /// Voluntary submit, only offered on the last question.
    pub fn submit(&mut self) -> Result<(), SessionError> {
        if self.submit_in_flight {
            return Err(SessionError::SubmissionInFlight);
        }
        self.ensure_accepting()?;
        if !self.is_last_question() {
            return Err(SessionError::NotOnLastQuestion);
        }
        self.start_submission(false);
        Ok(())
    }

    fn submit_or_explain(&mut self) {
        if let Err(e) = self.submit() {
            self.notice = Some(Notice::warning(e.to_string()));
        }
    }

    fn start_submission(&mut self, forced: bool) {
        self.phase = SessionPhase::Submitting { forced };
        self.submit_in_flight = true;
        self.notice = Some(if forced {
            Notice::warning(FORCED_SUBMIT_NOTICE)
        } else {
            Notice::info("Submitting your answers...")
        });
        self.send_submission();
    }

    fn send_submission(&self) {
        self.send(ApiRequest::Submit {
            quiz_id: self.quiz.id.clone(),
            attempt: self.attempt,
            answers: self.submission_payload(),
        });
    }

    /// Answers in quiz question order. Anything not belonging to this quiz is dropped.
    pub fn submission_payload(&self) -> Vec<Answer> {
        let mut answers: Vec<(usize, Answer)> = self
            .answers
            .iter()
            .filter_map(|a| match self.quiz.question_position(&a.question_id) {
                Some(position) => Some((position, a.clone())),
                None => {
                    logger::log(&format!("Dropping answer for unknown question {}", a.question_id));
                    None
                }
            })
            .collect();
        answers.sort_by_key(|(position, _)| *position);
        answers.into_iter().map(|(_, answer)| answer).collect()
    }

    pub fn on_submission_result(&mut self, result: Result<(), ApiError>) {
        let SessionPhase::Submitting { forced } = self.phase else {
            logger::log(&format!(
                "Ignoring submission result while {}",
                self.phase.name()
            ));
            return;
        };
        self.submit_in_flight = false;

        match result {
            Ok(()) => {
                self.phase = SessionPhase::Submitted { forced };
                self.finished_at = Some(Utc::now());
                self.notice = Some(if forced {
                    Notice::warning(FORCED_SUBMITTED_NOTICE)
                } else {
                    Notice::info(SUBMITTED_NOTICE)
                });
                logger::log(&format!("Quiz {} submitted (forced: {})", self.quiz.id, forced));
            }
            Err(e) if !forced => {
                self.phase = SessionPhase::InProgress;
                self.notice = Some(Notice::error(format!(
                    "Submission failed: {}. Your answers are kept, try again.",
                    e
                )));
            }
            Err(e) if !self.forced_retry_used => {
                self.forced_retry_used = true;
                self.submit_in_flight = true;
                self.notice = Some(Notice::warning(format!(
                    "Automatic submission failed ({}). Retrying once...",
                    e
                )));
                logger::log("Retrying forced submission");
                self.send_submission();
            }
            Err(e) => {
                self.phase = SessionPhase::Abandoned;
                self.finished_at = Some(Utc::now());
                self.notice = Some(Notice::error(format!(
                    "Automatic submission failed again ({}). This attempt was abandoned.",
                    e
                )));
                logger::log(&format!("Quiz {} attempt abandoned", self.quiz.id));
            }
        }
    }
}

fn validate_answer(question: &Question, value: &AnswerValue) -> Result<(), SessionError> {
    let unknown = |option_id: &str| SessionError::UnknownOption {
        question_id: question.id.clone(),
        option_id: option_id.to_string(),
    };

    match (question.kind, value) {
        (QuestionType::SingleChoice | QuestionType::TrueFalse, AnswerValue::Single(id)) => {
            if id.is_empty() || question.has_option(id) {
                Ok(())
            } else {
                Err(unknown(id))
            }
        }
        (QuestionType::MultipleChoice, AnswerValue::Multiple(ids)) => {
            match ids.iter().find(|id| !question.has_option(id)) {
                Some(id) => Err(unknown(id)),
                None => Ok(()),
            }
        }
        (QuestionType::ShortAnswer | QuestionType::FillBlank, AnswerValue::Text(_)) => Ok(()),
        (kind, _) => Err(SessionError::AnswerTypeMismatch(kind.label())),
    }
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
