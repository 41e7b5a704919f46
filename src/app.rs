use crate::auth::AuthContext;
use crate::db::attempt::{self, AttemptSummary};
use crate::forms::QuizId;
use crate::logger;
use crate::models::{ApiRequest, ApiResponse, AppState, QuizSession, SessionPhase};
use crate::session::handle_quiz_input;
use crate::ui::{
    draw_loading, draw_menu, draw_not_found, draw_quit_confirmation, draw_quiz, draw_summary,
};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{Frame, Terminal, backend::Backend};
use rusqlite::Connection;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, Interval, MissedTickBehavior};

const HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuFocus {
    Input,
    History,
}

#[derive(Debug)]
pub struct MenuState {
    pub input: String,
    /// Cursor in `input`, counted in chars.
    pub cursor_position: usize,
    pub attempts: Vec<AttemptSummary>,
    pub selected_attempt: usize,
    pub focus: MenuFocus,
    pub error: Option<String>,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            input: String::new(),
            cursor_position: 0,
            attempts: Vec::new(),
            selected_attempt: 0,
            focus: MenuFocus::Input,
            error: None,
        }
    }
}

/// The quiz being fetched, or the one that failed to load.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    pub quiz_id: String,
    pub error: Option<String>,
}

pub struct App {
    pub state: AppState,
    pub menu: MenuState,
    pub session: Option<QuizSession>,
    pub pending: Option<PendingLoad>,
    pub auth: AuthContext,
    pub api_tx: UnboundedSender<ApiRequest>,
    pub db: Option<Connection>,
    pub should_quit: bool,
    history_recorded: bool,
}

impl App {
    pub fn new(
        auth: AuthContext,
        api_tx: UnboundedSender<ApiRequest>,
        db: Option<Connection>,
    ) -> Self {
        let mut app = Self {
            state: AppState::Menu,
            menu: MenuState::default(),
            session: None,
            pending: None,
            auth,
            api_tx,
            db,
            should_quit: false,
            history_recorded: false,
        };
        app.refresh_history();
        app
    }

    fn send(&self, request: ApiRequest) {
        if self.api_tx.send(request).is_err() {
            logger::log("API worker is gone, request dropped");
        }
    }

    pub fn refresh_history(&mut self) {
        let Some(conn) = &self.db else {
            return;
        };
        match attempt::recent_attempts(conn, HISTORY_LIMIT) {
            Ok(attempts) => {
                self.menu.attempts = attempts;
                if self.menu.selected_attempt >= self.menu.attempts.len() {
                    self.menu.selected_attempt = self.menu.attempts.len().saturating_sub(1);
                }
            }
            Err(e) => logger::log(&format!("Failed to load attempt history: {}", e)),
        }
    }

    /// Refreshes the display name from the backend when an identity is configured.
    pub fn refresh_current_user(&self) {
        if self.auth.is_active() {
            self.send(ApiRequest::FetchCurrentUser);
        }
    }

    pub fn open_quiz(&mut self, quiz_id: QuizId) {
        logger::log(&format!("Opening quiz {}", quiz_id));
        self.session = None;
        self.history_recorded = false;
        self.pending = Some(PendingLoad {
            quiz_id: quiz_id.to_string(),
            error: None,
        });
        self.state = AppState::Loading;
        self.send(ApiRequest::FetchQuiz {
            quiz_id: quiz_id.into_inner(),
        });
    }

    /// Drops the page: session, timer and any outstanding load.
    pub fn return_to_menu(&mut self) {
        if let Some(session) = &self.session {
            logger::log(&format!(
                "Leaving quiz {} while {}",
                session.quiz.id,
                session.phase.name()
            ));
        }
        self.session = None;
        self.pending = None;
        self.state = AppState::Menu;
        self.refresh_history();
    }

    /// True while the countdown should be running.
    pub fn timer_active(&self) -> bool {
        matches!(self.state, AppState::Quiz | AppState::QuizQuitConfirm)
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.phase == SessionPhase::InProgress)
    }

    pub fn tick(&mut self) {
        if let Some(session) = &mut self.session {
            session.tick();
        }
        self.after_session_update();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> io::Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match self.state {
            AppState::Menu => self.handle_menu_key(key),
            AppState::Loading => {
                if key.code == KeyCode::Esc {
                    self.return_to_menu();
                }
            }
            AppState::NotFound => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('m')) {
                    self.return_to_menu();
                }
            }
            AppState::Quiz => {
                if let Some(session) = &mut self.session {
                    handle_quiz_input(session, key, &mut self.state)?;
                }
                self.after_session_update();
            }
            AppState::QuizQuitConfirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.return_to_menu(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.state = AppState::Quiz;
                }
                _ => {}
            },
            AppState::Summary => match key.code {
                KeyCode::Char('m') | KeyCode::Enter | KeyCode::Esc => self.return_to_menu(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            },
        }
        Ok(())
    }

    /// Tears down the identity for every holder of the auth context.
    pub fn logout(&mut self) {
        self.auth.logout();
        self.menu.error = None;
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('l') {
                self.logout();
            }
            return;
        }

        let menu = &mut self.menu;
        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                menu.focus = match menu.focus {
                    MenuFocus::Input if !menu.attempts.is_empty() => MenuFocus::History,
                    _ => MenuFocus::Input,
                };
                return;
            }
            _ => {}
        }

        match menu.focus {
            MenuFocus::Input => match key.code {
                KeyCode::Enter => match QuizId::parse(&menu.input) {
                    Ok(quiz_id) => {
                        menu.error = None;
                        self.open_quiz(quiz_id);
                    }
                    Err(e) => menu.error = Some(e.to_string()),
                },
                KeyCode::Char(c) => {
                    let byte_idx = menu
                        .input
                        .char_indices()
                        .nth(menu.cursor_position)
                        .map(|(i, _)| i)
                        .unwrap_or(menu.input.len());
                    menu.input.insert(byte_idx, c);
                    menu.cursor_position += 1;
                    menu.error = None;
                }
                KeyCode::Backspace => {
                    if menu.cursor_position > 0 {
                        if let Some((byte_idx, _)) =
                            menu.input.char_indices().nth(menu.cursor_position - 1)
                        {
                            menu.input.remove(byte_idx);
                        }
                        menu.cursor_position -= 1;
                    }
                }
                KeyCode::Left => {
                    menu.cursor_position = menu.cursor_position.saturating_sub(1);
                }
                KeyCode::Right => {
                    menu.cursor_position =
                        (menu.cursor_position + 1).min(menu.input.chars().count());
                }
                KeyCode::Down if !menu.attempts.is_empty() => {
                    menu.focus = MenuFocus::History;
                }
                _ => {}
            },
            MenuFocus::History => match key.code {
                KeyCode::Up => {
                    if menu.selected_attempt == 0 {
                        menu.focus = MenuFocus::Input;
                    } else {
                        menu.selected_attempt -= 1;
                    }
                }
                KeyCode::Down => {
                    if menu.selected_attempt + 1 < menu.attempts.len() {
                        menu.selected_attempt += 1;
                    }
                }
                KeyCode::Enter => {
                    let Some(past) = menu.attempts.get(menu.selected_attempt) else {
                        return;
                    };
                    match QuizId::parse(&past.quiz_id) {
                        Ok(quiz_id) => self.open_quiz(quiz_id),
                        Err(e) => menu.error = Some(e.to_string()),
                    }
                }
                _ => {}
            },
        }
    }

    pub fn handle_api_response(&mut self, response: ApiResponse) {
        if let ApiResponse::CurrentUser { result } = response {
            match result {
                Ok(user) => self.auth.set_display_name(&user.username),
                Err(e) => logger::log(&format!("Keeping configured identity: {}", e)),
            }
            return;
        }

        if let ApiResponse::QuizLoaded { quiz_id, result } = response {
            let is_current = self.state == AppState::Loading
                && self.pending.as_ref().is_some_and(|p| p.quiz_id == quiz_id);
            if !is_current {
                logger::log(&format!("Dropping stale quiz load for {}", quiz_id));
                return;
            }
            match result {
                Ok(quiz) => {
                    if let Some(protocol_id) = &quiz.protocol_id {
                        self.send(ApiRequest::FetchProtocol {
                            quiz_id: quiz.id.clone(),
                            protocol_id: protocol_id.clone(),
                        });
                    }
                    self.pending = None;
                    self.history_recorded = false;
                    self.session = Some(QuizSession::new(
                        quiz,
                        self.auth.clone(),
                        Some(self.api_tx.clone()),
                    ));
                    self.state = AppState::Quiz;
                }
                Err(e) => {
                    if let Some(pending) = &mut self.pending {
                        pending.error = Some(e.to_string());
                    }
                    self.state = AppState::NotFound;
                }
            }
            return;
        }

        let Some(session) = &mut self.session else {
            logger::log("Dropping API response, no quiz open");
            return;
        };
        if response.quiz_id() != Some(session.quiz.id.as_str()) {
            logger::log(&format!(
                "Dropping stale response for quiz {:?}",
                response.quiz_id()
            ));
            return;
        }
        if let Some(attempt) = response.attempt()
            && attempt != session.attempt
        {
            logger::log(&format!(
                "Dropping response for earlier attempt {} of quiz {}",
                attempt, session.quiz.id
            ));
            return;
        }

        match response {
            ApiResponse::ProtocolLoaded { result, .. } => match result {
                Ok(protocol) => session.protocol_name = Some(protocol.name),
                Err(_) => session.protocol_name = None,
            },
            ApiResponse::StartRecorded { result, .. } => session.on_start_recorded(result),
            ApiResponse::Submitted { result, .. } => session.on_submission_result(result),
            ApiResponse::QuizLoaded { .. } | ApiResponse::CurrentUser { .. } => {}
        }
        self.after_session_update();
    }

    /// Records a finished attempt once and moves to the confirmation screen.
    fn after_session_update(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if !session.phase.is_finished() || self.history_recorded {
            return;
        }
        self.history_recorded = true;
        if let Some(conn) = &self.db
            && let Err(e) = attempt::record_attempt(conn, session)
        {
            logger::log(&format!("Failed to record attempt: {}", e));
        }
        self.state = AppState::Summary;
    }

    pub fn draw(&mut self, f: &mut Frame) {
        match self.state {
            AppState::Menu => draw_menu(f, &self.menu, &self.auth),
            AppState::Loading => {
                let quiz_id = self.pending.as_ref().map(|p| p.quiz_id.as_str()).unwrap_or("");
                draw_loading(f, quiz_id);
            }
            AppState::NotFound => {
                let (quiz_id, error) = match &self.pending {
                    Some(p) => (p.quiz_id.as_str(), p.error.as_deref()),
                    None => ("", None),
                };
                draw_not_found(f, quiz_id, error);
            }
            AppState::Quiz => {
                if let Some(session) = &mut self.session {
                    draw_quiz(f, session);
                }
            }
            AppState::QuizQuitConfirm => {
                if let Some(session) = &mut self.session {
                    draw_quiz(f, session);
                }
                draw_quit_confirmation(f);
            }
            AppState::Summary => {
                if let Some(session) = &self.session {
                    draw_summary(f, session);
                }
            }
        }
    }
}

fn new_countdown() -> Interval {
    let period = Duration::from_secs(1);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => futures::future::pending::<()>().await,
    }
}

/// Drives the UI until the user quits. The countdown interval only exists while a
/// session is in progress, so leaving the quiz stops the timer.
pub async fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut responses: UnboundedReceiver<ApiResponse>,
) -> io::Result<()> {
    let mut events = EventStream::new();
    let mut countdown: Option<Interval> = None;

    loop {
        terminal.draw(|f| app.draw(f))?;
        if app.should_quit {
            break;
        }

        match (app.timer_active(), countdown.is_some()) {
            (true, false) => countdown = Some(new_countdown()),
            (false, true) => countdown = None,
            _ => {}
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key)?;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            },
            Some(response) = responses.recv() => app.handle_api_response(response),
            _ = next_tick(&mut countdown) => app.tick(),
        }
    }

    Ok(())
}
