use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use hackquiz::{
    App, AuthContext, Config, HttpQuizApi, QuizApi, QuizId, api_worker, app, db, logger,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    logger::init(&config.data_dir);
    logger::log(&format!("Starting hackquiz against {}", config.api_url));

    let auth = AuthContext::init(&config);
    let api: Arc<dyn QuizApi> = Arc::new(
        HttpQuizApi::new(&config, auth.clone())
            .map_err(io::Error::other)?,
    );

    let db = match db::init_db(&config.data_dir) {
        Ok(conn) => Some(conn),
        Err(e) => {
            logger::log(&format!("Attempt history disabled: {}", e));
            None
        }
    };

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let worker = api_worker::spawn_api_worker(api, request_rx, response_tx);

    let mut app = App::new(auth, request_tx, db);
    app.refresh_current_user();
    if let Some(raw) = &config.initial_quiz_id {
        match QuizId::parse(raw) {
            Ok(quiz_id) => app.open_quiz(quiz_id),
            Err(e) => app.menu.error = Some(e.to_string()),
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app::run(&mut terminal, &mut app, response_rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    drop(app);
    worker.abort();
    logger::log("Exiting");

    result
}
