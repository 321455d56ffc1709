pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use prodle::{
    app_dirs::AppDirs,
    backend::{GameBackend, HttpBackend},
    config::{resolve_game_settings, Config, ConfigStore, FileConfigStore},
    protocol::Difficulty,
    runtime::{CrosstermEventSource, Dispatcher, FixedTicker, GameEvent, GameEventSource, Runner},
    session::{GameSession, Phase},
    timer::Timer,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// guess the pro player before the clock runs out
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Identify as many hidden esports pros as you can within the time limit. Every guess is compared attribute by attribute against the target: team, league, role, country, age, clubs, KDA and most played champion."
)]
pub struct Cli {
    /// base url of the game server
    #[clap(long)]
    server: Option<String>,

    /// player pool to draw targets from
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// seconds to wait for each server response
    #[clap(short = 't', long)]
    timeout: Option<u64>,
}

impl Cli {
    /// Command line flags win over the stored config
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub session: GameSession,
    /// guess input while playing, username once the game is over
    pub input: String,
    pub quit_armed: bool,
    last_username: Option<String>,
    last_phase: Phase,
}

impl App {
    pub fn new(session: GameSession, last_username: Option<String>) -> Self {
        let last_phase = session.phase();
        Self {
            session,
            input: String::new(),
            quit_armed: false,
            last_username,
            last_phase,
        }
    }

    /// Resets the input line when the game moves between screens.
    fn sync_input(&mut self) {
        let phase = self.session.phase();
        if phase == self.last_phase {
            return;
        }
        match phase {
            Phase::Ended => self.input = self.last_username.clone().unwrap_or_default(),
            Phase::Setup | Phase::Countdown => self.input.clear(),
            Phase::Submitted => self.last_username = self.session.score_form().username.clone(),
            _ => {}
        }
        self.last_phase = phase;
    }
}

fn init_logging() -> io::Result<()> {
    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env("PRODLE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging()?;

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);

    let backend: Arc<dyn GameBackend> = Arc::new(HttpBackend::new(
        &config.server_url,
        Duration::from_secs(config.request_timeout_secs),
    )?);
    let settings = resolve_game_settings(backend.as_ref());
    let session = GameSession::new(
        Timer::new(settings.total_game_time_seconds),
        settings.players_per_session,
        config.difficulty,
    );
    let mut app = App::new(session, config.last_username.clone());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend_tui = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_tui)?;

    let result = start_tui(&mut terminal, &mut app, backend);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if app.last_username.is_some() && app.last_username != config.last_username {
        config.last_username = app.last_username.clone();
        store.save(&config)?;
    }
    if let Some(reason) = app.session.redirect() {
        eprintln!("prodle: {reason}");
    }

    result
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    backend: Arc<dyn GameBackend>,
) -> Result<(), Box<dyn Error>> {
    let events = CrosstermEventSource::new();
    let dispatcher = Dispatcher::new(backend, events.sender());
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    app.session.begin();
    let mut last = Instant::now();

    loop {
        dispatcher.dispatch_all(app.session.take_requests());
        terminal.draw(|f| ui(app, f))?;

        let event = runner.step();
        let now = Instant::now();
        app.session.advance(now - last);
        last = now;

        match event {
            GameEvent::Key(key) => {
                if handle_key(app, key) == Flow::Quit {
                    break;
                }
            }
            GameEvent::Focus(visible) => app.session.set_visible(visible),
            GameEvent::Completed(completion) => app.session.apply(completion),
            GameEvent::Resize | GameEvent::Tick => {}
        }

        app.sync_input();

        if app.session.redirect().is_some() {
            info!("leaving game: session unavailable");
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Flow {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Flow::Quit;
    }
    if key.code == KeyCode::Esc {
        if app.session.blocks_navigation() && !app.quit_armed {
            app.quit_armed = true;
            return Flow::Continue;
        }
        return Flow::Quit;
    }
    app.quit_armed = false;

    match app.session.phase() {
        Phase::Active | Phase::Transitioning => handle_guess_key(app, key),
        Phase::Ended => {
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('r') {
                app.session.restart();
                return Flow::Continue;
            }
            match key.code {
                KeyCode::Char(c) => app.input.push(c),
                KeyCode::Backspace => {
                    app.input.pop();
                }
                KeyCode::Enter => {
                    let _ = app.session.submit_score(&app.input);
                }
                _ => {}
            }
        }
        Phase::Submitted => match key.code {
            KeyCode::Char('r') => app.session.restart(),
            KeyCode::Char('q') => return Flow::Quit,
            _ => {}
        },
        Phase::Setup | Phase::Countdown => {}
    }
    Flow::Continue
}

fn handle_guess_key(app: &mut App, key: KeyEvent) {
    if !app.session.accepts_guesses() {
        return;
    }
    match key.code {
        KeyCode::Char(c) => {
            app.input.push(c);
            app.session.query_changed(&app.input);
        }
        KeyCode::Backspace => {
            app.input.pop();
            app.session.query_changed(&app.input);
        }
        KeyCode::Down => app.session.autocomplete_mut().navigate(1),
        KeyCode::Up => app.session.autocomplete_mut().navigate(-1),
        KeyCode::Tab => {
            if let Some(name) = app.session.autocomplete_mut().accept() {
                app.input = name;
            }
        }
        KeyCode::Enter => {
            if let Some(name) = app.session.autocomplete_mut().accept() {
                app.input = name;
            } else if app.session.submit_guess(&app.input).is_ok() {
                app.input.clear();
            }
        }
        _ => {}
    }
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}
