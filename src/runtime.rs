use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::debug;

use crate::backend::GameBackend;
use crate::session::{Completion, Request};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    /// Terminal focus gained (true) or lost (false).
    Focus(bool),
    /// A backend call finished.
    Completed(Completion),
    Tick,
}

/// Source of app events (keyboard, focus, backend completions)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;

    /// Handle through which other producers (the dispatcher) feed this source.
    fn sender(&self) -> Sender<GameEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    Some(GameEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => Some(GameEvent::Resize),
                Ok(CtEvent::FocusGained) => Some(GameEvent::Focus(true)),
                Ok(CtEvent::FocusLost) => Some(GameEvent::Focus(false)),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(ev) = forwarded {
                if input_tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<GameEvent> {
        self.tx.clone()
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Event source fed entirely by the test through a channel.
pub struct TestEventSource {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<GameEvent> {
        self.tx.clone()
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }

    pub fn sender(&self) -> Sender<GameEvent> {
        self.event_source.sender()
    }
}

/// Performs one request against the backend. Blocking.
pub fn perform(backend: &dyn GameBackend, request: Request) -> Completion {
    match request {
        Request::StartSession { difficulty } => {
            Completion::SessionStarted(backend.start_session(difficulty))
        }
        Request::Guess {
            token,
            session_id,
            player_name,
        } => Completion::Guess {
            token,
            result: backend.submit_guess(&session_id, &player_name),
        },
        Request::Autocomplete {
            token,
            session_id,
            query,
        } => Completion::Autocomplete {
            token,
            result: backend.autocomplete(&session_id, &query),
        },
        Request::EndGame { session_id } => Completion::GameEnded(backend.end_game(&session_id)),
        Request::SubmitScore {
            session_id,
            username,
        } => Completion::ScoreSubmitted(backend.submit_score(&session_id, &username)),
    }
}

/// Runs requests off the event loop; each result comes back as `GameEvent::Completed`.
pub struct Dispatcher {
    backend: Arc<dyn GameBackend>,
    events: Sender<GameEvent>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn GameBackend>, events: Sender<GameEvent>) -> Self {
        Self { backend, events }
    }

    pub fn dispatch(&self, request: Request) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        std::thread::spawn(move || {
            let completion = perform(backend.as_ref(), request);
            if events.send(GameEvent::Completed(completion)).is_err() {
                debug!("event loop gone, dropping completion");
            }
        });
    }

    pub fn dispatch_all(&self, requests: Vec<Request>) {
        for request in requests {
            self.dispatch(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use crate::protocol::{Difficulty, EndGameResponse, GameSettings, GuessResponse};

    struct EchoBackend;

    impl GameBackend for EchoBackend {
        fn start_session(&self, difficulty: Difficulty) -> Result<String, GameError> {
            Ok(format!("session-{difficulty}"))
        }

        fn submit_guess(&self, _: &str, _: &str) -> Result<GuessResponse, GameError> {
            Err(GameError::Transport("unreachable".into()))
        }

        fn autocomplete(&self, _: &str, query: &str) -> Result<Vec<String>, GameError> {
            Ok(vec![format!("{query}!")])
        }

        fn end_game(&self, _: &str) -> Result<EndGameResponse, GameError> {
            Err(GameError::Transport("unreachable".into()))
        }

        fn submit_score(&self, _: &str, _: &str) -> Result<Option<u32>, GameError> {
            Ok(Some(1))
        }

        fn fetch_settings(&self) -> Result<GameSettings, GameError> {
            Err(GameError::Transport("unreachable".into()))
        }
    }

    #[test]
    fn step_returns_tick_on_timeout() {
        let es = TestEventSource::new();
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        // With no events available, step should yield Tick
        let ev = runner.step();
        match ev {
            GameEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let es = TestEventSource::new();
        es.sender().send(GameEvent::Resize).unwrap();
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            GameEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn perform_keeps_request_token() {
        let completion = perform(
            &EchoBackend,
            Request::Autocomplete {
                token: 42,
                session_id: "s".into(),
                query: "fa".into(),
            },
        );
        assert_eq!(
            completion,
            Completion::Autocomplete {
                token: 42,
                result: Ok(vec!["fa!".to_string()])
            }
        );
    }

    #[test]
    fn dispatcher_posts_completion_to_event_loop() {
        let es = TestEventSource::new();
        let dispatcher = Dispatcher::new(Arc::new(EchoBackend), es.sender());
        dispatcher.dispatch(Request::StartSession {
            difficulty: Difficulty::Facile,
        });
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        let mut got = None;
        for _ in 0..200 {
            if let GameEvent::Completed(c) = runner.step() {
                got = Some(c);
                break;
            }
        }
        assert_eq!(
            got,
            Some(Completion::SessionStarted(Ok("session-facile".to_string())))
        );
    }
}
