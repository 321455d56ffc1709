//! The game state machine.
//!
//! `GameSession` never performs I/O. Operations queue [`Request`]s that the
//! runtime executes; results come back as [`Completion`]s through
//! [`GameSession::apply`]. Time only moves through [`GameSession::advance`].

use crate::autocomplete::Autocomplete;
use crate::countdown::{Countdown, CountdownEvent};
use crate::error::{GameError, ValidationError};
use crate::protocol::{Comparison, Difficulty, EndGameResponse, GuessResponse, PlayerProfile};
use crate::timer::{Timer, TimerEvent};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TOTAL_TARGETS: u32 = 20;
/// Counted in UTF-8 bytes, the way the server counts it.
pub const MAX_USERNAME_BYTES: usize = 50;
pub const SUCCESS_BANNER: Duration = Duration::from_millis(1000);
pub const ADVANCE_DELAY: Duration = Duration::from_millis(3500);
pub const GAME_OVER_DELAY: Duration = Duration::from_millis(2000);
pub const GAME_OVER_AFTER_CORRECT_DELAY: Duration = Duration::from_millis(4000);
pub const NOTICE_LIFETIME: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Setup,
    Countdown,
    Active,
    Transitioning,
    Ended,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameProgress {
    /// 1-based
    pub current_target_index: u32,
    pub total_targets: u32,
    pub score: u32,
    pub guess_count_for_current_target: u32,
    pub targets_found: u32,
}

impl GameProgress {
    fn new(total_targets: u32) -> Self {
        Self {
            current_target_index: 1,
            total_targets,
            score: 0,
            guess_count_for_current_target: 0,
            targets_found: 0,
        }
    }
}

/// One submitted guess and how it compared.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessAttempt {
    pub guessed_name: String,
    pub comparison: Comparison,
    pub correct: bool,
    pub score_after: u32,
    pub game_over: bool,
    pub target_index: u32,
}

/// Work for the runtime to carry out on the session's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    StartSession {
        difficulty: Difficulty,
    },
    Guess {
        token: u64,
        session_id: String,
        player_name: String,
    },
    Autocomplete {
        token: u64,
        session_id: String,
        query: String,
    },
    EndGame {
        session_id: String,
    },
    SubmitScore {
        session_id: String,
        username: String,
    },
}

/// Result of a [`Request`], delivered back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    SessionStarted(Result<String, GameError>),
    Guess {
        token: u64,
        result: Result<GuessResponse, GameError>,
    },
    Autocomplete {
        token: u64,
        result: Result<Vec<String>, GameError>,
    },
    GameEnded(Result<EndGameResponse, GameError>),
    ScoreSubmitted(Result<Option<u32>, GameError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message for the player; disappears on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    remaining: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    HideBanner,
    AdvanceTarget,
    EndGame,
}

#[derive(Debug, Clone)]
struct Scheduled {
    wait: Duration,
    action: Deferred,
}

/// Score form state once the game has ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreForm {
    pub submitting: bool,
    pub rank: Option<u32>,
    pub username: Option<String>,
}

#[derive(Debug)]
pub struct GameSession {
    phase: Phase,
    difficulty: Difficulty,
    session_id: Option<String>,
    progress: GameProgress,
    history: Vec<GuessAttempt>,
    countdown: Countdown,
    timer: Timer,
    autocomplete: Autocomplete,
    guess_generation: u64,
    guess_in_flight: Option<u64>,
    closing: bool,
    scheduled: Vec<Scheduled>,
    visible: bool,
    show_banner: bool,
    revealed: Option<PlayerProfile>,
    missed_target: Option<PlayerProfile>,
    score_form: ScoreForm,
    notice: Option<Notice>,
    redirect: Option<String>,
    outbox: Vec<Request>,
}

impl GameSession {
    pub fn new(timer: Timer, total_targets: u32, difficulty: Difficulty) -> Self {
        Self {
            phase: Phase::Setup,
            difficulty,
            session_id: None,
            progress: GameProgress::new(total_targets.max(1)),
            history: Vec::new(),
            countdown: Countdown::new(),
            timer,
            autocomplete: Autocomplete::new(),
            guess_generation: 0,
            guess_in_flight: None,
            closing: false,
            scheduled: Vec::new(),
            visible: true,
            show_banner: false,
            revealed: None,
            missed_target: None,
            score_form: ScoreForm::default(),
            notice: None,
            redirect: None,
            outbox: Vec::new(),
        }
    }

    /// Asks the server for a fresh session. Any previous id is discarded first.
    pub fn begin(&mut self) {
        self.session_id = None;
        self.phase = Phase::Setup;
        self.outbox.push(Request::StartSession {
            difficulty: self.difficulty,
        });
    }

    /// Adopts a server-issued session id and starts the lead-in.
    pub fn initialize(&mut self, session_id: &str) -> Result<(), GameError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(self.fail_session("no session id was issued"));
        }
        info!(session_id, "session ready, starting countdown");
        self.session_id = Some(session_id.to_string());
        self.phase = Phase::Countdown;
        self.countdown.start();
        Ok(())
    }

    /// Full restart from the end screen: clears progress and requests a new session.
    pub fn restart(&mut self) {
        if !matches!(self.phase, Phase::Ended | Phase::Submitted) {
            debug!(phase = %self.phase, "restart ignored");
            return;
        }
        info!("restarting game");
        self.timer.reset();
        self.countdown.cancel();
        self.progress = GameProgress::new(self.progress.total_targets);
        self.history.clear();
        self.autocomplete.clear();
        self.guess_in_flight = None;
        self.closing = false;
        self.scheduled.clear();
        self.show_banner = false;
        self.revealed = None;
        self.missed_target = None;
        self.score_form = ScoreForm::default();
        self.notice = None;
        self.begin();
    }

    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::SessionStarted(result) => self.on_session_started(result),
            Completion::Guess { token, result } => self.on_guess_completed(token, result),
            Completion::Autocomplete { token, result } => {
                self.autocomplete.apply(token, result);
            }
            Completion::GameEnded(result) => self.on_game_ended(result),
            Completion::ScoreSubmitted(result) => self.on_score_submitted(result),
        }
    }

    /// Moves every clock forward by `elapsed`.
    pub fn advance(&mut self, elapsed: Duration) {
        // the clock starts fresh when the lead-in ends; leftover time is not carried over
        if let Some(CountdownEvent::Complete) = self.countdown.advance(elapsed) {
            self.on_countdown_complete();
        } else {
            for event in self.timer.advance(elapsed) {
                match event {
                    TimerEvent::Tick(_) => {}
                    TimerEvent::TimeUp => self.handle_time_up(),
                }
            }
        }

        self.run_scheduled(elapsed);

        if let Some(lookup) = self.autocomplete.advance(elapsed) {
            match (&self.session_id, self.phase) {
                (Some(session_id), phase) if phase != Phase::Transitioning => {
                    self.outbox.push(Request::Autocomplete {
                        token: lookup.token,
                        session_id: session_id.clone(),
                        query: lookup.query,
                    });
                }
                _ => debug!("autocomplete lookup dropped"),
            }
        }

        if let Some(notice) = self.notice.as_mut() {
            notice.remaining = notice.remaining.saturating_sub(elapsed);
            if notice.remaining.is_zero() {
                self.notice = None;
            }
        }
    }

    /// Sends a guess if the session is accepting input.
    pub fn submit_guess(&mut self, name: &str) -> Result<(), GameError> {
        if !self.accepts_guesses() {
            debug!(phase = %self.phase, in_flight = self.guess_in_flight.is_some(), "guess rejected");
            return Err(GameError::InputLocked(self.phase));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(self.report(ValidationError::EmptyGuess.into()));
        }
        let Some(session_id) = self.session_id.clone() else {
            return Err(self.fail_session("session id lost"));
        };

        self.guess_generation += 1;
        self.guess_in_flight = Some(self.guess_generation);
        self.autocomplete.clear();
        self.outbox.push(Request::Guess {
            token: self.guess_generation,
            session_id,
            player_name: name.to_string(),
        });
        Ok(())
    }

    fn on_guess_completed(&mut self, token: u64, result: Result<GuessResponse, GameError>) {
        if self.guess_in_flight != Some(token) {
            debug!(token, "discarding stale guess response");
            return;
        }
        self.guess_in_flight = None;
        if self.phase != Phase::Active {
            debug!(phase = %self.phase, "guess response arrived after the game moved on");
            return;
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.report(err);
                return;
            }
        };
        let Some(comparison) = response.comparison.clone() else {
            self.report(GameError::Transport(
                "guess response had no comparison".to_string(),
            ));
            return;
        };

        let attempt = GuessAttempt {
            guessed_name: comparison.guessed_player.player_username.clone(),
            comparison,
            correct: response.correct,
            score_after: response.score,
            game_over: response.game_over,
            target_index: self.progress.current_target_index,
        };
        self.handle_guess_result(attempt);
    }

    /// Applies a successful guess. The server's score is taken as is.
    pub fn handle_guess_result(&mut self, attempt: GuessAttempt) {
        self.progress.score = attempt.score_after;
        self.progress.guess_count_for_current_target += 1;
        let correct = attempt.correct;
        let game_over = attempt.game_over;

        if correct {
            self.progress.targets_found += 1;
            self.phase = Phase::Transitioning;
            self.show_banner = true;
            self.revealed = Some(attempt.comparison.guessed_player.clone());
            self.schedule(SUCCESS_BANNER, Deferred::HideBanner);
            info!(
                target = self.progress.current_target_index,
                score = self.progress.score,
                "target found"
            );
        }
        self.history.push(attempt);

        if game_over {
            // the end takes over; no advance is scheduled that could reopen input
            self.closing = true;
            let delay = if correct {
                GAME_OVER_AFTER_CORRECT_DELAY
            } else {
                GAME_OVER_DELAY
            };
            self.schedule(delay, Deferred::EndGame);
        } else if correct {
            self.schedule(ADVANCE_DELAY, Deferred::AdvanceTarget);
        }
    }

    fn advance_target(&mut self) {
        if self.phase != Phase::Transitioning {
            debug!(phase = %self.phase, "advance skipped");
            return;
        }
        self.revealed = None;
        if self.progress.current_target_index >= self.progress.total_targets {
            info!("all targets played");
            self.end();
            return;
        }
        self.progress.current_target_index += 1;
        self.progress.guess_count_for_current_target = 0;
        self.history.clear();
        self.phase = Phase::Active;
        debug!(
            target = self.progress.current_target_index,
            total = self.progress.total_targets,
            "next target"
        );
    }

    /// The whole-game clock ran out.
    pub fn handle_time_up(&mut self) {
        if matches!(self.phase, Phase::Active | Phase::Transitioning) {
            info!(targets_found = self.progress.targets_found, "time up");
            self.end();
        }
    }

    /// Finishes the game: stops the clock, notifies the server, opens the score form.
    /// Runs at most once per game.
    pub fn end(&mut self) {
        if matches!(self.phase, Phase::Ended | Phase::Submitted) {
            return;
        }
        self.timer.stop();
        self.countdown.cancel();
        self.phase = Phase::Ended;
        self.closing = false;
        self.guess_in_flight = None;
        self.scheduled.clear();
        self.show_banner = false;
        self.revealed = None;
        self.autocomplete.clear();
        info!(
            score = self.progress.score,
            found = self.progress.targets_found,
            "game over"
        );
        if let Some(session_id) = self.session_id.clone() {
            self.outbox.push(Request::EndGame { session_id });
        }
    }

    fn on_game_ended(&mut self, result: Result<EndGameResponse, GameError>) {
        match result {
            Ok(response) => {
                if self.phase == Phase::Ended || self.phase == Phase::Submitted {
                    self.missed_target = response.missed_player;
                }
            }
            Err(err) => warn!(%err, "failed to notify server of game end"),
        }
    }

    /// Validates and sends the player's name for the leaderboard.
    pub fn submit_score(&mut self, username: &str) -> Result<(), GameError> {
        if self.phase != Phase::Ended || self.score_form.submitting {
            return Err(GameError::InputLocked(self.phase));
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(self.report(ValidationError::EmptyUsername.into()));
        }
        if username.len() > MAX_USERNAME_BYTES {
            return Err(self.report(
                ValidationError::UsernameTooLong {
                    max: MAX_USERNAME_BYTES,
                }
                .into(),
            ));
        }
        let Some(session_id) = self.session_id.clone() else {
            return Err(self.fail_session("session id lost"));
        };

        self.score_form.submitting = true;
        self.score_form.username = Some(username.to_string());
        self.outbox.push(Request::SubmitScore {
            session_id,
            username: username.to_string(),
        });
        Ok(())
    }

    fn on_score_submitted(&mut self, result: Result<Option<u32>, GameError>) {
        if self.phase != Phase::Ended || !self.score_form.submitting {
            debug!("discarding score response");
            return;
        }
        self.score_form.submitting = false;
        match result {
            Ok(rank) => {
                self.score_form.rank = rank;
                self.phase = Phase::Submitted;
                let text = match rank {
                    Some(rank) => format!("Score saved! Leaderboard rank #{rank}"),
                    None => "Score saved!".to_string(),
                };
                self.notify(NoticeKind::Success, text);
            }
            Err(err) => {
                self.report(err);
            }
        }
    }

    fn on_session_started(&mut self, result: Result<String, GameError>) {
        if self.phase != Phase::Setup {
            debug!(phase = %self.phase, "ignoring unexpected session id");
            return;
        }
        match result {
            Ok(session_id) => {
                if self.initialize(&session_id).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(%err, "could not create session");
                self.fail_session(&format!("could not create a game session ({err})"));
            }
        }
    }

    fn on_countdown_complete(&mut self) {
        if self.phase != Phase::Countdown {
            return;
        }
        self.timer.start();
        if !self.visible {
            // hidden during the lead-in: hold the clock until focus returns
            self.timer.pause();
        }
        self.phase = Phase::Active;
        info!("countdown finished, guessing open");
    }

    /// Hosting surface hidden or shown.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.timer.resume();
        } else {
            self.timer.pause();
        }
    }

    /// Feeds the current guess-input text to the suggestion lookup.
    pub fn query_changed(&mut self, text: &str) {
        if self.phase == Phase::Transitioning || self.session_id.is_none() {
            return;
        }
        self.autocomplete.on_input(text);
    }

    pub fn autocomplete_mut(&mut self) -> &mut Autocomplete {
        &mut self.autocomplete
    }

    fn schedule(&mut self, wait: Duration, action: Deferred) {
        self.scheduled.push(Scheduled { wait, action });
    }

    fn run_scheduled(&mut self, elapsed: Duration) {
        let mut due = Vec::new();
        self.scheduled.retain_mut(|s| {
            s.wait = s.wait.saturating_sub(elapsed);
            if s.wait.is_zero() {
                due.push(s.action);
                false
            } else {
                true
            }
        });

        for action in due {
            match action {
                Deferred::HideBanner => self.show_banner = false,
                Deferred::AdvanceTarget => self.advance_target(),
                Deferred::EndGame => self.end(),
            }
        }
    }

    fn notify(&mut self, kind: NoticeKind, text: String) {
        self.notice = Some(Notice {
            kind,
            text,
            remaining: NOTICE_LIFETIME,
        });
    }

    /// Surfaces an error to the player and hands it back to the caller.
    fn report(&mut self, err: GameError) -> GameError {
        warn!(%err, "action failed");
        self.notify(NoticeKind::Error, err.to_string());
        err
    }

    fn fail_session(&mut self, reason: &str) -> GameError {
        let err = GameError::Session(reason.to_string());
        self.timer.stop();
        self.countdown.cancel();
        self.redirect = Some(reason.to_string());
        self.report(err)
    }

    /// Requests queued since the last call.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    pub fn accepts_guesses(&self) -> bool {
        self.phase == Phase::Active && self.guess_in_flight.is_none() && !self.closing
    }

    pub fn guess_in_flight(&self) -> bool {
        self.guess_in_flight.is_some()
    }

    /// True while leaving would abandon a running lead-in or clock.
    pub fn blocks_navigation(&self) -> bool {
        self.countdown.blocks_navigation() || self.timer.is_running()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn progress(&self) -> &GameProgress {
        &self.progress
    }

    /// Guesses made against the current target.
    pub fn history(&self) -> &[GuessAttempt] {
        &self.history
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn autocomplete(&self) -> &Autocomplete {
        &self.autocomplete
    }

    pub fn show_banner(&self) -> bool {
        self.show_banner
    }

    /// The solved target, shown once the success banner has gone.
    pub fn revealed(&self) -> Option<&PlayerProfile> {
        if self.show_banner {
            None
        } else {
            self.revealed.as_ref()
        }
    }

    pub fn missed_target(&self) -> Option<&PlayerProfile> {
        self.missed_target.as_ref()
    }

    pub fn score_form(&self) -> &ScoreForm {
        &self.score_form
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Set when the session cannot continue and the player must start over.
    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }
}
