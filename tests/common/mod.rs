// Shared in-memory backend for the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use prodle::backend::GameBackend;
use prodle::protocol::{
    Comparison, Difficulty, EndGameResponse, GameSettings, GuessResponse, Outcome, PlayerProfile,
};
use prodle::GameError;

pub const SESSION_ID: &str = "test-session";

pub fn player(name: &str) -> PlayerProfile {
    PlayerProfile {
        player_username: name.to_string(),
        player_team: "T1".to_string(),
        player_league: "LCK".to_string(),
        player_role: "Mid".to_string(),
        player_country: "South Korea".to_string(),
        player_age: 28,
        number_of_clubs: 1,
        kda_ratio: 4.5,
        player_most_played_champion: "Azir".to_string(),
        ..Default::default()
    }
}

pub fn guess_response(name: &str, correct: bool, score: u32, game_over: bool) -> GuessResponse {
    let comparisons: BTreeMap<String, Outcome> = [
        ("team", Outcome::Exact),
        ("league", Outcome::Exact),
        ("role", if correct { Outcome::Exact } else { Outcome::Wrong }),
        ("age", if correct { Outcome::Exact } else { Outcome::Higher }),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    GuessResponse {
        success: true,
        message: None,
        correct,
        comparison: Some(Comparison {
            guessed_player: player(name),
            timestamp: None,
            comparisons,
            is_correct: correct,
        }),
        score,
        time_left: 60,
        game_over,
        next_player: correct,
    }
}

/// Backend that answers guesses from a queue and records every call.
#[derive(Default)]
pub struct ScriptedBackend {
    pub guesses: Mutex<VecDeque<Result<GuessResponse, GameError>>>,
    pub calls: Mutex<Vec<String>>,
    pub suggestions: Vec<String>,
}

impl ScriptedBackend {
    pub fn with_guesses(guesses: Vec<Result<GuessResponse, GameError>>) -> Self {
        Self {
            guesses: Mutex::new(guesses.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GameBackend for ScriptedBackend {
    fn start_session(&self, difficulty: Difficulty) -> Result<String, GameError> {
        self.record(format!("start:{difficulty}"));
        Ok(SESSION_ID.to_string())
    }

    fn submit_guess(&self, session_id: &str, player_name: &str) -> Result<GuessResponse, GameError> {
        self.record(format!("guess:{session_id}:{player_name}"));
        self.guesses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GameError::Transport("no scripted answer".into())))
    }

    fn autocomplete(&self, _session_id: &str, query: &str) -> Result<Vec<String>, GameError> {
        self.record(format!("autocomplete:{query}"));
        Ok(self
            .suggestions
            .iter()
            .filter(|s| s.to_lowercase().starts_with(&query.to_lowercase()))
            .cloned()
            .collect())
    }

    fn end_game(&self, session_id: &str) -> Result<EndGameResponse, GameError> {
        self.record(format!("end:{session_id}"));
        Ok(EndGameResponse {
            success: true,
            message: None,
            missed_player: Some(player("Chovy")),
        })
    }

    fn submit_score(&self, session_id: &str, username: &str) -> Result<Option<u32>, GameError> {
        self.record(format!("score:{session_id}:{username}"));
        Ok(Some(3))
    }

    fn fetch_settings(&self) -> Result<GameSettings, GameError> {
        Ok(GameSettings {
            total_game_time_seconds: 120,
            players_per_session: 20,
        })
    }
}
