//! Request and response bodies exchanged with the game server.
//!
//! Field names follow the server's JSON: envelopes are camelCase, player
//! profiles and comparison results are snake_case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of comparing one attribute of a guessed player with the target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Exact,
    Partial,
    /// The guessed value is higher than the target's.
    Higher,
    /// The guessed value is lower than the target's.
    Lower,
    Wrong,
}

impl Outcome {
    /// Direction the player should move in, for ordered attributes.
    pub fn arrow(&self) -> Option<char> {
        match self {
            Outcome::Higher => Some('↓'),
            Outcome::Lower => Some('↑'),
            _ => None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Facile,
    Moyen,
    #[default]
    Difficile,
}

/// A professional player as described by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub player_username: String,
    pub player_name: String,
    pub player_media_url: String,
    pub player_team: String,
    pub player_team_media_url: String,
    pub player_league: String,
    pub number_of_clubs: u32,
    pub player_country: String,
    pub player_country_continent: String,
    pub player_role: String,
    pub player_most_played_champion: String,
    pub player_age: u32,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    pub kda_ratio: f64,
    pub games_played: u32,
}

/// The attributes shown for every guess, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Team,
    League,
    Role,
    Country,
    Age,
    Clubs,
    Kda,
    Champion,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Team,
        Attribute::League,
        Attribute::Role,
        Attribute::Country,
        Attribute::Age,
        Attribute::Clubs,
        Attribute::Kda,
        Attribute::Champion,
    ];

    /// Key used in the server's `comparisons` map.
    pub fn key(&self) -> &'static str {
        match self {
            Attribute::Team => "team",
            Attribute::League => "league",
            Attribute::Role => "role",
            Attribute::Country => "country",
            Attribute::Age => "age",
            Attribute::Clubs => "clubs",
            Attribute::Kda => "kda",
            Attribute::Champion => "champion",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Attribute::Team => "Team",
            Attribute::League => "League",
            Attribute::Role => "Role",
            Attribute::Country => "Country",
            Attribute::Age => "Age",
            Attribute::Clubs => "Clubs",
            Attribute::Kda => "KDA",
            Attribute::Champion => "Champion",
        }
    }

    pub fn value(&self, player: &PlayerProfile) -> String {
        match self {
            Attribute::Team => player.player_team.clone(),
            Attribute::League => player.player_league.clone(),
            Attribute::Role => player.player_role.clone(),
            Attribute::Country => player.player_country.clone(),
            Attribute::Age => player.player_age.to_string(),
            Attribute::Clubs => player.number_of_clubs.to_string(),
            Attribute::Kda => format!("{:.2}", player.kda_ratio),
            Attribute::Champion => player.player_most_played_champion.clone(),
        }
    }
}

/// Per-guess comparison computed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub guessed_player: PlayerProfile,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comparisons: BTreeMap<String, Outcome>,
    #[serde(default)]
    pub is_correct: bool,
}

impl Comparison {
    /// Missing keys count as `Wrong`.
    pub fn outcome(&self, attribute: Attribute) -> Outcome {
        self.comparisons
            .get(attribute.key())
            .copied()
            .unwrap_or(Outcome::Wrong)
    }
}

/// Common shape of every response: a success flag and an optional message.
pub trait Envelope {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

macro_rules! envelope {
    ($($ty:ty),* $(,)?) => {
        $(impl Envelope for $ty {
            fn success(&self) -> bool {
                self.success
            }

            fn message(&self) -> Option<&str> {
                self.message.as_deref()
            }
        })*
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub success: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub session_id: String,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub comparison: Option<Comparison>,
    /// Authoritative running total.
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub time_left: i64,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub next_player: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    #[serde(default)]
    pub players: Vec<String>,
}

impl Envelope for AutocompleteResponse {
    fn success(&self) -> bool {
        true
    }

    fn message(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndGameResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// The target the player was on when the game ended, if any.
    #[serde(default)]
    pub missed_player: Option<PlayerProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub session_id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitScoreResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Leaderboard position; the server omits it (or sends 0) when unknown.
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub total_game_time_seconds: u32,
    pub players_per_session: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub success: bool,
    #[serde(default)]
    pub config: Option<GameSettings>,
    #[serde(default)]
    pub message: Option<String>,
}

envelope!(
    StartSessionResponse,
    GuessResponse,
    EndGameResponse,
    SubmitScoreResponse,
    ConfigResponse,
);
