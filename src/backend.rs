use crate::error::GameError;
use crate::protocol::{
    AutocompleteResponse, ConfigResponse, Difficulty, EndGameRequest, EndGameResponse, Envelope,
    GameSettings, GuessRequest, GuessResponse, StartSessionRequest, StartSessionResponse,
    SubmitScoreRequest, SubmitScoreResponse,
};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// The server side of the game: owns the targets, compares guesses and keeps scores.
pub trait GameBackend: Send + Sync + 'static {
    fn start_session(&self, difficulty: Difficulty) -> Result<String, GameError>;

    fn submit_guess(&self, session_id: &str, player_name: &str)
        -> Result<GuessResponse, GameError>;

    fn autocomplete(&self, session_id: &str, query: &str) -> Result<Vec<String>, GameError>;

    fn end_game(&self, session_id: &str) -> Result<EndGameResponse, GameError>;

    /// Returns the leaderboard rank when the server reports one.
    fn submit_score(&self, session_id: &str, username: &str) -> Result<Option<u32>, GameError>;

    fn fetch_settings(&self) -> Result<GameSettings, GameError>;
}

/// JSON-over-HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GameError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }
}

/// Decodes a response body into `T`, mapping the failure modes onto the
/// error taxonomy. A decodable `success: false` body wins over the HTTP status
/// so the server's message reaches the player.
fn read_payload<T: DeserializeOwned + Envelope>(response: Response) -> Result<T, GameError> {
    let status = response.status();
    let body = response.text()?;
    decode_payload(status.as_u16(), &body)
}

pub(crate) fn decode_payload<T: DeserializeOwned + Envelope>(
    status: u16,
    body: &str,
) -> Result<T, GameError> {
    let ok_status = (200..300).contains(&status);
    match serde_json::from_str::<T>(body) {
        Ok(payload) if payload.success() && ok_status => Ok(payload),
        Ok(payload) if !payload.success() => Err(GameError::ServerDeclined(
            payload
                .message()
                .filter(|m| !m.is_empty())
                .unwrap_or("request declined by server")
                .to_string(),
        )),
        Ok(_) => Err(GameError::Transport(format!("server returned {status}"))),
        Err(_) if !ok_status => Err(GameError::Transport(format!("server returned {status}"))),
        Err(err) => Err(GameError::Transport(format!("malformed response: {err}"))),
    }
}

impl GameBackend for HttpBackend {
    fn start_session(&self, difficulty: Difficulty) -> Result<String, GameError> {
        debug!(%difficulty, "starting session");
        let response = self
            .client
            .post(self.url("start-game"))
            .json(&StartSessionRequest { difficulty })
            .send()?;
        let payload: StartSessionResponse = read_payload(response)?;
        if payload.session_id.is_empty() {
            return Err(GameError::Session(
                "server did not issue a session id".to_string(),
            ));
        }
        Ok(payload.session_id)
    }

    fn submit_guess(
        &self,
        session_id: &str,
        player_name: &str,
    ) -> Result<GuessResponse, GameError> {
        let response = self
            .client
            .post(self.url("guess"))
            .json(&GuessRequest {
                session_id: session_id.to_string(),
                player_name: player_name.to_string(),
            })
            .send()?;
        read_payload(response)
    }

    fn autocomplete(&self, session_id: &str, query: &str) -> Result<Vec<String>, GameError> {
        let response = self
            .client
            .get(self.url("autocomplete"))
            .query(&[("query", query), ("sessionId", session_id)])
            .send()?;
        let payload: AutocompleteResponse = read_payload(response)?;
        Ok(payload.players)
    }

    fn end_game(&self, session_id: &str) -> Result<EndGameResponse, GameError> {
        let response = self
            .client
            .post(self.url("end-game"))
            .json(&EndGameRequest {
                session_id: session_id.to_string(),
            })
            .send()?;
        read_payload(response)
    }

    fn submit_score(&self, session_id: &str, username: &str) -> Result<Option<u32>, GameError> {
        let response = self
            .client
            .post(self.url("submit-score"))
            .json(&SubmitScoreRequest {
                session_id: session_id.to_string(),
                username: username.to_string(),
            })
            .send()?;
        let payload: SubmitScoreResponse = read_payload(response)?;
        Ok(payload.rank.filter(|rank| *rank > 0))
    }

    fn fetch_settings(&self) -> Result<GameSettings, GameError> {
        let response = self.client.get(self.url("config")).send()?;
        let payload: ConfigResponse = read_payload(response)?;
        payload
            .config
            .ok_or_else(|| GameError::Transport("config missing from response".to_string()))
    }
}
