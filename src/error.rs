use crate::session::Phase;

/// Input problems caught before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("enter a player name")]
    EmptyGuess,
    #[error("enter a username")]
    EmptyUsername,
    #[error("username cannot exceed {max} bytes")]
    UsernameTooLong { max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing or rejected session id. Not recoverable in place.
    #[error("session unavailable: {0}")]
    Session(String),

    /// Network failure, timeout, non-2xx status or an undecodable body.
    #[error("connection error: {0}")]
    Transport(String),

    /// The server answered but reported `success: false`.
    #[error("{0}")]
    ServerDeclined(String),

    #[error("input is locked during {0}")]
    InputLocked(Phase),
}

impl From<reqwest::Error> for GameError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GameError::Transport("request timed out".to_string())
        } else {
            GameError::Transport(err.to_string())
        }
    }
}
