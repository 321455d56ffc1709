use crate::error::GameError;
use std::time::Duration;
use tracing::debug;

pub const DEBOUNCE: Duration = Duration::from_millis(10);
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 10;

/// A lookup the debouncer decided to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub token: u64,
    pub query: String,
}

#[derive(Debug, Clone)]
struct PendingQuery {
    query: String,
    wait: Duration,
}

/// Suggestion state for the guess input. Each issued lookup gets a fresh
/// token and only the response to the newest one is kept.
#[derive(Debug, Clone, Default)]
pub struct Autocomplete {
    latest_token: u64,
    pending: Option<PendingQuery>,
    suggestions: Vec<String>,
    selected: Option<usize>,
}

impl Autocomplete {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current input text. Short queries clear the list and
    /// invalidate anything in flight.
    pub fn on_input(&mut self, text: &str) {
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.clear();
            return;
        }
        self.pending = Some(PendingQuery {
            query: query.to_string(),
            wait: DEBOUNCE,
        });
    }

    /// Returns a lookup once the input has been quiet for the debounce window.
    pub fn advance(&mut self, elapsed: Duration) -> Option<Lookup> {
        let pending = self.pending.as_mut()?;
        pending.wait = pending.wait.saturating_sub(elapsed);
        if !pending.wait.is_zero() {
            return None;
        }
        let pending = self.pending.take()?;
        self.latest_token += 1;
        Some(Lookup {
            token: self.latest_token,
            query: pending.query,
        })
    }

    /// Applies a lookup result. Returns false when the response was stale.
    pub fn apply(&mut self, token: u64, result: Result<Vec<String>, GameError>) -> bool {
        if token != self.latest_token {
            debug!(token, latest = self.latest_token, "discarding stale suggestions");
            return false;
        }
        match result {
            Ok(mut names) => {
                names.truncate(MAX_SUGGESTIONS);
                self.suggestions = names;
            }
            Err(err) => {
                debug!(%err, "autocomplete lookup failed");
                self.suggestions.clear();
            }
        }
        self.selected = None;
        true
    }

    /// Drops suggestions, any pending query, and makes in-flight lookups stale.
    pub fn clear(&mut self) {
        self.pending = None;
        self.suggestions.clear();
        self.selected = None;
        self.latest_token += 1;
    }

    /// Moves the highlight by `step`, wrapping at both ends.
    pub fn navigate(&mut self, step: isize) {
        let len = self.suggestions.len() as isize;
        if len == 0 {
            return;
        }
        let next = match self.selected {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step < 0 => len - 1,
            None => 0,
        };
        self.selected = Some(next as usize);
    }

    /// Takes the highlighted suggestion, closing the list.
    pub fn accept(&mut self) -> Option<String> {
        let picked = self
            .selected
            .and_then(|i| self.suggestions.get(i))
            .cloned()?;
        self.clear();
        Some(picked)
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}
