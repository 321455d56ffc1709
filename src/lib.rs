// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod autocomplete;
pub mod backend;
pub mod config;
pub mod countdown;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod timer;

pub use error::{GameError, ValidationError};
pub use session::{GameSession, Phase};
