//! Focus Session - a Pomodoro focus timer daemon
//!
//! One authoritative countdown shared by every view, with persisted timer
//! settings, preferences and ambient preset, ambient sound playback, title
//! mirroring and best-effort sync of session history to a remote service.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{FocusError, Result};
pub use runtime::{Collaborators, Runtime, RuntimeOptions};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
