//! State management module
//!
//! Persisted stores, the countdown snapshot types, the shared focus session
//! and the application state handed to HTTP handlers.

pub mod app_state;
pub mod focus_session;
pub mod settings;
pub mod store;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use focus_session::FocusSession;
pub use settings::{Persisted, SelectedPreset, TimerPreferences, TimerSettings};
pub use store::{FileStorage, MemoryStorage, Storage, StorageBus, Store, StoreSet};
pub use timer_state::{format_countdown, TimerMode, TimerState};
