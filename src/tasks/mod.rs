//! Background tasks module
//!
//! Tasks that run alongside the HTTP server: ticking, presenters, remote
//! session sync and cross-context store refresh.

pub mod presenters;
pub mod session_poller;
pub mod session_sync;
pub mod store_sync;
pub mod ticker;

// Re-export main functions
pub use presenters::{ambient_audio_task, title_presenter_task, AudioInputs};
pub use session_poller::session_poller_task;
pub use session_sync::{session_sync_task, SessionSync};
pub use store_sync::{settings_follower_task, store_listener_task};
