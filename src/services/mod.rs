//! Side-effecting collaborators: audio output, title mirroring and the
//! remote session service.

pub mod audio;
pub mod sessions;
pub mod title;

// Re-export main types
pub use audio::{AmbientAudioPlayer, AmbientPreset, AudioPort, CommandAudioPort};
pub use sessions::{HttpSessionService, SessionService, TimeBlockService, TimerSession};
pub use title::{TabTitlePresenter, TitlePort, WatchTitle};
