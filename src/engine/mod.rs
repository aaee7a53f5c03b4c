//! Pure countdown state machine and its clock capability

pub mod clock;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timer::{AbandonedCountdown, TimerEngine, TimerEvent, DEFAULT_LONG_BREAK_EVERY};
