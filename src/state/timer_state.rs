//! Timer modes and the observable countdown snapshot

use std::fmt;

use serde::{Deserialize, Serialize};

use super::settings::TimerSettings;

/// Which kind of interval is being counted down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Focus,
    Break,
    LongBreak,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Break => "break",
            Self::LongBreak => "long_break",
        }
    }

    /// Configured length of this mode in minutes
    pub fn minutes(self, settings: &TimerSettings) -> u32 {
        match self {
            Self::Focus => settings.focus_minutes,
            Self::Break => settings.break_minutes,
            Self::LongBreak => settings.long_break_minutes,
        }
    }

    /// Configured length of this mode in seconds
    pub fn duration_seconds(self, settings: &TimerSettings) -> u64 {
        u64::from(self.minutes(settings)) * 60
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the countdown, shared with every observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining_seconds: u64,
    pub duration_seconds: u64,
    pub is_running: bool,
    pub cycles_completed: u32,
    /// Time block the current countdown was launched against, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
}

impl TimerState {
    /// Fresh idle focus countdown
    pub fn initial(settings: &TimerSettings) -> Self {
        let duration = TimerMode::Focus.duration_seconds(settings);
        Self {
            mode: TimerMode::Focus,
            remaining_seconds: duration,
            duration_seconds: duration,
            is_running: false,
            cycles_completed: 0,
            block_id: None,
        }
    }

    /// Remaining time as `MM:SS`
    pub fn display(&self) -> String {
        format_countdown(self.remaining_seconds)
    }
}

/// Format whole seconds as zero-padded `MM:SS`; minutes are not wrapped at 60
pub fn format_countdown(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}
