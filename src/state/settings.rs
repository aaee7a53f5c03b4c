//! Persisted user settings: durations, preferences and the ambient preset

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{FocusError, Result};

/// A value that lives under a fixed storage key and has a hard-coded default
pub trait Persisted:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + Sync + 'static
{
    /// Storage key the value is written under
    const KEY: &'static str;

    /// Reject values that must never reach storage
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Per-mode durations in whole minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(rename = "focus")]
    pub focus_minutes: u32,
    #[serde(rename = "break")]
    pub break_minutes: u32,
    #[serde(rename = "long_break")]
    pub long_break_minutes: u32,
}

impl TimerSettings {
    pub fn new(focus_minutes: u32, break_minutes: u32, long_break_minutes: u32) -> Self {
        Self {
            focus_minutes,
            break_minutes,
            long_break_minutes,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::new(25, 5, 15)
    }
}

impl Persisted for TimerSettings {
    const KEY: &'static str = "timer-settings";

    fn validate(&self) -> Result<()> {
        let fields = [
            ("focus", self.focus_minutes),
            ("break", self.break_minutes),
            ("long_break", self.long_break_minutes),
        ];
        for (field, minutes) in fields {
            if minutes == 0 {
                return Err(FocusError::InvalidDuration { field, minutes });
            }
        }
        Ok(())
    }
}

/// Boolean toggles shown next to the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPreferences {
    /// Play a chime when a countdown completes
    #[serde(rename = "timerSounds")]
    pub sound_enabled: bool,
    /// Ask views to switch to a dark theme while the timer runs
    #[serde(rename = "darkMode")]
    pub dark_mode_while_running: bool,
}

impl Default for TimerPreferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            dark_mode_while_running: false,
        }
    }
}

impl Persisted for TimerPreferences {
    const KEY: &'static str = "timer-preferences";
}

/// Raw preset id as chosen by the user; resolution to a known preset happens
/// in the audio layer so unknown ids survive a round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedPreset(pub Option<String>);

impl SelectedPreset {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<Option<String>> for SelectedPreset {
    fn from(value: Option<String>) -> Self {
        Self(value.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()))
    }
}

impl Persisted for SelectedPreset {
    const KEY: &'static str = "selected-ambient-preset";
}
