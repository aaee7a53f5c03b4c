//! Countdown and mode state machine
//!
//! The engine is a plain struct: it owns the [`TimerState`], reads time from
//! a [`Clock`] and reports every lifecycle transition as a [`TimerEvent`].
//! Scheduling ticks, persisting outcomes and rendering are left to callers.
//!
//! Ticks measure the wall-clock time elapsed since the previous tick rather
//! than assuming one second per call, so throttled or missed callbacks never
//! make the countdown run slow. Sub-second remainders are carried forward.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use super::clock::Clock;
use crate::{
    error::{FocusError, Result},
    state::{TimerMode, TimerSettings, TimerState},
};

/// Completed focus cycles between long breaks
pub const DEFAULT_LONG_BREAK_EVERY: u32 = 4;

/// Lifecycle transition reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// A fresh countdown began running
    Started {
        mode: TimerMode,
        planned_seconds: u64,
        block_id: Option<String>,
    },
    /// A paused countdown continued
    Resumed {
        mode: TimerMode,
        remaining_seconds: u64,
    },
    /// A running countdown halted with time left
    Paused {
        mode: TimerMode,
        planned_seconds: u64,
        elapsed_seconds: u64,
    },
    /// The countdown reached zero. Fired once per countdown.
    Completed {
        mode: TimerMode,
        next_mode: TimerMode,
        planned_seconds: u64,
        actual_seconds: u64,
        cycles_completed: u32,
        block_id: Option<String>,
    },
    /// The countdown was abandoned before reaching zero
    Cancelled {
        mode: TimerMode,
        planned_seconds: u64,
        elapsed_seconds: u64,
        skipped: bool,
        block_id: Option<String>,
    },
    /// Back to an idle focus countdown; carries the abandoned elapsed time
    /// when a countdown had been started
    Reset {
        abandoned: Option<AbandonedCountdown>,
    },
}

/// Countdown thrown away by a reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbandonedCountdown {
    pub mode: TimerMode,
    pub planned_seconds: u64,
    pub elapsed_seconds: u64,
    pub block_id: Option<String>,
}

pub struct TimerEngine {
    settings: TimerSettings,
    state: TimerState,
    clock: Arc<dyn Clock>,
    long_break_every: u32,
    /// True once the current countdown has been started at least once
    started: bool,
    /// Seconds actually counted down in the current countdown. Independent
    /// of `duration_seconds`, which a settings change may move.
    ran_seconds: u64,
    last_tick: Option<Instant>,
    carry: Duration,
}

impl TimerEngine {
    pub fn new(settings: TimerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: TimerState::initial(&settings),
            settings,
            clock,
            long_break_every: DEFAULT_LONG_BREAK_EVERY,
            started: false,
            ran_seconds: 0,
            last_tick: None,
            carry: Duration::ZERO,
        }
    }

    /// Override the long-break cadence; zero is treated as one
    pub fn with_long_break_every(mut self, every: u32) -> Self {
        self.long_break_every = every.max(1);
        self
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Seconds counted down so far in the current countdown
    pub fn elapsed_seconds(&self) -> u64 {
        self.ran_seconds
    }

    /// Start a fresh countdown or resume a paused one
    pub fn start(&mut self) -> Result<TimerEvent> {
        if self.state.is_running {
            return Err(FocusError::InvalidState("timer is already running".to_string()));
        }

        self.state.is_running = true;
        self.last_tick = Some(self.clock.now());

        if self.started {
            info!("Resuming {} with {}s left", self.state.mode, self.state.remaining_seconds);
            Ok(TimerEvent::Resumed {
                mode: self.state.mode,
                remaining_seconds: self.state.remaining_seconds,
            })
        } else {
            self.started = true;
            self.carry = Duration::ZERO;
            info!("Starting {} countdown of {}s", self.state.mode, self.state.duration_seconds);
            Ok(TimerEvent::Started {
                mode: self.state.mode,
                planned_seconds: self.state.duration_seconds,
                block_id: self.state.block_id.clone(),
            })
        }
    }

    /// Start a fresh countdown launched against a scheduled time block
    pub fn start_block(&mut self, block_id: impl Into<String>) -> Result<TimerEvent> {
        if self.started {
            return Err(FocusError::InvalidState(
                "a countdown is already in progress".to_string(),
            ));
        }
        self.state.block_id = Some(block_id.into());
        self.start()
    }

    /// Halt a running countdown. Time elapsed since the last tick is counted
    /// first; if that finishes the countdown the completion is returned.
    pub fn pause(&mut self) -> Result<TimerEvent> {
        if !self.state.is_running {
            return Err(FocusError::InvalidState("timer is not running".to_string()));
        }
        if let Some(completed) = self.tick() {
            return Ok(completed);
        }

        self.state.is_running = false;
        self.last_tick = None;
        info!("Paused {} with {}s left", self.state.mode, self.state.remaining_seconds);
        Ok(TimerEvent::Paused {
            mode: self.state.mode,
            planned_seconds: self.state.duration_seconds,
            elapsed_seconds: self.ran_seconds,
        })
    }

    /// Account for real time elapsed since the previous tick. Returns the
    /// completion event when the countdown reaches zero.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.state.is_running {
            return None;
        }

        let now = self.clock.now();
        let since = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);

        let pending = self.carry + since;
        let whole = pending.as_secs();
        self.carry = pending - Duration::from_secs(whole);

        let step = whole.min(self.state.remaining_seconds);
        self.state.remaining_seconds -= step;
        self.ran_seconds += step;
        if step > 0 {
            debug!("Tick: -{}s, {}s left", step, self.state.remaining_seconds);
        }

        if self.state.remaining_seconds == 0 {
            Some(self.complete())
        } else {
            None
        }
    }

    fn complete(&mut self) -> TimerEvent {
        let mode = self.state.mode;
        let planned_seconds = self.state.duration_seconds;
        let actual_seconds = self.ran_seconds;
        let block_id = self.state.block_id.take();

        if mode == TimerMode::Focus {
            self.state.cycles_completed += 1;
        }
        let next_mode = self.next_mode_after_completion(mode);
        self.enter_mode(next_mode);

        info!(
            "Completed {} countdown, next is {} (cycles={})",
            mode, next_mode, self.state.cycles_completed
        );
        TimerEvent::Completed {
            mode,
            next_mode,
            planned_seconds,
            actual_seconds,
            cycles_completed: self.state.cycles_completed,
            block_id,
        }
    }

    fn next_mode_after_completion(&self, completed: TimerMode) -> TimerMode {
        match completed {
            TimerMode::Focus if self.state.cycles_completed % self.long_break_every == 0 => {
                TimerMode::LongBreak
            }
            TimerMode::Focus => TimerMode::Break,
            TimerMode::Break | TimerMode::LongBreak => TimerMode::Focus,
        }
    }

    /// Abandon the current countdown and move to the next mode without
    /// counting a cycle
    pub fn skip(&mut self) -> Result<TimerEvent> {
        self.abandon(true)
    }

    /// Abandon the current countdown and restore its full duration
    pub fn cancel(&mut self) -> Result<TimerEvent> {
        if !self.started {
            return Err(FocusError::InvalidState("no countdown to cancel".to_string()));
        }
        self.abandon(false)
    }

    fn abandon(&mut self, skipped: bool) -> Result<TimerEvent> {
        if let Some(completed) = self.tick() {
            return Ok(completed);
        }

        let mode = self.state.mode;
        let planned_seconds = self.state.duration_seconds;
        let elapsed_seconds = self.ran_seconds;
        let block_id = self.state.block_id.take();

        let next = match (skipped, mode) {
            (false, mode) => mode,
            (true, TimerMode::Focus) => TimerMode::Break,
            (true, _) => TimerMode::Focus,
        };
        self.enter_mode(next);

        info!(
            "{} {} countdown after {}s",
            if skipped { "Skipped" } else { "Cancelled" },
            mode,
            elapsed_seconds
        );
        Ok(TimerEvent::Cancelled {
            mode,
            planned_seconds,
            elapsed_seconds,
            skipped,
            block_id,
        })
    }

    /// Return to an idle focus countdown. Completed cycles are kept.
    pub fn reset(&mut self) -> TimerEvent {
        let abandoned = self.started.then(|| AbandonedCountdown {
            mode: self.state.mode,
            planned_seconds: self.state.duration_seconds,
            elapsed_seconds: self.ran_seconds,
            block_id: self.state.block_id.clone(),
        });
        self.state.block_id = None;
        self.enter_mode(TimerMode::Focus);
        info!("Timer reset to focus");
        TimerEvent::Reset { abandoned }
    }

    /// Adopt new durations. An untouched countdown takes the new length; a
    /// started one keeps its remaining time, clamped to the new length.
    pub fn apply_settings(&mut self, settings: TimerSettings) {
        let duration = self.state.mode.duration_seconds(&settings);
        self.settings = settings;
        self.state.remaining_seconds = if self.started {
            self.state.remaining_seconds.min(duration)
        } else {
            duration
        };
        self.state.duration_seconds = duration;
        debug!("Applied settings {:?}", settings);
    }

    fn enter_mode(&mut self, mode: TimerMode) {
        let duration = mode.duration_seconds(&self.settings);
        self.state.mode = mode;
        self.state.duration_seconds = duration;
        self.state.remaining_seconds = duration;
        self.state.is_running = false;
        self.started = false;
        self.ran_seconds = 0;
        self.last_tick = None;
        self.carry = Duration::ZERO;
    }
}
