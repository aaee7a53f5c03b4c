//! The single authoritative focus session shared by every view

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::{TimerSettings, TimerState};
use crate::{
    engine::{TimerEngine, TimerEvent},
    error::{FocusError, Result},
    tasks::ticker::{spawn_ticker, TickHandle, TICK_PERIOD},
};

/// Owns the engine, schedules its ticks and publishes its state.
///
/// State snapshots go out on a `watch` channel (presenters, widget),
/// lifecycle events on a `broadcast` channel (session sync, chime). The tick
/// handle lives under the same lock as the engine, so acquiring and
/// releasing it is ordered with the transition that caused it.
#[derive(Debug)]
pub struct FocusSession {
    core: Mutex<Core>,
    state_tx: watch::Sender<TimerState>,
    events_tx: broadcast::Sender<TimerEvent>,
    tick_period: Duration,
}

struct Core {
    engine: TimerEngine,
    ticker: Option<TickHandle>,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("state", self.engine.state())
            .field("ticking", &self.ticker.is_some())
            .finish()
    }
}

/// What a transition does with the tick handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ticking {
    Acquire,
    Release,
}

impl FocusSession {
    pub fn new(engine: TimerEngine) -> Arc<Self> {
        Self::with_tick_period(engine, TICK_PERIOD)
    }

    pub fn with_tick_period(engine: TimerEngine, tick_period: Duration) -> Arc<Self> {
        let (state_tx, _) = watch::channel(engine.state().clone());
        let (events_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            core: Mutex::new(Core {
                engine,
                ticker: None,
            }),
            state_tx,
            events_tx,
            tick_period,
        })
    }

    fn core(&self) -> Result<MutexGuard<'_, Core>> {
        self.core
            .lock()
            .map_err(|e| FocusError::InvalidState(format!("Failed to lock timer engine: {}", e)))
    }

    /// Current countdown snapshot
    pub fn snapshot(&self) -> TimerState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TimerState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.events_tx.subscribe()
    }

    /// Start or resume, optionally against a time block, and begin ticking
    pub fn start(self: &Arc<Self>, block_id: Option<String>) -> Result<TimerEvent> {
        self.transition(Ticking::Acquire, |engine| match block_id {
            Some(id) => engine.start_block(id),
            None => engine.start(),
        })
    }

    pub fn pause(self: &Arc<Self>) -> Result<TimerEvent> {
        self.transition(Ticking::Release, TimerEngine::pause)
    }

    pub fn skip(self: &Arc<Self>) -> Result<TimerEvent> {
        self.transition(Ticking::Release, TimerEngine::skip)
    }

    pub fn cancel(self: &Arc<Self>) -> Result<TimerEvent> {
        self.transition(Ticking::Release, TimerEngine::cancel)
    }

    pub fn reset(self: &Arc<Self>) -> Result<TimerEvent> {
        self.transition(Ticking::Release, |engine| Ok(engine.reset()))
    }

    /// Advance the countdown from the tick task. Returns whether it is still
    /// running.
    pub fn tick(&self) -> bool {
        let mut core = match self.core() {
            Ok(core) => core,
            Err(e) => {
                warn!("Tick skipped: {}", e);
                return false;
            }
        };

        let event = core.engine.tick();
        let running = core.engine.is_running();
        self.publish_state(core.engine.state());
        if let Some(event) = event {
            Self::release_ticker(&mut core);
            self.publish_event(event);
        }
        running
    }

    /// Push new durations into the engine
    pub fn apply_settings(&self, settings: TimerSettings) -> Result<()> {
        let mut core = self.core()?;
        core.engine.apply_settings(settings);
        self.publish_state(core.engine.state());
        Ok(())
    }

    /// Stop ticking and halt a running countdown; used on unmount
    pub fn shutdown(&self) {
        let mut core = match self.core() {
            Ok(core) => core,
            Err(e) => {
                warn!("Failed to halt focus session: {}", e);
                return;
            }
        };
        Self::release_ticker(&mut core);
        if core.engine.is_running() {
            match core.engine.pause() {
                Ok(event) => {
                    self.publish_state(core.engine.state());
                    self.publish_event(event);
                    info!("Focus session halted for shutdown");
                }
                Err(e) => warn!("Failed to halt focus session: {}", e),
            }
        }
    }

    /// True while a tick task is held
    pub fn is_ticking(&self) -> bool {
        self.core
            .lock()
            .map(|core| core.ticker.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    /// Apply `op` and adjust the tick handle, all under the engine lock.
    /// Publishing also happens under the lock so observers see transitions
    /// in the order they were made.
    fn transition<F>(self: &Arc<Self>, ticking: Ticking, op: F) -> Result<TimerEvent>
    where
        F: FnOnce(&mut TimerEngine) -> Result<TimerEvent>,
    {
        let mut core = self.core()?;
        let event = op(&mut core.engine)?;

        match ticking {
            Ticking::Acquire if core.engine.is_running() => {
                // Replacing drops (and cancels) any stale handle
                core.ticker = Some(spawn_ticker(Arc::downgrade(self), self.tick_period));
            }
            Ticking::Acquire => {}
            Ticking::Release => Self::release_ticker(&mut core),
        }

        self.publish_state(core.engine.state());
        self.publish_event(event.clone());
        Ok(event)
    }

    fn publish_state(&self, state: &TimerState) {
        self.state_tx.send_if_modified(|current| {
            if current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
    }

    fn publish_event(&self, event: TimerEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("No listeners for timer event");
        }
    }

    fn release_ticker(core: &mut Core) {
        if core.ticker.take().is_some() {
            debug!("Tick handle released");
        }
    }
}

impl Drop for FocusSession {
    fn drop(&mut self) {
        if let Ok(core) = self.core.get_mut() {
            Self::release_ticker(core);
        }
    }
}
