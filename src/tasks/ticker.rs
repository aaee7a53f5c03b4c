//! Tick scheduling for a running countdown

use std::{sync::Weak, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::state::FocusSession;

/// Default spacing between ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Scoped ownership of the tick task. Dropping the handle cancels the task,
/// so every path that lets go of it (pause, completion, shutdown, panic
/// unwinding) also stops the ticks.
#[derive(Debug)]
pub struct TickHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TickHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn the tick loop for `session`. The loop ends when the handle is
/// dropped, the session goes away, or the countdown stops running.
pub fn spawn_ticker(session: Weak<FocusSession>, period: Duration) -> TickHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let task = tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("Tick task started");

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticks.tick() => {
                    let Some(session) = session.upgrade() else {
                        break;
                    };
                    if !session.tick() {
                        break;
                    }
                }
            }
        }
        debug!("Tick task finished");
    });

    TickHandle { token, task }
}
