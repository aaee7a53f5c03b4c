//! Periodic read of the remote active session

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::sessions::{SessionService, TimerSession};

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls the remote service for an active session and publishes the result.
/// Read-only: the local countdown is never touched from here. A failed poll
/// keeps the last known value.
pub async fn session_poller_task(
    sessions: Arc<dyn SessionService>,
    active_tx: watch::Sender<Option<TimerSession>>,
    period: Duration,
    token: CancellationToken,
) {
    info!("Starting active-session poller every {:?}", period);
    let mut ticks = interval(period);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticks.tick() => {
                match sessions.active_session().await {
                    Ok(active) => {
                        let changed = active_tx.send_if_modified(|current| {
                            if *current == active {
                                false
                            } else {
                                *current = active;
                                true
                            }
                        });
                        if changed {
                            debug!("Remote active session changed");
                        }
                    }
                    Err(e) => warn!("Active session poll failed: {}", e),
                }
            }
        }
    }
    info!("Active-session poller stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::{
        services::sessions::fake::{session, FakeSessionService},
        state::TimerMode,
    };

    #[tokio::test(start_paused = true)]
    async fn publishes_remote_session_and_stops_on_cancel() {
        let service = Arc::new(FakeSessionService::default());
        *service.active.lock().unwrap() = Some(session("remote-1", TimerMode::Focus));
        let (tx, mut rx) = watch::channel(None);
        let token = CancellationToken::new();

        let task = tokio::spawn(session_poller_task(
            service.clone(),
            tx,
            POLL_INTERVAL,
            token.clone(),
        ));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|s| s.id.as_str()), Some("remote-1"));

        tokio::time::sleep(Duration::from_secs(11)).await;
        let polls = service.polls.load(Ordering::SeqCst);
        assert_eq!(polls, 3);

        token.cancel();
        task.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_keeps_last_value() {
        let service = Arc::new(FakeSessionService::default());
        *service.active.lock().unwrap() = Some(session("remote-2", TimerMode::Break));
        let (tx, mut rx) = watch::channel(None);
        let token = CancellationToken::new();
        let task = tokio::spawn(session_poller_task(
            service.clone(),
            tx,
            POLL_INTERVAL,
            token.clone(),
        ));

        rx.changed().await.unwrap();
        service.fail.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(service.polls.load(Ordering::SeqCst) >= 3);
        assert_eq!(rx.borrow().as_ref().map(|s| s.id.as_str()), Some("remote-2"));

        token.cancel();
        task.await.unwrap();
    }
}
