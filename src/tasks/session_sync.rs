//! Mirrors local countdown lifecycle into the remote session record

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    engine::TimerEvent,
    services::sessions::{
        reported_minutes, BlockUpdate, NewSession, SessionService, SessionStatus, SessionUpdate,
        TimeBlockService,
    },
    state::TimerMode,
};

#[derive(Debug, Clone)]
struct RemoteRecord {
    id: String,
    planned_minutes: u32,
    /// Elapsed time as of the last checkpoint
    last_elapsed_seconds: u64,
}

/// Translates [`TimerEvent`]s into remote create/update calls.
///
/// Every remote failure is logged and dropped; the local countdown never
/// waits on or depends on these calls.
pub struct SessionSync {
    sessions: Arc<dyn SessionService>,
    blocks: Option<Arc<dyn TimeBlockService>>,
    current: Option<RemoteRecord>,
    local_id_tx: watch::Sender<Option<String>>,
}

impl SessionSync {
    pub fn new(
        sessions: Arc<dyn SessionService>,
        blocks: Option<Arc<dyn TimeBlockService>>,
        local_id_tx: watch::Sender<Option<String>>,
    ) -> Self {
        Self {
            sessions,
            blocks,
            current: None,
            local_id_tx,
        }
    }

    /// Id of the remote record tracking the local countdown
    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|record| record.id.as_str())
    }

    pub async fn handle(&mut self, event: &TimerEvent) {
        match event {
            TimerEvent::Started {
                mode,
                planned_seconds,
                ..
            } => self.open(*mode, *planned_seconds).await,
            TimerEvent::Resumed { mode, .. } => {
                debug!("Resumed {} locally, remote record unchanged", mode);
            }
            TimerEvent::Paused {
                elapsed_seconds, ..
            } => self.checkpoint(*elapsed_seconds).await,
            TimerEvent::Completed {
                actual_seconds,
                block_id,
                ..
            } => {
                self.close(*actual_seconds, SessionStatus::Completed).await;
                self.update_block(block_id.as_deref(), *actual_seconds, true)
                    .await;
            }
            TimerEvent::Cancelled {
                elapsed_seconds,
                block_id,
                ..
            } => {
                self.close(*elapsed_seconds, SessionStatus::Cancelled).await;
                self.update_block(block_id.as_deref(), *elapsed_seconds, false)
                    .await;
            }
            TimerEvent::Reset { abandoned } => {
                if let Some(abandoned) = abandoned {
                    self.close(abandoned.elapsed_seconds, SessionStatus::Cancelled)
                        .await;
                    self.update_block(
                        abandoned.block_id.as_deref(),
                        abandoned.elapsed_seconds,
                        false,
                    )
                    .await;
                }
            }
        }
    }

    async fn open(&mut self, mode: TimerMode, planned_seconds: u64) {
        if let Some(stale) = &self.current {
            // The end of the previous countdown was missed (lagged events)
            warn!("Closing stale remote session {} before starting anew", stale.id);
            let elapsed = stale.last_elapsed_seconds;
            self.close(elapsed, SessionStatus::Cancelled).await;
        }
        let request = NewSession {
            mode,
            planned_minutes: u32::try_from(planned_seconds / 60).unwrap_or(u32::MAX),
        };
        match self.sessions.create_session(&request).await {
            Ok(created) => {
                info!("Remote session {} created for {}", created.id, mode);
                self.current = Some(RemoteRecord {
                    id: created.id,
                    planned_minutes: request.planned_minutes,
                    last_elapsed_seconds: 0,
                });
            }
            Err(e) => warn!("Failed to create remote session: {}", e),
        }
        self.publish_local_id();
    }

    async fn checkpoint(&mut self, elapsed_seconds: u64) {
        let Some(record) = self.current.as_mut() else {
            return;
        };
        record.last_elapsed_seconds = elapsed_seconds;
        let update = SessionUpdate {
            actual_minutes: reported_minutes(elapsed_seconds, record.planned_minutes),
            completed: false,
            status: SessionStatus::Active,
        };
        if let Err(e) = self.sessions.update_session(&record.id, &update).await {
            warn!("Failed to checkpoint remote session {}: {}", record.id, e);
        }
    }

    async fn close(&mut self, elapsed_seconds: u64, status: SessionStatus) {
        let Some(record) = self.current.take() else {
            debug!("No remote session to close");
            return;
        };
        self.publish_local_id();

        let update = SessionUpdate {
            actual_minutes: reported_minutes(elapsed_seconds, record.planned_minutes),
            completed: status == SessionStatus::Completed,
            status,
        };
        match self.sessions.update_session(&record.id, &update).await {
            Ok(_) => info!(
                "Remote session {} closed as {:?} with {} min",
                record.id, status, update.actual_minutes
            ),
            Err(e) => error!("Failed to close remote session {}: {}", record.id, e),
        }
    }

    async fn update_block(&self, block_id: Option<&str>, elapsed_seconds: u64, completed: bool) {
        let (Some(block_id), Some(blocks)) = (block_id, &self.blocks) else {
            return;
        };
        let update = BlockUpdate {
            actual_minutes: u32::try_from((elapsed_seconds + 30) / 60).unwrap_or(u32::MAX),
            completed,
        };
        match blocks.update_block(block_id, &update).await {
            Ok(()) => info!("Time block {} updated ({} min)", block_id, update.actual_minutes),
            Err(e) => error!("Failed to update time block {}: {}", block_id, e),
        }
    }

    fn publish_local_id(&self) {
        let id = self.current.as_ref().map(|record| record.id.clone());
        self.local_id_tx.send_replace(id);
    }
}

/// Background task feeding timer events into [`SessionSync`]
pub async fn session_sync_task(
    mut sync: SessionSync,
    mut events: broadcast::Receiver<TimerEvent>,
    token: CancellationToken,
) {
    info!("Starting session sync task");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => sync.handle(&event).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Session sync lagged, {} timer events missed", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    info!("Session sync task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::AbandonedCountdown,
        services::sessions::fake::{Call, FakeSessionService},
    };

    fn sync(service: &Arc<FakeSessionService>) -> (SessionSync, watch::Receiver<Option<String>>) {
        let (tx, rx) = watch::channel(None);
        let blocks: Arc<dyn TimeBlockService> = service.clone();
        (SessionSync::new(service.clone(), Some(blocks), tx), rx)
    }

    fn started() -> TimerEvent {
        TimerEvent::Started {
            mode: TimerMode::Focus,
            planned_seconds: 1500,
            block_id: None,
        }
    }

    #[tokio::test]
    async fn completion_marks_session_completed_and_updates_block() {
        let service = Arc::new(FakeSessionService::default());
        let (mut sync, local_id) = sync(&service);

        sync.handle(&started()).await;
        assert_eq!(local_id.borrow().as_deref(), Some("s-1"));

        sync.handle(&TimerEvent::Completed {
            mode: TimerMode::Focus,
            next_mode: TimerMode::Break,
            planned_seconds: 1500,
            actual_seconds: 1500,
            cycles_completed: 1,
            block_id: Some("b-3".to_string()),
        })
        .await;

        assert_eq!(
            service.calls(),
            vec![
                Call::Create(NewSession {
                    mode: TimerMode::Focus,
                    planned_minutes: 25
                }),
                Call::Update(
                    "s-1".to_string(),
                    SessionUpdate {
                        actual_minutes: 25,
                        completed: true,
                        status: SessionStatus::Completed
                    }
                ),
                Call::Block(
                    "b-3".to_string(),
                    BlockUpdate {
                        actual_minutes: 25,
                        completed: true
                    }
                ),
            ]
        );
        assert!(sync.current_id().is_none());
        assert!(local_id.borrow().is_none());
    }

    #[tokio::test]
    async fn cancellation_sends_truncated_minutes_with_cancelled_status() {
        let service = Arc::new(FakeSessionService::default());
        let (mut sync, _) = sync(&service);
        sync.handle(&started()).await;
        sync.handle(&TimerEvent::Cancelled {
            mode: TimerMode::Focus,
            planned_seconds: 1500,
            elapsed_seconds: 600,
            skipped: false,
            block_id: None,
        })
        .await;

        assert_eq!(
            service.calls().last(),
            Some(&Call::Update(
                "s-1".to_string(),
                SessionUpdate {
                    actual_minutes: 10,
                    completed: false,
                    status: SessionStatus::Cancelled
                }
            ))
        );
    }

    #[tokio::test]
    async fn pause_checkpoints_but_keeps_session_open() {
        let service = Arc::new(FakeSessionService::default());
        let (mut sync, _) = sync(&service);
        sync.handle(&started()).await;
        sync.handle(&TimerEvent::Paused {
            mode: TimerMode::Focus,
            planned_seconds: 1500,
            elapsed_seconds: 300,
        })
        .await;
        assert_eq!(sync.current_id(), Some("s-1"));
        assert!(matches!(
            service.calls().last(),
            Some(Call::Update(_, SessionUpdate { actual_minutes: 5, status: SessionStatus::Active, .. }))
        ));
    }

    #[tokio::test]
    async fn reset_of_started_countdown_is_a_cancellation() {
        let service = Arc::new(FakeSessionService::default());
        let (mut sync, _) = sync(&service);
        sync.handle(&started()).await;
        sync.handle(&TimerEvent::Reset {
            abandoned: Some(AbandonedCountdown {
                mode: TimerMode::Focus,
                planned_seconds: 1500,
                elapsed_seconds: 90,
                block_id: None,
            }),
        })
        .await;
        assert!(matches!(
            service.calls().last(),
            Some(Call::Update(_, SessionUpdate { status: SessionStatus::Cancelled, actual_minutes: 2, .. }))
        ));
    }

    #[tokio::test]
    async fn remote_failures_are_swallowed() {
        let service = Arc::new(FakeSessionService::failing());
        let (mut sync, local_id) = sync(&service);
        sync.handle(&started()).await;
        assert!(sync.current_id().is_none());
        assert!(local_id.borrow().is_none());

        // Nothing to close; no update is attempted for an unknown record
        sync.handle(&TimerEvent::Cancelled {
            mode: TimerMode::Focus,
            planned_seconds: 1500,
            elapsed_seconds: 10,
            skipped: true,
            block_id: None,
        })
        .await;
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn missed_end_of_countdown_closes_previous_session() {
        let service = Arc::new(FakeSessionService::default());
        let (mut sync, local_id) = sync(&service);
        sync.handle(&started()).await;
        sync.handle(&TimerEvent::Paused {
            mode: TimerMode::Focus,
            planned_seconds: 1500,
            elapsed_seconds: 240,
        })
        .await;

        // Completion of s-1 never arrived
        sync.handle(&started()).await;

        let calls = service.calls();
        assert_eq!(
            calls[2],
            Call::Update(
                "s-1".to_string(),
                SessionUpdate {
                    actual_minutes: 4,
                    completed: false,
                    status: SessionStatus::Cancelled
                }
            )
        );
        assert!(matches!(calls[3], Call::Create(_)));
        assert_eq!(sync.current_id(), Some("s-2"));
        assert_eq!(local_id.borrow().as_deref(), Some("s-2"));
    }
}
