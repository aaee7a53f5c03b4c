//! Cross-context store refresh and settings propagation

use std::sync::Arc;

use tokio::{
    sync::{broadcast, watch},
    task::spawn_blocking,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::state::{store::StorageEvent, FocusSession, StoreSet, TimerSettings};

/// Reload this context's stores whenever another context writes a key
pub async fn store_listener_task(
    stores: StoreSet,
    mut bus_rx: broadcast::Receiver<StorageEvent>,
    token: CancellationToken,
) {
    info!("Starting store listener task");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = bus_rx.recv() => match received {
                Ok(event) => {
                    let set = stores.clone();
                    match spawn_blocking(move || set.handle_storage_event(&event).then_some(event)).await {
                        Ok(Some(event)) => {
                            debug!("Reloaded {} after write from {}", event.key, event.origin);
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Store reload failed: {}", e),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Events were dropped; storage is the source of truth
                    warn!("Store listener lagged by {} events, reloading all keys", missed);
                    let set = stores.clone();
                    if let Err(e) = spawn_blocking(move || set.reload()).await {
                        warn!("Store reload failed: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    info!("Store listener task stopped");
}

/// Feed settings changes into the running session
pub async fn settings_follower_task(
    session: Arc<FocusSession>,
    mut settings_rx: watch::Receiver<TimerSettings>,
    token: CancellationToken,
) {
    info!("Starting settings follower task");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let settings = *settings_rx.borrow_and_update();
                match session.apply_settings(settings) {
                    Ok(()) => info!(
                        "Timer settings applied: focus={} break={} long_break={}",
                        settings.focus_minutes, settings.break_minutes, settings.long_break_minutes
                    ),
                    Err(e) => warn!("Failed to apply timer settings: {}", e),
                }
            }
        }
    }
    info!("Settings follower task stopped");
}
