//! Application state shared with HTTP handlers

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use super::{FocusSession, StoreSet};
use crate::services::{sessions::TimerSession, SessionService, WatchTitle};

/// Everything a request handler can reach. Handlers write through the
/// `stores` of the API context; the running session picks the changes up
/// from the storage bus.
pub struct AppState {
    /// The one focus session for this process
    pub session: Arc<FocusSession>,
    /// Stores as seen from the HTTP API context
    pub stores: StoreSet,
    pub title: WatchTitle,
    /// Remote session service, when configured
    pub sessions: Option<Arc<dyn SessionService>>,
    /// Last polled remote active session
    pub remote_active: watch::Receiver<Option<TimerSession>>,
    /// Remote id of the session tracking the local countdown
    pub local_session_id: watch::Receiver<Option<String>>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    pub product_name: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<FocusSession>,
        stores: StoreSet,
        title: WatchTitle,
        sessions: Option<Arc<dyn SessionService>>,
        remote_active: watch::Receiver<Option<TimerSession>>,
        local_session_id: watch::Receiver<Option<String>>,
        host: String,
        port: u16,
        product_name: String,
    ) -> Self {
        Self {
            session,
            stores,
            title,
            sessions,
            remote_active,
            local_session_id,
            start_time: Instant::now(),
            port,
            host,
            product_name,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Remember the latest user action for status reporting
    pub fn record_action(&self, action: &str) {
        debug!("Action: {}", action);
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Last polled remote active session
    pub fn remote_session(&self) -> Option<TimerSession> {
        self.remote_active.borrow().clone()
    }

    /// True when the remote service reports an active session that is not
    /// the one this process is tracking (another device or tab)
    pub fn foreign_session_active(&self) -> bool {
        let local = self.local_session_id.borrow().clone();
        self.remote_active
            .borrow()
            .as_ref()
            .is_some_and(|remote| remote.is_active() && local.as_deref() != Some(remote.id.as_str()))
    }
}
