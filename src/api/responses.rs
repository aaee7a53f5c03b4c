//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::TimerEvent,
    services::{AmbientPreset, TimerSession},
    state::{TimerMode, TimerState},
};

/// Response for timer control endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub event: TimerEvent,
    pub timer: TimerState,
}

impl ActionResponse {
    pub fn new(message: impl Into<String>, event: TimerEvent, timer: TimerState) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            event,
            timer,
        }
    }
}

/// Error body returned with 4xx/5xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Compact indicator shown on every page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetResponse {
    pub display: String,
    pub mode: TimerMode,
    pub is_running: bool,
    pub cycles_completed: u32,
    pub ambient_preset: Option<String>,
    /// Views should switch to a dark theme
    pub dark_mode: bool,
    /// Another device or tab has an active remote session
    pub remote_session_active: bool,
}

/// Selected ambient preset and the presets the player knows about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbientResponse {
    pub preset: Option<String>,
    pub known: bool,
    pub available: Vec<String>,
}

impl AmbientResponse {
    pub fn new(preset: Option<String>) -> Self {
        let known = preset
            .as_deref()
            .is_some_and(|id| AmbientPreset::from_id(id).is_some());
        Self {
            preset,
            known,
            available: AmbientPreset::ALL.iter().map(|p| p.id().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmbientRequest {
    pub preset: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSessionResponse {
    pub session: Option<TimerSession>,
    /// True when the active session is not the one tracked locally
    pub foreign: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodaySessionsResponse {
    pub sessions: Vec<TimerSession>,
}

/// Status response with timer and server information
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: TimerState,
    pub display: String,
    pub ticking: bool,
    pub remote_sync: bool,
    pub remote_session_id: Option<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
