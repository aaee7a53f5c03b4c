//! Remote session-history and time-block collaborators

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{FocusError, Result},
    state::TimerMode,
};

/// Terminal or in-progress state of a remote session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// Remote record of one focus/break interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub id: String,
    pub mode: TimerMode,
    pub planned_minutes: u32,
    #[serde(default)]
    pub actual_minutes: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl TimerSession {
    /// Still running somewhere: no completion time recorded
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
            && !self.completed
            && !matches!(self.status, Some(SessionStatus::Cancelled))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub mode: TimerMode,
    pub planned_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub actual_minutes: u32,
    pub completed: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUpdate {
    pub actual_minutes: u32,
    pub completed: bool,
}

/// Convert elapsed seconds to the whole minutes reported remotely: rounded
/// to nearest, never above the planned minutes
pub fn reported_minutes(elapsed_seconds: u64, planned_minutes: u32) -> u32 {
    let rounded = (elapsed_seconds + 30) / 60;
    u32::try_from(rounded).unwrap_or(u32::MAX).min(planned_minutes)
}

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(&self, request: &NewSession) -> Result<CreatedSession>;

    async fn update_session(&self, id: &str, update: &SessionUpdate) -> Result<TimerSession>;

    async fn active_session(&self) -> Result<Option<TimerSession>>;

    async fn today_sessions(&self) -> Result<Vec<TimerSession>>;
}

#[async_trait]
pub trait TimeBlockService: Send + Sync {
    async fn update_block(&self, id: &str, update: &BlockUpdate) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ActiveSessionResponse {
    session: Option<TimerSession>,
}

#[derive(Debug, Deserialize)]
struct TodaySessionsResponse {
    sessions: Vec<TimerSession>,
}

/// HTTP client for the dashboard's session and time-block endpoints
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpSessionService {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| FocusError::Config(format!("invalid session api url '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(FocusError::Config(format!(
                "session api url '{base_url}' cannot be a base"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                FocusError::Config("session api url cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FocusError::RemoteSync(if body.trim().is_empty() {
                format!("http {}", status.as_u16())
            } else {
                format!("http {}; body={}", status.as_u16(), body.trim())
            }));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn create_session(&self, request: &NewSession) -> Result<CreatedSession> {
        let url = self.endpoint(&["sessions"])?;
        debug!("POST {}", url);
        self.send(self.client.post(url).json(request)).await
    }

    async fn update_session(&self, id: &str, update: &SessionUpdate) -> Result<TimerSession> {
        let url = self.endpoint(&["sessions", id])?;
        debug!("PATCH {}", url);
        self.send(self.client.patch(url).json(update)).await
    }

    async fn active_session(&self) -> Result<Option<TimerSession>> {
        let url = self.endpoint(&["sessions", "active"])?;
        let response: ActiveSessionResponse = self.send(self.client.get(url)).await?;
        Ok(response.session)
    }

    async fn today_sessions(&self) -> Result<Vec<TimerSession>> {
        let url = self.endpoint(&["sessions", "today"])?;
        let response: TodaySessionsResponse = self.send(self.client.get(url)).await?;
        Ok(response.sessions)
    }
}

#[async_trait]
impl TimeBlockService for HttpSessionService {
    async fn update_block(&self, id: &str, update: &BlockUpdate) -> Result<()> {
        let url = self.endpoint(&["time-blocks", id])?;
        debug!("PATCH {}", url);
        let _: serde_json::Value = self.send(self.client.patch(url).json(update)).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_round_to_nearest_and_cap_at_plan() {
        assert_eq!(reported_minutes(1500, 25), 25);
        assert_eq!(reported_minutes(600, 25), 10);
        assert_eq!(reported_minutes(629, 25), 10);
        assert_eq!(reported_minutes(630, 25), 11);
        assert_eq!(reported_minutes(29, 25), 0);
        assert_eq!(reported_minutes(4000, 25), 25);
    }

    #[test]
    fn endpoints_append_encoded_segments() {
        let service =
            HttpSessionService::new("http://localhost:8000/api", None, Duration::from_secs(5))
                .unwrap();
        let url = service.endpoint(&["sessions", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/sessions/a%20b");
        let url = service.endpoint(&["time-blocks", "42"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/time-blocks/42");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = HttpSessionService::new("not a url", None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, FocusError::Config(_)));
    }

    #[test]
    fn session_record_parses_dashboard_shape() {
        let record: TimerSession = serde_json::from_str(
            r#"{"id":"9","mode":"long_break","plannedMinutes":15,"actualMinutes":3,
                "startedAt":"2026-10-16T09:00:00Z","completedAt":null,"completed":false}"#,
        )
        .unwrap();
        assert_eq!(record.mode, TimerMode::LongBreak);
        assert!(record.is_active());
    }

    #[test]
    fn update_payload_carries_cancelled_marker() {
        let update = SessionUpdate {
            actual_minutes: 7,
            completed: false,
            status: SessionStatus::Cancelled,
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({"actualMinutes": 7, "completed": false, "status": "cancelled"})
        );
    }
}
