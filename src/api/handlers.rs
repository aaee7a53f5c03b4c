//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use super::responses::{
    ActionResponse, ActiveSessionResponse, AmbientRequest, AmbientResponse, ErrorResponse,
    HealthResponse, StartRequest, StatusResponse, TitleBody, TodaySessionsResponse,
    WidgetResponse,
};
use crate::{
    engine::TimerEvent,
    error::FocusError,
    services::TitlePort,
    state::{AppState, SelectedPreset, TimerPreferences, TimerSettings},
};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(context: &str, e: FocusError) -> ApiError {
    if e.is_client_error() {
        warn!("{}: {}", context, e);
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
    } else {
        error!("{}: {}", context, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("{}: {}", context, e))),
        )
    }
}

/// Run a store operation on the blocking pool; file-backed storage does
/// synchronous I/O
async fn with_store<T, F>(context: &str, op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result.map_err(|e| api_error(context, e)),
        Err(e) => {
            error!("{}: store task failed: {}", context, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("{}: {}", context, e))),
            ))
        }
    }
}

fn timer_action(
    state: &AppState,
    action: &str,
    result: crate::error::Result<TimerEvent>,
) -> ApiResult<ActionResponse> {
    let event = result.map_err(|e| api_error(&format!("Failed to {} timer", action), e))?;
    state.record_action(action);
    let timer = state.session.snapshot();
    info!("Timer {} - {} {}", action, timer.mode, timer.display());
    Ok(Json(ActionResponse::new(
        format!("Timer {}", action),
        event,
        timer,
    )))
}

/// Handle GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let timer = state.session.snapshot();
    let (last_action, last_action_time) = state.get_last_action();
    Json(StatusResponse {
        display: timer.display(),
        timer,
        ticking: state.session.is_ticking(),
        remote_sync: state.sessions.is_some(),
        remote_session_id: state.local_session_id.borrow().clone(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /timer
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Json<crate::state::TimerState> {
    Json(state.session.snapshot())
}

/// Handle GET /widget
pub async fn widget_handler(State(state): State<Arc<AppState>>) -> Json<WidgetResponse> {
    let timer = state.session.snapshot();
    let preferences = state.stores.preferences.current();
    Json(WidgetResponse {
        display: timer.display(),
        mode: timer.mode,
        is_running: timer.is_running,
        cycles_completed: timer.cycles_completed,
        ambient_preset: state.stores.ambient.current().0,
        dark_mode: timer.is_running && preferences.dark_mode_while_running,
        remote_session_active: state.foreign_session_active(),
    })
}

/// Handle POST /timer/start - start or resume, optionally for a time block
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> ApiResult<ActionResponse> {
    let block_id = body
        .and_then(|Json(request)| request.block_id)
        .filter(|id| !id.trim().is_empty());
    let result = state.session.start(block_id);
    timer_action(&state, "start", result)
}

/// Handle POST /timer/pause
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ApiResult<ActionResponse> {
    let result = state.session.pause();
    timer_action(&state, "pause", result)
}

/// Handle POST /timer/skip
pub async fn skip_handler(State(state): State<Arc<AppState>>) -> ApiResult<ActionResponse> {
    let result = state.session.skip();
    timer_action(&state, "skip", result)
}

/// Handle POST /timer/cancel
pub async fn cancel_handler(State(state): State<Arc<AppState>>) -> ApiResult<ActionResponse> {
    let result = state.session.cancel();
    timer_action(&state, "cancel", result)
}

/// Handle POST /timer/reset
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult<ActionResponse> {
    let result = state.session.reset();
    timer_action(&state, "reset", result)
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerSettings> {
    let store = state.stores.settings.clone();
    with_store("Failed to load timer settings", move || Ok(store.load()))
        .await
        .map(Json)
}

/// Handle PUT /settings
pub async fn put_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<TimerSettings>,
) -> ApiResult<TimerSettings> {
    let store = state.stores.settings.clone();
    let saved = with_store("Failed to save timer settings", move || store.save(settings)).await?;
    state.record_action("settings");
    Ok(Json(saved))
}

/// Handle DELETE /settings
pub async fn reset_settings_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerSettings> {
    let store = state.stores.settings.clone();
    let value = with_store("Failed to reset timer settings", move || store.reset()).await?;
    state.record_action("settings-reset");
    Ok(Json(value))
}

/// Handle GET /preferences
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<TimerPreferences> {
    let store = state.stores.preferences.clone();
    with_store("Failed to load timer preferences", move || Ok(store.load()))
        .await
        .map(Json)
}

/// Handle PUT /preferences
pub async fn put_preferences_handler(
    State(state): State<Arc<AppState>>,
    Json(preferences): Json<TimerPreferences>,
) -> ApiResult<TimerPreferences> {
    let store = state.stores.preferences.clone();
    let saved =
        with_store("Failed to save timer preferences", move || store.save(preferences)).await?;
    state.record_action("preferences");
    Ok(Json(saved))
}

/// Handle DELETE /preferences
pub async fn reset_preferences_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<TimerPreferences> {
    let store = state.stores.preferences.clone();
    let value = with_store("Failed to reset timer preferences", move || store.reset()).await?;
    state.record_action("preferences-reset");
    Ok(Json(value))
}

/// Handle GET /ambient
pub async fn get_ambient_handler(State(state): State<Arc<AppState>>) -> ApiResult<AmbientResponse> {
    let store = state.stores.ambient.clone();
    let selected = with_store("Failed to load ambient preset", move || Ok(store.load())).await?;
    Ok(Json(AmbientResponse::new(selected.0)))
}

/// Handle PUT /ambient - unknown ids are stored but play nothing
pub async fn put_ambient_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AmbientRequest>,
) -> ApiResult<AmbientResponse> {
    let store = state.stores.ambient.clone();
    let selected = SelectedPreset::from(request.preset);
    let saved = with_store("Failed to save ambient preset", move || store.save(selected)).await?;
    state.record_action("ambient");
    Ok(Json(AmbientResponse::new(saved.0)))
}

/// Handle DELETE /ambient
pub async fn clear_ambient_handler(State(state): State<Arc<AppState>>) -> ApiResult<AmbientResponse> {
    let store = state.stores.ambient.clone();
    let value = with_store("Failed to clear ambient preset", move || store.reset()).await?;
    state.record_action("ambient-clear");
    Ok(Json(AmbientResponse::new(value.0)))
}

/// Handle GET /sessions/active - last polled value, never a live call
pub async fn active_session_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ActiveSessionResponse> {
    Json(ActiveSessionResponse {
        session: state.remote_session(),
        foreign: state.foreign_session_active(),
    })
}

/// Handle GET /sessions/today
pub async fn today_sessions_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<TodaySessionsResponse> {
    let Some(sessions) = &state.sessions else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("No session service configured")),
        ));
    };
    match sessions.today_sessions().await {
        Ok(sessions) => Ok(Json(TodaySessionsResponse { sessions })),
        Err(e) => {
            warn!("Failed to fetch today's sessions: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(e.to_string())),
            ))
        }
    }
}

/// Handle GET /title
pub async fn get_title_handler(State(state): State<Arc<AppState>>) -> Json<TitleBody> {
    Json(TitleBody {
        title: state.title.title(),
    })
}

/// Handle PUT /title - navigation reports the page title
pub async fn put_title_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TitleBody>,
) -> Json<TitleBody> {
    state.title.set_title(&body.title);
    Json(TitleBody {
        title: state.title.title(),
    })
}
