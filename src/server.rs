use crate::components::google_calendar::time::{current_week, WeekWindow};
use crate::components::google_calendar::{GoogleCalendarHandle, WeekBuckets};
use crate::error::{other_error, Error, TabResult};
use crate::presenter::render_page;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

/// Message action that runs the calendar fetch
pub const FETCH_ACTION: &str = "fetchCalendarEvents";

#[derive(Clone)]
pub struct AppState {
    /// Calendar actor handle
    pub calendar: GoogleCalendarHandle,
    /// Latest clock text
    pub clock: watch::Receiver<String>,
    /// Candidate background images
    pub background_images: Arc<Vec<String>>,
}

/// Error returned from HTTP handlers
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            e if e.is_fetch() => StatusCode::BAD_GATEWAY,
            Error::Other(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (
            status,
            Json(json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Inbound message, e.g. `{"action": "fetchCalendarEvents"}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub action: String,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    /// Report failures instead of answering with an empty week
    #[serde(default)]
    pub strict: bool,
}

/// Window named by an optional `timeMin`/`timeMax` pair
pub fn requested_window(
    time_min: Option<&str>,
    time_max: Option<&str>,
    tz: Tz,
) -> TabResult<Option<WeekWindow>> {
    match (time_min, time_max) {
        (Some(min), Some(max)) => WeekWindow::from_rfc3339(min, max, tz).map(Some),
        (None, None) => Ok(None),
        _ => Err(other_error("timeMin and timeMax must be given together")),
    }
}

/// Build the HTTP router
pub fn router(state: AppState, images_dir: &str) -> Router {
    Router::new()
        .route("/", get(new_tab_handler))
        .route("/api/events", get(events_handler))
        .route("/api/messages", post(message_handler))
        .route("/api/signout", post(sign_out_handler))
        .route("/api/clock", get(clock_handler))
        .route("/health", get(health_handler))
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the new-tab page
pub async fn new_tab_handler(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let window = current_week(Utc::now().with_timezone(&state.calendar.timezone()))?;
    let monday = window.first_day();
    let week = state.calendar.fetch_calendar_events(Some(window)).await?;
    let html = render_page(week, monday, &state.background_images)?;
    Ok(Html(html))
}

/// Handler returning the bucketed week as JSON
pub async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<WeekBuckets>, ApiError> {
    let tz = state.calendar.timezone();
    let window = requested_window(query.time_min.as_deref(), query.time_max.as_deref(), tz)?;

    let week = if query.strict {
        let window = match window {
            Some(window) => window,
            None => current_week(Utc::now().with_timezone(&tz))?,
        };
        state.calendar.try_fetch_calendar_events(window).await?
    } else {
        state.calendar.fetch_calendar_events(window).await?
    };

    Ok(Json(week))
}

/// Handler for inbound messages
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> Result<Json<MessageResponse>, ApiError> {
    if message.action != FETCH_ACTION {
        warn!("Ignoring message with unknown action '{}'", message.action);
        return Err(other_error(&format!("Unknown action '{}'", message.action)).into());
    }

    let window = requested_window(
        message.time_min.as_deref(),
        message.time_max.as_deref(),
        state.calendar.timezone(),
    )?;
    let week = state.calendar.fetch_calendar_events(window).await?;
    info!("Message fetch finished with {} events", week.len());

    Ok(Json(MessageResponse { success: true }))
}

/// Handler clearing the cached token
pub async fn sign_out_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    state.calendar.sign_out().await?;
    Ok(Json(MessageResponse { success: true }))
}

/// Handler for the current clock text
pub async fn clock_handler(State(state): State<AppState>) -> impl IntoResponse {
    let time = state.clock.borrow().clone();
    Json(json!({ "time": time }))
}

// Handler for API health check
pub async fn health_handler() -> &'static str {
    "OK"
}
