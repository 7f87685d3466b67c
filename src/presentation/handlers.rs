// HTTP request handlers
use crate::application::export::BufferDump;
use crate::domain::chart::{ChannelSelection, ChartView, OverlaySelection, RangeSelection};
use crate::domain::connection::ConnectionState;
use crate::infrastructure::frame_stream::chart_sse;
use crate::infrastructure::http_response::{csv_attachment, error_response, json_attachment};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const DEFAULT_HISTORY_LIMIT: u32 = 100;

/// Chart view options as query parameters; anything omitted keeps its default.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    pub range: Option<String>,
    pub v: Option<bool>,
    pub a: Option<bool>,
    pub x: Option<bool>,
    pub tag: Option<bool>,
    pub enc: Option<bool>,
    pub state: Option<bool>,
}

impl ChartQuery {
    pub fn to_view(&self) -> Result<ChartView, String> {
        let range = match &self.range {
            Some(range) => range.parse::<RangeSelection>().map_err(|e| e.to_string())?,
            None => RangeSelection::default(),
        };
        let channels = ChannelSelection {
            velocity: self.v.unwrap_or(true),
            acceleration: self.a.unwrap_or(true),
            position: self.x.unwrap_or(true),
        };
        let overlays = OverlaySelection {
            tag: self.tag.unwrap_or(true),
            encoder_reset: self.enc.unwrap_or(true),
            state_change: self.state.unwrap_or(true),
        };
        Ok(ChartView {
            range,
            channels,
            overlays,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StreamStatus {
    pub connection: ConnectionState,
    pub paused: bool,
    pub sample_index: u64,
    /// RFC 3339 time of the last accepted sample
    pub last_sample_at: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn stream_status(State(state): State<Arc<AppState>>) -> Json<StreamStatus> {
    let (sample_index, last_sample_at) = {
        let session = state.stream.session().read().await;
        (session.sample_index(), session.last_sample_at())
    };
    Json(StreamStatus {
        connection: state.stream.state(),
        paused: state.stream.is_paused(),
        sample_index,
        last_sample_at: last_sample_at.map(|t| t.to_rfc3339()),
    })
}

/// Current chart frame for the requested view
pub async fn chart_frame(
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let view = match query.to_view() {
        Ok(view) => view,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let session = state.stream.session().read().await;
    let frame = state.charts.frame(
        &session,
        &view,
        state.stream.state(),
        state.stream.is_paused(),
    );
    Json(frame).into_response()
}

/// Server-sent chart frames, one per accepted sample
pub async fn stream_chart(
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match query.to_view() {
        Ok(view) => chart_sse(state.stream.clone(), state.charts.clone(), view).into_response(),
        Err(message) => error_response(StatusCode::BAD_REQUEST, message),
    }
}

pub async fn pause_stream(State(state): State<Arc<AppState>>) -> StatusCode {
    state.stream.pause();
    StatusCode::NO_CONTENT
}

pub async fn resume_stream(State(state): State<Arc<AppState>>) -> StatusCode {
    state.stream.resume();
    StatusCode::NO_CONTENT
}

pub async fn export_csv(State(state): State<Arc<AppState>>) -> Response {
    let dump = BufferDump::from_session(&*state.stream.session().read().await);
    match csv_attachment(dump.to_csv(), "vax.csv") {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn export_json(State(state): State<Arc<AppState>>) -> Response {
    let dump = BufferDump::from_session(&*state.stream.session().read().await);
    let body = match dump.to_json() {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };
    match json_attachment(body, "vax.json") {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Forward a control command to the robot backend
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    if request.command.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "command must not be empty");
    }
    match state.backend.send_command(&request.command).await {
        Ok(()) => Json(json!({})).into_response(),
        Err(e) => {
            tracing::warn!("Control command {} failed: {:#}", request.command, e);
            error_response(StatusCode::BAD_GATEWAY, format!("{:#}", e))
        }
    }
}

pub async fn telemetry_history(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.backend.telemetry_history(limit).await {
        Ok(data) => Json(json!({ "data": data })).into_response(),
        Err(e) => {
            tracing::warn!("Telemetry history request failed: {:#}", e);
            error_response(StatusCode::BAD_GATEWAY, format!("{:#}", e))
        }
    }
}
