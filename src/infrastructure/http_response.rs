// HTTP response utilities for buffer exports and error bodies
use axum::{
    Json,
    body::Body,
    http::{HeaderValue, Response, StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

/// Build a download response with the given content type and file name.
pub fn attachment_response(
    body: String,
    content_type: &'static str,
    filename: &str,
) -> Result<Response<Body>, StatusCode> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| {
            tracing::error!("Invalid export file name {}: {}", filename, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

pub fn csv_attachment(body: String, filename: &str) -> Result<Response<Body>, StatusCode> {
    attachment_response(body, "text/csv; charset=utf-8", filename)
}

pub fn json_attachment(body: String, filename: &str) -> Result<Response<Body>, StatusCode> {
    attachment_response(body, "application/json", filename)
}

/// `{ "error": message }` with the given status.
pub fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response<Body> {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}
