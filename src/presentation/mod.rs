// Presentation layer - HTTP surface over the telemetry client
pub mod app_state;
pub mod handlers;
