// Application layer - telemetry stream core and use cases
pub mod backoff;
pub mod chart_service;
pub mod decoder;
pub mod export;
pub mod overlay;
pub mod pipeline;
pub mod render;
pub mod robot_backend;
pub mod session;
pub mod stats;
pub mod streaming_service;
pub mod telemetry_transport;
