// Domain layer - Core business entities
pub mod chart;
pub mod connection;
pub mod marker;
pub mod rolling_buffer;
pub mod telemetry;
