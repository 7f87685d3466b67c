// Application state for HTTP handlers
use crate::application::chart_service::ChartService;
use crate::application::robot_backend::RobotBackend;
use crate::application::streaming_service::TelemetryStreamService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub stream: Arc<TelemetryStreamService>,
    pub charts: Arc<ChartService>,
    pub backend: Arc<dyn RobotBackend>,
}
