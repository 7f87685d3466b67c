// Backend trait for the robot-control REST API
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait RobotBackend: Send + Sync {
    /// Send a control command such as `"stop"` or `"move_forward"`.
    async fn send_command(&self, command: &str) -> anyhow::Result<()>;

    /// Most recent telemetry history records, newest last.
    async fn telemetry_history(&self, limit: u32) -> anyhow::Result<Vec<Value>>;
}
