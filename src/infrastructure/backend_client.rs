// REST client for the robot-control backend
use crate::application::robot_backend::RobotBackend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: Vec<Value>,
}

impl BackendClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", what, status, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl RobotBackend for BackendClient {
    async fn send_command(&self, command: &str) -> Result<()> {
        let url = self.url("/api/v1/control/command");
        tracing::debug!("Sending control command {} to {}", command, url);

        let response = self
            .client
            .post(&url)
            .json(&CommandRequest { command })
            .send()
            .await
            .context("Failed to send control command")?;

        Self::check(response, "Control command").await?;
        Ok(())
    }

    async fn telemetry_history(&self, limit: u32) -> Result<Vec<Value>> {
        let url = self.url("/api/v1/telemetry/history");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to request telemetry history")?;

        let envelope = Self::check(response, "Telemetry history request")
            .await?
            .json::<DataEnvelope>()
            .await
            .context("Failed to parse telemetry history response")?;

        Ok(envelope.data)
    }
}
