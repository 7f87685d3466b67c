use crate::application::backoff::Backoff;
use crate::application::render::ChartGeometry;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_STREAM_URL: &str = "ws://localhost:8000/api/v1/telemetry/ws";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub stream: StreamSettings,
    pub buffer: BufferSettings,
    pub chart: ChartSettings,
    pub backend: BackendSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    #[serde(default)]
    pub url: String,
    pub reconnect_base_ms: u64,
    pub reconnect_cap_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BufferSettings {
    pub capacity: usize,
    pub sample_rate_hz: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    pub width: f64,
    pub height: f64,
    pub offset_y: f64,
    pub epsilon: f64,
    pub velocity_range: f64,
    pub acceleration_range: f64,
    pub position_range: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub base_url: String,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            reconnect_base_ms: 500,
            reconnect_cap_ms: 5000,
        }
    }
}

impl StreamSettings {
    /// Configured URL, or the default endpoint when left blank.
    pub fn endpoint(&self) -> &str {
        let url = self.url.trim();
        if url.is_empty() { DEFAULT_STREAM_URL } else { url }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_base_ms),
            Duration::from_millis(self.reconnect_cap_ms),
        )
    }
}

impl AppConfig {
    pub fn geometry(&self) -> ChartGeometry {
        ChartGeometry {
            width: self.chart.width,
            height: self.chart.height,
            offset_y: self.chart.offset_y,
            epsilon: self.chart.epsilon,
            sample_rate_hz: self.buffer.sample_rate_hz,
            velocity_range: self.chart.velocity_range,
            acceleration_range: self.chart.acceleration_range,
            position_range: self.chart.position_range,
        }
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.buffer.capacity < 2 {
            anyhow::bail!("buffer.capacity must be at least 2, got {}", self.buffer.capacity);
        }
        if !(self.buffer.sample_rate_hz > 0.0) {
            anyhow::bail!("buffer.sample_rate_hz must be positive");
        }
        if !(self.chart.epsilon > 0.0) {
            anyhow::bail!("chart.epsilon must be positive");
        }
        if self.stream.reconnect_base_ms == 0
            || self.stream.reconnect_cap_ms < self.stream.reconnect_base_ms
        {
            anyhow::bail!(
                "invalid reconnect backoff: base {}ms, cap {}ms",
                self.stream.reconnect_base_ms,
                self.stream.reconnect_cap_ms
            );
        }
        Ok(self)
    }
}

fn builder_with_defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("stream.url", DEFAULT_STREAM_URL)?
        .set_default("stream.reconnect_base_ms", 500)?
        .set_default("stream.reconnect_cap_ms", 5000)?
        .set_default("buffer.capacity", 600)?
        .set_default("buffer.sample_rate_hz", 10.0)?
        .set_default("chart.width", 800.0)?
        .set_default("chart.height", 256.0)?
        .set_default("chart.offset_y", 128.0)?
        .set_default("chart.epsilon", 0.001)?
        .set_default("chart.velocity_range", 64.0)?
        .set_default("chart.acceleration_range", 51.2)?
        .set_default("chart.position_range", 96.0)?
        .set_default("backend.base_url", "http://localhost:8000")?)
}

/// Defaults, then `config/telemetry.*` if present, then `OHT__SECTION__KEY` env vars.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = builder_with_defaults()?
        .add_source(config::File::with_name("config/telemetry").required(false))
        .add_source(config::Environment::with_prefix("OHT").separator("__"))
        .build()?;

    settings.try_deserialize::<AppConfig>()?.validate()
}
