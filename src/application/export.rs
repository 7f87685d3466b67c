// Export of the full rolling buffers as CSV or JSON
use crate::application::session::TelemetrySession;
use crate::domain::telemetry::Channel;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferDump {
    pub v: Vec<f64>,
    pub a: Vec<f64>,
    pub x: Vec<f64>,
}

impl BufferDump {
    pub fn from_session(session: &TelemetrySession) -> Self {
        Self {
            v: session.buffer(Channel::Velocity).to_vec(),
            a: session.buffer(Channel::Acceleration).to_vec(),
            x: session.buffer(Channel::Position).to_vec(),
        }
    }

    /// `t,v,a,x` header, one row per buffer slot, oldest first.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("t,v,a,x\n");
        for (t, ((v, a), x)) in self.v.iter().zip(&self.a).zip(&self.x).enumerate() {
            let _ = writeln!(csv, "{},{},{},{}", t, v, a, x);
        }
        csv
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
