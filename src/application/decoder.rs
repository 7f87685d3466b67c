// Telemetry message decoder - JSON text to TelemetryFrame
use crate::domain::telemetry::{MILLI_PER_UNIT, Sample, TelemetryFrame};
use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object at the message root")]
    NotAnObject,
    #[error("field {0} is not a number")]
    NotANumber(&'static str),
}

/// Decode one text message from the telemetry feed.
///
/// Every field is optional: missing or `null` channel values decode as 0,
/// a missing tag/state/reset simply yields no event. Channel values that are
/// present but not numeric reject the whole message.
pub fn decode_message(text: &str) -> Result<TelemetryFrame, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(&value)
}

pub fn decode_value(value: &Value) -> Result<TelemetryFrame, DecodeError> {
    let root = value.as_object().ok_or(DecodeError::NotAnObject)?;
    let status = section(root, "status");
    let location = section(root, "location");
    let events = section(root, "events");

    let mut sample = Sample::new(
        millis_to_units(status, "vel_mms")?,
        millis_to_units(status, "acc_mms2")?,
        millis_to_units(status, "pos_mm")?,
    );
    sample.tag_id = location.and_then(|l| l.get("tag_id")).and_then(tag_label);
    sample.state = status
        .and_then(|s| s.get("state"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let encoder_reset = events
        .and_then(|e| e.get("enc_reset"))
        .is_some_and(is_truthy);

    Ok(TelemetryFrame {
        sample,
        encoder_reset,
    })
}

fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    root.get(key).and_then(Value::as_object)
}

fn millis_to_units(
    status: Option<&Map<String, Value>>,
    field: &'static str,
) -> Result<f64, DecodeError> {
    match status.and_then(|s| s.get(field)) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|raw| raw / MILLI_PER_UNIT)
            .ok_or(DecodeError::NotANumber(field)),
        Some(_) => Err(DecodeError::NotANumber(field)),
    }
}

/// Tag ids arrive as strings or numbers; empty strings and 0 mean "no tag".
fn tag_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if !is_zero(n) => Some(number_label(n)),
        _ => None,
    }
}

fn number_label(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

fn is_zero(n: &Number) -> bool {
    n.as_f64().is_some_and(|f| f == 0.0)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => !is_zero(n),
        _ => false,
    }
}
