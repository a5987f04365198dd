//! JSON telemetry message
//!
//! ```json
//! {
//!     "timestamp": physics time (s),
//!     "imu": {
//!         "gyro": [roll, pitch, yaw] (rad/s, body frame),
//!         "accel_body": [x, y, z] (m/s², body frame)
//!     },
//!     "position": [north, east, down] (m, earth frame),
//!     "velocity": [north, east, down] (m/s, earth frame),
//!     "quaternion": [w, x, y, z]
//! }
//! ```
//!
//! Validation is strict. A field of the wrong type, an array of the wrong
//! length or a non-numeric element is rejected, never coerced. Unknown fields
//! are ignored so simulators may send extra sensors.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a telemetry datagram is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("telemetry is not valid JSON: {0}")]
    Parse(String),

    #[error("telemetry does not contain {0}")]
    MissingField(&'static str),

    #[error("telemetry field {field} is not a numeric array of length {expected}")]
    Shape {
        field: &'static str,
        expected: usize,
    },
}

/// Vehicle state reported by the physics simulation after one step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryRecord {
    /// Physics time in seconds.
    pub timestamp: f64,
    /// Body-frame angular rate in rad/s [roll, pitch, yaw].
    pub gyro: [f64; 3],
    /// Body-frame specific force in m/s² [x, y, z].
    pub accel: [f64; 3],
    /// Earth-frame position in m [north, east, down].
    pub position: [f64; 3],
    /// Earth-frame velocity in m/s [north, east, down].
    pub velocity: [f64; 3],
    /// Attitude quaternion [w, x, y, z].
    pub quaternion: [f64; 4],
}

#[derive(Serialize)]
struct TelemetryJson<'a> {
    timestamp: f64,
    imu: ImuJson<'a>,
    position: &'a [f64; 3],
    velocity: &'a [f64; 3],
    quaternion: &'a [f64; 4],
}

#[derive(Serialize)]
struct ImuJson<'a> {
    gyro: &'a [f64; 3],
    accel_body: &'a [f64; 3],
}

impl TelemetryRecord {
    /// Serialize in the simulator's wire format.
    pub fn to_json(&self) -> String {
        let json = TelemetryJson {
            timestamp: self.timestamp,
            imu: ImuJson {
                gyro: &self.gyro,
                accel_body: &self.accel,
            },
            position: &self.position,
            velocity: &self.velocity,
            quaternion: &self.quaternion,
        };
        // Plain numbers and fixed arrays cannot fail to serialize.
        serde_json::to_string(&json).unwrap_or_default()
    }
}

/// Validate a received datagram and extract a complete [`TelemetryRecord`].
pub fn decode_telemetry(raw: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| DecodeError::Parse(format!("invalid UTF-8: {e}")))?;
    let msg: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Parse(e.to_string()))?;
    let msg = msg
        .as_object()
        .ok_or_else(|| DecodeError::Parse("top level is not an object".into()))?;

    let timestamp = msg
        .get("timestamp")
        .and_then(Value::as_f64)
        .ok_or(DecodeError::MissingField("timestamp"))?;

    let imu = msg
        .get("imu")
        .and_then(Value::as_object)
        .ok_or(DecodeError::MissingField("imu"))?;

    Ok(TelemetryRecord {
        timestamp,
        accel: numeric_array(imu, "accel_body")?,
        gyro: numeric_array(imu, "gyro")?,
        position: numeric_array(msg, "position")?,
        velocity: numeric_array(msg, "velocity")?,
        quaternion: numeric_array(msg, "quaternion")?,
    })
}

fn numeric_array<const N: usize>(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<[f64; N], DecodeError> {
    let shape = DecodeError::Shape { field, expected: N };

    let items = obj
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| shape.clone())?;
    if items.len() != N {
        return Err(shape);
    }

    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(|| shape.clone())?;
    }
    Ok(out)
}
