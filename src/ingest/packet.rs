//! packet.rs
//! Wire format and decoder for one inbound telemetry datagram.
//! - One datagram carries one JSON record (UTF-8).
//! - Only the two routing fields are validated: `deviceId` must be non-empty and
//!   `playerSlot` must be 1 or 2 (`1.0` counts as 1). Other numeric fields that are
//!   missing, `null` or not numbers read as zero.
//! - Decoding is a pure transform; logging of rejections is left to the caller.

use glam::{Quat, Vec3};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Raw record exactly as the device sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WirePacket {
    #[serde(deserialize_with = "lenient_f64")]
    pub t: f64,
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
    #[serde(rename = "playerSlot", deserialize_with = "whole_number")]
    pub player_slot: i64,

    #[serde(deserialize_with = "lenient_f64")]
    pub qx: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub qy: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub qz: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub qw: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub gx: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub gy: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub gz: f64,

    #[serde(deserialize_with = "lenient_f64")]
    pub ax: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ay: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub az: f64,
}

/// Any JSON number as `f64`; `null`, strings, bools and containers read as 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64().unwrap_or(0.0))
}

/// Integer, or a float with no fractional part. Anything else fails the parse.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(de::Error::custom(format!("playerSlot must be a whole number, got {}", value))),
    }
}

impl WirePacket {
    /// Serialises the record the way a device would put it on the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// One of the two tracked player slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    /// Zero-based mailbox index.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    /// Slot number as it appears on the wire.
    #[inline]
    pub fn number(self) -> i64 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }
}

impl TryFrom<i64> for PlayerSlot {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PlayerSlot::One),
            2 => Ok(PlayerSlot::Two),
            other => Err(other),
        }
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// One accepted telemetry reading. Immutable once decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    /// Sender clock, advisory only.
    pub timestamp: f64,
    pub device_id: String,
    pub slot: PlayerSlot,
    /// Device-frame orientation, unmapped.
    pub orientation: Quat,
    pub angular_velocity: Vec3,
    pub linear_acceleration: Vec3,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing deviceId (playerSlot={slot})")]
    MissingDeviceId { slot: i64 },

    #[error("playerSlot={slot} from device '{device_id}' (expected 1 or 2)")]
    InvalidSlot { slot: i64, device_id: String },
}

/// Parses and validates one datagram payload.
pub fn decode(bytes: &[u8]) -> Result<MotionSample, DecodeError> {
    let wire: WirePacket = serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let device_id = match wire.device_id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(DecodeError::MissingDeviceId { slot: wire.player_slot }),
    };

    let slot = PlayerSlot::try_from(wire.player_slot).map_err(|slot| DecodeError::InvalidSlot {
        slot,
        device_id: device_id.clone(),
    })?;

    Ok(MotionSample {
        timestamp: wire.t,
        device_id,
        slot,
        orientation: Quat::from_xyzw(wire.qx as f32, wire.qy as f32, wire.qz as f32, wire.qw as f32),
        angular_velocity: Vec3::new(wire.gx as f32, wire.gy as f32, wire.gz as f32),
        linear_acceleration: Vec3::new(wire.ax as f32, wire.ay as f32, wire.az as f32),
    })
}
