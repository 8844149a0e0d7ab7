//! Runtime configuration: UDP endpoint, orientation preset, smoothing and logging switches.
//!
//! Loaded from a JSON file whose keys match the device-side tooling (`listenPort`,
//! `rotationLerp`, ...). Every key is optional; missing keys take the defaults below.

use serde::Deserialize;
use std::{
    fs,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::orientation::mapper::MappingPreset;

pub const DEFAULT_LISTEN_PORT: u16 = 9000;
pub const DEFAULT_ROTATION_LERP: f32 = 0.35;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} = {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub listen_port: u16,
    pub bind_address: IpAddr,
    pub preset: MappingPreset,
    pub flip_front_back: bool,
    pub rotation_lerp: f32,
    pub verbose_logs: bool,
    /// Optional CSV file receiving one stats row per second.
    pub stats_csv: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            preset: MappingPreset::A,
            flip_front_back: true,
            rotation_lerp: DEFAULT_ROTATION_LERP,
            verbose_logs: true,
            stats_csv: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.rotation_lerp) {
            return Err(ConfigError::OutOfRange {
                field: "rotationLerp",
                value: self.rotation_lerp,
            });
        }
        Ok(())
    }

    /// Replaces an out-of-range `rotationLerp` with a usable value and reports
    /// what was wrong. NaN falls back to the default; other values are clamped.
    pub fn sanitize(&mut self) -> Result<(), ConfigError> {
        let err = match self.validate() {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        self.rotation_lerp = if self.rotation_lerp.is_nan() {
            DEFAULT_ROTATION_LERP
        } else {
            self.rotation_lerp.clamp(0.0, 1.0)
        };
        Err(err)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.listen_port)
    }
}
