//! Session configuration

use std::path::Path;
use std::time::Duration;

use gaze::GazeConfig;
use serde::{Deserialize, Serialize};
use tracing::info;
use violation_policy::PolicyConfig;

use crate::SessionError;

/// Environment prefix for overrides, e.g. `PROCTOR__POLICY__MAX_VIOLATIONS=5`
pub const ENV_PREFIX: &str = "PROCTOR";

/// Capture loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device path or frame directory
    pub device: String,
    /// Maximum pipeline iterations per second
    pub target_fps: u32,
    /// Results buffered between capture loop and session
    pub channel_capacity: usize,
    /// How long `stop` waits for the worker to exit (milliseconds)
    pub join_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            channel_capacity: 32,
            join_timeout_ms: 1000,
        }
    }
}

impl CaptureConfig {
    /// Sleep between iterations
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.target_fps.max(1) as u64)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

/// Complete proctoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    pub gaze: GazeConfig,
    pub policy: PolicyConfig,
    pub capture: CaptureConfig,
}

impl ProctorConfig {
    /// Defaults for proctored exam attempts
    pub fn proctored() -> Self {
        Self {
            gaze: GazeConfig::proctored(),
            ..Default::default()
        }
    }

    /// Load from an optional config file, then apply environment overrides.
    ///
    /// Keys missing from both fall back to the proctored defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SessionError> {
        let defaults = ::config::Config::try_from(&Self::proctored())?;
        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
