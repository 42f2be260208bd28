//! Session configuration

use crate::errors::SapError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for one session. Durations are written as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fallback wait after confirming the logon screen when the host cannot
    /// report whether it is busy.
    #[serde(with = "duration_ms")]
    pub login_settle: Duration,
    /// Fallback wait after navigating to a transaction.
    #[serde(with = "duration_ms")]
    pub navigation_settle: Duration,
    /// Interval between polls of the host's busy flag.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// Upper bound for the host to become idle after input.
    #[serde(with = "duration_ms")]
    pub action_timeout: Duration,
    /// Wait before the client retries `open` once.
    #[serde(with = "duration_ms")]
    pub open_retry_delay: Duration,
    pub main_window_id: String,
    pub navigation_prefix: String,
    pub confirm_key: i32,
    pub host_executable: String,
    #[serde(with = "duration_ms")]
    pub host_startup_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_settle: Duration::from_millis(1500),
            navigation_settle: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
            action_timeout: Duration::from_secs(30),
            open_retry_delay: Duration::from_secs(1),
            main_window_id: "wnd[0]".to_string(),
            navigation_prefix: "/n".to_string(),
            confirm_key: crate::types::VKEY_ENTER,
            host_executable: "saplogon.exe".to_string(),
            host_startup_timeout: Duration::from_secs(7),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SapError> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| SapError::Config(format!("Invalid session config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SapError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SapError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), SapError> {
        if self.poll_interval.is_zero() {
            return Err(SapError::Config("poll_interval must be non-zero".into()));
        }
        if self.main_window_id.trim().is_empty() {
            return Err(SapError::Config("main_window_id must not be empty".into()));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
