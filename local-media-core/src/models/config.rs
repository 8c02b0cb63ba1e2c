use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constraints::VideoProfile;

/// Tunables for a local media session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NegotiationConfig {
    /// How long to wait for the screen-share helper to answer (default: 1000 ms).
    pub extension_timeout_ms: u64,

    /// Stream clock sampling interval of the end-of-stream watcher (default: 500 ms).
    pub end_poll_interval_ms: u64,

    /// Screen-share frame rate when the request leaves it unset (default: 3).
    pub default_screenshare_frame_rate: u32,

    /// Profile name used when a request names none (default: `stdres`).
    pub default_video_profile: String,
}

impl NegotiationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.extension_timeout_ms == 0 {
            return Err("extension timeout must be positive".into());
        }
        if self.end_poll_interval_ms == 0 {
            return Err("end poll interval must be positive".into());
        }
        if self.default_screenshare_frame_rate == 0 {
            return Err("default screenshare frame rate must be positive".into());
        }
        if VideoProfile::from_name(&self.default_video_profile).is_none() {
            return Err(format!(
                "unknown default video profile: {}",
                self.default_video_profile
            ));
        }
        Ok(())
    }

    pub fn extension_timeout(&self) -> Duration {
        Duration::from_millis(self.extension_timeout_ms)
    }

    pub fn end_poll_interval(&self) -> Duration {
        Duration::from_millis(self.end_poll_interval_ms)
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            extension_timeout_ms: 1000,
            end_poll_interval_ms: 500,
            default_screenshare_frame_rate: 3,
            default_video_profile: "stdres".into(),
        }
    }
}
