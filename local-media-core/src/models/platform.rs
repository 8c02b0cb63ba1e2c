use serde::{Deserialize, Serialize};

use super::media::NegotiationMode;

/// Browser/engine family the platform reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    Chrome,
    Firefox,
    Safari,
    EdgeLegacy,
    Other,
}

/// Host operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Linux,
    Windows,
    MacOs,
    Other,
}

/// Capability descriptor resolved once when the platform is set up.
///
/// Every tier decision in the selector is a pure function of this value;
/// nothing sniffs the environment at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformCapabilities {
    pub browser: BrowserFamily,
    pub version: u32,
    pub os: HostOs,

    /// A camera/microphone capture API is exposed at all. Browsers hide it
    /// on insecure origins.
    pub capture_available: bool,

    /// Native display capture (`getDisplayMedia` analogue) is exposed.
    pub display_capture: bool,

    /// Display capture can also deliver desktop audio.
    pub display_audio: bool,

    /// The out-of-process screen-share helper announced itself.
    pub screen_extension_installed: bool,

    /// The peer connection supports transceivers.
    pub transceivers: bool,

    pub screen_width: u32,
    pub screen_height: u32,
}

impl PlatformCapabilities {
    pub fn negotiation_mode(&self) -> NegotiationMode {
        if self.transceivers {
            NegotiationMode::TransceiverBased
        } else {
            NegotiationMode::TrackBased
        }
    }

    /// Data channels are missing on the legacy Edge engine.
    pub fn supports_data_channels(&self) -> bool {
        self.browser != BrowserFamily::EdgeLegacy
    }

    /// Highest Chrome version in which the flag-based screen capture works
    /// without the helper extension. The extension path crashes Chrome 34 and
    /// 35 on Linux, so the range is wider there.
    pub fn legacy_screen_max_version(&self) -> u32 {
        if self.os == HostOs::Linux {
            35
        } else {
            33
        }
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            browser: BrowserFamily::Other,
            version: 0,
            os: HostOs::Other,
            capture_available: true,
            display_capture: false,
            display_audio: false,
            screen_extension_installed: false,
            transceivers: true,
            screen_width: 1920,
            screen_height: 1080,
        }
    }
}
