//! Capture constraints handed to the platform capture calls.
//!
//! Shapes mirror the constraint dictionaries platforms accept, including the
//! vendor dialects (`mandatory.chromeMediaSource`, `mozMediaSource`) that
//! older screen-capture tiers rely on.

use serde::{Deserialize, Serialize};

/// A numeric constraint: ideal value plus optional bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constrain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ideal: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<u32>,
}

impl Constrain {
    pub fn ideal(value: u32) -> Self {
        Self {
            ideal: Some(value),
            ..Self::default()
        }
    }
}

/// Legacy `mandatory` block used by flag-based and extension screen capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandatoryVideoConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_media_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_media_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moz_media_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goog_leaky_bucket: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_frame_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_frame_rate: Option<u32>,
}

/// Video constraint object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Constrain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Constrain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<Constrain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moz_media_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<MandatoryVideoConstraints>,
}

impl VideoConstraints {
    /// Ideal width/height hint, the only negotiation a named profile does.
    pub fn ideal_resolution(width: u32, height: u32) -> Self {
        Self {
            width: Some(Constrain::ideal(width)),
            height: Some(Constrain::ideal(height)),
            ..Self::default()
        }
    }

    /// Whether the `mandatory` block names a desktop/screen/window source.
    pub fn has_screen_source(&self) -> bool {
        let Some(mandatory) = &self.mandatory else {
            return false;
        };
        if let Some(source) = &mandatory.chrome_media_source {
            return source == "desktop" || source == "screen";
        }
        if let Some(source) = &mandatory.moz_media_source {
            return source == "window" || source == "screen";
        }
        if let Some(source) = &mandatory.media_source {
            return source == "window" || source == "screen";
        }
        false
    }
}

/// Audio constraint object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo_cancellation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_suppression: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_gain_control: Option<bool>,
}

/// What to ask the platform for on the audio side: on/off or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudioCapture {
    Toggle(bool),
    Constraints(AudioConstraints),
}

impl AudioCapture {
    pub const DISABLED: Self = Self::Toggle(false);

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Toggle(false))
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// What to ask the platform for on the video side: on/off or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoCapture {
    Toggle(bool),
    Constraints(VideoConstraints),
}

impl VideoCapture {
    pub const DISABLED: Self = Self::Toggle(false);

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Toggle(false))
    }

    pub fn constraints(&self) -> Option<&VideoConstraints> {
        match self {
            Self::Constraints(constraints) => Some(constraints),
            Self::Toggle(_) => None,
        }
    }
}

impl Default for VideoCapture {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Argument of a camera/microphone capture call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStreamConstraints {
    pub audio: AudioCapture,
    pub video: VideoCapture,
}

impl MediaStreamConstraints {
    /// Microphone and camera with platform defaults.
    pub fn audio_and_video() -> Self {
        Self {
            audio: AudioCapture::Toggle(true),
            video: VideoCapture::Toggle(true),
        }
    }

    /// A microphone-only capture, used to add audio to a screen stream.
    pub fn microphone_only() -> Self {
        Self {
            audio: AudioCapture::Toggle(true),
            video: VideoCapture::DISABLED,
        }
    }

    /// Nothing would be captured with these constraints.
    pub fn is_empty(&self) -> bool {
        !self.audio.is_enabled() && !self.video.is_enabled()
    }
}

/// Argument of a native display capture call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMediaConstraints {
    pub video: VideoCapture,
    pub audio: bool,
}

/// Named camera resolution tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoProfile {
    /// 320x240, 4:3
    Low,
    /// 320x180, 16:9
    LowWide,
    /// 1280x720; `hires`, `hires-16:9` and `hdres` all land here.
    High,
    /// 1920x1080
    FullHd,
    /// 3840x2160
    Uhd4k,
    /// 640x480, 4:3
    Standard,
    /// 640x360, 16:9
    StandardWide,
}

impl VideoProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "lowres" => Some(Self::Low),
            "lowres-16:9" => Some(Self::LowWide),
            "hires" | "hires-16:9" | "hdres" => Some(Self::High),
            "fhdres" => Some(Self::FullHd),
            "4kres" => Some(Self::Uhd4k),
            "stdres" => Some(Self::Standard),
            "stdres-16:9" => Some(Self::StandardWide),
            _ => None,
        }
    }

    /// Look up a profile by name, falling back to `stdres`.
    pub fn resolve(name: Option<&str>) -> Self {
        match name.and_then(Self::from_name) {
            Some(profile) => profile,
            None => {
                log::info!("Default video setting is stdres 4:3 (requested {:?})", name);
                Self::Standard
            }
        }
    }

    /// Ideal `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Low => (320, 240),
            Self::LowWide => (320, 180),
            Self::High => (1280, 720),
            Self::FullHd => (1920, 1080),
            Self::Uhd4k => (3840, 2160),
            Self::Standard => (640, 480),
            Self::StandardWide => (640, 360),
        }
    }

    pub fn constraints(&self) -> VideoConstraints {
        let (width, height) = self.dimensions();
        VideoConstraints::ideal_resolution(width, height)
    }
}
