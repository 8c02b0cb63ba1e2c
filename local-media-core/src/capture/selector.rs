//! Capture strategy selection.
//!
//! Turns a request plus the probed availability into a `CapturePlan`. This
//! module never touches the platform: the screen-share tier is a pure
//! function of `PlatformCapabilities`, and the executor runs the plan.

use crate::models::config::NegotiationConfig;
use crate::models::constraints::{
    AudioCapture, Constrain, DisplayMediaConstraints, MandatoryVideoConstraints, MediaStreamConstraints,
    VideoCapture, VideoConstraints, VideoProfile,
};
use crate::models::error::CaptureError;
use crate::models::platform::{BrowserFamily, PlatformCapabilities};
use crate::models::request::{AudioRequest, MediaRequest, ScreenSource, VideoRequest};

use super::prober::DeviceAvailability;

const CHROME_FIRST_SCREEN_VERSION: u32 = 26;
const FIREFOX_FIRST_SCREEN_VERSION: u32 = 33;

/// Strategy used to obtain a screen or window stream, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenShareTier {
    /// Native display capture API.
    Native,
    /// Source id obtained from the helper extension, then a constrained capture.
    Extension,
    /// Flag-gated `chromeMediaSource: "screen"` capture of older Chrome builds.
    LegacyFlags,
    /// `mediaSource` capture without a native end-of-capture event.
    ExperimentalVendor,
}

/// Resolved constraints for one capture attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePlan {
    pub audio: AudioCapture,
    pub video: VideoCapture,
    pub screen_share: Option<ScreenShareTier>,
    /// A separate microphone capture is merged into the screen stream.
    pub supplemental_microphone: bool,
}

impl CapturePlan {
    pub fn uses_screen_share(&self) -> bool {
        self.screen_share.is_some()
    }

    /// Nothing would be captured: no platform call at all.
    pub fn is_empty(&self) -> bool {
        !self.audio.is_enabled() && !self.video.is_enabled() && !self.supplemental_microphone
    }

    pub fn media_constraints(&self) -> MediaStreamConstraints {
        MediaStreamConstraints {
            audio: self.audio.clone(),
            video: self.video.clone(),
        }
    }

    pub fn display_constraints(&self) -> DisplayMediaConstraints {
        DisplayMediaConstraints {
            video: self.video.clone(),
            audio: self.audio.is_enabled(),
        }
    }
}

/// Walk the screen-share tiers and return the first that applies.
pub fn select_screen_tier(platform: &PlatformCapabilities) -> Result<ScreenShareTier, CaptureError> {
    if platform.display_capture {
        return Ok(ScreenShareTier::Native);
    }

    let version = platform.version;
    match platform.browser {
        BrowserFamily::Chrome => {
            if version < CHROME_FIRST_SCREEN_VERSION {
                Err(CaptureError::ScreenShareUnsupported(format!(
                    "Chrome {} predates screen capture",
                    version
                )))
            } else if version <= platform.legacy_screen_max_version() {
                Ok(ScreenShareTier::LegacyFlags)
            } else if platform.screen_extension_installed {
                Ok(ScreenShareTier::Extension)
            } else {
                Err(CaptureError::ScreenShareUnsupported(
                    "the screen-share extension is not installed".into(),
                ))
            }
        }
        BrowserFamily::Firefox => {
            if version >= FIREFOX_FIRST_SCREEN_VERSION {
                Ok(ScreenShareTier::ExperimentalVendor)
            } else {
                Err(CaptureError::ScreenShareUnsupported(format!(
                    "Firefox {} or newer is required",
                    FIREFOX_FIRST_SCREEN_VERSION
                )))
            }
        }
        other => Err(CaptureError::ScreenShareUnsupported(format!(
            "{:?} {} has no screen capture",
            other, version
        ))),
    }
}

/// Build the plan for this round.
pub fn build_capture_plan(
    request: &MediaRequest,
    availability: &DeviceAvailability,
    platform: &PlatformCapabilities,
    config: &NegotiationConfig,
) -> Result<CapturePlan, CaptureError> {
    if let Some(source) = request.screen_source() {
        if availability.capture_video {
            return screen_plan(source, request, availability, platform, config);
        }
    }

    let audio = if availability.capture_audio {
        match &request.audio {
            Some(AudioRequest::Constraints(constraints)) => AudioCapture::Constraints(constraints.clone()),
            _ => AudioCapture::Toggle(true),
        }
    } else {
        AudioCapture::DISABLED
    };

    let video = if availability.capture_video {
        VideoCapture::Constraints(camera_constraints(request, config))
    } else {
        VideoCapture::DISABLED
    };

    let plan = CapturePlan {
        audio,
        video,
        screen_share: None,
        supplemental_microphone: false,
    };
    log::debug!("Capture plan: {:?}", plan);
    Ok(plan)
}

fn camera_constraints(request: &MediaRequest, config: &NegotiationConfig) -> VideoConstraints {
    match &request.video {
        Some(VideoRequest::Constraints(constraints)) => constraints.clone(),
        Some(VideoRequest::Named(name)) => {
            log::info!("Adding media constraint: {}", name);
            VideoProfile::resolve(Some(name.as_str())).constraints()
        }
        _ => VideoProfile::resolve(Some(config.default_video_profile.as_str())).constraints(),
    }
}

fn screen_plan(
    source: ScreenSource,
    request: &MediaRequest,
    availability: &DeviceAvailability,
    platform: &PlatformCapabilities,
    config: &NegotiationConfig,
) -> Result<CapturePlan, CaptureError> {
    let tier = select_screen_tier(platform)?;
    log::info!("Screen sharing {} via {:?} tier", source.as_str(), tier);

    let frame_rate = request
        .screenshare_frame_rate
        .unwrap_or(config.default_screenshare_frame_rate);
    let audio_wanted = availability.capture_audio;
    let max_width = request.screenshare_width.unwrap_or(platform.screen_width);
    let max_height = request.screenshare_height.unwrap_or(platform.screen_height);

    let plan = match tier {
        ScreenShareTier::Native => {
            let desktop_audio = request.capture_desktop_audio && platform.display_audio;
            CapturePlan {
                audio: AudioCapture::Toggle(desktop_audio),
                video: VideoCapture::Constraints(VideoConstraints {
                    frame_rate: Some(Constrain::ideal(frame_rate)),
                    width: request.screenshare_width.map(Constrain::ideal),
                    height: request.screenshare_height.map(Constrain::ideal),
                    ..VideoConstraints::default()
                }),
                screen_share: Some(tier),
                supplemental_microphone: audio_wanted && !desktop_audio,
            }
        }
        ScreenShareTier::LegacyFlags => CapturePlan {
            audio: AudioCapture::Toggle(audio_wanted),
            video: VideoCapture::Constraints(VideoConstraints {
                mandatory: Some(MandatoryVideoConstraints {
                    goog_leaky_bucket: Some(true),
                    chrome_media_source: Some("screen".into()),
                    max_width: Some(max_width),
                    max_height: Some(max_height),
                    min_frame_rate: Some(frame_rate),
                    max_frame_rate: Some(frame_rate),
                    ..MandatoryVideoConstraints::default()
                }),
                ..VideoConstraints::default()
            }),
            screen_share: Some(tier),
            supplemental_microphone: false,
        },
        // chromeMediaSourceId is filled in once the helper grants a source
        ScreenShareTier::Extension => CapturePlan {
            audio: AudioCapture::DISABLED,
            video: VideoCapture::Constraints(VideoConstraints {
                mandatory: Some(MandatoryVideoConstraints {
                    chrome_media_source: Some("desktop".into()),
                    max_width: Some(max_width),
                    max_height: Some(max_height),
                    min_frame_rate: Some(frame_rate),
                    max_frame_rate: Some(frame_rate),
                    ..MandatoryVideoConstraints::default()
                }),
                ..VideoConstraints::default()
            }),
            screen_share: Some(tier),
            supplemental_microphone: audio_wanted,
        },
        ScreenShareTier::ExperimentalVendor => CapturePlan {
            audio: AudioCapture::Toggle(audio_wanted),
            video: VideoCapture::Constraints(VideoConstraints {
                moz_media_source: Some(source.as_str().into()),
                media_source: Some(source.as_str().into()),
                ..VideoConstraints::default()
            }),
            screen_share: Some(tier),
            supplemental_microphone: false,
        },
    };
    log::debug!("Screen capture plan: {:?}", plan);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::platform::HostOs;

    fn chrome(version: u32, os: HostOs) -> PlatformCapabilities {
        PlatformCapabilities {
            browser: BrowserFamily::Chrome,
            version,
            os,
            ..Default::default()
        }
    }

    fn everything() -> DeviceAvailability {
        DeviceAvailability {
            audio_exists: true,
            video_exists: true,
            capture_audio: true,
            capture_video: true,
        }
    }

    fn plan_for(value: serde_json::Value, platform: &PlatformCapabilities) -> CapturePlan {
        let request = MediaRequest::from_json(value).unwrap();
        build_capture_plan(&request, &everything(), platform, &NegotiationConfig::default()).unwrap()
    }

    #[test]
    fn native_display_capture_wins() {
        let platform = PlatformCapabilities {
            display_capture: true,
            ..chrome(30, HostOs::Windows)
        };
        assert_eq!(select_screen_tier(&platform).unwrap(), ScreenShareTier::Native);
    }

    #[test]
    fn legacy_range_selects_flag_tier_not_extension() {
        let platform = PlatformCapabilities {
            screen_extension_installed: true,
            ..chrome(30, HostOs::Windows)
        };
        assert_eq!(select_screen_tier(&platform).unwrap(), ScreenShareTier::LegacyFlags);
    }

    #[test]
    fn linux_legacy_range_is_wider() {
        assert_eq!(
            select_screen_tier(&chrome(35, HostOs::Linux)).unwrap(),
            ScreenShareTier::LegacyFlags
        );
        assert!(select_screen_tier(&chrome(35, HostOs::Windows)).is_err());
    }

    #[test]
    fn newer_chrome_needs_extension() {
        let mut platform = chrome(60, HostOs::MacOs);
        assert!(matches!(
            select_screen_tier(&platform),
            Err(CaptureError::ScreenShareUnsupported(_))
        ));
        platform.screen_extension_installed = true;
        assert_eq!(select_screen_tier(&platform).unwrap(), ScreenShareTier::Extension);
    }

    #[test]
    fn firefox_version_gate() {
        let mut platform = PlatformCapabilities {
            browser: BrowserFamily::Firefox,
            version: 32,
            ..Default::default()
        };
        assert!(select_screen_tier(&platform).is_err());
        platform.version = 33;
        assert_eq!(select_screen_tier(&platform).unwrap(), ScreenShareTier::ExperimentalVendor);
    }

    #[test]
    fn old_chrome_and_other_families_unsupported() {
        assert!(select_screen_tier(&chrome(25, HostOs::Windows)).is_err());
        let safari = PlatformCapabilities {
            browser: BrowserFamily::Safari,
            version: 12,
            ..Default::default()
        };
        assert!(matches!(
            select_screen_tier(&safari),
            Err(CaptureError::ScreenShareUnsupported(_))
        ));
    }

    #[test]
    fn camera_plan_uses_profile_table() {
        let plan = plan_for(json!({ "video": "fhdres" }), &PlatformCapabilities::default());
        assert_eq!(plan.video, VideoCapture::Constraints(VideoConstraints::ideal_resolution(1920, 1080)));
        assert_eq!(plan.audio, AudioCapture::Toggle(true));
        assert!(!plan.uses_screen_share());

        let plan = plan_for(json!({ "video": "nonsense" }), &PlatformCapabilities::default());
        assert_eq!(plan.video, VideoCapture::Constraints(VideoConstraints::ideal_resolution(640, 480)));

        let plan = plan_for(json!({}), &PlatformCapabilities::default());
        assert_eq!(plan.video, VideoCapture::Constraints(VideoConstraints::ideal_resolution(640, 480)));
    }

    #[test]
    fn constraint_objects_pass_through() {
        let plan = plan_for(
            json!({ "audio": { "deviceId": "mic-2" }, "video": { "deviceId": "cam-2" } }),
            &PlatformCapabilities::default(),
        );
        match (&plan.audio, &plan.video) {
            (AudioCapture::Constraints(a), VideoCapture::Constraints(v)) => {
                assert_eq!(a.device_id.as_deref(), Some("mic-2"));
                assert_eq!(v.device_id.as_deref(), Some("cam-2"));
                assert!(v.width.is_none());
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn unavailable_media_are_disabled() {
        let request = MediaRequest::default();
        let nothing = DeviceAvailability {
            audio_exists: false,
            video_exists: false,
            capture_audio: false,
            capture_video: false,
        };
        let plan =
            build_capture_plan(&request, &nothing, &PlatformCapabilities::default(), &NegotiationConfig::default())
                .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn native_plan_adds_microphone_without_desktop_audio() {
        let platform = PlatformCapabilities {
            display_capture: true,
            display_audio: false,
            ..Default::default()
        };
        let plan = plan_for(
            json!({ "video": "screen", "captureDesktopAudio": true, "screenshareFrameRate": 15 }),
            &platform,
        );
        assert_eq!(plan.screen_share, Some(ScreenShareTier::Native));
        assert!(!plan.audio.is_enabled());
        assert!(plan.supplemental_microphone);
        let video = plan.video.constraints().unwrap();
        assert_eq!(video.frame_rate, Some(Constrain::ideal(15)));
    }

    #[test]
    fn native_plan_with_desktop_audio_skips_microphone() {
        let platform = PlatformCapabilities {
            display_capture: true,
            display_audio: true,
            ..Default::default()
        };
        let plan = plan_for(json!({ "video": "screen", "captureDesktopAudio": true }), &platform);
        assert!(plan.display_constraints().audio);
        assert!(!plan.supplemental_microphone);
        // frame rate falls back to the configured default
        assert_eq!(plan.video.constraints().unwrap().frame_rate, Some(Constrain::ideal(3)));
    }

    #[test]
    fn legacy_plan_uses_mandatory_dialect() {
        let platform = PlatformCapabilities {
            screen_width: 2560,
            screen_height: 1440,
            ..chrome(28, HostOs::Windows)
        };
        let plan = plan_for(json!({ "video": "screen" }), &platform);
        let mandatory = plan.video.constraints().unwrap().mandatory.clone().unwrap();
        assert_eq!(mandatory.chrome_media_source.as_deref(), Some("screen"));
        assert_eq!(mandatory.goog_leaky_bucket, Some(true));
        assert_eq!(mandatory.max_width, Some(2560));
        assert_eq!(mandatory.max_height, Some(1440));
        assert_eq!(plan.audio, AudioCapture::Toggle(true));
    }

    #[test]
    fn vendor_plan_names_source() {
        let platform = PlatformCapabilities {
            browser: BrowserFamily::Firefox,
            version: 40,
            ..Default::default()
        };
        let plan = plan_for(json!({ "video": "window", "audio": false }), &platform);
        let video = plan.video.constraints().unwrap();
        assert_eq!(video.moz_media_source.as_deref(), Some("window"));
        assert_eq!(video.media_source.as_deref(), Some("window"));
        assert_eq!(plan.screen_share, Some(ScreenShareTier::ExperimentalVendor));
    }

    #[test]
    fn unsupported_screen_share_fails_plan() {
        let request = MediaRequest::from_json(json!({ "video": "screen" })).unwrap();
        let err = build_capture_plan(
            &request,
            &everything(),
            &PlatformCapabilities::default(),
            &NegotiationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::ScreenShareUnsupported(_)));
    }
}
