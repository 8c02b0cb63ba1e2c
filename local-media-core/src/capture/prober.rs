use crate::models::constraints::MediaStreamConstraints;
use crate::models::error::CaptureError;
use crate::models::media::{DeviceInfo, DeviceKind, MediaKind};
use crate::models::request::{MediaIntents, MediaRequest};
use crate::traits::media_devices::MediaDevices;

/// Outcome of cross-checking the device inventory against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAvailability {
    pub audio_exists: bool,
    /// Vacuously true when a screen is the video source.
    pub video_exists: bool,
    /// Audio will be captured in this round.
    pub capture_audio: bool,
    /// Video will be captured in this round.
    pub capture_video: bool,
}

impl DeviceAvailability {
    /// Availability when probing is skipped: whatever the intents capture.
    pub fn assumed(intents: &MediaIntents) -> Self {
        Self {
            audio_exists: true,
            video_exists: true,
            capture_audio: intents.audio.captures(),
            capture_video: intents.video.captures(),
        }
    }

    pub fn captures(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.capture_audio,
            MediaKind::Video => self.capture_video,
        }
    }
}

/// Enumerate devices and validate them against `request`.
pub async fn probe<D>(
    devices: &D,
    request: &MediaRequest,
    intents: &MediaIntents,
) -> Result<DeviceAvailability, CaptureError>
where
    D: MediaDevices + ?Sized,
{
    let inventory = devices.enumerate_devices().await?;
    log::debug!("Enumerated {} devices", inventory.len());
    check_availability(&inventory, request, intents)
}

/// Device inventory for populating selectors.
///
/// Platforms only report device labels once capture was granted, so this
/// runs a throwaway capture with `priming` first and stops it again whether
/// or not enumeration succeeds. Empty `priming` constraints skip that step.
pub async fn list_devices<D>(devices: &D, priming: &MediaStreamConstraints) -> Result<Vec<DeviceInfo>, CaptureError>
where
    D: MediaDevices + ?Sized,
{
    let primer = if priming.is_empty() {
        None
    } else {
        Some(devices.get_user_media(priming).await?)
    };
    let inventory = devices.enumerate_devices().await;
    if let Some(primer) = primer {
        log::debug!("Releasing priming stream {}", primer.id());
        primer.stop_all_tracks();
    }
    let inventory = inventory?;
    log::debug!("Listed {} devices", inventory.len());
    Ok(inventory)
}

/// Pure part of `probe`.
///
/// A missing device only fails the request when the caller marked that
/// medium as required; otherwise the medium silently drops out of capture.
pub fn check_availability(
    inventory: &[DeviceInfo],
    request: &MediaRequest,
    intents: &MediaIntents,
) -> Result<DeviceAvailability, CaptureError> {
    let audio_exists = inventory.iter().any(|d| d.kind == DeviceKind::AudioInput);
    let video_exists = request.screen_share_wanted()
        || request.screen_share_requested()
        || inventory.iter().any(|d| d.kind == DeviceKind::VideoInput);

    let audio_needed = intents.audio.captures();
    let video_needed = intents.video.captures();
    let audio_required = audio_needed && request.audio_send_required();
    let video_required = video_needed && request.video_send_required();

    if audio_required && video_required && !audio_exists && !video_exists {
        return Err(CaptureError::NoCaptureDevice);
    }
    if audio_required && !audio_exists {
        return Err(CaptureError::RequiredDeviceMissing(MediaKind::Audio));
    }
    if video_required && !video_exists {
        return Err(CaptureError::RequiredDeviceMissing(MediaKind::Video));
    }

    if audio_needed && !audio_exists {
        log::warn!("No audio input device, continuing without audio");
    }
    if video_needed && !video_exists {
        log::warn!("No video input device, continuing without video");
    }

    Ok(DeviceAvailability {
        audio_exists,
        video_exists,
        capture_audio: audio_needed && audio_exists,
        capture_video: video_needed && video_exists,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::models::constraints::DisplayMediaConstraints;
    use crate::models::request::MediaIntent;
    use crate::models::stream::MediaStream;
    use crate::traits::media_track::MediaTrack;

    struct Track(AtomicBool);

    impl MediaTrack for Track {
        fn id(&self) -> &str {
            "primer"
        }
        fn kind(&self) -> MediaKind {
            MediaKind::Audio
        }
        fn label(&self) -> &str {
            "primer"
        }
        fn stop(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
        fn is_stopped(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// One microphone; enumeration fails when `broken` is set.
    struct Inventory {
        broken: bool,
        primers: Mutex<Vec<Arc<Track>>>,
    }

    impl Inventory {
        fn new(broken: bool) -> Self {
            Self {
                broken,
                primers: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MediaDevices for Inventory {
        async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
            if self.broken {
                return Err(CaptureError::EnumerationFailed("device list unavailable".into()));
            }
            Ok(vec![mic()])
        }

        async fn get_user_media(&self, _constraints: &MediaStreamConstraints) -> Result<MediaStream, CaptureError> {
            let track = Arc::new(Track(AtomicBool::new(false)));
            self.primers.lock().push(track.clone());
            Ok(MediaStream::with_tracks(vec![track as Arc<dyn MediaTrack>]))
        }

        async fn get_display_media(&self, _constraints: &DisplayMediaConstraints) -> Result<MediaStream, CaptureError> {
            Err(CaptureError::ScreenShareUnsupported("no display capture".into()))
        }
    }

    fn new_session(request: &MediaRequest) -> MediaIntents {
        request.intents(None, false).unwrap()
    }

    fn mic() -> DeviceInfo {
        DeviceInfo::new("mic-1", DeviceKind::AudioInput, "Built-in Microphone")
    }

    fn cam() -> DeviceInfo {
        DeviceInfo::new("cam-1", DeviceKind::VideoInput, "FaceTime HD Camera")
    }

    fn speaker() -> DeviceInfo {
        DeviceInfo::new("spk-1", DeviceKind::AudioOutput, "Speakers")
    }

    #[test]
    fn all_devices_present() {
        let request = MediaRequest::default();
        let availability =
            check_availability(&[mic(), cam(), speaker()], &request, &new_session(&request)).unwrap();
        assert!(availability.capture_audio);
        assert!(availability.capture_video);
    }

    #[test]
    fn nothing_present_but_nothing_required_degrades() {
        let request = MediaRequest::default();
        let availability = check_availability(&[speaker()], &request, &new_session(&request)).unwrap();
        assert!(!availability.audio_exists);
        assert!(!availability.video_exists);
        assert!(!availability.capture_audio);
        assert!(!availability.capture_video);
    }

    #[test]
    fn required_audio_missing() {
        let request = MediaRequest::from_json(json!({ "failIfNoAudio": true })).unwrap();
        let err = check_availability(&[cam()], &request, &new_session(&request)).unwrap_err();
        assert_eq!(err, CaptureError::RequiredDeviceMissing(MediaKind::Audio));
    }

    #[test]
    fn required_video_missing() {
        let request = MediaRequest::from_json(json!({ "failIfNoVideo": true })).unwrap();
        let err = check_availability(&[mic()], &request, &new_session(&request)).unwrap_err();
        assert_eq!(err, CaptureError::RequiredDeviceMissing(MediaKind::Video));
    }

    #[test]
    fn both_required_and_both_missing() {
        let request =
            MediaRequest::from_json(json!({ "failIfNoAudio": true, "failIfNoVideo": true })).unwrap();
        let err = check_availability(&[], &request, &new_session(&request)).unwrap_err();
        assert_eq!(err, CaptureError::NoCaptureDevice);
    }

    #[test]
    fn screen_share_needs_no_camera() {
        let request = MediaRequest::from_json(json!({ "video": "screen", "failIfNoVideo": true })).unwrap();
        let availability = check_availability(&[mic()], &request, &new_session(&request)).unwrap();
        assert!(availability.video_exists);
        assert!(availability.capture_video);
    }

    #[test]
    fn kept_medium_is_not_checked() {
        let request = MediaRequest::from_json(json!({ "failIfNoAudio": true })).unwrap();
        let intents = MediaIntents {
            audio: MediaIntent::Keep,
            video: MediaIntent::Add,
            renegotiating: true,
        };
        let availability = check_availability(&[cam()], &request, &intents).unwrap();
        assert!(!availability.capture_audio);
        assert!(availability.capture_video);
    }

    #[tokio::test]
    async fn listing_releases_priming_capture() {
        let devices = Inventory::new(false);
        let listed = list_devices(&devices, &MediaStreamConstraints::audio_and_video()).await.unwrap();
        assert_eq!(listed, vec![mic()]);
        let primers = devices.primers.lock();
        assert_eq!(primers.len(), 1);
        assert!(primers[0].is_stopped());
    }

    #[tokio::test]
    async fn failed_enumeration_still_releases_priming_capture() {
        let devices = Inventory::new(true);
        let err = list_devices(&devices, &MediaStreamConstraints::audio_and_video()).await.unwrap_err();
        assert!(matches!(err, CaptureError::EnumerationFailed(_)));
        assert!(devices.primers.lock()[0].is_stopped());
    }

    #[tokio::test]
    async fn empty_priming_skips_capture() {
        let devices = Inventory::new(false);
        let listed = list_devices(&devices, &MediaStreamConstraints::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(devices.primers.lock().is_empty());
    }
}
