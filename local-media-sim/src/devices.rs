//! In-memory device inventory and capture backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use local_media_core::models::constraints::{DisplayMediaConstraints, MediaStreamConstraints, VideoCapture};
use local_media_core::models::error::CaptureError;
use local_media_core::models::media::{DeviceInfo, DeviceKind, MediaKind};
use local_media_core::models::stream::MediaStream;
use local_media_core::traits::media_devices::MediaDevices;
use local_media_core::traits::media_track::MediaTrack;

use crate::permissions::PermissionPolicy;
use crate::track::{ManualClock, SimTrack};

/// Simulated `MediaDevices`.
///
/// Records every capture call with its constraints and hands out
/// `SimTrack`s labelled after the matching input device.
#[derive(Default)]
pub struct SimulatedDevices {
    inventory: Mutex<Vec<DeviceInfo>>,
    permissions: Mutex<PermissionPolicy>,
    capture_delay: Mutex<Option<Duration>>,
    screen_clock: Mutex<Option<Arc<ManualClock>>>,
    user_media_calls: Mutex<Vec<MediaStreamConstraints>>,
    display_media_calls: Mutex<Vec<DisplayMediaConstraints>>,
    captured: Mutex<Vec<Arc<SimTrack>>>,
}

impl SimulatedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// A laptop: one microphone, one camera, one speaker.
    pub fn laptop() -> Self {
        Self::new()
            .with_device(DeviceInfo::new("mic-0", DeviceKind::AudioInput, "Built-in Microphone"))
            .with_device(DeviceInfo::new("cam-0", DeviceKind::VideoInput, "Integrated Camera"))
            .with_device(DeviceInfo::new("spk-0", DeviceKind::AudioOutput, "Speakers"))
    }

    pub fn with_device(self, device: DeviceInfo) -> Self {
        self.inventory.lock().push(device);
        self
    }

    pub fn with_permissions(self, permissions: PermissionPolicy) -> Self {
        *self.permissions.lock() = permissions;
        self
    }

    /// Every capture call suspends this long before answering.
    pub fn with_capture_delay(self, delay: Duration) -> Self {
        *self.capture_delay.lock() = Some(delay);
        self
    }

    /// Screen streams captured by constraint carry this clock.
    pub fn with_screen_clock(self, clock: Arc<ManualClock>) -> Self {
        *self.screen_clock.lock() = Some(clock);
        self
    }

    pub fn set_permissions(&self, permissions: PermissionPolicy) {
        *self.permissions.lock() = permissions;
    }

    pub fn user_media_calls(&self) -> Vec<MediaStreamConstraints> {
        self.user_media_calls.lock().clone()
    }

    pub fn display_media_calls(&self) -> Vec<DisplayMediaConstraints> {
        self.display_media_calls.lock().clone()
    }

    /// Every track ever handed out, in capture order.
    pub fn captured_tracks(&self) -> Vec<Arc<SimTrack>> {
        self.captured.lock().clone()
    }

    pub fn live_tracks(&self) -> Vec<Arc<SimTrack>> {
        self.captured
            .lock()
            .iter()
            .filter(|t| !t.is_stopped())
            .cloned()
            .collect()
    }

    fn device_label(&self, kind: DeviceKind) -> Option<String> {
        self.inventory
            .lock()
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.label.clone())
    }

    fn issue(&self, kind: MediaKind, label: &str) -> Arc<dyn MediaTrack> {
        let track = SimTrack::new(kind, label);
        self.captured.lock().push(track.clone());
        track
    }

    async fn wait(&self) {
        let delay = *self.capture_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn not_found(kind: DeviceKind) -> CaptureError {
        CaptureError::CaptureDenied(format!("NotFoundError: no {:?} device", kind))
    }
}

#[async_trait]
impl MediaDevices for SimulatedDevices {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        Ok(self.inventory.lock().clone())
    }

    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CaptureError> {
        log::debug!("getUserMedia {:?}", constraints);
        self.user_media_calls.lock().push(constraints.clone());
        if constraints.is_empty() {
            return Err(CaptureError::InvalidRequest(
                "at least one of audio and video must be requested".into(),
            ));
        }
        self.wait().await;

        let permissions = *self.permissions.lock();
        let screen = match &constraints.video {
            VideoCapture::Constraints(video) => {
                video.has_screen_source() || video.media_source.is_some() || video.moz_media_source.is_some()
            }
            VideoCapture::Toggle(_) => false,
        };

        let mut tracks = Vec::new();
        if constraints.audio.is_enabled() {
            permissions.check_microphone()?;
            let label = self
                .device_label(DeviceKind::AudioInput)
                .ok_or_else(|| Self::not_found(DeviceKind::AudioInput))?;
            tracks.push((MediaKind::Audio, label));
        }
        if constraints.video.is_enabled() {
            let label = if screen {
                permissions.check_screen()?;
                "screen".to_string()
            } else {
                permissions.check_camera()?;
                self.device_label(DeviceKind::VideoInput)
                    .ok_or_else(|| Self::not_found(DeviceKind::VideoInput))?
            };
            tracks.push((MediaKind::Video, label));
        }

        let tracks: Vec<Arc<dyn MediaTrack>> = tracks
            .iter()
            .map(|(kind, label)| self.issue(*kind, label))
            .collect();
        let clock = if screen { self.screen_clock.lock().clone() } else { None };
        Ok(match clock {
            Some(clock) => MediaStream::with_clock(tracks, clock),
            None => MediaStream::with_tracks(tracks),
        })
    }

    async fn get_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, CaptureError> {
        log::debug!("getDisplayMedia {:?}", constraints);
        self.display_media_calls.lock().push(constraints.clone());
        self.wait().await;

        let permissions = *self.permissions.lock();
        permissions.check_screen()?;

        let stream = MediaStream::with_tracks(vec![self.issue(MediaKind::Video, "screen")]);
        if constraints.audio {
            stream.add_track(self.issue(MediaKind::Audio, "desktop audio"));
        }
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use local_media_core::models::constraints::{AudioCapture, VideoConstraints};

    use super::*;
    use crate::permissions::Permission;

    #[tokio::test]
    async fn camera_and_microphone_tracks_carry_device_labels() {
        let devices = SimulatedDevices::laptop();
        let stream = devices
            .get_user_media(&MediaStreamConstraints {
                audio: AudioCapture::Toggle(true),
                video: VideoCapture::Toggle(true),
            })
            .await
            .unwrap();

        assert_eq!(stream.audio_tracks()[0].label(), "Built-in Microphone");
        assert_eq!(stream.video_tracks()[0].label(), "Integrated Camera");
        assert_eq!(devices.live_tracks().len(), 2);
    }

    #[tokio::test]
    async fn missing_device_is_not_found() {
        let devices = SimulatedDevices::new();
        let err = devices
            .get_user_media(&MediaStreamConstraints::microphone_only())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::CaptureDenied(m) if m.starts_with("NotFoundError")));
    }

    #[tokio::test]
    async fn denied_camera_is_rejected() {
        let devices = SimulatedDevices::laptop().with_permissions(PermissionPolicy {
            camera: Permission::Denied,
            ..Default::default()
        });
        let err = devices
            .get_user_media(&MediaStreamConstraints {
                audio: AudioCapture::DISABLED,
                video: VideoCapture::Toggle(true),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::CaptureDenied(_)));
        assert!(devices.captured_tracks().is_empty());
    }

    #[tokio::test]
    async fn screen_constraints_need_no_camera() {
        let clock = ManualClock::new();
        let devices = SimulatedDevices::new().with_screen_clock(clock);
        let stream = devices
            .get_user_media(&MediaStreamConstraints {
                audio: AudioCapture::DISABLED,
                video: VideoCapture::Constraints(VideoConstraints {
                    media_source: Some("screen".into()),
                    ..Default::default()
                }),
            })
            .await
            .unwrap();
        assert_eq!(stream.video_tracks()[0].label(), "screen");
        assert!(stream.has_clock());
    }
}
