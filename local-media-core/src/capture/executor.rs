use crate::models::config::NegotiationConfig;
use crate::models::constraints::{AudioCapture, MediaStreamConstraints, VideoCapture};
use crate::models::error::CaptureError;
use crate::models::media::MediaKind;
use crate::models::stream::MediaStream;
use crate::traits::extension_channel::ExtensionChannel;
use crate::traits::media_devices::MediaDevices;

use super::end_watcher::EndWatcher;
use super::extension::request_screen_source;
use super::selector::{CapturePlan, ScreenShareTier};

/// Result of running a plan: the fresh stream (if anything was captured)
/// and the end watcher attached to it, if one was needed.
#[derive(Debug, Default)]
pub struct CaptureOutcome {
    pub stream: Option<MediaStream>,
    pub watcher: Option<EndWatcher>,
}

impl CaptureOutcome {
    fn captured(stream: MediaStream) -> Self {
        Self {
            stream: Some(stream),
            watcher: None,
        }
    }
}

/// Run `plan` against the platform.
///
/// An empty plan makes no platform call. Any partially captured stream is
/// stopped before an error is returned.
pub async fn execute_plan<D>(
    devices: &D,
    plan: &CapturePlan,
    extension: Option<&dyn ExtensionChannel>,
    config: &NegotiationConfig,
) -> Result<CaptureOutcome, CaptureError>
where
    D: MediaDevices + ?Sized,
{
    let Some(tier) = plan.screen_share else {
        if plan.is_empty() {
            log::debug!("Nothing to capture");
            return Ok(CaptureOutcome::default());
        }
        let stream = devices.get_user_media(&plan.media_constraints()).await?;
        log::debug!("Captured {:?}", stream);
        return Ok(CaptureOutcome::captured(stream));
    };

    match tier {
        ScreenShareTier::Native => {
            let stream = devices.get_display_media(&plan.display_constraints()).await?;
            if plan.supplemental_microphone {
                merge_microphone(devices, &stream).await?;
            }
            Ok(CaptureOutcome::captured(stream))
        }
        ScreenShareTier::LegacyFlags => {
            let stream = devices.get_user_media(&plan.media_constraints()).await?;
            Ok(CaptureOutcome::captured(stream))
        }
        ScreenShareTier::Extension => {
            let channel = extension.ok_or_else(|| {
                CaptureError::ScreenShareUnsupported("no screen-share extension channel configured".into())
            })?;
            let source_id = request_screen_source(channel, config.extension_timeout()).await?;

            let mut video = plan.video.constraints().cloned().unwrap_or_default();
            video.mandatory.get_or_insert_with(Default::default).chrome_media_source_id = Some(source_id);
            let constraints = MediaStreamConstraints {
                audio: AudioCapture::DISABLED,
                video: VideoCapture::Constraints(video),
            };
            let stream = devices.get_user_media(&constraints).await?;
            if plan.supplemental_microphone {
                merge_microphone(devices, &stream).await?;
            }
            Ok(CaptureOutcome::captured(stream))
        }
        ScreenShareTier::ExperimentalVendor => {
            let stream = devices.get_user_media(&plan.media_constraints()).await?;
            let watcher = EndWatcher::spawn(&stream, config.end_poll_interval());
            Ok(CaptureOutcome {
                stream: Some(stream),
                watcher,
            })
        }
    }
}

/// Capture a microphone and move its audio track into `screen`.
async fn merge_microphone<D>(devices: &D, screen: &MediaStream) -> Result<(), CaptureError>
where
    D: MediaDevices + ?Sized,
{
    let microphone = match devices.get_user_media(&MediaStreamConstraints::microphone_only()).await {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Microphone capture for screen share failed: {}", e);
            screen.stop_all_tracks();
            return Err(e);
        }
    };

    let audio = microphone.first_track(MediaKind::Audio);
    for track in microphone.tracks() {
        let keep = audio.as_ref().map(|a| a.id() == track.id()).unwrap_or(false);
        if !keep {
            track.stop();
        }
    }
    match audio {
        Some(track) => {
            log::debug!("Merging microphone track {} into screen stream", track.id());
            screen.add_track(track);
        }
        None => log::warn!("Microphone capture returned no audio track"),
    }
    Ok(())
}
