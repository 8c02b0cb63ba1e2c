//! Declarative media request and the predicates derived from it.
//!
//! Every flag on a request is optional or defaults to `false`, so an absent
//! or partial request degrades to "send and receive audio and video". The
//! accessor methods below are the only place that interprets the flags.

use serde::{Deserialize, Serialize};

use super::constraints::{AudioConstraints, VideoConstraints};
use super::error::CaptureError;
use super::media::{MediaDirection, MediaKind};
use super::platform::PlatformCapabilities;
use super::stream::MediaStream;

/// The `audio` field: on/off or a constraint object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudioRequest {
    Toggle(bool),
    Constraints(AudioConstraints),
}

/// The `video` field: on/off, a profile or screen source name, or a
/// constraint object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VideoRequest {
    Toggle(bool),
    Named(String),
    Constraints(VideoConstraints),
}

/// What the caller wants to share when asking for screen capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenSource {
    Screen,
    Window,
}

impl ScreenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Window => "window",
        }
    }
}

/// Caller's description of the local media it wants.
///
/// Deserializes from the camelCase object callers already use, e.g.
/// `{"audio": true, "video": "hires", "failIfNoAudio": true}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaRequest {
    pub audio: Option<AudioRequest>,
    pub video: Option<VideoRequest>,

    pub audio_send: Option<bool>,
    pub audio_recv: Option<bool>,
    pub video_send: Option<bool>,
    pub video_recv: Option<bool>,

    pub fail_if_no_audio: Option<bool>,
    pub fail_if_no_video: Option<bool>,

    pub data: bool,

    /// Renegotiate an existing connection instead of starting fresh.
    pub update: bool,

    pub keep_audio: bool,
    pub keep_video: bool,
    pub add_audio: bool,
    pub replace_audio: bool,
    pub remove_audio: bool,
    pub add_video: bool,
    pub replace_video: bool,
    pub remove_video: bool,

    pub capture_desktop_audio: bool,
    pub screenshare_frame_rate: Option<u32>,
    pub screenshare_width: Option<u32>,
    pub screenshare_height: Option<u32>,

    /// Pre-captured stream to use as-is; bypasses probing and capture.
    #[serde(skip)]
    pub external_stream: Option<MediaStream>,
}

/// Per-medium update flags, as set on the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateFlags {
    pub keep: bool,
    pub add: bool,
    pub replace: bool,
    pub remove: bool,
}

/// What one medium should do in this round, after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaIntent {
    /// Nothing to capture or send.
    Skip,
    /// The existing track stays; capture is skipped.
    Keep,
    /// First capture of a new session.
    Capture,
    /// Renegotiation: attach a track where there is none.
    Add,
    /// Renegotiation: swap the existing track for a new capture.
    Replace,
    /// Renegotiation: drop the existing track.
    Remove,
}

impl MediaIntent {
    /// Whether a new track of this medium has to be captured.
    pub fn captures(&self) -> bool {
        matches!(self, Self::Capture | Self::Add | Self::Replace)
    }
}

/// Resolved intent for both media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaIntents {
    pub audio: MediaIntent,
    pub video: MediaIntent,
    /// Whether these intents apply to an existing local stream.
    pub renegotiating: bool,
}

impl MediaIntents {
    pub fn get(&self, kind: MediaKind) -> MediaIntent {
        match kind {
            MediaKind::Audio => self.audio,
            MediaKind::Video => self.video,
        }
    }

    pub fn captures_anything(&self) -> bool {
        self.audio.captures() || self.video.captures()
    }
}

impl MediaRequest {
    pub fn from_json(value: serde_json::Value) -> Result<Self, CaptureError> {
        serde_json::from_value(value).map_err(|e| CaptureError::InvalidRequest(e.to_string()))
    }

    fn audio_disabled(&self) -> bool {
        matches!(self.audio, Some(AudioRequest::Toggle(false)))
    }

    fn video_disabled(&self) -> bool {
        matches!(self.video, Some(VideoRequest::Toggle(false)))
    }

    pub fn audio_send_wanted(&self) -> bool {
        log::trace!("audio_send_wanted: {:?}", self.audio_send);
        if self.audio_disabled() {
            return false;
        }
        self.audio_send.unwrap_or(true)
    }

    pub fn audio_send_required(&self) -> bool {
        if self.audio_disabled() || self.audio_send == Some(false) {
            return false;
        }
        self.fail_if_no_audio.unwrap_or(false)
    }

    pub fn audio_recv_wanted(&self) -> bool {
        if self.audio_disabled() {
            return false;
        }
        self.audio_recv.unwrap_or(true)
    }

    pub fn video_send_wanted(&self) -> bool {
        log::trace!("video_send_wanted: {:?}", self.video_send);
        if self.video_disabled() {
            return false;
        }
        self.video_send.unwrap_or(true)
    }

    pub fn video_send_required(&self) -> bool {
        if self.video_disabled() || self.video_send == Some(false) {
            return false;
        }
        self.fail_if_no_video.unwrap_or(false)
    }

    pub fn video_recv_wanted(&self) -> bool {
        if self.video_disabled() {
            return false;
        }
        self.video_recv.unwrap_or(true)
    }

    pub fn send_wanted(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.audio_send_wanted(),
            MediaKind::Video => self.video_send_wanted(),
        }
    }

    pub fn send_required(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.audio_send_required(),
            MediaKind::Video => self.video_send_required(),
        }
    }

    pub fn recv_wanted(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Audio => self.audio_recv_wanted(),
            MediaKind::Video => self.video_recv_wanted(),
        }
    }

    /// Transceiver direction for `kind`.
    pub fn direction(&self, kind: MediaKind) -> MediaDirection {
        MediaDirection::from_flags(self.send_wanted(kind), self.recv_wanted(kind))
    }

    /// A video constraint object names a desktop/screen/window source.
    pub fn screen_share_wanted(&self) -> bool {
        match &self.video {
            Some(VideoRequest::Constraints(constraints)) => constraints.has_screen_source(),
            _ => false,
        }
    }

    /// `video: "screen"` or `video: "window"`.
    pub fn screen_source(&self) -> Option<ScreenSource> {
        match &self.video {
            Some(VideoRequest::Named(name)) if name == "screen" => Some(ScreenSource::Screen),
            Some(VideoRequest::Named(name)) if name == "window" => Some(ScreenSource::Window),
            _ => None,
        }
    }

    pub fn screen_share_requested(&self) -> bool {
        self.screen_source().is_some()
    }

    pub fn data_channel_wanted(&self, platform: &PlatformCapabilities) -> bool {
        if !platform.supports_data_channels() {
            log::warn!("{:?} doesn't support data channels", platform.browser);
            return false;
        }
        self.data
    }

    /// Update flags for `kind`; all `false` unless this is an update.
    pub fn update_flags(&self, kind: MediaKind) -> UpdateFlags {
        if !self.update {
            return UpdateFlags::default();
        }
        match kind {
            MediaKind::Audio => UpdateFlags {
                keep: self.keep_audio,
                add: self.add_audio,
                replace: self.replace_audio,
                remove: self.remove_audio,
            },
            MediaKind::Video => UpdateFlags {
                keep: self.keep_video,
                add: self.add_video,
                replace: self.replace_video,
                remove: self.remove_video,
            },
        }
    }

    /// Resolve the per-medium intent against the current local stream.
    ///
    /// Without `update`, without a current stream, or when the current stream
    /// was supplied externally, this is a new session and every update flag
    /// is ignored.
    pub fn intents(
        &self,
        current: Option<&MediaStream>,
        stream_is_external: bool,
    ) -> Result<MediaIntents, CaptureError> {
        let current = match current {
            Some(stream) if self.update && !stream_is_external => stream,
            _ => {
                return Ok(MediaIntents {
                    audio: self.new_session_intent(MediaKind::Audio),
                    video: self.new_session_intent(MediaKind::Video),
                    renegotiating: false,
                })
            }
        };

        Ok(MediaIntents {
            audio: self.update_intent(MediaKind::Audio, current.has_track(MediaKind::Audio))?,
            video: self.update_intent(MediaKind::Video, current.has_track(MediaKind::Video))?,
            renegotiating: true,
        })
    }

    fn new_session_intent(&self, kind: MediaKind) -> MediaIntent {
        if self.send_wanted(kind) {
            MediaIntent::Capture
        } else {
            MediaIntent::Skip
        }
    }

    fn update_intent(&self, kind: MediaKind, existing: bool) -> Result<MediaIntent, CaptureError> {
        let flags = self.update_flags(kind);
        let intent = if flags.add {
            if existing {
                return Err(CaptureError::InvalidRequest(format!(
                    "can't add {} track, there already is one",
                    kind
                )));
            }
            MediaIntent::Add
        } else if flags.remove {
            MediaIntent::Remove
        } else if flags.replace {
            if existing {
                MediaIntent::Replace
            } else {
                MediaIntent::Add
            }
        } else if existing {
            MediaIntent::Keep
        } else if !flags.keep && self.send_wanted(kind) {
            MediaIntent::Add
        } else {
            MediaIntent::Skip
        };
        log::debug!("{} intent for update: {:?}", kind, intent);
        Ok(intent)
    }
}
