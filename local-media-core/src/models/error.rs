use std::time::Duration;

use thiserror::Error;

use super::media::MediaKind;

/// Errors surfaced while preparing local media for a peer connection.
///
/// None of these are retried internally. `is_retryable` tells the caller
/// which ones are worth a second attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture device found")]
    NoCaptureDevice,

    #[error("media capture is not available on this platform")]
    CaptureUnavailable,

    #[error("{0} capture is required, but no capture device found")]
    RequiredDeviceMissing(MediaKind),

    #[error("capture denied: {0}")]
    CaptureDenied(String),

    #[error("screen sharing unsupported: {0}")]
    ScreenShareUnsupported(String),

    #[error("screen sharing request cancelled by the user")]
    ScreenShareCancelled,

    #[error("screen sharing extension did not answer within {0:?}")]
    ScreenShareTimeout(Duration),

    #[error("another local media operation is already in flight")]
    SessionBusy,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("peer connection closed")]
    ConnectionClosed,

    #[error("device enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("peer connection error: {0}")]
    PeerConnection(String),

    #[error("extension protocol error: {0}")]
    ExtensionProtocol(String),
}

impl CaptureError {
    /// Whether the same request may succeed if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ScreenShareTimeout(_) | Self::SessionBusy)
    }
}
