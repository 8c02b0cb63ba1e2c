use std::sync::Arc;

use async_trait::async_trait;

use crate::models::error::CaptureError;
use crate::models::media::MediaKind;
use crate::models::stream::MediaStream;
use crate::traits::media_track::MediaTrack;

/// Outgoing half of a transceiver, or a plan-B sender.
#[async_trait]
pub trait RtpSender: Send + Sync {
    /// Track currently being sent, if any.
    fn track(&self) -> Option<Arc<dyn MediaTrack>>;

    /// Swap the outgoing track in place, without renegotiation.
    async fn replace_track(&self, track: Option<Arc<dyn MediaTrack>>) -> Result<(), CaptureError>;
}

/// Sender/receiver pairing bound to one media kind.
pub trait RtpTransceiver: Send + Sync {
    fn sender(&self) -> Option<Arc<dyn RtpSender>>;

    /// Kind of the track the receiver side carries, if any.
    fn receiver_track_kind(&self) -> Option<MediaKind>;

    /// Whether the sender or the receiver currently carries a `kind` track.
    fn carries(&self, kind: MediaKind) -> bool {
        let sending = self
            .sender()
            .and_then(|s| s.track())
            .map(|t| t.kind() == kind)
            .unwrap_or(false);
        sending || self.receiver_track_kind() == Some(kind)
    }
}

/// The parts of a peer connection the reconciler touches.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Transceivers, in creation order. Empty on track-based connections.
    fn transceivers(&self) -> Vec<Arc<dyn RtpTransceiver>>;

    fn senders(&self) -> Vec<Arc<dyn RtpSender>>;

    /// Create a new outgoing binding for `track`, associated with `stream`.
    async fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        stream: &MediaStream,
    ) -> Result<Arc<dyn RtpSender>, CaptureError>;

    fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> Result<(), CaptureError>;
}
