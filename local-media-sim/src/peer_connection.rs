//! In-memory peer connection with transceivers and an event log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use local_media_core::models::error::CaptureError;
use local_media_core::models::media::{MediaKind, NegotiationMode};
use local_media_core::models::stream::MediaStream;
use local_media_core::traits::media_track::MediaTrack;
use local_media_core::traits::peer_connection::{PeerConnection, RtpSender, RtpTransceiver};

/// Something the session did to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    AddTrack { track_id: String },
    ReplaceTrack { sender_id: String, track_id: Option<String> },
    RemoveTrack { sender_id: String },
}

type EventLog = Arc<Mutex<Vec<ConnectionEvent>>>;

pub struct SimSender {
    id: String,
    track: Mutex<Option<Arc<dyn MediaTrack>>>,
    events: EventLog,
}

impl SimSender {
    fn new(track: Option<Arc<dyn MediaTrack>>, events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            track: Mutex::new(track),
            events,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl RtpSender for SimSender {
    fn track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.track.lock().clone()
    }

    async fn replace_track(&self, track: Option<Arc<dyn MediaTrack>>) -> Result<(), CaptureError> {
        self.events.lock().push(ConnectionEvent::ReplaceTrack {
            sender_id: self.id.clone(),
            track_id: track.as_ref().map(|t| t.id().to_string()),
        });
        *self.track.lock() = track;
        Ok(())
    }
}

pub struct SimTransceiver {
    sender: Arc<SimSender>,
    receiver_kind: Option<MediaKind>,
}

impl RtpTransceiver for SimTransceiver {
    fn sender(&self) -> Option<Arc<dyn RtpSender>> {
        Some(self.sender.clone())
    }

    fn receiver_track_kind(&self) -> Option<MediaKind> {
        self.receiver_kind
    }
}

/// Simulated `PeerConnection`.
///
/// Under `TransceiverBased` every `add_track` also creates a transceiver,
/// as a unified-plan connection does.
pub struct SimulatedPeerConnection {
    mode: NegotiationMode,
    transceivers: Mutex<Vec<Arc<SimTransceiver>>>,
    senders: Mutex<Vec<Arc<SimSender>>>,
    events: EventLog,
    reject_add: AtomicBool,
}

impl SimulatedPeerConnection {
    pub fn new(mode: NegotiationMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            transceivers: Mutex::new(Vec::new()),
            senders: Mutex::new(Vec::new()),
            events: Arc::new(Mutex::new(Vec::new())),
            reject_add: AtomicBool::new(false),
        })
    }

    /// Add a transceiver negotiated by the remote side: it receives `kind`
    /// and its sender has no track yet.
    pub fn add_remote_transceiver(&self, kind: MediaKind) {
        let sender = SimSender::new(None, self.events.clone());
        self.transceivers.lock().push(Arc::new(SimTransceiver {
            sender,
            receiver_kind: Some(kind),
        }));
    }

    /// Make subsequent `add_track` calls fail.
    pub fn reject_add_track(&self, reject: bool) {
        self.reject_add.store(reject, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().clone()
    }

    /// Ids of the tracks currently being sent, in sender order.
    pub fn sent_track_ids(&self) -> Vec<String> {
        self.senders()
            .iter()
            .filter_map(|s| s.track().map(|t| t.id().to_string()))
            .collect()
    }

    pub fn transceiver_count(&self) -> usize {
        self.transceivers.lock().len()
    }
}

#[async_trait]
impl PeerConnection for SimulatedPeerConnection {
    fn transceivers(&self) -> Vec<Arc<dyn RtpTransceiver>> {
        self.transceivers
            .lock()
            .iter()
            .map(|t| t.clone() as Arc<dyn RtpTransceiver>)
            .collect()
    }

    fn senders(&self) -> Vec<Arc<dyn RtpSender>> {
        let mut senders: Vec<Arc<dyn RtpSender>> = self
            .senders
            .lock()
            .iter()
            .map(|s| s.clone() as Arc<dyn RtpSender>)
            .collect();
        for transceiver in self.transceivers.lock().iter() {
            let sender = &transceiver.sender;
            if !self.senders.lock().iter().any(|s| s.id == sender.id) {
                senders.push(sender.clone());
            }
        }
        senders
    }

    async fn add_track(
        &self,
        track: Arc<dyn MediaTrack>,
        stream: &MediaStream,
    ) -> Result<Arc<dyn RtpSender>, CaptureError> {
        if self.reject_add.load(Ordering::SeqCst) {
            return Err(CaptureError::PeerConnection("addTrack rejected".into()));
        }
        log::debug!("addTrack {} to stream {}", track.id(), stream.id());
        self.events.lock().push(ConnectionEvent::AddTrack {
            track_id: track.id().to_string(),
        });

        let sender = SimSender::new(Some(track), self.events.clone());
        self.senders.lock().push(sender.clone());
        if self.mode == NegotiationMode::TransceiverBased {
            self.transceivers.lock().push(Arc::new(SimTransceiver {
                sender: sender.clone(),
                receiver_kind: None,
            }));
        }
        Ok(sender)
    }

    /// A sender owned by a transceiver stays on it with its track cleared;
    /// a plain sender is dropped.
    fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> Result<(), CaptureError> {
        let target = Arc::as_ptr(sender) as *const ();
        let on_transceiver = self
            .transceivers
            .lock()
            .iter()
            .map(|t| t.sender.clone())
            .find(|s| Arc::as_ptr(s) as *const () == target);

        let removed = match on_transceiver {
            Some(sender) => {
                *sender.track.lock() = None;
                sender
            }
            None => {
                let mut senders = self.senders.lock();
                let index = senders
                    .iter()
                    .position(|s| Arc::as_ptr(s) as *const () == target)
                    .ok_or_else(|| CaptureError::PeerConnection("sender does not belong to this connection".into()))?;
                senders.remove(index)
            }
        };
        log::debug!("removeTrack on sender {}", removed.id);
        self.events.lock().push(ConnectionEvent::RemoveTrack {
            sender_id: removed.id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::SimTrack;

    #[tokio::test]
    async fn unified_plan_creates_transceivers() {
        let connection = SimulatedPeerConnection::new(NegotiationMode::TransceiverBased);
        let mic = SimTrack::new(MediaKind::Audio, "mic");
        let sender = connection.add_track(mic, &MediaStream::new()).await.unwrap();

        assert_eq!(connection.transceiver_count(), 1);
        assert!(connection.transceivers()[0].carries(MediaKind::Audio));

        connection.remove_track(&sender).unwrap();
        assert!(connection.sent_track_ids().is_empty());
        assert!(matches!(connection.events()[1], ConnectionEvent::RemoveTrack { .. }));
    }

    #[tokio::test]
    async fn remote_transceiver_carries_receiver_kind() {
        let connection = SimulatedPeerConnection::new(NegotiationMode::TransceiverBased);
        connection.add_remote_transceiver(MediaKind::Video);

        let transceivers = connection.transceivers();
        assert!(transceivers[0].carries(MediaKind::Video));
        assert!(!transceivers[0].carries(MediaKind::Audio));
        assert_eq!(connection.senders().len(), 1);
    }

    #[tokio::test]
    async fn remote_transceiver_sender_can_be_cleared() {
        let connection = SimulatedPeerConnection::new(NegotiationMode::TransceiverBased);
        connection.add_remote_transceiver(MediaKind::Video);
        let sender = connection.senders()[0].clone();
        let cam = SimTrack::new(MediaKind::Video, "cam");
        sender.replace_track(Some(cam.clone() as Arc<dyn MediaTrack>)).await.unwrap();
        assert_eq!(connection.sent_track_ids(), vec![cam.id().to_string()]);

        connection.remove_track(&sender).unwrap();
        assert!(connection.sent_track_ids().is_empty());
        assert!(sender.track().is_none());
        assert_eq!(connection.transceiver_count(), 1);
        assert!(matches!(connection.events()[1], ConnectionEvent::RemoveTrack { .. }));
    }

    #[tokio::test]
    async fn foreign_sender_is_rejected() {
        let connection = SimulatedPeerConnection::new(NegotiationMode::TrackBased);
        let other = SimulatedPeerConnection::new(NegotiationMode::TrackBased);
        let cam = SimTrack::new(MediaKind::Video, "cam");
        let sender = other.add_track(cam, &MediaStream::new()).await.unwrap();
        assert!(connection.remove_track(&sender).is_err());
    }
}
