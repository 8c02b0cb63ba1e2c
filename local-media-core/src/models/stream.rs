use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::media::MediaKind;
use crate::traits::media_track::{MediaTrack, StreamClock};

/// Shared handle to an ordered set of tracks.
///
/// Clones refer to the same stream, so the handle delivered to the caller
/// observes later reconciliation of the session's local stream.
#[derive(Clone)]
pub struct MediaStream {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    id: String,
    tracks: Mutex<Vec<Arc<dyn MediaTrack>>>,
    ended: watch::Sender<bool>,
    clock: Option<Arc<dyn StreamClock>>,
}

/// Non-owning reference used by background watchers.
#[derive(Clone)]
pub struct WeakMediaStream {
    inner: Weak<StreamInner>,
}

impl WeakMediaStream {
    pub fn upgrade(&self) -> Option<MediaStream> {
        self.inner.upgrade().map(|inner| MediaStream { inner })
    }
}

impl MediaStream {
    pub fn new() -> Self {
        Self::build(uuid::Uuid::new_v4().to_string(), Vec::new(), None)
    }

    pub fn with_tracks(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self::build(uuid::Uuid::new_v4().to_string(), tracks, None)
    }

    /// Stream whose playback time can be sampled, e.g. a screen stream on a
    /// platform without a native "ended" event.
    pub fn with_clock(tracks: Vec<Arc<dyn MediaTrack>>, clock: Arc<dyn StreamClock>) -> Self {
        Self::build(uuid::Uuid::new_v4().to_string(), tracks, Some(clock))
    }

    fn build(id: String, tracks: Vec<Arc<dyn MediaTrack>>, clock: Option<Arc<dyn StreamClock>>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            inner: Arc::new(StreamInner {
                id,
                tracks: Mutex::new(tracks),
                ended,
                clock,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.inner.tracks.lock().clone()
    }

    pub fn tracks_of(&self, kind: MediaKind) -> Vec<Arc<dyn MediaTrack>> {
        self.inner
            .tracks
            .lock()
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn audio_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(MediaKind::Audio)
    }

    pub fn video_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(MediaKind::Video)
    }

    pub fn first_track(&self, kind: MediaKind) -> Option<Arc<dyn MediaTrack>> {
        self.inner
            .tracks
            .lock()
            .iter()
            .find(|t| t.kind() == kind)
            .cloned()
    }

    pub fn has_track(&self, kind: MediaKind) -> bool {
        self.inner.tracks.lock().iter().any(|t| t.kind() == kind)
    }

    pub fn track_count(&self) -> usize {
        self.inner.tracks.lock().len()
    }

    /// Attach a track. Returns `false` if a track with the same id is
    /// already attached.
    pub fn add_track(&self, track: Arc<dyn MediaTrack>) -> bool {
        let mut tracks = self.inner.tracks.lock();
        if tracks.iter().any(|t| t.id() == track.id()) {
            return false;
        }
        tracks.push(track);
        true
    }

    /// Detach the track with `track_id`, returning it.
    pub fn remove_track(&self, track_id: &str) -> Option<Arc<dyn MediaTrack>> {
        let mut tracks = self.inner.tracks.lock();
        let index = tracks.iter().position(|t| t.id() == track_id)?;
        Some(tracks.remove(index))
    }

    /// Stop every track, releasing the underlying devices.
    pub fn stop_all_tracks(&self) {
        for track in self.tracks() {
            log::debug!("Stopping {} track {}", track.kind(), track.id());
            track.stop();
        }
    }

    pub fn mark_ended(&self) {
        self.inner.ended.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.inner.ended.borrow()
    }

    /// Receiver flipping to `true` once the stream has ended.
    pub fn subscribe_ended(&self) -> watch::Receiver<bool> {
        self.inner.ended.subscribe()
    }

    /// Current stream time in seconds, when the platform exposes it.
    pub fn current_time(&self) -> Option<f64> {
        self.inner.clock.as_ref().map(|c| c.current_time())
    }

    pub fn has_clock(&self) -> bool {
        self.inner.clock.is_some()
    }

    pub fn downgrade(&self) -> WeakMediaStream {
        WeakMediaStream {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles refer to the same stream.
    pub fn same_stream(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracks: Vec<String> = self
            .tracks()
            .iter()
            .map(|t| format!("{}:{}", t.kind(), t.id()))
            .collect();
        f.debug_struct("MediaStream")
            .field("id", &self.inner.id)
            .field("tracks", &tracks)
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct TestTrack {
        id: String,
        kind: MediaKind,
        stopped: AtomicBool,
    }

    impl TestTrack {
        fn new(id: &str, kind: MediaKind) -> Arc<Self> {
            Arc::new(Self {
                id: id.into(),
                kind,
                stopped: AtomicBool::new(false),
            })
        }
    }

    impl MediaTrack for TestTrack {
        fn id(&self) -> &str {
            &self.id
        }
        fn kind(&self) -> MediaKind {
            self.kind
        }
        fn label(&self) -> &str {
            "test"
        }
        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
        fn is_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn add_and_remove_tracks() {
        let stream = MediaStream::new();
        let mic = TestTrack::new("mic", MediaKind::Audio);

        assert!(stream.add_track(mic.clone()));
        assert!(!stream.add_track(mic.clone()));
        assert!(stream.has_track(MediaKind::Audio));
        assert!(!stream.has_track(MediaKind::Video));

        let removed = stream.remove_track("mic").unwrap();
        assert_eq!(removed.id(), "mic");
        assert_eq!(stream.track_count(), 0);
        assert!(stream.remove_track("mic").is_none());
    }

    #[test]
    fn clones_share_track_set() {
        let stream = MediaStream::new();
        let handle = stream.clone();
        stream.add_track(TestTrack::new("cam", MediaKind::Video));

        assert_eq!(handle.video_tracks().len(), 1);
        assert!(handle.same_stream(&stream));
        assert!(!handle.same_stream(&MediaStream::new()));
    }

    #[test]
    fn stop_all_tracks_stops_each_track() {
        let mic = TestTrack::new("mic", MediaKind::Audio);
        let cam = TestTrack::new("cam", MediaKind::Video);
        let stream = MediaStream::with_tracks(vec![mic.clone() as Arc<dyn MediaTrack>, cam.clone()]);

        stream.stop_all_tracks();
        assert!(mic.is_stopped());
        assert!(cam.is_stopped());
    }

    #[test]
    fn ended_signal_reaches_subscribers() {
        let stream = MediaStream::new();
        let rx = stream.subscribe_ended();
        assert!(!stream.is_ended());

        stream.mark_ended();
        assert!(stream.is_ended());
        assert!(*rx.borrow());
    }

    #[test]
    fn weak_handle_dies_with_stream() {
        let stream = MediaStream::new();
        let weak = stream.downgrade();
        assert!(weak.upgrade().is_some());
        drop(stream);
        assert!(weak.upgrade().is_none());
    }
}
