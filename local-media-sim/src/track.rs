use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use local_media_core::models::media::MediaKind;
use local_media_core::traits::media_track::{MediaTrack, StreamClock};

/// In-memory track. Stopping it flips a flag the tests can observe.
#[derive(Debug)]
pub struct SimTrack {
    id: String,
    kind: MediaKind,
    label: String,
    stopped: AtomicBool,
}

impl SimTrack {
    pub fn new(kind: MediaKind, label: &str) -> Arc<Self> {
        Self::with_id(&uuid::Uuid::new_v4().to_string(), kind, label)
    }

    pub fn with_id(id: &str, kind: MediaKind, label: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            kind,
            label: label.into(),
            stopped: AtomicBool::new(false),
        })
    }
}

impl MediaTrack for SimTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            log::debug!("Released {} device behind track {}", self.kind, self.id);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Stream clock driven by hand. A screen share "ends" when tests stop
/// advancing it.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn advance(&self, seconds: f64) {
        *self.seconds.lock() += seconds;
    }
}

impl StreamClock for ManualClock {
    fn current_time(&self) -> f64 {
        *self.seconds.lock()
    }
}
