use crate::models::media::MediaKind;

/// A single captured audio or video track.
///
/// Implemented by platform backends. `stop` must release the underlying
/// device synchronously; the reconciler relies on that when it drops a track.
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> MediaKind;

    /// Human-readable source name (device label, "screen", ...).
    fn label(&self) -> &str;

    fn stop(&self);

    fn is_stopped(&self) -> bool;
}

/// Monotonic playback clock of a stream, in seconds.
///
/// Only platforms lacking a native "capture ended" event need to provide
/// one; the end-of-stream watcher samples it.
pub trait StreamClock: Send + Sync {
    fn current_time(&self) -> f64;
}
