//! End-of-stream detection for screen streams that never fire "ended".
//!
//! Some capture paths give no event when the user stops sharing. The
//! watcher samples the stream clock and treats a clock that stopped
//! advancing between two samples as the end of the stream.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::models::stream::MediaStream;

/// Handle to a running watcher. Dropping it leaves the task running until
/// the stream ends or is dropped; call `cancel` to stop it early.
#[derive(Debug)]
pub struct EndWatcher {
    stream_id: String,
    handle: JoinHandle<()>,
}

impl EndWatcher {
    /// Start watching `stream`. Returns `None` when the stream has no clock
    /// to sample.
    pub fn spawn(stream: &MediaStream, interval: Duration) -> Option<Self> {
        if !stream.has_clock() {
            log::warn!("Stream {} exposes no clock, its end will go unnoticed", stream.id());
            return None;
        }

        let weak = stream.downgrade();
        let mut last = stream.current_time();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(stream) = weak.upgrade() else {
                    break;
                };
                if stream.is_ended() {
                    break;
                }
                let now = stream.current_time();
                if now == last {
                    log::info!("Stream {} clock stopped at {:?}, marking ended", stream.id(), now);
                    stream.mark_ended();
                    break;
                }
                last = now;
            }
        });

        log::debug!("Watching stream {} every {:?}", stream.id(), interval);
        Some(Self {
            stream_id: stream.id().to_string(),
            handle,
        })
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::traits::media_track::StreamClock;

    #[derive(Default)]
    struct FakeClock(Mutex<f64>);

    impl FakeClock {
        fn advance(&self, secs: f64) {
            *self.0.lock() += secs;
        }
    }

    impl StreamClock for FakeClock {
        fn current_time(&self) -> f64 {
            *self.0.lock()
        }
    }

    const POLL: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn stalled_clock_marks_stream_ended() {
        let clock = Arc::new(FakeClock::default());
        let stream = MediaStream::with_clock(Vec::new(), clock.clone());
        let watcher = EndWatcher::spawn(&stream, POLL).unwrap();

        // stay half a period out of phase with the watcher's samples
        tokio::time::sleep(POLL / 2).await;
        for _ in 0..3 {
            clock.advance(0.5);
            tokio::time::sleep(POLL).await;
            assert!(!stream.is_ended());
        }

        tokio::time::sleep(POLL * 2).await;
        assert!(stream.is_ended());
        tokio::task::yield_now().await;
        assert!(watcher.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_watcher_never_fires() {
        let clock = Arc::new(FakeClock::default());
        let stream = MediaStream::with_clock(Vec::new(), clock);
        let watcher = EndWatcher::spawn(&stream, POLL).unwrap();
        watcher.cancel();

        tokio::time::sleep(POLL * 4).await;
        assert!(!stream.is_ended());
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_exits_when_stream_dropped() {
        let clock = Arc::new(FakeClock::default());
        let stream = MediaStream::with_clock(Vec::new(), clock.clone());
        let watcher = EndWatcher::spawn(&stream, POLL).unwrap();
        drop(stream);

        clock.advance(1.0);
        tokio::time::sleep(POLL * 2).await;
        tokio::task::yield_now().await;
        assert!(watcher.is_finished());
    }

    #[tokio::test]
    async fn clockless_stream_is_not_watched() {
        assert!(EndWatcher::spawn(&MediaStream::new(), POLL).is_none());
    }
}
