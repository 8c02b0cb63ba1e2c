use super::error::CaptureError;

/// Local media lifecycle of one peer connection.
///
/// State transitions:
/// ```text
/// idle → probing → capturing → reconciling → ready
///   ↑       ↓          ↓            ↓          │
///   └──── failed ◄─────┴────────────┘          │
///   ready ──(next request)──► probing …  ◄─────┘
///   any ──close()──► closed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum LocalMediaState {
    Idle,
    Probing,
    Capturing,
    Reconciling,
    Ready { audio_tracks: usize, video_tracks: usize },
    Failed(CaptureError),
    Closed,
}

impl LocalMediaState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// An operation is running against the session.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Probing | Self::Capturing | Self::Reconciling)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Capturing => "capturing",
            Self::Reconciling => "reconciling",
            Self::Ready { .. } => "ready",
            Self::Failed(_) => "failed",
            Self::Closed => "closed",
        }
    }
}
