//! # local-media-core
//!
//! Platform-agnostic local media preparation for real-time peer connections.
//!
//! Decides which audio/video sources to capture for a request, picks a
//! screen-share strategy from the platform's capabilities, and merges the
//! captured tracks into the connection's local stream. Platform backends
//! implement `MediaDevices`, `PeerConnection` and friends and plug into the
//! generic `LocalMediaSession`.
//!
//! ## Architecture
//!
//! ```text
//! local-media-core (this crate)
//! ├── traits/   ← MediaDevices, PeerConnection, MediaTrack, ExtensionChannel, LocalMediaDelegate
//! ├── models/   ← MediaRequest, MediaStream, CaptureError, constraints, NegotiationConfig, state
//! ├── capture/  ← device prober, strategy selector, executor, extension handshake, end watcher
//! └── session/  ← stream reconciler, LocalMediaSession (orchestrator)
//! ```

pub mod capture;
pub mod models;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use capture::end_watcher::EndWatcher;
pub use capture::prober::{list_devices, DeviceAvailability};
pub use capture::selector::{build_capture_plan, select_screen_tier, CapturePlan, ScreenShareTier};
pub use models::config::NegotiationConfig;
pub use models::constraints::{
    AudioCapture, AudioConstraints, DisplayMediaConstraints, MediaStreamConstraints, VideoCapture,
    VideoConstraints, VideoProfile,
};
pub use models::error::CaptureError;
pub use models::media::{DeviceInfo, DeviceKind, MediaDirection, MediaKind, NegotiationMode};
pub use models::platform::{BrowserFamily, HostOs, PlatformCapabilities};
pub use models::request::{MediaIntent, MediaIntents, MediaRequest, ScreenSource};
pub use models::state::LocalMediaState;
pub use models::stream::{MediaStream, WeakMediaStream};
pub use session::local_media::{validate_offer_intent, LocalMediaSession};
pub use session::reconciler::SessionState;
pub use traits::delegate::LocalMediaDelegate;
pub use traits::extension_channel::{ExtensionChannel, ExtensionMessage};
pub use traits::media_devices::MediaDevices;
pub use traits::media_track::{MediaTrack, StreamClock};
pub use traits::peer_connection::{PeerConnection, RtpSender, RtpTransceiver};
