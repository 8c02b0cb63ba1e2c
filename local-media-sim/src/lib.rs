//! # local-media-sim
//!
//! In-memory platform backend for local-media.
//!
//! Provides:
//! - `SimulatedDevices` — device inventory plus camera, microphone and screen capture
//! - `SimulatedPeerConnection` — senders, transceivers and an event log
//! - `SimulatedExtension` — scripted screen-share helper
//! - `permissions` — per-source consent answers
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use local_media_core::{LocalMediaSession, MediaRequest, NegotiationConfig, NegotiationMode, PlatformCapabilities};
//! use local_media_sim::{SimulatedDevices, SimulatedPeerConnection};
//!
//! let devices = Arc::new(SimulatedDevices::laptop());
//! let connection = SimulatedPeerConnection::new(NegotiationMode::TransceiverBased);
//! let platform = PlatformCapabilities::default();
//! let session = LocalMediaSession::new(devices, connection, platform, NegotiationConfig::default())?;
//! let stream = session.prepare(MediaRequest::default()).await?;
//! ```

pub mod devices;
pub mod extension;
pub mod peer_connection;
pub mod permissions;
pub mod track;

pub use devices::SimulatedDevices;
pub use extension::{ExtensionBehavior, SimulatedExtension};
pub use peer_connection::{ConnectionEvent, SimulatedPeerConnection};
pub use permissions::{Permission, PermissionPolicy};
pub use track::{ManualClock, SimTrack};
