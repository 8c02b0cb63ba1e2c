use std::sync::Arc;

use crate::capture::end_watcher::EndWatcher;
use crate::models::error::CaptureError;
use crate::models::media::{MediaKind, NegotiationMode};
use crate::models::request::{MediaIntent, MediaIntents};
use crate::models::stream::MediaStream;
use crate::traits::media_track::MediaTrack;
use crate::traits::peer_connection::PeerConnection;

/// Per-connection record the reconciler reads and mutates.
pub struct SessionState {
    pub local_stream: Option<MediaStream>,
    /// The local stream was handed in by the caller; its tracks are never
    /// stopped by the session.
    pub stream_is_external: bool,
    pub negotiation_mode: NegotiationMode,
    pub connection: Arc<dyn PeerConnection>,
    watcher: Option<EndWatcher>,
}

impl SessionState {
    pub fn new(connection: Arc<dyn PeerConnection>, negotiation_mode: NegotiationMode) -> Self {
        Self {
            local_stream: None,
            stream_is_external: false,
            negotiation_mode,
            connection,
            watcher: None,
        }
    }

    /// Keep `watcher` if it watches the current local stream, cancel it
    /// otherwise. A previous watcher on a replaced stream is cancelled.
    pub fn adopt_watcher(&mut self, watcher: Option<EndWatcher>) {
        let Some(watcher) = watcher else {
            return;
        };
        let watches_local = self
            .local_stream
            .as_ref()
            .map(|s| s.id() == watcher.stream_id())
            .unwrap_or(false);
        if watches_local {
            if let Some(previous) = self.watcher.replace(watcher) {
                previous.cancel();
            }
        } else {
            watcher.cancel();
        }
    }

    /// Stop every owned track and forget the local stream.
    pub fn release(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.cancel();
        }
        if let Some(stream) = self.local_stream.take() {
            if self.stream_is_external {
                log::debug!("Leaving external stream {} running", stream.id());
            } else {
                stream.stop_all_tracks();
            }
        }
        self.stream_is_external = false;
    }
}

/// Merge a capture result into `state` and return the local stream.
///
/// A new session (no renegotiation, no current stream, or an external
/// current stream) adopts `captured` wholesale. Otherwise each medium is
/// updated in place, attaching the new track before the old one is dropped,
/// so a failed addition leaves that medium as it was.
pub async fn reconcile(
    state: &mut SessionState,
    intents: &MediaIntents,
    captured: Option<MediaStream>,
    external: bool,
) -> Result<MediaStream, CaptureError> {
    let current = match &state.local_stream {
        Some(current) if intents.renegotiating && !state.stream_is_external => current.clone(),
        _ => return Ok(adopt_stream(state, captured, external)),
    };

    let mut result = Ok(());
    for kind in [MediaKind::Audio, MediaKind::Video] {
        result = update_medium(state, &current, intents.get(kind), kind, captured.as_ref()).await;
        if result.is_err() {
            break;
        }
    }

    if let Some(captured) = &captured {
        release_unattached(captured, &current);
    }
    result.map(|()| current)
}

fn adopt_stream(state: &mut SessionState, captured: Option<MediaStream>, external: bool) -> MediaStream {
    let stream = captured.unwrap_or_default();
    if !external {
        trim_duplicates(&stream);
    }

    if let Some(old) = state.local_stream.take() {
        if !state.stream_is_external && !old.same_stream(&stream) {
            let kept = stream.tracks();
            for track in old.tracks() {
                if !kept.iter().any(|t| t.id() == track.id()) {
                    track.stop();
                }
            }
        }
    }

    log::info!("Adding local stream {}", stream.id());
    for track in stream.tracks() {
        log::info!("Adding local {} track {}", track.kind(), track.id());
    }

    state.local_stream = Some(stream.clone());
    state.stream_is_external = external;
    stream
}

/// Keep the first track of each kind, stop the rest.
fn trim_duplicates(stream: &MediaStream) {
    for kind in [MediaKind::Audio, MediaKind::Video] {
        for extra in stream.tracks_of(kind).into_iter().skip(1) {
            log::warn!("Dropping extra {} track {}", kind, extra.id());
            stream.remove_track(extra.id());
            extra.stop();
        }
    }
}

async fn update_medium(
    state: &SessionState,
    current: &MediaStream,
    intent: MediaIntent,
    kind: MediaKind,
    captured: Option<&MediaStream>,
) -> Result<(), CaptureError> {
    match intent {
        MediaIntent::Add | MediaIntent::Replace => {
            let old = if intent == MediaIntent::Replace {
                current.first_track(kind)
            } else {
                None
            };
            let Some(track) = captured.and_then(|s| s.first_track(kind)) else {
                match old {
                    Some(old) => log::warn!("No new {} track captured, keeping {}", kind, old.id()),
                    None => log::warn!("No {} track captured, nothing to add", kind),
                }
                return Ok(());
            };

            let reused_transceiver = attach_track(state, current, &track, old.is_some()).await?;
            if let Some(old) = old {
                // the new track is already on the stream, so the old one has to go
                if !reused_transceiver {
                    if let Err(e) = remove_sender_of(state, &old) {
                        log::warn!("Could not remove sender of {} track {}: {}", kind, old.id(), e);
                    }
                }
                drop_track(current, &old);
            }
            Ok(())
        }
        MediaIntent::Remove => match current.first_track(kind) {
            Some(old) => detach_track(state, current, &old),
            None => {
                log::debug!("No {} track to remove", kind);
                Ok(())
            }
        },
        MediaIntent::Skip | MediaIntent::Keep | MediaIntent::Capture => Ok(()),
    }
}

/// Bind `track` to the connection and the local stream. Returns whether an
/// existing transceiver's sender was reused.
async fn attach_track(
    state: &SessionState,
    current: &MediaStream,
    track: &Arc<dyn MediaTrack>,
    replacing: bool,
) -> Result<bool, CaptureError> {
    let kind = track.kind();
    let verb = if replacing { "Replacing" } else { "Adding" };

    let mut reused = false;
    if state.negotiation_mode == NegotiationMode::TransceiverBased {
        let sender = state
            .connection
            .transceivers()
            .into_iter()
            .find(|t| t.carries(kind))
            .and_then(|t| t.sender());
        if let Some(sender) = sender {
            log::info!("{} {} track {} on existing transceiver", verb, kind, track.id());
            sender.replace_track(Some(track.clone())).await?;
            reused = true;
        }
    }
    if !reused {
        log::info!("{} {} track {}", verb, kind, track.id());
        state.connection.add_track(track.clone(), current).await?;
    }

    current.add_track(track.clone());
    Ok(reused)
}

/// Remove the sender carrying exactly `old`, then detach and stop it.
///
/// If the connection refuses, the track stays on the stream untouched.
fn detach_track(state: &SessionState, current: &MediaStream, old: &Arc<dyn MediaTrack>) -> Result<(), CaptureError> {
    remove_sender_of(state, old)?;
    drop_track(current, old);
    Ok(())
}

fn remove_sender_of(state: &SessionState, track: &Arc<dyn MediaTrack>) -> Result<(), CaptureError> {
    let sender = state
        .connection
        .senders()
        .into_iter()
        .find(|s| s.track().map(|t| t.id() == track.id()).unwrap_or(false));
    match sender {
        Some(sender) => state.connection.remove_track(&sender),
        None => Ok(()),
    }
}

fn drop_track(current: &MediaStream, old: &Arc<dyn MediaTrack>) {
    log::info!("Removing {} track {}", old.kind(), old.id());
    current.remove_track(old.id());
    old.stop();
}

/// Stop captured tracks that did not make it into the local stream.
fn release_unattached(captured: &MediaStream, current: &MediaStream) {
    if captured.same_stream(current) {
        return;
    }
    let attached = current.tracks();
    for track in captured.tracks() {
        if !attached.iter().any(|t| t.id() == track.id()) {
            log::debug!("Releasing unused {} track {}", track.kind(), track.id());
            track.stop();
        }
    }
}
