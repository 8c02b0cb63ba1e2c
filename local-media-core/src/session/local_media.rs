use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::executor::{execute_plan, CaptureOutcome};
use crate::capture::prober::{list_devices, probe, DeviceAvailability};
use crate::capture::selector::build_capture_plan;
use crate::models::config::NegotiationConfig;
use crate::models::constraints::MediaStreamConstraints;
use crate::models::error::CaptureError;
use crate::models::media::{DeviceInfo, MediaKind, NegotiationMode};
use crate::models::platform::PlatformCapabilities;
use crate::models::request::MediaRequest;
use crate::models::state::LocalMediaState;
use crate::models::stream::MediaStream;
use crate::traits::delegate::LocalMediaDelegate;
use crate::traits::extension_channel::ExtensionChannel;
use crate::traits::media_devices::MediaDevices;
use crate::traits::peer_connection::PeerConnection;

use super::reconciler::{reconcile, SessionState};

/// Last reconciled stream, readable without waiting on an in-flight request.
#[derive(Default)]
struct Published {
    stream: Option<MediaStream>,
    external: bool,
}

/// Local media orchestrator for one peer connection.
///
/// Generic over the platform capture backend via `MediaDevices`. Each
/// `prepare` runs the whole pipeline:
/// ```text
/// [MediaRequest] → intents → [probe devices] → [CapturePlan] → [capture]
///                                                                   │
///             [on_local_stream] ◄── [reconcile into SessionState] ◄─┘
/// ```
/// Only one request runs at a time; a second one fails with `SessionBusy`.
pub struct LocalMediaSession<D: MediaDevices> {
    devices: D,
    platform: PlatformCapabilities,
    config: NegotiationConfig,
    extension: Option<Arc<dyn ExtensionChannel>>,
    session: tokio::sync::Mutex<SessionState>,
    published: Mutex<Published>,
    lifecycle: Mutex<LocalMediaState>,
    delegate: Mutex<Option<Arc<dyn LocalMediaDelegate>>>,
    closed: AtomicBool,
}

impl<D: MediaDevices> LocalMediaSession<D> {
    pub fn new(
        devices: D,
        connection: Arc<dyn PeerConnection>,
        platform: PlatformCapabilities,
        config: NegotiationConfig,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidRequest)?;
        let mode = platform.negotiation_mode();
        log::debug!("New local media session ({:?}, {:?} {})", mode, platform.browser, platform.version);
        Ok(Self {
            devices,
            platform,
            config,
            extension: None,
            session: tokio::sync::Mutex::new(SessionState::new(connection, mode)),
            published: Mutex::new(Published::default()),
            lifecycle: Mutex::new(LocalMediaState::Idle),
            delegate: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Channel to the screen-share helper, needed for the extension tier.
    pub fn with_extension(mut self, channel: Arc<dyn ExtensionChannel>) -> Self {
        self.extension = Some(channel);
        self
    }

    pub fn set_delegate(&self, delegate: Arc<dyn LocalMediaDelegate>) {
        *self.delegate.lock() = Some(delegate);
    }

    pub fn state(&self) -> LocalMediaState {
        self.lifecycle.lock().clone()
    }

    pub fn local_stream(&self) -> Option<MediaStream> {
        self.published.lock().stream.clone()
    }

    pub fn is_external(&self) -> bool {
        self.published.lock().external
    }

    pub fn negotiation_mode(&self) -> NegotiationMode {
        self.platform.negotiation_mode()
    }

    pub fn platform(&self) -> &PlatformCapabilities {
        &self.platform
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Capture what `request` asks for and merge it into the local stream.
    pub async fn prepare(&self, request: MediaRequest) -> Result<MediaStream, CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::ConnectionClosed);
        }
        let mut session = self.session.try_lock().map_err(|_| {
            log::warn!("Rejecting local media request, another one is in flight");
            CaptureError::SessionBusy
        })?;

        let result = self.run(&mut session, request).await;

        if self.is_closed() {
            session.release();
            if let Ok(stream) = &result {
                log::info!("Session closed during preparation, releasing stream {}", stream.id());
            }
            return Err(CaptureError::ConnectionClosed);
        }

        match &result {
            Ok(stream) => {
                {
                    let mut published = self.published.lock();
                    published.stream = Some(stream.clone());
                    published.external = session.stream_is_external;
                }
                self.set_state(LocalMediaState::Ready {
                    audio_tracks: stream.audio_tracks().len(),
                    video_tracks: stream.video_tracks().len(),
                });
            }
            Err(e) => {
                log::error!("Local media preparation failed: {}", e);
                self.set_state(LocalMediaState::Failed(e.clone()));
            }
        }
        result
    }

    /// Run `prepare` on the tokio runtime and report the outcome to
    /// `delegate`: exactly one of `on_local_stream` / `on_error` fires.
    pub fn prepare_with_callbacks(
        self: Arc<Self>,
        request: MediaRequest,
        delegate: Arc<dyn LocalMediaDelegate>,
    ) where
        D: 'static,
    {
        tokio::spawn(async move {
            match self.prepare(request).await {
                Ok(stream) => delegate.on_local_stream(&stream),
                Err(e) => delegate.on_error(&e),
            }
        });
    }

    /// Enumerate devices after a priming capture with `priming`.
    pub async fn list_devices(&self, priming: &MediaStreamConstraints) -> Result<Vec<DeviceInfo>, CaptureError> {
        if !self.platform.capture_available {
            log::warn!("Media devices unavailable, nothing to list");
            return Err(CaptureError::CaptureUnavailable);
        }
        list_devices(&self.devices, priming).await
    }

    /// Tear the session down: stop owned tracks, forget the local stream.
    ///
    /// A request still in flight releases whatever it captured and fails
    /// with `ConnectionClosed`.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("Closing local media session");

        let published = std::mem::take(&mut *self.published.lock());
        if let Some(stream) = published.stream {
            if !published.external {
                stream.stop_all_tracks();
            }
        }
        if let Ok(mut session) = self.session.try_lock() {
            session.release();
        }
        self.set_state(LocalMediaState::Closed);
    }

    async fn run(&self, session: &mut SessionState, request: MediaRequest) -> Result<MediaStream, CaptureError> {
        let intents = request.intents(session.local_stream.as_ref(), session.stream_is_external)?;
        log::debug!(
            "Media intents: audio {:?} ({:?}), video {:?} ({:?}), data channel: {}",
            intents.audio,
            request.direction(MediaKind::Audio),
            intents.video,
            request.direction(MediaKind::Video),
            request.data_channel_wanted(&self.platform)
        );

        if let Some(stream) = request.external_stream.clone() {
            log::info!("Using external stream {}", stream.id());
            self.set_state(LocalMediaState::Reconciling);
            return reconcile(session, &intents, Some(stream), true).await;
        }

        if intents.captures_anything() && !self.platform.capture_available {
            log::error!("getUserMedia not available");
            return Err(CaptureError::CaptureUnavailable);
        }

        let native_screen = request.screen_share_requested() && self.platform.display_capture;
        let availability = if native_screen || !intents.captures_anything() {
            DeviceAvailability::assumed(&intents)
        } else {
            self.set_state(LocalMediaState::Probing);
            probe(&self.devices, &request, &intents).await?
        };

        let plan = build_capture_plan(&request, &availability, &self.platform, &self.config)?;
        let outcome = if plan.is_empty() {
            CaptureOutcome::default()
        } else {
            self.set_state(LocalMediaState::Capturing);
            self.consent_dialog(true);
            let outcome = execute_plan(&self.devices, &plan, self.extension.as_deref(), &self.config).await;
            self.consent_dialog(false);
            outcome?
        };

        if self.is_closed() {
            if let Some(stream) = &outcome.stream {
                log::info!("Releasing stream {} captured after close", stream.id());
                stream.stop_all_tracks();
            }
            if let Some(watcher) = &outcome.watcher {
                watcher.cancel();
            }
            return Err(CaptureError::ConnectionClosed);
        }

        self.set_state(LocalMediaState::Reconciling);
        let local = reconcile(session, &intents, outcome.stream, false).await?;
        session.adopt_watcher(outcome.watcher);
        Ok(local)
    }

    fn delegate(&self) -> Option<Arc<dyn LocalMediaDelegate>> {
        self.delegate.lock().clone()
    }

    fn set_state(&self, new_state: LocalMediaState) {
        {
            let mut state = self.lifecycle.lock();
            if state.is_closed() && !new_state.is_closed() {
                return;
            }
            *state = new_state.clone();
        }
        log::debug!("Local media state: {}", new_state.as_str());
        if let Some(delegate) = self.delegate() {
            delegate.on_state_changed(&new_state);
        }
    }

    fn consent_dialog(&self, open: bool) {
        if let Some(delegate) = self.delegate() {
            delegate.on_consent_dialog(open);
        }
    }
}

/// Check the offer/answer intent against the remote description.
///
/// An offer must not carry a remote description; an answer needs a
/// non-empty one.
pub fn validate_offer_intent(offer: bool, remote_sdp: Option<&str>) -> Result<(), CaptureError> {
    match (offer, remote_sdp) {
        (true, Some(_)) => Err(CaptureError::InvalidRequest(
            "provided a remote description when asking for an offer".into(),
        )),
        (false, None) => Err(CaptureError::InvalidRequest(
            "a remote description is needed to create an answer".into(),
        )),
        (false, Some(sdp)) if sdp.trim().is_empty() => Err(CaptureError::InvalidRequest(
            "the remote description is empty".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_must_not_carry_description() {
        assert!(validate_offer_intent(true, None).is_ok());
        assert!(matches!(
            validate_offer_intent(true, Some("v=0")),
            Err(CaptureError::InvalidRequest(_))
        ));
    }

    #[test]
    fn answer_needs_description() {
        assert!(validate_offer_intent(false, Some("v=0\r\n")).is_ok());
        assert!(validate_offer_intent(false, None).is_err());
        assert!(validate_offer_intent(false, Some("  ")).is_err());
    }
}
