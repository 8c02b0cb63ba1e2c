use crate::models::error::CaptureError;
use crate::models::state::LocalMediaState;
use crate::models::stream::MediaStream;

/// Event delegate for local media preparation.
///
/// Methods are called from the task running the preparation, not from a UI
/// thread. For each request exactly one of `on_local_stream` / `on_error`
/// fires.
pub trait LocalMediaDelegate: Send + Sync {
    /// The finalized local stream, after reconciliation.
    fn on_local_stream(&self, stream: &MediaStream);

    /// Preparation failed; session state is left as it was where possible.
    fn on_error(&self, error: &CaptureError);

    /// The session moved to a new lifecycle state.
    fn on_state_changed(&self, _state: &LocalMediaState) {}

    /// A platform permission prompt is about to open (`true`) or has
    /// resolved (`false`).
    fn on_consent_dialog(&self, _open: bool) {}
}
