use async_trait::async_trait;

use crate::models::constraints::{DisplayMediaConstraints, MediaStreamConstraints};
use crate::models::error::CaptureError;
use crate::models::media::DeviceInfo;
use crate::models::stream::MediaStream;

/// Platform device inventory and capture calls.
///
/// Every call may suspend (permission prompts, device warm-up). Rejections
/// of a capture call are reported as `CaptureError::CaptureDenied`.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List input and output devices.
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;

    /// Capture from camera and/or microphone.
    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CaptureError>;

    /// Capture a screen or window through the native display API.
    ///
    /// Only called when `PlatformCapabilities::display_capture` is set.
    async fn get_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, CaptureError>;
}

#[async_trait]
impl<T: MediaDevices + ?Sized> MediaDevices for std::sync::Arc<T> {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        (**self).enumerate_devices().await
    }

    async fn get_user_media(
        &self,
        constraints: &MediaStreamConstraints,
    ) -> Result<MediaStream, CaptureError> {
        (**self).get_user_media(constraints).await
    }

    async fn get_display_media(
        &self,
        constraints: &DisplayMediaConstraints,
    ) -> Result<MediaStream, CaptureError> {
        (**self).get_display_media(constraints).await
    }
}
