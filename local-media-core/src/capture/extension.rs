//! Screen-source handshake with the helper extension.

use std::time::Duration;

use crate::models::error::CaptureError;
use crate::traits::extension_channel::{ExtensionChannel, ExtensionMessage};

/// Ask the helper for a screen source id.
///
/// Fails with `ScreenShareTimeout` if no answer arrives within `timeout`,
/// and with `ScreenShareCancelled` if the user dismissed the picker (an
/// empty source id counts as dismissal).
pub async fn request_screen_source<C>(channel: &C, timeout: Duration) -> Result<String, CaptureError>
where
    C: ExtensionChannel + ?Sized,
{
    let request_id = uuid::Uuid::new_v4().to_string();
    let request = ExtensionMessage::RequestScreen {
        id: request_id.clone(),
    };
    channel.post(request.to_json()?).await?;
    log::debug!("Requested screen source {} from extension", request_id);

    match tokio::time::timeout(timeout, await_answer(channel, &request_id)).await {
        Ok(answer) => answer,
        Err(_) => {
            log::warn!("Screen-share extension did not answer request {} in {:?}", request_id, timeout);
            Err(CaptureError::ScreenShareTimeout(timeout))
        }
    }
}

async fn await_answer<C>(channel: &C, request_id: &str) -> Result<String, CaptureError>
where
    C: ExtensionChannel + ?Sized,
{
    while let Some(raw) = channel.recv().await {
        let message = match ExtensionMessage::from_json(&raw) {
            Ok(message) => message,
            Err(e) => {
                log::debug!("Ignoring extension channel message: {}", e);
                continue;
            }
        };
        if !message.answers(request_id) {
            continue;
        }
        match message {
            ExtensionMessage::ScreenGranted { source_id, .. } if !source_id.is_empty() => {
                log::info!("Extension granted screen source {}", source_id);
                return Ok(source_id);
            }
            ExtensionMessage::ScreenGranted { .. } | ExtensionMessage::ScreenCancelled { .. } => {
                return Err(CaptureError::ScreenShareCancelled);
            }
            // our own request echoed back on a shared channel
            ExtensionMessage::RequestScreen { .. } => continue,
        }
    }
    Err(CaptureError::ExtensionProtocol("extension channel closed".into()))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::*;

    /// Channel that answers every request with a scripted reply.
    struct ScriptedChannel {
        reply: Option<fn(&str) -> Vec<String>>,
        tx: mpsc::UnboundedSender<String>,
        rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
        posted: Mutex<Vec<String>>,
    }

    impl ScriptedChannel {
        fn new(reply: Option<fn(&str) -> Vec<String>>) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                reply,
                tx,
                rx: tokio::sync::Mutex::new(rx),
                posted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExtensionChannel for ScriptedChannel {
        async fn post(&self, message: String) -> Result<(), CaptureError> {
            let id = ExtensionMessage::from_json(&message)?.id().to_string();
            self.posted.lock().push(message);
            if let Some(reply) = self.reply {
                for answer in reply(&id) {
                    let _ = self.tx.send(answer);
                }
            }
            Ok(())
        }

        async fn recv(&self) -> Option<String> {
            self.rx.lock().await.recv().await
        }
    }

    #[tokio::test]
    async fn granted_source_is_returned() {
        let channel = ScriptedChannel::new(Some(|id| {
            vec![
                "not json".to_string(),
                r#"{"type":"screen-granted","id":"other","sourceId":"wrong"}"#.to_string(),
                format!(r#"{{"type":"screen-granted","id":"{}","sourceId":"screen:1"}}"#, id),
            ]
        }));
        let source = request_screen_source(&channel, Duration::from_secs(1)).await.unwrap();
        assert_eq!(source, "screen:1");
        assert!(channel.posted.lock()[0].contains("request-screen"));
    }

    #[tokio::test]
    async fn cancelled_request() {
        let channel = ScriptedChannel::new(Some(|id| {
            vec![format!(r#"{{"type":"screen-cancelled","id":"{}"}}"#, id)]
        }));
        let err = request_screen_source(&channel, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, CaptureError::ScreenShareCancelled);
    }

    #[tokio::test]
    async fn empty_source_id_counts_as_cancel() {
        let channel = ScriptedChannel::new(Some(|_| {
            vec![r#"{"type":"screen-granted","sourceId":""}"#.to_string()]
        }));
        let err = request_screen_source(&channel, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, CaptureError::ScreenShareCancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_extension_times_out() {
        let channel = ScriptedChannel::new(None);
        let timeout = Duration::from_millis(1000);
        let err = request_screen_source(&channel, timeout).await.unwrap_err();
        assert_eq!(err, CaptureError::ScreenShareTimeout(timeout));
        assert!(err.is_retryable());
    }
}
