//! Simulated screen-share helper extension.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use local_media_core::models::error::CaptureError;
use local_media_core::traits::extension_channel::{ExtensionChannel, ExtensionMessage};

/// How the helper answers a `request-screen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionBehavior {
    Grant(String),
    Cancel,
    /// Never answers.
    Silent,
}

/// Simulated `ExtensionChannel`.
///
/// Like a page-level message bus, the channel delivers the page's own
/// requests back to it before the helper's answer.
pub struct SimulatedExtension {
    behavior: Mutex<ExtensionBehavior>,
    tx: mpsc::UnboundedSender<String>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    requests: Mutex<Vec<ExtensionMessage>>,
}

impl SimulatedExtension {
    pub fn new(behavior: ExtensionBehavior) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            behavior: Mutex::new(behavior),
            tx,
            rx: tokio::sync::Mutex::new(rx),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn granting(source_id: &str) -> Self {
        Self::new(ExtensionBehavior::Grant(source_id.into()))
    }

    pub fn set_behavior(&self, behavior: ExtensionBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn requests(&self) -> Vec<ExtensionMessage> {
        self.requests.lock().clone()
    }

    /// Inject a raw message, as other page traffic would.
    pub fn inject(&self, raw: &str) {
        let _ = self.tx.send(raw.to_string());
    }
}

#[async_trait]
impl ExtensionChannel for SimulatedExtension {
    async fn post(&self, message: String) -> Result<(), CaptureError> {
        let request = ExtensionMessage::from_json(&message)?;
        let id = request.id().to_string();
        self.requests.lock().push(request);
        // echo of the page's own message
        let _ = self.tx.send(message);

        let behavior = self.behavior.lock().clone();
        let answer = match behavior {
            ExtensionBehavior::Grant(source_id) => ExtensionMessage::ScreenGranted { id, source_id },
            ExtensionBehavior::Cancel => ExtensionMessage::ScreenCancelled { id },
            ExtensionBehavior::Silent => {
                log::debug!("Simulated extension ignoring request {}", id);
                return Ok(());
            }
        };
        let _ = self.tx.send(answer.to_json()?);
        Ok(())
    }

    async fn recv(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }
}
