use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::error::CaptureError;

/// Messages exchanged with the out-of-process screen-share helper.
///
/// Wire format is JSON with a `type` tag:
/// ```text
/// → {"type":"request-screen","id":"…"}
/// ← {"type":"screen-granted","id":"…","sourceId":"…"}
/// ← {"type":"screen-cancelled","id":"…"}
/// ```
/// Helpers that do not echo `id` are accepted; their answer applies to
/// whichever request is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExtensionMessage {
    RequestScreen {
        #[serde(default)]
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    ScreenGranted {
        #[serde(default)]
        id: String,
        source_id: String,
    },
    ScreenCancelled {
        #[serde(default)]
        id: String,
    },
}

impl ExtensionMessage {
    pub fn id(&self) -> &str {
        match self {
            Self::RequestScreen { id } | Self::ScreenGranted { id, .. } | Self::ScreenCancelled { id } => id,
        }
    }

    /// Whether this message answers the request with `request_id`.
    pub fn answers(&self, request_id: &str) -> bool {
        let id = self.id();
        id.is_empty() || id == request_id
    }

    pub fn to_json(&self) -> Result<String, CaptureError> {
        serde_json::to_string(self)
            .map_err(|e| CaptureError::ExtensionProtocol(format!("failed to encode message: {}", e)))
    }

    pub fn from_json(raw: &str) -> Result<Self, CaptureError> {
        serde_json::from_str(raw)
            .map_err(|e| CaptureError::ExtensionProtocol(format!("failed to decode message: {}", e)))
    }
}

/// Message channel to the screen-share helper.
///
/// The channel carries other traffic too; the handshake skips anything it
/// cannot decode or that answers a different request.
#[async_trait]
pub trait ExtensionChannel: Send + Sync {
    async fn post(&self, message: String) -> Result<(), CaptureError>;

    /// Next message from the helper, `None` once the channel is closed.
    async fn recv(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_kebab_case_tag() {
        let json = ExtensionMessage::RequestScreen { id: "42".into() }.to_json().unwrap();
        assert_eq!(json, r#"{"type":"request-screen","id":"42"}"#);
    }

    #[test]
    fn granted_reads_camel_case_source_id() {
        let msg = ExtensionMessage::from_json(r#"{"type":"screen-granted","id":"7","sourceId":"screen:0"}"#)
            .unwrap();
        assert_eq!(
            msg,
            ExtensionMessage::ScreenGranted {
                id: "7".into(),
                source_id: "screen:0".into()
            }
        );
        assert!(msg.answers("7"));
        assert!(!msg.answers("8"));
    }

    #[test]
    fn missing_id_answers_any_request() {
        let msg = ExtensionMessage::from_json(r#"{"type":"screen-cancelled"}"#).unwrap();
        assert!(msg.answers("whatever"));
    }

    #[test]
    fn unknown_type_is_protocol_error() {
        let err = ExtensionMessage::from_json(r#"{"type":"hello"}"#).unwrap_err();
        assert!(matches!(err, CaptureError::ExtensionProtocol(_)));
    }
}
