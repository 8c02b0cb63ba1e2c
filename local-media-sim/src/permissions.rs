//! Simulated capture permissions.
//!
//! Stands in for the platform consent prompt: each source is either
//! granted or denied up front, and a denied source makes the capture call
//! fail the way a browser rejects it.

use local_media_core::models::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    #[default]
    Granted,
    Denied,
}

/// Per-source answers to the consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionPolicy {
    pub microphone: Permission,
    pub camera: Permission,
    pub screen: Permission,
}

impl PermissionPolicy {
    pub fn deny_all() -> Self {
        Self {
            microphone: Permission::Denied,
            camera: Permission::Denied,
            screen: Permission::Denied,
        }
    }

    pub fn check_microphone(&self) -> Result<(), CaptureError> {
        check(self.microphone, "microphone")
    }

    pub fn check_camera(&self) -> Result<(), CaptureError> {
        check(self.camera, "camera")
    }

    pub fn check_screen(&self) -> Result<(), CaptureError> {
        check(self.screen, "screen")
    }
}

fn check(permission: Permission, source: &str) -> Result<(), CaptureError> {
    match permission {
        Permission::Granted => Ok(()),
        Permission::Denied => {
            log::warn!("Simulated user denied {} access", source);
            Err(CaptureError::CaptureDenied(format!(
                "NotAllowedError: permission to use the {} was denied",
                source
            )))
        }
    }
}
