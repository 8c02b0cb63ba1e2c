pub mod local_media;
pub mod reconciler;
