pub mod delegate;
pub mod extension_channel;
pub mod media_devices;
pub mod media_track;
pub mod peer_connection;
