pub mod config;
pub mod constraints;
pub mod error;
pub mod media;
pub mod platform;
pub mod request;
pub mod state;
pub mod stream;
