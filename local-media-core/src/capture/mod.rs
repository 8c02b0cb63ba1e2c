pub mod end_watcher;
pub mod executor;
pub mod extension;
pub mod prober;
pub mod selector;
