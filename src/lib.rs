pub mod config;
pub mod events;
pub mod icon;
pub mod ipc;
pub mod presence;
pub mod protocol;
pub mod source;
