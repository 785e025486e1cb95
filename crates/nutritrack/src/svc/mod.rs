//! Services layer for the app. Uses nutritrack_core sessions to provide services for the cli.
pub mod chat;
