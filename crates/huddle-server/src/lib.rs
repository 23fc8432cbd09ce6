//! # huddle-server
//!
//! Real-time chat server for the Huddle social platform.
//!
//! Exposes a single WebSocket endpoint over which authenticated users send
//! direct and group chat messages. The heavy lifting lives in
//! [`huddle-core`](huddle_core); this crate supplies configuration, the HTTP
//! surface, per-connection task plumbing, and metrics.

pub mod config;
pub mod connection;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{app, run_server, AppState};
