//! # huddle-protocol
//!
//! Wire protocol definitions for the Huddle real-time chat core.
//!
//! This crate defines the JSON frames exchanged between chat clients and the
//! server over a persistent duplex connection.
//!
//! ## Frame types
//!
//! Inbound (client to server):
//!
//! - `dm_send` - direct message to a user
//! - `group_send` - message to a group
//!
//! Outbound (server to client):
//!
//! - `dm_new` / `group_new` - a persisted message being pushed live
//! - `error` - a local error, delivered only to the offending connection
//!
//! ## Example
//!
//! ```rust
//! use huddle_protocol::{codec, ClientFrame};
//!
//! let frame = codec::decode(br#"{"type":"dm_send","to_user_id":2,"text":"hi"}"#).unwrap();
//! assert!(matches!(frame, ClientFrame::DmSend { .. }));
//! ```

pub mod codec;
pub mod frames;

pub use codec::{decode, encode, ProtocolError, MAX_FRAME_SIZE};
pub use frames::{ClientFrame, GroupId, ServerFrame, UserId};
