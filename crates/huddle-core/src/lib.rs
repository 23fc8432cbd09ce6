//! # huddle-core
//!
//! Connection hub and message routing for the Huddle real-time chat core.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Hub** - Registry of open connections per user, with fan-out delivery
//! - **ChatRouter** - Validation, authorization, persistence, and dispatch
//! - **RelationshipOracle** / **MessageStore** - Collaborator traits at the
//!   boundary to the rest of the platform
//! - **MemoryDirectory** / **MemoryStore** - In-memory collaborators for
//!   development and tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│ ChatRouter  │────▶│     Hub     │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                        │        │
//!                        ▼        ▼
//!                 ┌──────────┐ ┌──────────────┐
//!                 │  Store   │ │    Oracle    │
//!                 └──────────┘ └──────────────┘
//! ```
//!
//! The hub is the only state shared across connections. It is created once
//! at server startup and handed to every connection by reference; a
//! connection unregisters itself on teardown and nothing else ever does.

pub mod hub;
pub mod memory;
pub mod router;
pub mod social;
pub mod store;

pub use hub::{ConnectionHandle, ConnectionId, Hub};
pub use memory::{MemoryDirectory, MemoryStore};
pub use router::{ChatRouter, RouterError};
pub use social::RelationshipOracle;
pub use store::{MessageStore, StoreError, StoredMessage};
