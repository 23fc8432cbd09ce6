//! Message store trait.
//!
//! Messages are persisted before any live push, so every delivered frame
//! corresponds to a durably stored record. The store, never the router,
//! assigns identifiers and creation timestamps.

use async_trait::async_trait;
use huddle_protocol::{GroupId, UserId};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the write.
    #[error("Store write failed: {0}")]
    WriteFailed(String),
}

/// The store's view of a persisted message.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    /// Monotonically increasing identifier assigned by the store.
    pub id: i64,
    /// Creation timestamp assigned by the store.
    pub created_at: String,
}

/// Durably persists chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a direct message.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; nothing is broadcast in that case.
    async fn save_dm(
        &self,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> Result<StoredMessage, StoreError>;

    /// Persist a group message.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; nothing is broadcast in that case.
    async fn save_group_message(
        &self,
        group: GroupId,
        from: UserId,
        text: &str,
    ) -> Result<StoredMessage, StoreError>;
}
