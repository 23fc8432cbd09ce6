//! Message router for Huddle.
//!
//! One inbound frame at a time: validate shape, authorize against the
//! relationship oracle, persist through the message store, then fan the
//! resulting frame out through the hub. The router keeps no state across
//! frames beyond the sending connection's user identity.

use crate::hub::Hub;
use crate::social::RelationshipOracle;
use crate::store::{MessageStore, StoreError};
use huddle_protocol::{codec, ClientFrame, GroupId, ServerFrame, UserId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Router errors.
///
/// Every variant is recoverable for the connection: the display string is
/// sent back as a local `error` frame and the connection stays open.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Message text empty after trimming.
    #[error("text required")]
    TextRequired,

    /// Direct message without a positive target user id.
    #[error("to_user_id required")]
    TargetUserRequired,

    /// Group message without a positive group id.
    #[error("group_id required")]
    GroupRequired,

    /// No follow relation between sender and target in either direction.
    #[error("dm not allowed")]
    DmNotAllowed,

    /// Sender is not a member of the target group.
    #[error("not a member")]
    NotGroupMember,

    /// Frame type not recognized.
    #[error("unsupported type")]
    Unsupported,

    /// Store rejected a direct message.
    #[error("dm failed")]
    DmPersistFailed(#[source] StoreError),

    /// Store rejected a group message.
    #[error("group message failed")]
    GroupPersistFailed(#[source] StoreError),

    /// Frame could not be serialized for delivery.
    #[error("internal error")]
    Internal(#[from] huddle_protocol::ProtocolError),
}

/// Routes inbound chat frames to their recipients.
///
/// Holds non-owning handles to the hub and the collaborators; all three are
/// constructed once at startup and shared across connections.
pub struct ChatRouter {
    hub: Arc<Hub>,
    oracle: Arc<dyn RelationshipOracle>,
    store: Arc<dyn MessageStore>,
}

impl ChatRouter {
    /// Create a router over the given hub and collaborators.
    #[must_use]
    pub fn new(
        hub: Arc<Hub>,
        oracle: Arc<dyn RelationshipOracle>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self { hub, oracle, store }
    }

    /// The hub this router delivers through.
    #[must_use]
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Process one inbound frame from `sender`.
    ///
    /// # Errors
    ///
    /// Returns an error whose display string is the wire error message; no
    /// partial side effects remain when an error is returned before the
    /// persist step.
    pub async fn handle(&self, sender: UserId, frame: ClientFrame) -> Result<(), RouterError> {
        match frame {
            ClientFrame::DmSend { to_user_id, text } => {
                self.handle_dm(sender, to_user_id, text.trim()).await
            }
            ClientFrame::GroupSend { group_id, text } => {
                self.handle_group(sender, group_id, text.trim()).await
            }
            ClientFrame::Unknown => Err(RouterError::Unsupported),
        }
    }

    async fn handle_dm(&self, sender: UserId, to: UserId, text: &str) -> Result<(), RouterError> {
        if text.is_empty() {
            return Err(RouterError::TextRequired);
        }
        if to <= 0 {
            return Err(RouterError::TargetUserRequired);
        }

        // A follow in either direction authorizes the send; this is looser
        // than profile visibility on purpose.
        let allowed = self.oracle.is_following(sender, to).await
            || self.oracle.is_following(to, sender).await;
        if !allowed {
            warn!(sender, to, "DM rejected: no follow relation");
            return Err(RouterError::DmNotAllowed);
        }

        let stored = self
            .store
            .save_dm(sender, to, text)
            .await
            .map_err(RouterError::DmPersistFailed)?;

        let frame = codec::encode(&ServerFrame::dm_new(sender, to, text, stored.created_at))?;

        // Authorization decided the message may exist; eligibility decides
        // whether the recipient sees it live. An ineligible recipient still
        // finds the message in history later.
        if self.push_eligible(sender, to).await {
            self.hub.send_to_user(to, &frame);
        }
        let echoed = self.hub.send_to_user(sender, &frame);

        debug!(sender, to, id = stored.id, echoed, "DM routed");
        Ok(())
    }

    async fn handle_group(
        &self,
        sender: UserId,
        group: GroupId,
        text: &str,
    ) -> Result<(), RouterError> {
        if text.is_empty() {
            return Err(RouterError::TextRequired);
        }
        if group <= 0 {
            return Err(RouterError::GroupRequired);
        }

        if !self.oracle.is_group_member(group, sender).await {
            warn!(sender, group, "Group message rejected: not a member");
            return Err(RouterError::NotGroupMember);
        }

        let stored = self
            .store
            .save_group_message(group, sender, text)
            .await
            .map_err(RouterError::GroupPersistFailed)?;

        let frame = codec::encode(&ServerFrame::group_new(
            sender,
            group,
            text,
            stored.created_at,
        ))?;

        // Membership is enumerated at dispatch time; every current member
        // (the sender included) gets the push, with no eligibility filter.
        let members = self.oracle.list_group_members(group).await;
        let mut delivered = 0;
        for member in &members {
            delivered += self.hub.send_to_user(*member, &frame);
        }

        debug!(
            sender,
            group,
            id = stored.id,
            members = members.len(),
            delivered,
            "Group message routed"
        );
        Ok(())
    }

    /// Live-delivery policy for direct messages: the recipient follows the
    /// sender, or the sender's profile is public.
    async fn push_eligible(&self, sender: UserId, recipient: UserId) -> bool {
        self.oracle.is_following(recipient, sender).await
            || self.oracle.is_user_public(sender).await
    }
}
