//! Relationship oracle trait.
//!
//! The router never touches the social graph directly; it asks this oracle.
//! The production implementation sits in front of the platform's relational
//! store and is wired in at startup.

use async_trait::async_trait;
use huddle_protocol::{GroupId, UserId};

/// Answers relationship questions for authorization and delivery decisions.
#[async_trait]
pub trait RelationshipOracle: Send + Sync {
    /// Does `follower` follow `followee`?
    async fn is_following(&self, follower: UserId, followee: UserId) -> bool;

    /// Is the user's profile public?
    async fn is_user_public(&self, user: UserId) -> bool;

    /// Is the user currently a member of the group?
    async fn is_group_member(&self, group: GroupId, user: UserId) -> bool;

    /// Current members of the group.
    async fn list_group_members(&self, group: GroupId) -> Vec<UserId>;
}
