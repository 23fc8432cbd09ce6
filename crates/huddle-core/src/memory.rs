//! In-memory collaborator implementations.
//!
//! `MemoryDirectory` and `MemoryStore` back the dev server and the test
//! suite. Production deployments wire real implementations of
//! [`RelationshipOracle`](crate::RelationshipOracle) and
//! [`MessageStore`](crate::MessageStore) in front of the platform's store.

use crate::social::RelationshipOracle;
use crate::store::{MessageStore, StoreError, StoredMessage};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use huddle_protocol::{GroupId, UserId};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// In-memory social graph: follows, public profiles, group membership.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    follows: DashSet<(UserId, UserId)>,
    public: DashSet<UserId>,
    groups: DashMap<GroupId, Vec<UserId>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `follower` follows `followee`.
    pub fn add_follow(&self, follower: UserId, followee: UserId) {
        self.follows.insert((follower, followee));
    }

    /// Mark a user's profile as public or private.
    pub fn set_public(&self, user: UserId, public: bool) {
        if public {
            self.public.insert(user);
        } else {
            self.public.remove(&user);
        }
    }

    /// Add a user to a group, creating the group if needed.
    pub fn add_group_member(&self, group: GroupId, user: UserId) {
        let mut members = self.groups.entry(group).or_default();
        if !members.contains(&user) {
            members.push(user);
        }
    }

    /// Remove a user from a group.
    pub fn remove_group_member(&self, group: GroupId, user: UserId) {
        if let Some(mut members) = self.groups.get_mut(&group) {
            members.retain(|m| *m != user);
        }
    }
}

#[async_trait]
impl RelationshipOracle for MemoryDirectory {
    async fn is_following(&self, follower: UserId, followee: UserId) -> bool {
        self.follows.contains(&(follower, followee))
    }

    async fn is_user_public(&self, user: UserId) -> bool {
        self.public.contains(&user)
    }

    async fn is_group_member(&self, group: GroupId, user: UserId) -> bool {
        self.groups
            .get(&group)
            .map(|m| m.contains(&user))
            .unwrap_or(false)
    }

    async fn list_group_members(&self, group: GroupId) -> Vec<UserId> {
        self.groups
            .get(&group)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }
}

/// A persisted direct message.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessage {
    pub id: i64,
    pub from: UserId,
    pub to: UserId,
    pub text: String,
    pub created_at: String,
}

/// A persisted group message.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMessage {
    pub id: i64,
    pub group: GroupId,
    pub from: UserId,
    pub text: String,
    pub created_at: String,
}

/// In-memory message store with monotonic ids and store-assigned timestamps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    dms: Mutex<Vec<DirectMessage>>,
    group_messages: Mutex<Vec<GroupMessage>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn now() -> String {
        Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Direct-message history between two users, oldest first.
    ///
    /// Messages a recipient was not push-eligible for are still here.
    #[must_use]
    pub fn dms_between(&self, a: UserId, b: UserId) -> Vec<DirectMessage> {
        self.dms
            .lock()
            .unwrap()
            .iter()
            .filter(|m| (m.from == a && m.to == b) || (m.from == b && m.to == a))
            .cloned()
            .collect()
    }

    /// Message history for a group, oldest first.
    #[must_use]
    pub fn group_history(&self, group: GroupId) -> Vec<GroupMessage> {
        self.group_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.group == group)
            .cloned()
            .collect()
    }

    /// Total number of persisted messages of either kind.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.dms.lock().unwrap().len() + self.group_messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save_dm(
        &self,
        from: UserId,
        to: UserId,
        text: &str,
    ) -> Result<StoredMessage, StoreError> {
        let record = DirectMessage {
            id: self.next_id(),
            from,
            to,
            text: text.to_string(),
            created_at: Self::now(),
        };
        let stored = StoredMessage {
            id: record.id,
            created_at: record.created_at.clone(),
        };
        self.dms.lock().unwrap().push(record);
        Ok(stored)
    }

    async fn save_group_message(
        &self,
        group: GroupId,
        from: UserId,
        text: &str,
    ) -> Result<StoredMessage, StoreError> {
        let record = GroupMessage {
            id: self.next_id(),
            group,
            from,
            text: text.to_string(),
            created_at: Self::now(),
        };
        let stored = StoredMessage {
            id: record.id,
            created_at: record.created_at.clone(),
        };
        self.group_messages.lock().unwrap().push(record);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_follows() {
        let dir = MemoryDirectory::new();
        dir.add_follow(1, 2);

        assert!(dir.is_following(1, 2).await);
        assert!(!dir.is_following(2, 1).await);
    }

    #[tokio::test]
    async fn test_directory_groups() {
        let dir = MemoryDirectory::new();
        dir.add_group_member(10, 1);
        dir.add_group_member(10, 2);
        dir.add_group_member(10, 2); // duplicate join is a no-op

        assert!(dir.is_group_member(10, 1).await);
        assert!(!dir.is_group_member(10, 3).await);
        assert_eq!(dir.list_group_members(10).await, vec![1, 2]);

        dir.remove_group_member(10, 1);
        assert!(!dir.is_group_member(10, 1).await);
    }

    #[tokio::test]
    async fn test_store_assigns_monotonic_ids() {
        let store = MemoryStore::new();
        let first = store.save_dm(1, 2, "a").await.unwrap();
        let second = store.save_dm(2, 1, "b").await.unwrap();
        assert!(second.id > first.id);
        assert!(!first.created_at.is_empty());

        let history = store.dms_between(1, 2);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "a");
    }

    #[tokio::test]
    async fn test_group_history() {
        let store = MemoryStore::new();
        store.save_group_message(10, 1, "hello").await.unwrap();
        store.save_group_message(11, 1, "elsewhere").await.unwrap();

        let history = store.group_history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello");
    }
}
