//! Ordered message log of the active channel.
//!
//! Messages reach the log from two independent paths (REST responses and the
//! real-time stream) in no guaranteed order, so every write is a merge by id:
//! an existing entry is updated in place and keeps its position, a new id is
//! appended.

use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_shared::model::{DeliveryStatus, Message, MessagePatch};
use parley_shared::types::MessageId;

use crate::error::Result;

/// How status updates that would move a message backwards are treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StatusPolicy {
    /// Never regress: `read` stays `read` when a late `delivered` arrives.
    #[default]
    Monotonic,
    /// Apply whatever status was observed last.
    LastWriteWins,
}

impl StatusPolicy {
    fn resolve(self, current: DeliveryStatus, incoming: DeliveryStatus) -> DeliveryStatus {
        match self {
            StatusPolicy::Monotonic => current.max(incoming),
            StatusPolicy::LastWriteWins => incoming,
        }
    }
}

/// Result of [`MessageLog::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    policy: StatusPolicy,
}

impl MessageLog {
    pub fn new(policy: StatusPolicy) -> Self {
        Self {
            messages: Vec::new(),
            policy,
        }
    }

    /// Build a log from a history page (oldest first).  Duplicate ids in the
    /// page collapse onto their first position.
    pub fn from_history(messages: Vec<Message>, policy: StatusPolicy) -> Self {
        let mut log = Self::new(policy);
        for message in messages {
            let id = message.id.clone();
            if let Err(e) = log.merge(message.into()) {
                debug!(message = %id, error = %e, "Skipping history message");
            }
        }
        log
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Insert or update a message.
    ///
    /// A patch for an unknown id must carry every field a [`Message`] needs,
    /// otherwise the log is left untouched and an error is returned.
    pub fn merge(&mut self, mut patch: MessagePatch) -> Result<MergeOutcome> {
        match self.position(&patch.id) {
            Some(idx) => {
                let existing = &mut self.messages[idx];
                if let Some(incoming) = patch.status {
                    patch.status = Some(self.policy.resolve(existing.status, incoming));
                }
                existing.apply(patch);
                Ok(MergeOutcome::Updated)
            }
            None => {
                let message = patch.into_message()?;
                self.messages.push(message);
                Ok(MergeOutcome::Inserted)
            }
        }
    }

    /// Replace the delivery status of one message.  Returns `false` when the
    /// message is not in the log or the policy kept the old value.
    pub fn update_status(&mut self, id: &MessageId, status: DeliveryStatus) -> bool {
        let policy = self.policy;
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            debug!(message = %id, "Status update for message not in log");
            return false;
        };
        let resolved = policy.resolve(message.status, status);
        if resolved == message.status {
            return false;
        }
        message.status = resolved;
        true
    }

    /// Remove a message.  No tombstone is kept.
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let idx = self.position(id)?;
        Some(self.messages.remove(idx))
    }

    /// Put an older history page in front of the current messages, skipping
    /// ids already present.  Returns how many messages were added.
    pub fn prepend_history(&mut self, older: Vec<Message>) -> usize {
        let mut fresh: Vec<Message> = Vec::with_capacity(older.len());
        for message in older {
            if self.position(&message.id).is_none() && !fresh.iter().any(|m| m.id == message.id) {
                fresh.push(message);
            }
        }
        let added = fresh.len();
        fresh.append(&mut self.messages);
        self.messages = fresh;
        added
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.position(id).is_some()
    }

    /// The newest message.
    pub fn tail(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The oldest loaded message.
    pub fn head(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Drain the log, keeping the policy.
    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use parley_shared::types::{ChannelId, UserId};

    use crate::error::StoreError;

    fn message(channel: &ChannelId, content: &str) -> Message {
        Message {
            id: MessageId::new(),
            channel_id: channel.clone(),
            sender_id: UserId::new(),
            content: content.to_string(),
            attachment_url: None,
            reply_to_id: None,
            created_at: Utc::now(),
            edited: false,
            status: DeliveryStatus::Sent,
        }
    }

    #[test]
    fn merge_appends_new_and_updates_existing_in_place() {
        let channel = ChannelId::new();
        let mut log = MessageLog::default();
        let first = message(&channel, "one");
        let second = message(&channel, "two");

        assert_eq!(log.merge(first.clone().into()).unwrap(), MergeOutcome::Inserted);
        assert_eq!(log.merge(second.clone().into()).unwrap(), MergeOutcome::Inserted);

        let mut patch = MessagePatch::new(first.id.clone());
        patch.content = Some("one, edited".into());
        assert_eq!(log.merge(patch).unwrap(), MergeOutcome::Updated);

        assert_eq!(log.len(), 2);
        assert_eq!(log.as_slice()[0].content, "one, edited");
        assert_eq!(log.as_slice()[1].id, second.id);
    }

    #[test]
    fn repeated_merges_keep_last_provided_fields() {
        let channel = ChannelId::new();
        let mut log = MessageLog::default();
        let original = message(&channel, "v1");
        log.merge(original.clone().into()).unwrap();

        let mut a = MessagePatch::new(original.id.clone());
        a.content = Some("v2".into());
        a.attachment_url = Some("https://cdn/a.png".into());
        log.merge(a).unwrap();

        let mut b = MessagePatch::new(original.id.clone());
        b.content = Some("v3".into());
        log.merge(b).unwrap();

        let merged = log.get(&original.id).unwrap();
        assert_eq!(merged.content, "v3");
        assert_eq!(merged.attachment_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(merged.sender_id, original.sender_id);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn incomplete_unknown_patch_is_rejected() {
        let mut log = MessageLog::default();
        let err = log.merge(MessagePatch::new(MessageId::new())).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
        assert!(log.is_empty());
    }

    #[test]
    fn monotonic_policy_never_regresses() {
        let channel = ChannelId::new();
        let mut log = MessageLog::new(StatusPolicy::Monotonic);
        let msg = message(&channel, "hi");
        log.merge(msg.clone().into()).unwrap();

        assert!(log.update_status(&msg.id, DeliveryStatus::Read));
        assert!(!log.update_status(&msg.id, DeliveryStatus::Delivered));
        assert_eq!(log.get(&msg.id).unwrap().status, DeliveryStatus::Read);

        // The same rule applies to status carried by a merge.
        let mut patch = MessagePatch::new(msg.id.clone());
        patch.status = Some(DeliveryStatus::Sent);
        log.merge(patch).unwrap();
        assert_eq!(log.get(&msg.id).unwrap().status, DeliveryStatus::Read);
    }

    #[test]
    fn last_write_wins_policy_applies_latest_status() {
        let channel = ChannelId::new();
        let mut log = MessageLog::new(StatusPolicy::LastWriteWins);
        let msg = message(&channel, "hi");
        log.merge(msg.clone().into()).unwrap();

        log.update_status(&msg.id, DeliveryStatus::Read);
        assert!(log.update_status(&msg.id, DeliveryStatus::Delivered));
        assert_eq!(log.get(&msg.id).unwrap().status, DeliveryStatus::Delivered);
    }

    #[test]
    fn status_update_for_missing_message_is_noop() {
        let mut log = MessageLog::default();
        assert!(!log.update_status(&MessageId::new(), DeliveryStatus::Read));
    }

    #[test]
    fn remove_and_tail() {
        let channel = ChannelId::new();
        let mut log = MessageLog::default();
        let a = message(&channel, "a");
        let b = message(&channel, "b");
        log.merge(a.clone().into()).unwrap();
        log.merge(b.clone().into()).unwrap();

        assert_eq!(log.remove(&b.id).map(|m| m.id), Some(b.id.clone()));
        assert_eq!(log.tail().map(|m| m.id.clone()), Some(a.id));
        assert!(log.remove(&b.id).is_none());
    }

    #[test]
    fn prepend_history_skips_known_ids() {
        let channel = ChannelId::new();
        let now = Utc::now();
        let mut older = message(&channel, "older");
        older.created_at = now - Duration::minutes(5);
        let current = message(&channel, "current");

        let mut log = MessageLog::from_history(vec![current.clone()], StatusPolicy::Monotonic);
        let added = log.prepend_history(vec![older.clone(), current.clone()]);

        assert_eq!(added, 1);
        assert_eq!(log.head().map(|m| m.id.clone()), Some(older.id));
        assert_eq!(log.tail().map(|m| m.id.clone()), Some(current.id));
    }

    #[test]
    fn history_with_duplicates_collapses() {
        let channel = ChannelId::new();
        let msg = message(&channel, "dup");
        let log = MessageLog::from_history(vec![msg.clone(), msg], StatusPolicy::Monotonic);
        assert_eq!(log.len(), 1);
    }
}
