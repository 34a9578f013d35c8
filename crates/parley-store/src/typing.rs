use std::collections::{BTreeSet, HashMap};

use parley_shared::types::{ChannelId, UserId};

/// Users currently typing, per channel.
#[derive(Debug, Clone, Default)]
pub struct TypingSets {
    channels: HashMap<ChannelId, BTreeSet<UserId>>,
}

impl TypingSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert or remove.  Returns `true` when the set changed.
    pub fn set_typing(&mut self, channel: &ChannelId, user: &UserId, is_typing: bool) -> bool {
        if is_typing {
            return self
                .channels
                .entry(channel.clone())
                .or_default()
                .insert(user.clone());
        }
        let Some(set) = self.channels.get_mut(channel) else {
            return false;
        };
        let removed = set.remove(user);
        if set.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// Typing users of a channel in a stable order.
    pub fn users(&self, channel: &ChannelId) -> Vec<UserId> {
        self.channels
            .get(channel)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_typing(&self, channel: &ChannelId, user: &UserId) -> bool {
        self.channels
            .get(channel)
            .map(|s| s.contains(user))
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
