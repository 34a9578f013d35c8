//! Ordered channel list with unread counters and last-message previews.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use parley_shared::constants::SEEN_IDS_PER_CHANNEL;
use parley_shared::model::{Channel, Message, MessagePreview};
use parley_shared::types::{ChannelId, MessageId, UserId};

use crate::error::{Result, StoreError};

/// Result of [`ChannelList::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Result of [`ChannelList::record_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// The message id was already accounted for.
    Repeat,
    /// First sighting; the unread counter was left alone.
    Recorded,
    /// First sighting; the unread counter went up.
    Counted,
}

/// Message ids of one channel, oldest evicted first once `limit` is hit.
#[derive(Debug, Clone, Default)]
struct SeenIds {
    ids: HashSet<MessageId>,
    order: VecDeque<MessageId>,
}

impl SeenIds {
    fn insert(&mut self, id: MessageId, limit: usize) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > limit {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

/// Unread and preview collected for a channel that is not listed yet.
#[derive(Debug, Clone, Default)]
struct Pending {
    unread: u32,
    preview: Option<MessagePreview>,
}

/// Channels in recency order, front first.
#[derive(Debug, Clone)]
pub struct ChannelList {
    channels: Vec<Channel>,
    /// Message ids already accounted for per channel, so a message delivered
    /// twice is counted once.  Only the most recent `seen_limit` ids per
    /// channel are kept; a copy of an older message would count again.
    seen: HashMap<ChannelId, SeenIds>,
    seen_limit: usize,
    pending: HashMap<ChannelId, Pending>,
}

impl Default for ChannelList {
    fn default() -> Self {
        Self::with_seen_limit(SEEN_IDS_PER_CHANNEL)
    }
}

impl ChannelList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seen_limit(seen_limit: usize) -> Self {
        Self {
            channels: Vec::new(),
            seen: HashMap::new(),
            seen_limit,
            pending: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Bulk
    // ------------------------------------------------------------------

    /// Replace the list with a full server fetch.
    ///
    /// Channels that fail validation are dropped with a warning.  A locally
    /// tracked unread count survives when it is larger than the server's,
    /// except for the `active` channel, which always reads zero.
    pub fn replace_all(&mut self, incoming: Vec<Channel>, active: Option<&ChannelId>) -> usize {
        let mut next = Vec::with_capacity(incoming.len());
        for mut channel in incoming {
            if let Err(e) = channel.validate() {
                warn!(channel = %channel.id, error = %e, "Dropping invalid channel");
                continue;
            }
            if next.iter().any(|c: &Channel| c.id == channel.id) {
                continue;
            }
            if let Some(local) = self.get(&channel.id) {
                channel.unread_count = channel.unread_count.max(local.unread_count);
            }
            self.absorb_pending(&mut channel);
            if active == Some(&channel.id) {
                channel.unread_count = 0;
            }
            next.push(channel);
        }
        let pending = &self.pending;
        self.seen
            .retain(|id, _| next.iter().any(|c: &Channel| &c.id == id) || pending.contains_key(id));
        self.channels = next;
        debug!(count = self.channels.len(), "Channel list replaced");
        self.channels.len()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.seen.clear();
        self.pending.clear();
    }

    // ------------------------------------------------------------------
    // Single channel
    // ------------------------------------------------------------------

    /// Prepend a channel the list does not know, or replace it in place.
    /// A newly listed channel picks up messages recorded before it was.
    pub fn upsert(&mut self, mut channel: Channel) -> Result<Upsert> {
        channel.validate()?;
        match self.position(&channel.id) {
            Some(idx) => {
                self.channels[idx] = channel;
                Ok(Upsert::Replaced)
            }
            None => {
                self.absorb_pending(&mut channel);
                self.channels.insert(0, channel);
                Ok(Upsert::Inserted)
            }
        }
    }

    /// Make sure the channel is listed without touching an existing entry.
    /// Returns `true` when it had to be added.
    pub fn ensure_present(&mut self, channel: Channel) -> Result<bool> {
        if self.contains(&channel.id) {
            return Ok(false);
        }
        self.upsert(channel)?;
        Ok(true)
    }

    /// Account for a message arriving in `message.channel_id`.
    ///
    /// The first sighting of a message id bumps the channel to the front,
    /// refreshes its preview and, unless the channel is active or the
    /// message is ours, increments the unread counter.  For a channel not
    /// listed yet the unread count and preview are held until it is.
    pub fn record_message(&mut self, message: &Message, is_active: bool, from_me: bool) -> Sighting {
        let limit = self.seen_limit;
        let first_sighting = self
            .seen
            .entry(message.channel_id.clone())
            .or_default()
            .insert(message.id.clone(), limit);

        if !first_sighting {
            // Later copies only refresh a preview that still points at them.
            self.update_preview(message);
            return Sighting::Repeat;
        }

        let counted = !is_active && !from_me;
        let preview = MessagePreview::of(message);
        match self.position(&message.channel_id) {
            Some(idx) => {
                let mut channel = self.channels.remove(idx);
                channel.last_message = Some(preview);
                if counted {
                    channel.unread_count += 1;
                } else if is_active {
                    channel.unread_count = 0;
                }
                self.channels.insert(0, channel);
            }
            None => {
                debug!(channel = %message.channel_id, message = %message.id, "Holding message for unlisted channel");
                let pending = self.pending.entry(message.channel_id.clone()).or_default();
                pending.preview = Some(preview);
                if counted {
                    pending.unread += 1;
                }
            }
        }

        if counted {
            Sighting::Counted
        } else {
            Sighting::Recorded
        }
    }

    /// Mark messages as already accounted for, e.g. after a history load.
    pub fn mark_seen<'a>(&mut self, id: &ChannelId, messages: impl IntoIterator<Item = &'a MessageId>) {
        let limit = self.seen_limit;
        let seen = self.seen.entry(id.clone()).or_default();
        for message in messages {
            seen.insert(message.clone(), limit);
        }
    }

    /// Refresh the preview of the message's channel if it shows this
    /// message.  Order and counters are left alone.
    pub fn update_preview(&mut self, message: &Message) -> bool {
        let Some(channel) = self.get_mut(&message.channel_id) else {
            return false;
        };
        if channel.last_message.as_ref().map(|p| &p.message_id) == Some(&message.id) {
            channel.last_message = Some(MessagePreview::of(message));
            return true;
        }
        false
    }

    pub fn reset_unread(&mut self, id: &ChannelId) -> Result<()> {
        let channel = self
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownChannel(id.clone()))?;
        channel.unread_count = 0;
        Ok(())
    }

    /// Set the preview from the given newest message, or clear it.
    pub fn refresh_preview(&mut self, id: &ChannelId, newest: Option<&Message>) -> Result<()> {
        let channel = self
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownChannel(id.clone()))?;
        channel.last_message = newest.map(MessagePreview::of);
        Ok(())
    }

    /// Clear the preview when it refers to `message`.
    pub fn clear_preview_if(&mut self, id: &ChannelId, message: &MessageId) -> bool {
        let Some(channel) = self.get_mut(id) else {
            return false;
        };
        if channel.last_message.as_ref().map(|p| &p.message_id) == Some(message) {
            channel.last_message = None;
            return true;
        }
        false
    }

    /// Update every member record for `user`.  Returns how many channels
    /// were touched.
    pub fn apply_presence(&mut self, user: &UserId, online: bool, at: DateTime<Utc>) -> usize {
        let mut touched = 0;
        for channel in &mut self.channels {
            let mut hit = false;
            for member in channel.members.iter_mut().filter(|m| &m.user.id == user) {
                member.user.set_presence(online, at);
                hit = true;
            }
            if hit {
                touched += 1;
            }
        }
        touched
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn as_slice(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The direct channel shared with `user`, if any.
    pub fn direct_with(&self, me: &UserId, user: &UserId) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.counterpart(me).map(|u| &u.id) == Some(user))
    }

    fn absorb_pending(&mut self, channel: &mut Channel) {
        let Some(pending) = self.pending.remove(&channel.id) else {
            return;
        };
        channel.unread_count = channel.unread_count.max(pending.unread);
        if channel.last_message.is_none() {
            channel.last_message = pending.preview;
        }
    }

    fn get_mut(&mut self, id: &ChannelId) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| &c.id == id)
    }

    fn position(&self, id: &ChannelId) -> Option<usize> {
        self.channels.iter().position(|c| &c.id == id)
    }
}
