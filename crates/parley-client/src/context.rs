//! Session-scoped client state.
//!
//! [`ClientContext`] is created when the engine starts, lives behind the
//! engine's mutex and is reset by [`crate::ChatEngine::shutdown`].  Its
//! methods are synchronous; anything that needs the network lives on the
//! engine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use parley_shared::model::{DeliveryStatus, MessagePatch, User};
use parley_shared::protocol::{ClientEvent, Receipt};
use parley_shared::types::{ChannelId, ConnectionStatus, MessageId, UserId};
use parley_store::{ChannelList, FriendGraph, MergeOutcome, PresenceTracker, Sighting, StatusPolicy, TypingSets};

use crate::session::ActiveSession;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A user-facing message queued for the UI to drain.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

pub struct ClientContext {
    /// The signed-in user.
    pub me: User,
    pub channels: ChannelList,
    /// `None` while no channel is selected.
    pub session: Option<ActiveSession>,
    pub presence: PresenceTracker,
    pub typing: TypingSets,
    pub friends: FriendGraph,
    pub connection: ConnectionStatus,
    pub notices: Vec<Notice>,
    pub policy: StatusPolicy,
    /// Bumped on every channel selection; history responses carrying an
    /// older value are discarded.
    pub generation: u64,
}

impl ClientContext {
    pub fn new(me: User, policy: StatusPolicy) -> Self {
        Self {
            me,
            channels: ChannelList::new(),
            session: None,
            presence: PresenceTracker::new(),
            typing: TypingSets::new(),
            friends: FriendGraph::new(),
            connection: ConnectionStatus::Disconnected,
            notices: Vec::new(),
            policy,
            generation: 0,
        }
    }

    pub fn active_channel(&self) -> Option<&ChannelId> {
        self.session.as_ref().map(|s| &s.channel_id)
    }

    pub fn is_active(&self, channel: &ChannelId) -> bool {
        self.active_channel() == Some(channel)
    }

    pub fn push_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Drop everything except the identity and policy.
    pub fn reset(&mut self) {
        self.channels.clear();
        self.session = None;
        self.presence.clear();
        self.typing.clear();
        self.friends.clear();
        self.connection = ConnectionStatus::Disconnected;
        self.notices.clear();
    }

    // ------------------------------------------------------------------
    // Inbound updates
    // ------------------------------------------------------------------

    /// Merge a message from the real-time stream.
    ///
    /// Returns the acknowledgements to send: `delivered` and `read` for a new
    /// message in the active channel, `delivered` only elsewhere, nothing for
    /// our own messages or repeats.
    pub fn apply_new_message(&mut self, patch: MessagePatch) -> Vec<ClientEvent> {
        let me = self.me.id.clone();
        let message_id = patch.id.clone();

        let channel_id = match patch.channel_id.clone().or_else(|| {
            self.session
                .as_ref()
                .filter(|s| s.log.contains(&message_id))
                .map(|s| s.channel_id.clone())
        }) {
            Some(channel) => channel,
            None => {
                warn!(message = %message_id, "Dropping message without a known channel");
                return Vec::new();
            }
        };

        let (message, inserted, is_active) = match self
            .session
            .as_mut()
            .filter(|s| s.channel_id == channel_id)
        {
            Some(session) => match session.log.merge(patch) {
                Ok(outcome) => (
                    session.log.get(&message_id).cloned(),
                    outcome == MergeOutcome::Inserted,
                    true,
                ),
                Err(e) => {
                    warn!(message = %message_id, error = %e, "Dropping incomplete message");
                    return Vec::new();
                }
            },
            None => match patch.into_message() {
                Ok(message) => (Some(message), false, false),
                Err(e) => {
                    warn!(message = %message_id, error = %e, "Dropping incomplete message");
                    return Vec::new();
                }
            },
        };

        let Some(message) = message else {
            return Vec::new();
        };
        let from_me = message.sender_id == me;

        let counted = if is_active && !inserted {
            // An update to a message we already hold.
            self.channels.update_preview(&message);
            false
        } else {
            self.channels.record_message(&message, is_active, from_me) == Sighting::Counted
        };

        if from_me {
            return Vec::new();
        }
        let receipt = Receipt {
            channel_id,
            message_id,
            sender_id: message.sender_id.clone(),
        };
        if is_active && inserted {
            vec![
                ClientEvent::MessageDelivered(receipt.clone()),
                ClientEvent::MessageRead(receipt),
            ]
        } else if counted {
            vec![ClientEvent::MessageDelivered(receipt)]
        } else {
            Vec::new()
        }
    }

    /// Forget a deleted message and fix up the channel preview.
    pub fn remove_message(&mut self, channel: &ChannelId, id: &MessageId) -> bool {
        let previewed = self
            .channels
            .get(channel)
            .and_then(|c| c.last_message.as_ref())
            .map(|p| &p.message_id == id)
            .unwrap_or(false);

        match self.session.as_mut().filter(|s| &s.channel_id == channel) {
            Some(session) => {
                let removed = session.log.remove(id).is_some();
                if session.pending_reply.as_ref() == Some(id) {
                    session.pending_reply = None;
                }
                if previewed {
                    if let Err(e) = self.channels.refresh_preview(channel, session.log.tail()) {
                        debug!(channel = %channel, error = %e, "Preview refresh skipped");
                    }
                }
                removed
            }
            None => self.channels.clear_preview_if(channel, id),
        }
    }

    pub fn apply_status_update(&mut self, id: &MessageId, status: DeliveryStatus) -> bool {
        match self.session.as_mut() {
            Some(session) => session.log.update_status(id, status),
            None => false,
        }
    }

    /// Apply a presence change to the tracker, every channel member record
    /// and the friend list.
    pub fn apply_presence(&mut self, user: &UserId, online: bool, at: DateTime<Utc>) {
        self.presence.set_online(user, online, at);
        let channels = self.channels.apply_presence(user, online, at);
        let friend = self.friends.apply_presence(user, online, at);
        if user == &self.me.id {
            self.me.set_presence(online, at);
        }
        debug!(user = %user, online, channels, friend, "Presence updated");
    }

    pub fn set_typing(&mut self, channel: &ChannelId, user: &UserId, is_typing: bool) -> bool {
        if user == &self.me.id {
            return false;
        }
        self.typing.set_typing(channel, user, is_typing)
    }
}
