//! Domain model shared by the REST client, the real-time protocol and the
//! in-memory stores.
//!
//! JSON field names follow the server's camelCase convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::{ChannelId, FriendRequestId, MessageId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user as reported by the server.  Presence fields are mutated in place
/// when status events arrive; users are never deleted client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    /// Avatar URL or upload reference.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Free-form status line set by the user.
    #[serde(default, rename = "status")]
    pub status_text: Option<String>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_online: false,
            last_seen: None,
            avatar: None,
            status_text: None,
        }
    }

    /// Apply a presence change.  Going offline stamps `last_seen`.
    pub fn set_presence(&mut self, online: bool, at: DateTime<Utc>) {
        self.is_online = online;
        if !online {
            self.last_seen = Some(at);
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Direct,
    Group,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Member,
    Admin,
}

/// A user's membership in a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMember {
    pub user: User,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

impl ChannelMember {
    pub fn new(user: User) -> Self {
        Self {
            user,
            role: MemberRole::Member,
            joined_at: None,
        }
    }
}

/// Short summary of the newest message of a channel, shown in the channel list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePreview {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessagePreview {
    pub fn of(message: &Message) -> Self {
        let text = if message.content.is_empty() && message.attachment_url.is_some() {
            "Attachment".to_string()
        } else {
            message.content.clone()
        };
        Self {
            message_id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            text,
            created_at: message.created_at,
        }
    }
}

/// A direct (two-party) or group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Only meaningful for group channels.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub members: Vec<ChannelMember>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message: Option<MessagePreview>,
}

impl Channel {
    /// Check the member-count invariant for the channel kind.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.kind {
            ChannelKind::Direct if self.members.len() != 2 => Err(ModelError::DirectMemberCount {
                channel: self.id.clone(),
                count: self.members.len(),
            }),
            ChannelKind::Group if self.members.is_empty() => {
                Err(ModelError::EmptyGroup(self.id.clone()))
            }
            _ => Ok(()),
        }
    }

    /// The other participant of a direct channel.
    pub fn counterpart(&self, me: &UserId) -> Option<&User> {
        if self.kind != ChannelKind::Direct {
            return None;
        }
        self.members
            .iter()
            .map(|m| &m.user)
            .find(|u| &u.id != me)
    }

    pub fn display_name(&self, me: &UserId) -> String {
        match self.kind {
            ChannelKind::Group => self
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Group Chat".to_string()),
            ChannelKind::Direct => self
                .counterpart(me)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Unknown User".to_string()),
        }
    }

    /// Groups never show an online badge.
    pub fn is_counterpart_online(&self, me: &UserId) -> bool {
        self.counterpart(me).map(|u| u.is_online).unwrap_or(false)
    }

    pub fn has_member(&self, user: &UserId) -> bool {
        self.members.iter().any(|m| &m.user.id == user)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Delivery marker from the sender's viewpoint.  Variants are ordered so the
/// natural progression compares as increasing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub sender_id: UserId,
    /// May be empty when an attachment is present.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub reply_to_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "isEdited")]
    pub edited: bool,
    #[serde(default)]
    pub status: DeliveryStatus,
}

impl Message {
    /// Overlay the fields present in `patch`.  Absent fields keep their value.
    pub fn apply(&mut self, patch: MessagePatch) {
        if let Some(channel_id) = patch.channel_id {
            self.channel_id = channel_id;
        }
        if let Some(sender_id) = patch.sender_id {
            self.sender_id = sender_id;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(url) = patch.attachment_url {
            self.attachment_url = Some(url);
        }
        if let Some(reply_to) = patch.reply_to_id {
            self.reply_to_id = Some(reply_to);
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }
        if let Some(edited) = patch.edited {
            self.edited = edited;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// A possibly partial message, as delivered by the real-time stream.
///
/// Only `id` is mandatory; every other field is optional so a later event can
/// update a message without restating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePatch {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "isEdited", skip_serializing_if = "Option::is_none")]
    pub edited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,
}

impl MessagePatch {
    pub fn new(id: MessageId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Build a full message.  Fails when a field without a sensible default
    /// is missing.
    pub fn into_message(self) -> Result<Message, ModelError> {
        let missing = |field: &'static str| ModelError::IncompleteMessage {
            id: self.id.clone(),
            field,
        };
        let channel_id = self.channel_id.clone().ok_or_else(|| missing("channelId"))?;
        let sender_id = self.sender_id.clone().ok_or_else(|| missing("senderId"))?;
        let created_at = self.created_at.ok_or_else(|| missing("createdAt"))?;

        Ok(Message {
            id: self.id,
            channel_id,
            sender_id,
            content: self.content.unwrap_or_default(),
            attachment_url: self.attachment_url,
            reply_to_id: self.reply_to_id,
            created_at,
            edited: self.edited.unwrap_or(false),
            status: self.status.unwrap_or_default(),
        })
    }
}

impl From<Message> for MessagePatch {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            channel_id: Some(m.channel_id),
            sender_id: Some(m.sender_id),
            content: Some(m.content),
            attachment_url: m.attachment_url,
            reply_to_id: m.reply_to_id,
            created_at: Some(m.created_at),
            edited: Some(m.edited),
            status: Some(m.status),
        }
    }
}

/// Reference to an uploaded file, used as a message attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: FriendRequestId,
    #[serde(default)]
    pub sender: Option<User>,
    #[serde(default)]
    pub receiver: Option<User>,
    #[serde(default)]
    pub status: FriendRequestStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Answer to an incoming friend request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendAction {
    Accept,
    Reject,
}
