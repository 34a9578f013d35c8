use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::model::{Channel, DeliveryStatus, FriendRequest, MessagePatch};
use crate::types::{ChannelId, MessageId, UserId};

/// Events the client sends over the real-time connection.
///
/// On the wire every event is a JSON text frame `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom(ChannelId),
    LeaveRoom(ChannelId),
    SendMessage(OutgoingMessage),
    TypingStart(ChannelId),
    TypingStop(ChannelId),
    MessageDelivered(Receipt),
    MessageRead(Receipt),
}

/// Real-time notification that a message was persisted and should be fanned out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub channel_id: ChannelId,
    pub content: String,
    #[serde(default)]
    pub reply_to_id: Option<MessageId>,
}

/// Delivery or read acknowledgement sent back to a message's author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub sender_id: UserId,
}

/// Events pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "new_message")]
    NewMessage(MessagePatch),

    #[serde(rename = "message_deleted")]
    MessageDeleted(MessageDeleted),

    #[serde(rename = "user_typing")]
    UserTyping(UserTyping),

    #[serde(rename = "user_status_changed")]
    UserStatusChanged(UserStatusChanged),

    #[serde(rename = "message_status_update")]
    MessageStatusUpdate(MessageStatusUpdate),

    #[serde(rename = "channel_created")]
    ChannelCreated(Channel),

    #[serde(rename = "friendRequest:received")]
    FriendRequestReceived(FriendRequest),

    #[serde(rename = "friendRequest:updated")]
    FriendRequestUpdated(FriendRequest),

    #[serde(rename = "friend:removed")]
    FriendRemoved(FriendRemoved),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserTyping {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChanged {
    pub user_id: UserId,
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusUpdate {
    pub message_id: MessageId,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRemoved {
    pub friend_id: UserId,
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "join_room",
            ClientEvent::LeaveRoom(_) => "leave_room",
            ClientEvent::SendMessage(_) => "send_message",
            ClientEvent::TypingStart(_) => "typing_start",
            ClientEvent::TypingStop(_) => "typing_stop",
            ClientEvent::MessageDelivered(_) => "message_delivered",
            ClientEvent::MessageRead(_) => "message_read",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage(_) => "new_message",
            ServerEvent::MessageDeleted(_) => "message_deleted",
            ServerEvent::UserTyping(_) => "user_typing",
            ServerEvent::UserStatusChanged(_) => "user_status_changed",
            ServerEvent::MessageStatusUpdate(_) => "message_status_update",
            ServerEvent::ChannelCreated(_) => "channel_created",
            ServerEvent::FriendRequestReceived(_) => "friendRequest:received",
            ServerEvent::FriendRequestUpdated(_) => "friendRequest:updated",
            ServerEvent::FriendRemoved(_) => "friend:removed",
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
