use thiserror::Error;

use crate::types::{ChannelId, MessageId};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Direct channel {channel} must have exactly 2 members, found {count}")]
    DirectMemberCount { channel: ChannelId, count: usize },

    #[error("Group channel {0} has no members")]
    EmptyGroup(ChannelId),

    #[error("Message {id} is missing required field `{field}`")]
    IncompleteMessage { id: MessageId, field: &'static str },
}
