//! Channel list fetching and channel creation.

use tracing::{debug, info, warn};

use parley_net::ApiError;
use parley_shared::model::Channel;
use parley_shared::types::{ChannelId, UserId};

use crate::context::NoticeLevel;
use crate::engine::ChatEngine;
use crate::error::{EngineError, Result};

/// What [`ChatEngine::start_chat_with`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartChatOutcome {
    /// A direct channel was created or reopened and is now active.
    Opened(ChannelId),
    /// The users are not friends; a friend request was sent instead.
    FriendRequestSent,
    /// The users are not friends and a request is already pending.
    AlreadyPending,
}

impl ChatEngine {
    /// Replace the channel list with the server's.  Returns the number of
    /// channels kept.  The active channel stays at zero unread.
    pub async fn fetch_channels(&self) -> Result<usize> {
        let channels = self.api.list_channels().await?;
        let mut ctx = self.ctx();
        let active = ctx.active_channel().cloned();
        let count = ctx.channels.replace_all(channels, active.as_ref());
        drop(ctx);
        info!(count, "Channels loaded");
        Ok(count)
    }

    /// Create (or get back) the direct channel with `user` and list it.
    pub async fn create_direct_channel(&self, user: &UserId) -> Result<Channel> {
        let channel = self.api.create_direct_channel(user).await?;
        self.ctx().channels.upsert(channel.clone())?;
        debug!(channel = %channel.id, user = %user, "Direct channel ready");
        Ok(channel)
    }

    /// Create a group channel.  The name must not be blank and at least one
    /// member is required.
    pub async fn create_group(&self, name: &str, members: &[UserId]) -> Result<Channel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidGroup("name is empty".into()));
        }
        if members.is_empty() {
            return Err(EngineError::InvalidGroup("no members selected".into()));
        }

        let channel = self.api.create_group_channel(name, members).await?;
        self.ctx().channels.upsert(channel.clone())?;
        info!(channel = %channel.id, members = members.len(), "Group created");
        Ok(channel)
    }

    /// Open a direct conversation with `user`, falling back to a friend
    /// request when the server only allows chats between friends.  A direct
    /// channel already in the list is reused without a server round trip.
    pub async fn start_chat_with(&self, user: &UserId) -> Result<StartChatOutcome> {
        let existing = {
            let ctx = self.ctx();
            ctx.channels.direct_with(&ctx.me.id, user).cloned()
        };
        if let Some(channel) = existing {
            let id = channel.id.clone();
            self.select_channel(Some(channel)).await?;
            return Ok(StartChatOutcome::Opened(id));
        }

        match self.create_direct_channel(user).await {
            Ok(channel) => {
                let id = channel.id.clone();
                self.select_channel(Some(channel)).await?;
                Ok(StartChatOutcome::Opened(id))
            }
            Err(EngineError::Api(ApiError::NotFriends(reason))) => {
                debug!(user = %user, reason = %reason, "Not friends, sending request");
                match self.api.send_friend_request(user).await {
                    Ok(()) => {
                        self.ctx()
                            .push_notice(NoticeLevel::Success, "Friend request sent!");
                        Ok(StartChatOutcome::FriendRequestSent)
                    }
                    Err(ApiError::Conflict(_)) => {
                        self.ctx().push_notice(
                            NoticeLevel::Error,
                            "Friend request already sent/pending",
                        );
                        Ok(StartChatOutcome::AlreadyPending)
                    }
                    Err(e) => {
                        warn!(user = %user, error = %e, "Friend request failed");
                        self.ctx()
                            .push_notice(NoticeLevel::Error, "Failed to send friend request");
                        Err(e.into())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }
}
