//! Friend list, pending requests and blocking.

use tracing::{info, warn};

use parley_shared::model::{FriendAction, User};
use parley_shared::types::{FriendRequestId, UserId};

use crate::context::NoticeLevel;
use crate::engine::ChatEngine;
use crate::error::Result;

impl ChatEngine {
    pub async fn load_friends(&self) -> Result<usize> {
        let friends = self.api.list_friends().await?;
        let count = friends.len();
        self.ctx().friends.set_friends(friends);
        Ok(count)
    }

    pub async fn load_pending_requests(&self) -> Result<usize> {
        let pending = self.api.list_pending_requests().await?;
        let count = pending.len();
        self.ctx().friends.set_pending(pending);
        Ok(count)
    }

    pub async fn load_blocked(&self) -> Result<usize> {
        let blocked = self.api.list_blocked().await?;
        let count = blocked.len();
        self.ctx().friends.set_blocked(blocked);
        Ok(count)
    }

    pub async fn send_friend_request(&self, user: &UserId) -> Result<()> {
        self.api.send_friend_request(user).await?;
        self.ctx()
            .push_notice(NoticeLevel::Success, "Friend request sent!");
        info!(user = %user, "Friend request sent");
        Ok(())
    }

    /// Accept or reject an incoming request.  Accepting reloads the friend
    /// list.
    pub async fn respond_friend_request(&self, request: &FriendRequestId, action: FriendAction) -> Result<()> {
        self.api.respond_friend_request(request, action).await?;
        self.ctx().friends.remove_pending(request);
        info!(request = %request, ?action, "Friend request answered");

        if action == FriendAction::Accept {
            self.load_friends().await?;
        }
        Ok(())
    }

    pub async fn remove_friend(&self, friend: &UserId) -> Result<()> {
        self.api.remove_friend(friend).await?;
        self.ctx().friends.remove_friend(friend);
        self.ctx()
            .push_notice(NoticeLevel::Success, "Friend removed");
        Ok(())
    }

    /// Block a user.  The blocked list is updated locally first and then
    /// reloaded for full user details.
    pub async fn block_user(&self, user: &UserId) -> Result<()> {
        self.api.block_user(user).await?;
        {
            let mut ctx = self.ctx();
            let record = ctx
                .friends
                .friend(user)
                .cloned()
                .unwrap_or_else(|| User::new(user.clone(), String::new()));
            ctx.friends.block(record);
            ctx.push_notice(NoticeLevel::Success, "User blocked");
        }
        if let Err(e) = self.load_blocked().await {
            warn!(user = %user, error = %e, "Blocked list reload failed");
        }
        Ok(())
    }

    pub async fn unblock_user(&self, user: &UserId) -> Result<()> {
        self.api.unblock_user(user).await?;
        let mut ctx = self.ctx();
        ctx.friends.unblock(user);
        ctx.push_notice(NoticeLevel::Success, "User unblocked");
        Ok(())
    }
}
