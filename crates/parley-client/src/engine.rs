//! The chat engine: shared client state plus the REST and real-time seams.
//!
//! [`ChatEngine`] is cheap to clone; every clone shares the same
//! [`ClientContext`].  The context mutex is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::info;

use parley_net::{ChatApi, Transport};
use parley_shared::constants::TYPING_IDLE_MS;
use parley_shared::model::{Channel, FriendRequest, Message, User};
use parley_shared::types::{ChannelId, ConnectionStatus, MessageId, UserId};
use parley_store::{Presence, StatusPolicy};

use crate::context::{ClientContext, Notice};
use crate::error::{EngineError, Result};
use crate::session::SessionPhase;
use crate::typing::TypingNotifier;

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub status_policy: StatusPolicy,
    pub typing_idle: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            status_policy: StatusPolicy::default(),
            typing_idle: Duration::from_millis(TYPING_IDLE_MS),
        }
    }
}

#[derive(Clone)]
pub struct ChatEngine {
    pub(crate) ctx: Arc<Mutex<ClientContext>>,
    pub(crate) api: Arc<dyn ChatApi>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) typing: TypingNotifier,
}

impl ChatEngine {
    pub fn new(me: User, api: Arc<dyn ChatApi>, transport: Arc<dyn Transport>, options: EngineOptions) -> Self {
        info!(user = %me.id, policy = ?options.status_policy, "Chat engine created");
        Self {
            ctx: Arc::new(Mutex::new(ClientContext::new(me, options.status_policy))),
            api,
            typing: TypingNotifier::new(Arc::clone(&transport), options.typing_idle),
            transport,
        }
    }

    pub(crate) fn ctx(&self) -> MutexGuard<'_, ClientContext> {
        match self.ctx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// End the session: stop typing, leave the active room and drop all
    /// state.  The transport itself is owned by the caller.
    pub fn shutdown(&self) {
        self.typing.stop();
        let mut ctx = self.ctx();
        if let Some(session) = ctx.session.as_ref() {
            if self.transport.is_connected() {
                self.transport.leave_room(&session.channel_id);
            }
        }
        ctx.reset();
        info!("Chat engine shut down");
    }

    // ------------------------------------------------------------------
    // Local typing
    // ------------------------------------------------------------------

    /// Report a keystroke in the active channel's input.
    pub fn notify_keystroke(&self) -> Result<()> {
        let channel = self
            .ctx()
            .active_channel()
            .cloned()
            .ok_or(EngineError::NoActiveChannel)?;
        self.typing.keystroke(&channel);
        Ok(())
    }

    /// The input was cleared without sending.
    pub fn notify_input_cleared(&self) {
        self.typing.stop();
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn me(&self) -> User {
        self.ctx().me.clone()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.ctx().channels.as_slice().to_vec()
    }

    pub fn channel(&self, id: &ChannelId) -> Option<Channel> {
        self.ctx().channels.get(id).cloned()
    }

    pub fn active_channel(&self) -> Option<ChannelId> {
        self.ctx().active_channel().cloned()
    }

    /// Messages of the active channel, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.ctx()
            .session
            .as_ref()
            .map(|s| s.log.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// `None` while no channel is selected.
    pub fn session_phase(&self) -> Option<SessionPhase> {
        self.ctx().session.as_ref().map(|s| s.phase)
    }

    pub fn has_more_history(&self) -> bool {
        self.ctx()
            .session
            .as_ref()
            .map(|s| s.has_more_history())
            .unwrap_or(false)
    }

    pub fn reply_target(&self) -> Option<MessageId> {
        self.ctx().session.as_ref().and_then(|s| s.pending_reply.clone())
    }

    pub fn typing_users(&self, channel: &ChannelId) -> Vec<UserId> {
        self.ctx().typing.users(channel)
    }

    pub fn presence(&self, user: &UserId) -> Option<Presence> {
        self.ctx().presence.get(user)
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.ctx().presence.is_online(user)
    }

    /// Users currently reported online.
    pub fn online_count(&self) -> usize {
        self.ctx().presence.online_count()
    }

    pub fn friends(&self) -> Vec<User> {
        self.ctx().friends.friends().to_vec()
    }

    pub fn pending_requests(&self) -> Vec<FriendRequest> {
        self.ctx().friends.pending().to_vec()
    }

    pub fn blocked_users(&self) -> Vec<User> {
        self.ctx().friends.blocked().to_vec()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.ctx().connection.clone()
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    /// Drain queued notices.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.ctx().take_notices()
    }
}
