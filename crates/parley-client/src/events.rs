//! Dispatch of transport notifications into the client state.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use parley_net::TransportNotification;
use parley_shared::model::{FriendRequest, FriendRequestStatus};
use parley_shared::protocol::ServerEvent;
use parley_shared::types::ConnectionStatus;

use crate::context::NoticeLevel;
use crate::engine::ChatEngine;

impl ChatEngine {
    /// Apply one notification from the transport.
    pub async fn handle_notification(&self, notification: TransportNotification) {
        match notification {
            TransportNotification::Connected => {
                let mut ctx = self.ctx();
                ctx.connection = ConnectionStatus::Connected;
                if let Some(channel) = ctx.active_channel() {
                    self.transport.join_room(channel);
                    debug!(channel = %channel, "Rejoined active channel");
                }
                info!("Connected");
            }

            TransportNotification::Disconnected { reason, will_retry } => {
                self.typing.stop();
                let mut ctx = self.ctx();
                ctx.typing.clear();
                ctx.connection = if will_retry {
                    ConnectionStatus::Reconnecting { reason: reason.clone() }
                } else {
                    ConnectionStatus::Disconnected
                };
                warn!(reason = %reason, will_retry, "Disconnected");
            }

            TransportNotification::ConnectError { reason } => {
                warn!(reason = %reason, "Connection attempt failed");
                self.ctx().connection = ConnectionStatus::Reconnecting { reason };
            }

            TransportNotification::Event(event) => self.handle_server_event(event).await,
        }
    }

    async fn handle_server_event(&self, event: ServerEvent) {
        debug!(event = event.name(), "Server event");
        match event {
            ServerEvent::NewMessage(patch) => {
                let acks = self.ctx().apply_new_message(patch);
                for ack in acks {
                    self.transport.emit(ack);
                }
            }

            ServerEvent::MessageDeleted(deleted) => {
                let removed = self
                    .ctx()
                    .remove_message(&deleted.channel_id, &deleted.message_id);
                debug!(message = %deleted.message_id, removed, "Message deleted");
            }

            ServerEvent::UserTyping(typing) => {
                self.ctx()
                    .set_typing(&typing.channel_id, &typing.user_id, typing.is_typing);
            }

            ServerEvent::UserStatusChanged(status) => {
                let at = status.last_seen.unwrap_or_else(Utc::now);
                self.ctx().apply_presence(&status.user_id, status.is_online, at);
            }

            ServerEvent::MessageStatusUpdate(update) => {
                if !self.ctx().apply_status_update(&update.message_id, update.status) {
                    debug!(message = %update.message_id, "Status update for message not in view");
                }
            }

            ServerEvent::ChannelCreated(channel) => {
                let id = channel.id.clone();
                if let Err(e) = self.ctx().channels.upsert(channel) {
                    warn!(channel = %id, error = %e, "Ignoring invalid channel");
                }
            }

            ServerEvent::FriendRequestReceived(request) => {
                if let Some(sender) = request.sender.as_ref() {
                    if self.ctx().friends.is_blocked(&sender.id) {
                        debug!(user = %sender.id, "Ignoring friend request from blocked user");
                        return;
                    }
                }
                let who = request
                    .sender
                    .as_ref()
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| "Someone".to_string());
                let mut ctx = self.ctx();
                if ctx.friends.add_pending(request) {
                    ctx.push_notice(NoticeLevel::Info, format!("{who} sent you a friend request"));
                }
            }

            ServerEvent::FriendRequestUpdated(request) => self.friend_request_updated(request).await,

            ServerEvent::FriendRemoved(removed) => {
                self.ctx().friends.remove_friend(&removed.friend_id);
            }
        }
    }

    async fn friend_request_updated(&self, request: FriendRequest) {
        let other = {
            let mut ctx = self.ctx();
            ctx.friends.remove_pending(&request.id);
            let me = ctx.me.id.clone();
            [request.sender.as_ref(), request.receiver.as_ref()]
                .into_iter()
                .flatten()
                .find(|u| u.id != me)
                .map(|u| u.name.clone())
        };

        if request.status != FriendRequestStatus::Accepted {
            return;
        }
        if let Err(e) = self.load_friends().await {
            warn!(error = %e, "Friend list reload failed");
        }
        let name = other.unwrap_or_else(|| "a new friend".to_string());
        self.ctx()
            .push_notice(NoticeLevel::Success, format!("You are now friends with {name}"));
    }
}

/// Feed every notification from `rx` into `engine` until the transport
/// closes the channel.  `on_change` runs after each one.
pub async fn run_event_loop<F>(engine: ChatEngine, mut rx: mpsc::Receiver<TransportNotification>, mut on_change: F)
where
    F: FnMut(&ChatEngine),
{
    info!("Event loop started");
    while let Some(notification) = rx.recv().await {
        engine.handle_notification(notification).await;
        on_change(&engine);
    }
    warn!("Event loop ended");
}
