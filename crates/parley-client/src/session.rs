//! Channel session manager: selecting a channel, loading its history and
//! the pending-reply state.

use tracing::{debug, info, warn};

use parley_net::HistoryPage;
use parley_shared::model::Channel;
use parley_shared::protocol::{ClientEvent, Receipt};
use parley_shared::types::{ChannelId, MessageId};
use parley_store::{MessageLog, StatusPolicy, StoreError};

use crate::engine::ChatEngine;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Room switched, history fetch in flight.
    Switching,
    /// History loaded.
    Active,
}

/// The selected channel and its in-memory message log.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub channel_id: ChannelId,
    pub log: MessageLog,
    /// Message the next send replies to.
    pub pending_reply: Option<MessageId>,
    /// Cursor of the next older history page.
    pub cursor: Option<String>,
    pub generation: u64,
    pub phase: SessionPhase,
}

impl ActiveSession {
    pub fn new(channel_id: ChannelId, generation: u64, policy: StatusPolicy) -> Self {
        Self {
            channel_id,
            log: MessageLog::new(policy),
            pending_reply: None,
            cursor: None,
            generation,
            phase: SessionPhase::Switching,
        }
    }

    /// Install the first history page.  Messages that arrived live while the
    /// fetch was in flight are merged on top of it.
    pub fn load_history(&mut self, page: HistoryPage) {
        let live = self.log.take();
        let mut log = MessageLog::from_history(page.messages, self.log.policy());
        for message in live {
            if let Err(e) = log.merge(message.into()) {
                warn!(error = %e, "Live message lost while loading history");
            }
        }
        self.log = log;
        self.cursor = page.next_cursor;
        self.phase = SessionPhase::Active;
    }

    pub fn has_more_history(&self) -> bool {
        self.cursor.is_some()
    }
}

impl ChatEngine {
    /// Switch the active channel, or deselect with `None`.
    ///
    /// The previous room is left and the message log cleared before the
    /// history request is issued.  A response that arrives after another
    /// selection has been made is discarded.
    pub async fn select_channel(&self, channel: Option<Channel>) -> Result<()> {
        self.typing.stop();

        let (channel_id, generation) = {
            let mut guard = self.ctx();
            let ctx = &mut *guard;

            if let Some(previous) = ctx.session.take() {
                if self.transport.is_connected() {
                    self.transport.leave_room(&previous.channel_id);
                }
                debug!(channel = %previous.channel_id, "Left channel");
            }
            ctx.generation += 1;
            let generation = ctx.generation;

            let Some(channel) = channel else {
                info!("Channel deselected");
                return Ok(());
            };
            let channel_id = channel.id.clone();

            ctx.channels.ensure_present(channel)?;
            ctx.channels.reset_unread(&channel_id)?;
            if self.transport.is_connected() {
                self.transport.join_room(&channel_id);
            }
            ctx.session = Some(ActiveSession::new(channel_id.clone(), generation, ctx.policy));
            (channel_id, generation)
        };

        info!(channel = %channel_id, generation, "Channel selected, fetching history");
        let page = match self.api.fetch_history(&channel_id, None).await {
            Ok(page) => page,
            Err(e) => {
                warn!(channel = %channel_id, error = %e, "History fetch failed");
                return Err(e.into());
            }
        };

        let receipts = {
            let mut guard = self.ctx();
            let ctx = &mut *guard;
            let me = ctx.me.id.clone();

            let Some(session) = ctx
                .session
                .as_mut()
                .filter(|s| s.generation == generation)
            else {
                info!(channel = %channel_id, generation, "Discarding stale history response");
                return Ok(());
            };

            session.load_history(page);
            ctx.channels
                .mark_seen(&channel_id, session.log.iter().map(|m| &m.id));
            if let Some(tail) = session.log.tail() {
                if let Err(e) = ctx.channels.refresh_preview(&channel_id, Some(tail)) {
                    debug!(channel = %channel_id, error = %e, "Preview refresh skipped");
                }
            }
            debug!(channel = %channel_id, messages = session.log.len(), "History loaded");

            session
                .log
                .iter()
                .filter(|m| m.sender_id != me)
                .map(|m| Receipt {
                    channel_id: channel_id.clone(),
                    message_id: m.id.clone(),
                    sender_id: m.sender_id.clone(),
                })
                .collect::<Vec<_>>()
        };

        for receipt in receipts {
            self.transport.emit(ClientEvent::MessageRead(receipt));
        }
        Ok(())
    }

    /// Select a channel already in the channel list.
    pub async fn open_channel(&self, id: &ChannelId) -> Result<()> {
        let channel = self
            .ctx()
            .channels
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownChannel(id.clone()))?;
        self.select_channel(Some(channel)).await
    }

    /// Fetch the next older page and put it in front of the log.  Returns how
    /// many messages were added; 0 when history is exhausted.
    pub async fn load_older_messages(&self) -> Result<usize> {
        let (channel_id, cursor, generation) = {
            let ctx = self.ctx();
            let session = ctx.session.as_ref().ok_or(EngineError::NoActiveChannel)?;
            let Some(cursor) = session.cursor.clone() else {
                return Ok(0);
            };
            (session.channel_id.clone(), cursor, session.generation)
        };

        let page = self.api.fetch_history(&channel_id, Some(&cursor)).await?;

        let mut ctx = self.ctx();
        let Some(session) = ctx
            .session
            .as_mut()
            .filter(|s| s.generation == generation)
        else {
            info!(channel = %channel_id, "Discarding stale history page");
            return Ok(0);
        };
        let added = session.log.prepend_history(page.messages);
        session.cursor = page.next_cursor;
        debug!(channel = %channel_id, added, "Older history loaded");
        Ok(added)
    }

    /// Reply to `message` with the next send.
    pub fn set_reply_target(&self, message: &MessageId) -> Result<()> {
        let mut ctx = self.ctx();
        let session = ctx.session.as_mut().ok_or(EngineError::NoActiveChannel)?;
        if !session.log.contains(message) {
            return Err(EngineError::UnknownMessage(message.clone()));
        }
        session.pending_reply = Some(message.clone());
        Ok(())
    }

    pub fn clear_reply_target(&self) {
        if let Some(session) = self.ctx().session.as_mut() {
            session.pending_reply = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parley_shared::model::{DeliveryStatus, Message};
    use parley_shared::types::UserId;

    fn message(channel: &ChannelId, content: &str) -> Message {
        Message {
            id: MessageId::new(),
            channel_id: channel.clone(),
            sender_id: UserId::new(),
            content: content.into(),
            attachment_url: None,
            reply_to_id: None,
            created_at: Utc::now(),
            edited: false,
            status: DeliveryStatus::Sent,
        }
    }

    #[test]
    fn live_messages_survive_history_load() {
        let channel = ChannelId::new();
        let mut session = ActiveSession::new(channel.clone(), 1, StatusPolicy::Monotonic);
        let live = message(&channel, "live");
        let old = message(&channel, "old");
        session.log.merge(live.clone().into()).unwrap();

        session.load_history(HistoryPage {
            messages: vec![old.clone(), live.clone()],
            next_cursor: Some("c1".into()),
        });

        assert_eq!(session.phase, SessionPhase::Active);
        assert_eq!(session.log.len(), 2);
        assert_eq!(session.log.head().unwrap().id, old.id);
        assert!(session.has_more_history());
    }

    #[test]
    fn new_session_starts_switching() {
        let session = ActiveSession::new(ChannelId::new(), 3, StatusPolicy::Monotonic);
        assert_eq!(session.phase, SessionPhase::Switching);
        assert!(session.log.is_empty());
        assert!(!session.has_more_history());
    }
}
