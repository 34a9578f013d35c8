//! Sending, editing and deleting messages in the active channel.

use tracing::{debug, info, warn};

use parley_net::SendMessageRequest;
use parley_shared::model::{AttachmentRef, DeliveryStatus, Message};
use parley_shared::protocol::{ClientEvent, OutgoingMessage};
use parley_shared::types::{ChannelId, MessageId};

use crate::engine::ChatEngine;
use crate::error::{EngineError, Result};

impl ChatEngine {
    /// Send a message to the active channel.
    ///
    /// Consumes the reply target; it is put back if the request fails.  The
    /// message appears in the log only once the server has accepted it.
    pub async fn send_message(&self, content: &str, attachment_url: Option<String>) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() && attachment_url.is_none() {
            return Err(EngineError::EmptyMessage);
        }

        let (channel_id, reply_to_id) = {
            let mut ctx = self.ctx();
            let session = ctx.session.as_mut().ok_or(EngineError::NoActiveChannel)?;
            (session.channel_id.clone(), session.pending_reply.take())
        };
        self.typing.stop();

        let body = SendMessageRequest {
            content: content.to_string(),
            reply_to_id: reply_to_id.clone(),
            attachment_url,
        };
        let mut message = match self.api.send_message(&channel_id, &body).await {
            Ok(message) => message,
            Err(e) => {
                warn!(channel = %channel_id, error = %e, "Send failed");
                let mut ctx = self.ctx();
                if let Some(session) = ctx
                    .session
                    .as_mut()
                    .filter(|s| s.channel_id == channel_id && s.pending_reply.is_none())
                {
                    session.pending_reply = reply_to_id;
                }
                return Err(e.into());
            }
        };
        message.status = DeliveryStatus::Sent;

        {
            let mut guard = self.ctx();
            let ctx = &mut *guard;
            let is_active = ctx.is_active(&channel_id);
            if let Some(session) = ctx.session.as_mut().filter(|s| s.channel_id == channel_id) {
                session.log.merge(message.clone().into())?;
            }
            ctx.channels.record_message(&message, is_active, true);
        }

        self.transport.emit(ClientEvent::SendMessage(OutgoingMessage {
            channel_id: channel_id.clone(),
            content: message.content.clone(),
            reply_to_id,
        }));
        info!(channel = %channel_id, message = %message.id, "Message sent");
        Ok(message)
    }

    /// Replace the text of a message in the active channel.
    pub async fn edit_message(&self, id: &MessageId, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        self.require_in_log(id)?;

        let mut message = self.api.edit_message(id, content).await?;
        message.edited = true;

        let mut guard = self.ctx();
        let ctx = &mut *guard;
        let merged = match ctx
            .session
            .as_mut()
            .filter(|s| s.channel_id == message.channel_id)
        {
            Some(session) => {
                session.log.merge(message.clone().into())?;
                session.log.get(id).cloned().unwrap_or(message)
            }
            None => message,
        };
        ctx.channels.update_preview(&merged);
        debug!(message = %id, "Message edited");
        Ok(merged)
    }

    /// Delete a message of the active channel on the server, then locally.
    pub async fn delete_message(&self, id: &MessageId) -> Result<()> {
        let channel_id = self.require_in_log(id)?;
        self.api.delete_message(id).await?;

        let mut guard = self.ctx();
        let ctx = &mut *guard;
        ctx.remove_message(&channel_id, id);
        info!(channel = %channel_id, message = %id, "Message deleted");
        Ok(())
    }

    /// Upload a file to attach to a later message.
    pub async fn upload_attachment(&self, file_name: &str, bytes: Vec<u8>) -> Result<AttachmentRef> {
        let size = bytes.len();
        let attachment = self.api.upload_file(file_name, bytes).await?;
        info!(file = file_name, size, url = %attachment.url, "Attachment uploaded");
        Ok(attachment)
    }

    fn require_in_log(&self, id: &MessageId) -> Result<ChannelId> {
        let ctx = self.ctx();
        let session = ctx.session.as_ref().ok_or(EngineError::NoActiveChannel)?;
        if !session.log.contains(id) {
            return Err(EngineError::UnknownMessage(id.clone()));
        }
        Ok(session.channel_id.clone())
    }
}
