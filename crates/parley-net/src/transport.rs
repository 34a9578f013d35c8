//! Real-time transport: the seam between the engine and the socket task.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use parley_shared::constants::{
    CHANNEL_BUFFER, DEFAULT_SOCKET_URL, RECONNECT_ATTEMPTS, RECONNECT_DELAY_MS,
};
use parley_shared::protocol::ClientEvent;
use parley_shared::types::ChannelId;

use crate::error::TransportError;
use crate::socket::{build_request, spawn_socket, SocketCommand, SocketHandle, TransportNotification};

/// Fire-and-forget outbound side of the real-time connection.
///
/// Implementations never fail: without a live connection every call is a
/// silent no-op.
pub trait Transport: Send + Sync {
    fn is_connected(&self) -> bool;

    fn emit(&self, event: ClientEvent);

    fn join_room(&self, channel: &ChannelId) {
        self.emit(ClientEvent::JoinRoom(channel.clone()));
    }

    fn leave_room(&self, channel: &ChannelId) {
        self.emit(ClientEvent::LeaveRoom(channel.clone()));
    }
}

/// Configuration for the socket task.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    /// Fixed delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts before the task gives up.
    pub reconnect_attempts: u32,
    /// Capacity of the command and notification channels.
    pub buffer: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOCKET_URL.to_string(),
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            reconnect_attempts: RECONNECT_ATTEMPTS,
            buffer: CHANNEL_BUFFER,
        }
    }
}

/// WebSocket-backed [`Transport`].
pub struct SocketTransport {
    config: TransportConfig,
    handle: Mutex<Option<SocketHandle>>,
}

impl SocketTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
        }
    }

    /// Start the connection.
    ///
    /// Returns the notification stream of a newly spawned socket task, or
    /// `None` when a task is already running.
    pub fn connect(
        &self,
        credential: &str,
    ) -> Result<Option<mpsc::Receiver<TransportNotification>>, TransportError> {
        if credential.trim().is_empty() {
            return Err(TransportError::MissingCredential);
        }

        let mut guard = self.lock();
        if let Some(handle) = guard.as_ref() {
            if !handle.task.is_finished() {
                debug!("Socket already running, connect ignored");
                return Ok(None);
            }
        }

        // Fail fast on a bad URL or credential instead of inside the task.
        build_request(&self.config.url, credential)?;

        let (handle, notifications) = spawn_socket(self.config.clone(), credential.to_string());
        *guard = Some(handle);
        info!(url = %self.config.url, "Socket task started");
        Ok(Some(notifications))
    }

    /// Close the connection and drop the task handle.
    pub fn disconnect(&self) {
        let Some(handle) = self.lock().take() else {
            return;
        };
        if handle.cmd_tx.try_send(SocketCommand::Close).is_err() {
            // Queue full or task gone; dropping the sender stops it either way.
            debug!("Close command not delivered");
        }
        info!("Socket disconnect requested");
    }

    fn lock(&self) -> MutexGuard<'_, Option<SocketHandle>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for SocketTransport {
    fn is_connected(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|h| h.connected.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn emit(&self, event: ClientEvent) {
        let guard = self.lock();
        match guard.as_ref() {
            Some(handle) if handle.connected.load(Ordering::SeqCst) => {
                let name = event.name();
                if let Err(e) = handle.cmd_tx.try_send(SocketCommand::Emit(event)) {
                    warn!(event = name, error = %e, "Failed to queue event");
                }
            }
            _ => debug!(event = event.name(), "Not connected, event dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credential_is_rejected() {
        let transport = SocketTransport::new(TransportConfig::default());
        assert_eq!(
            transport.connect("   ").unwrap_err(),
            TransportError::MissingCredential
        );
    }

    #[test]
    fn calls_without_connection_are_noops() {
        let transport = SocketTransport::new(TransportConfig::default());
        let channel = ChannelId::new();
        assert!(!transport.is_connected());
        transport.join_room(&channel);
        transport.emit(ClientEvent::TypingStart(channel.clone()));
        transport.leave_room(&channel);
        transport.disconnect();
        assert!(!transport.is_connected());
    }
}
