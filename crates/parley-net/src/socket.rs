//! Background WebSocket task with the mpsc command/notification pattern.
//!
//! The task owns the socket.  Callers push [`SocketCommand`]s in and read
//! [`TransportNotification`]s out; the task reconnects on its own with a
//! fixed delay until the attempt cap is reached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use parley_shared::constants::MAX_FRAME_SIZE;
use parley_shared::protocol::{ClientEvent, ServerEvent};
use parley_shared::ProtocolError;

use crate::error::TransportError;
use crate::transport::TransportConfig;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the socket task.
#[derive(Debug)]
pub(crate) enum SocketCommand {
    /// Write one event as a text frame.
    Emit(ClientEvent),
    /// Close the socket and stop the task.
    Close,
}

/// Notifications sent *from* the socket task to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportNotification {
    /// The handshake completed.
    Connected,
    /// A live connection ended.  When `will_retry` is false this is the
    /// final notification of the task.
    Disconnected { reason: String, will_retry: bool },
    /// A connection attempt failed.
    ConnectError { reason: String },
    /// A well-formed server event.
    Event(ServerEvent),
}

/// Handles kept by [`crate::SocketTransport`] for a running task.
pub(crate) struct SocketHandle {
    pub cmd_tx: mpsc::Sender<SocketCommand>,
    pub connected: Arc<AtomicBool>,
    pub task: JoinHandle<()>,
}

/// Build the handshake request carrying the bearer credential.
pub(crate) fn build_request(url: &str, credential: &str) -> Result<Request, TransportError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    let value = HeaderValue::from_str(&format!("Bearer {}", credential.trim()))
        .map_err(|e| TransportError::InvalidCredential(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}

/// Spawn the socket task.
pub(crate) fn spawn_socket(
    config: TransportConfig,
    credential: String,
) -> (SocketHandle, mpsc::Receiver<TransportNotification>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SocketCommand>(config.buffer);
    let (notif_tx, notif_rx) = mpsc::channel::<TransportNotification>(config.buffer);
    let connected = Arc::new(AtomicBool::new(false));

    let task = tokio::spawn(run_socket(
        config,
        credential,
        cmd_rx,
        notif_tx,
        Arc::clone(&connected),
    ));

    (
        SocketHandle {
            cmd_tx,
            connected,
            task,
        },
        notif_rx,
    )
}

/// How a live connection ended.
enum Exit {
    Requested,
    Lost(String),
}

async fn run_socket(
    config: TransportConfig,
    credential: String,
    mut cmd_rx: mpsc::Receiver<SocketCommand>,
    notif_tx: mpsc::Sender<TransportNotification>,
    connected: Arc<AtomicBool>,
) {
    let mut failures: u32 = 0;

    loop {
        let request = match build_request(&config.url, &credential) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Cannot build socket request");
                let _ = notif_tx
                    .send(TransportNotification::ConnectError {
                        reason: e.to_string(),
                    })
                    .await;
                break;
            }
        };

        info!(url = %config.url, attempt = failures + 1, "Connecting socket");
        let lost = match tokio_tungstenite::connect_async(request).await {
            Ok((socket, _)) => {
                failures = 0;
                connected.store(true, Ordering::SeqCst);
                info!(url = %config.url, "Socket connected");
                let _ = notif_tx.send(TransportNotification::Connected).await;

                let exit = drive(socket, &mut cmd_rx, &notif_tx).await;
                connected.store(false, Ordering::SeqCst);
                match exit {
                    Exit::Requested => {
                        info!("Socket closed by client");
                        let _ = notif_tx
                            .send(TransportNotification::Disconnected {
                                reason: "client disconnect".into(),
                                will_retry: false,
                            })
                            .await;
                        return;
                    }
                    Exit::Lost(reason) => {
                        warn!(reason = %reason, "Socket connection lost");
                        Some(reason)
                    }
                }
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, attempt = failures, "Socket connect failed");
                let _ = notif_tx
                    .send(TransportNotification::ConnectError {
                        reason: e.to_string(),
                    })
                    .await;
                None
            }
        };

        let will_retry = failures < config.reconnect_attempts;
        if !will_retry {
            warn!(attempts = failures, "Giving up on socket reconnection");
        }
        // A failed attempt only reports here once the task gives up.
        if lost.is_some() || !will_retry {
            let reason = lost.unwrap_or_else(|| "reconnect attempts exhausted".to_string());
            let _ = notif_tx
                .send(TransportNotification::Disconnected { reason, will_retry })
                .await;
        }
        if !will_retry {
            break;
        }

        if !wait_before_retry(&config, &mut cmd_rx).await {
            info!("Socket task stopped while waiting to reconnect");
            return;
        }
    }

    info!("Socket task terminated");
}

/// Sleep for the reconnect delay.  Returns `false` when the caller asked the
/// task to stop in the meantime.
async fn wait_before_retry(
    config: &TransportConfig,
    cmd_rx: &mut mpsc::Receiver<SocketCommand>,
) -> bool {
    let sleep = tokio::time::sleep(config.reconnect_delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = cmd_rx.recv() => match cmd {
                Some(SocketCommand::Emit(event)) => {
                    debug!(event = event.name(), "Dropping event while reconnecting");
                }
                Some(SocketCommand::Close) | None => return false,
            }
        }
    }
}

async fn drive(
    socket: Socket,
    cmd_rx: &mut mpsc::Receiver<SocketCommand>,
    notif_tx: &mpsc::Sender<TransportNotification>,
) -> Exit {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            // --- Outgoing commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SocketCommand::Emit(event)) => {
                        let name = event.name();
                        let text = match event.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(event = name, error = %e, "Failed to encode event");
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            return Exit::Lost(e.to_string());
                        }
                        debug!(event = name, "Event sent");
                    }
                    Some(SocketCommand::Close) | None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return Exit::Requested;
                    }
                }
            }

            // --- Incoming frames ---
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = decode_frame(text.as_str()) {
                            let _ = notif_tx.send(TransportNotification::Event(event)).await;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let e = ProtocolError::UnexpectedFrame(format!("binary, {} bytes", data.len()));
                        warn!(error = %e, "Dropping frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                        return Exit::Lost(reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Exit::Lost(e.to_string()),
                    None => return Exit::Lost("stream ended".to_string()),
                }
            }
        }
    }
}

/// Parse one inbound text frame.  Oversized or malformed frames are logged
/// and dropped.
pub(crate) fn decode_frame(text: &str) -> Option<ServerEvent> {
    if text.len() > MAX_FRAME_SIZE {
        warn!(len = text.len(), "Dropping oversized frame");
        return None;
    }
    match ServerEvent::from_json(text) {
        Ok(event) => {
            debug!(event = event.name(), "Event received");
            Some(event)
        }
        Err(e) => {
            warn!(error = %e, "Dropping malformed frame");
            None
        }
    }
}
