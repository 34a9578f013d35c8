//! Socket task against a local WebSocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use parley_net::{SocketTransport, Transport, TransportConfig, TransportNotification};
use parley_shared::protocol::{ClientEvent, ServerEvent};
use parley_shared::types::{ChannelId, UserId};

fn config(url: String, attempts: u32) -> TransportConfig {
    TransportConfig {
        url,
        reconnect_delay: Duration::from_millis(10),
        reconnect_attempts: attempts,
        buffer: 16,
    }
}

#[tokio::test]
async fn events_flow_both_ways() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let friend = UserId::new();
    let pushed = serde_json::json!({
        "event": "friend:removed",
        "data": { "friendId": friend }
    })
    .to_string();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut auth = None;
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
            auth = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok::<_, ErrorResponse>(resp)
        })
        .await
        .unwrap();

        ws.send(Message::Text(pushed.into())).await.unwrap();

        let received = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text.as_str().to_string(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame {other:?}"),
            }
        };
        ws.close(None).await.unwrap();
        (auth, received)
    });

    let transport = SocketTransport::new(config(format!("ws://{addr}"), 0));
    let mut notifications = transport.connect("token").unwrap().unwrap();
    assert_eq!(notifications.recv().await, Some(TransportNotification::Connected));
    assert!(transport.is_connected());

    // A second connect while live starts nothing.
    assert!(transport.connect("token").unwrap().is_none());

    match notifications.recv().await {
        Some(TransportNotification::Event(ServerEvent::FriendRemoved(removed))) => {
            assert_eq!(removed.friend_id, friend);
        }
        other => panic!("unexpected notification {other:?}"),
    }

    let channel = ChannelId::new();
    transport.emit(ClientEvent::TypingStart(channel.clone()));

    let (auth, received) = server.await.unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer token"));
    let value: serde_json::Value = serde_json::from_str(&received).unwrap();
    assert_eq!(value["event"], "typing_start");
    assert_eq!(value["data"], channel.0.to_string());

    match notifications.recv().await {
        Some(TransportNotification::Disconnected { will_retry, .. }) => assert!(!will_retry),
        other => panic!("unexpected notification {other:?}"),
    }
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn gives_up_after_attempt_cap() {
    // Grab a free port, then close it so every dial is refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = SocketTransport::new(config(format!("ws://{addr}"), 2));
    let mut notifications = transport.connect("token").unwrap().unwrap();

    let mut seen = Vec::new();
    while let Some(n) = notifications.recv().await {
        seen.push(n);
    }

    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], TransportNotification::ConnectError { .. }));
    assert!(matches!(seen[1], TransportNotification::ConnectError { .. }));
    assert!(matches!(
        seen[2],
        TransportNotification::Disconnected { will_retry: false, .. }
    ));
    assert!(!transport.is_connected());
}
