//! Headless Parley client: connects, loads the channel and friend lists and
//! prints a line for every state change until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use parley_client::{init_tracing, run_event_loop, ChatEngine, ClientConfig};
use parley_net::{HttpChatApi, SocketTransport};
use parley_shared::constants::APP_NAME;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting {APP_NAME} client");

    let config = ClientConfig::from_env();
    let me = config
        .identity()
        .context("PARLEY_USER_ID must be set to a valid user id")?;

    let api = HttpChatApi::new(config.api_config()).context("failed to build HTTP client")?;
    let transport = Arc::new(SocketTransport::new(config.transport_config()));
    let engine = ChatEngine::new(me, Arc::new(api), transport.clone(), config.engine_options());

    let notifications = transport
        .connect(&config.token)?
        .context("socket already running")?;

    let channels = engine.fetch_channels().await?;
    info!(channels, "Channel list ready");
    if let Err(e) = engine.load_friends().await {
        warn!(error = %e, "Could not load friends");
    }
    if let Err(e) = engine.load_pending_requests().await {
        warn!(error = %e, "Could not load friend requests");
    }

    tokio::select! {
        _ = run_event_loop(engine.clone(), notifications, print_summary) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("Interrupted");
        }
    }

    engine.shutdown();
    transport.disconnect();
    Ok(())
}

fn print_summary(engine: &ChatEngine) {
    for notice in engine.take_notices() {
        println!("[{:?}] {}", notice.level, notice.text);
    }

    let me = engine.me().id;
    let channels = engine.channels();
    let unread: Vec<String> = channels
        .iter()
        .filter(|c| c.unread_count > 0)
        .map(|c| format!("{} ({})", c.display_name(&me), c.unread_count))
        .collect();
    println!(
        "{:?} | {} channels | {} online | unread: {}",
        engine.connection_status(),
        channels.len(),
        engine.online_count(),
        if unread.is_empty() { "none".to_string() } else { unread.join(", ") }
    );
}
