//! # parley-client
//!
//! Client-side synchronization engine for Parley chat.  [`ChatEngine`] keeps
//! the channel list, the active channel's message log, presence, typing and
//! the friend graph consistent with what the REST API and the real-time
//! transport report.

pub mod channels;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod friends;
pub mod messaging;
pub mod session;
pub mod typing;

pub use channels::StartChatOutcome;
pub use config::ClientConfig;
pub use context::{Notice, NoticeLevel};
pub use engine::{ChatEngine, EngineOptions};
pub use error::{EngineError, Result};
pub use events::run_event_loop;
pub use session::SessionPhase;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber.  `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("parley_client=debug,parley_net=debug,parley_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
