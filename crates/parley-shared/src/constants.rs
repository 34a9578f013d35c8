/// Application name
pub const APP_NAME: &str = "Parley";

/// Default REST base URL for local development
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Default real-time endpoint for local development
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:5000/ws";

/// Fixed delay between reconnection attempts (milliseconds)
pub const RECONNECT_DELAY_MS: u64 = 1_000;

/// Reconnection attempts before the transport gives up
pub const RECONNECT_ATTEMPTS: u32 = 5;

/// Quiet interval after the last local keystroke before typing stops (milliseconds)
pub const TYPING_IDLE_MS: u64 = 2_000;

/// REST request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Message ids remembered per channel for unread deduplication
pub const SEEN_IDS_PER_CHANNEL: usize = 1_000;

/// Capacity of the transport command / notification channels
pub const CHANNEL_BUFFER: usize = 256;

/// Maximum inbound frame size accepted from the server (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;
