//! # parley-net
//!
//! Network layer of the Parley client: the REST API client and the
//! real-time WebSocket transport.
//!
//! The transport runs in a dedicated tokio task.  The engine sends events in
//! through [`Transport`] and receives [`TransportNotification`]s from the
//! stream returned by [`SocketTransport::connect`].

pub mod api;
pub mod error;
pub mod socket;
pub mod transport;

pub use api::{ApiConfig, ChatApi, HistoryPage, HttpChatApi, SendMessageRequest};
pub use error::{ApiError, TransportError};
pub use socket::TransportNotification;
pub use transport::{SocketTransport, Transport, TransportConfig};
