//! # parley-store
//!
//! In-memory state of a Parley client session: the active channel's message
//! log, the channel list, presence, typing indicators and the friend graph.
//!
//! Everything here is synchronous and lock-free; the engine wraps the stores
//! in its own context and serializes access.

pub mod channels;
pub mod friends;
pub mod messages;
pub mod presence;
pub mod typing;

mod error;

pub use channels::{ChannelList, Sighting, Upsert};
pub use error::{Result, StoreError};
pub use friends::FriendGraph;
pub use messages::{MergeOutcome, MessageLog, StatusPolicy};
pub use presence::{Presence, PresenceTracker};
pub use typing::TypingSets;
