//! Types shared by every Parley crate: ids, the domain model and the
//! real-time wire protocol.

pub mod constants;
pub mod error;
pub mod model;
pub mod protocol;
pub mod types;

pub use error::{ModelError, ProtocolError};
