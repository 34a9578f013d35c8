use thiserror::Error;

use parley_shared::types::ChannelId;
use parley_shared::ModelError;

/// Errors produced by the store layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A message or channel violated a model invariant.
    #[error("Invalid record: {0}")]
    Invalid(#[from] ModelError),

    /// The channel is not in the channel list.
    #[error("Unknown channel: {0}")]
    UnknownChannel(ChannelId),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
