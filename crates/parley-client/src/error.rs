use thiserror::Error;

use parley_net::{ApiError, TransportError};
use parley_shared::types::MessageId;
use parley_store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No channel is selected")]
    NoActiveChannel,

    #[error("Message has no content and no attachment")]
    EmptyMessage,

    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Message {0} is not in the active channel")]
    UnknownMessage(MessageId),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
