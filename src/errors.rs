//! Error kinds for the trading core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("order not found")]
    NotFound,

    #[error("order does not belong to this account")]
    NotOwner,

    #[error("order is terminal and cannot be cancelled")]
    NotCancellable,

    #[error("order cannot be amended")]
    NotAmendable,
}

impl EngineError {
    /// The HTTP status the transport layer maps this to.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::NotFound => 404,
            EngineError::NotOwner => 403,
            EngineError::NotCancellable | EngineError::NotAmendable => 409,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
