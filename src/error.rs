use std::fmt;

use sled::transaction::TransactionError;

use super::request::ExchangeStatus;

pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    ExchangeRequest,
}

/// Coarse error classes a client can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidOperation,
    Conflict,
    Internal,
}

#[derive(thiserror::Error, Debug)]
pub enum ExchangeError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{0} not found: {1}")]
    NotFound(Entity, String),
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperation),
    #[error("Conflicting write on exchange request {0}")]
    Conflict(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] minicbor::encode::Error<std::convert::Infallible>),
    #[error("Failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("Requester {0} owns the requested book")]
    SelfExchange(String),
    #[error("Exchange request {id} is already {status}")]
    NotPending { id: String, status: ExchangeStatus },
    #[error("Pending exchange request {existing_id} already targets book {book_id}")]
    DuplicatePending { existing_id: String, book_id: String },
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::Validation(_) => ErrorKind::Validation,
            ExchangeError::NotFound(..) => ErrorKind::NotFound,
            ExchangeError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            ExchangeError::Conflict(_) => ErrorKind::Conflict,
            ExchangeError::Storage(_)
            | ExchangeError::Encode(_)
            | ExchangeError::Decode(_)
            | ExchangeError::Other(_) => ErrorKind::Internal,
        }
    }
    pub fn book_not_found(id: &str) -> Self {
        ExchangeError::NotFound(Entity::Book, id.to_string())
    }
    pub fn request_not_found(id: &str) -> Self {
        ExchangeError::NotFound(Entity::ExchangeRequest, id.to_string())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Book => f.write_str("Book"),
            Entity::ExchangeRequest => f.write_str("Exchange request"),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl From<TransactionError<ExchangeError>> for ExchangeError {
    fn from(value: TransactionError<ExchangeError>) -> Self {
        match value {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => ExchangeError::Storage(e),
        }
    }
}
