//! Error taxonomy for tile data operations
//!
//! The set of failure kinds is closed: a query is either malformed
//! (`BadRequest`) or something on the way to the data broke (`InternalError`).
//! Wire tags outside the vocabulary collapse to `InternalError`, never to a
//! parse failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure kinds a tile operation can surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The query itself is malformed; retrying without changing it is futile
    BadRequest,
    /// Transport or server failure; retryable by explicit user action
    InternalError,
}

impl ErrorKind {
    /// Status code for HTTP-facing boundaries
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::InternalError => 500,
        }
    }

    /// Parse a wire tag; anything unrecognized maps to `InternalError`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "BadRequest" => ErrorKind::BadRequest,
            "InternalError" => ErrorKind::InternalError,
            _ => ErrorKind::InternalError,
        }
    }
}

/// Transport status for a raw wire tag
pub fn status_for_tag(tag: &str) -> u16 {
    ErrorKind::from_tag(tag).status_code()
}

/// Error returned by a tile's data source
///
/// This is the only error type allowed to cross the fetch boundary; stores
/// convert it into the failed-state message shown on the tile.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum FetchError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::BadRequest(_) => ErrorKind::BadRequest,
            FetchError::InternalError(_) => ErrorKind::InternalError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}
