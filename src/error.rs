//! Error types for the etcd client

use std::io;
use std::num::ParseIntError;

use thiserror::Error;

use crate::types::KeysResult;

/// Errors that can occur when talking to etcd
///
/// Every failure in the request pipeline surfaces as one of these. Expected
/// "not found" states are not errors: they come back as `Ok(None)` from the
/// operations that document it.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport failed to deliver the request or receive a response
    #[error("Connection error: {0}")]
    Connection(String),

    /// etcd answered with a status the operation does not accept
    #[error("Error response from etcd: {reason}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for the status
        reason: String,
    },

    /// The response body could not be read
    #[error("Error reading response: {0}")]
    Read(String),

    /// The response carried no body text. This happens when etcd goes away
    /// while a watch is pending.
    #[error("No response from etcd")]
    EmptyResponse,

    /// The response body was not a valid keyspace result
    #[error("Error parsing response from etcd: {0}")]
    Json(#[from] serde_json::Error),

    /// One of the index headers was present but not an integer
    #[error("Invalid {name} header value {value:?}: {source}")]
    Header {
        /// Header name
        name: &'static str,
        /// Raw header value
        value: String,
        /// Underlying parse failure
        #[source]
        source: ParseIntError,
    },

    /// etcd reported an error code the operation does not accept
    #[error("{message}")]
    Etcd {
        /// Message reported by etcd
        message: String,
        /// The full parsed result, including error code and cause
        result: Box<KeysResult>,
    },

    /// The request was cancelled before it completed
    #[error("Interrupted during request")]
    Interrupted,

    /// The client has been closed
    #[error("Client is closed")]
    Closed,

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    Tls(String),

    /// Request timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// HTTP status code carried by this error, if any
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// etcd error code carried by this error, if any
    pub fn error_code(&self) -> Option<u32> {
        match self {
            Error::Etcd { result, .. } => result.error_code,
            _ => None,
        }
    }

    /// The parsed result attached to a domain error
    pub fn result(&self) -> Option<&KeysResult> {
        match self {
            Error::Etcd { result, .. } => Some(result),
            _ => None,
        }
    }

    /// True for failures of the transport rather than of the keyspace
    /// operation itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Connection(_)
                | Error::Http { .. }
                | Error::Read(_)
                | Error::EmptyResponse
                | Error::Closed
                | Error::Tls(_)
                | Error::Timeout(_)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
