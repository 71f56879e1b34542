//! Error types for request assembly and dispatch.
//!
//! # Design
//! Only `ConfigError` escapes to the caller: it is raised before any request
//! exists. `PayloadError` and `TransportError` are caught inside
//! `dispatch` and folded into a terminal `Outcome`, so they never propagate
//! past the single call site.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems detected before a request is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required input was absent or empty.
    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    /// The `method` input does not name a supported verb.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// Failures while building a form payload from `data` and `files`.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Arrays and nested objects have no single-field form representation.
    #[error("unsupported value for field \"{field}\": {kind} values are not supported")]
    UnsupportedValue { field: String, kind: &'static str },

    /// A `files` entry was not a string path.
    #[error("file path for field \"{0}\" must be a string")]
    InvalidPath(String),

    /// An attachment could not be read from disk.
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoded multipart stream could not be drained.
    #[error("unable to encode form payload: {0}")]
    Encode(#[source] std::io::Error),
}

/// Failures reported by a `Transport` before a response arrived.
///
/// HTTP error statuses are not transport errors: they come back as an
/// `HttpResponse` and are classified by the dispatcher.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be constructed or sent at all.
    #[error("{message}")]
    NotSent { code: &'static str, message: String },

    /// The request went out but no response was received.
    #[error("{message}")]
    NoResponse { code: &'static str, message: String },
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::NotSent { code, .. } | TransportError::NoResponse { code, .. } => code,
        }
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self, TransportError::NoResponse { .. })
    }
}
