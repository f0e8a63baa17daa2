//! Error types for the bangumi API client.
//!
//! # Design
//! Validation failures and the disabled-client case are raised before any
//! request leaves the process. Everything the server sends back with a
//! non-200 status lands in `Status`, whose message is the raw response body.

use thiserror::Error;

/// Errors returned by `BangumiClient` methods and the transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required argument was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The subject type code is neither 0 nor one of the supported types.
    #[error("subject type {0} is invalid")]
    InvalidSubjectType(i32),

    #[error("start {0} is invalid")]
    InvalidStart(i64),

    #[error("max_results {0} is invalid")]
    InvalidMaxResults(i64),

    /// The request URL is not an absolute URL with a host.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The client was built with the skip flag set.
    #[error("client is disabled")]
    Disabled,

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// DNS, connect, TLS, timeout or proxy failure.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The server answered with something other than 200.
    #[error("{body}")]
    Status { status: u16, body: String },

    /// The response body is not JSON, or not the requested shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// True for errors raised while checking arguments, before any I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::MissingField(_)
                | ApiError::InvalidSubjectType(_)
                | ApiError::InvalidStart(_)
                | ApiError::InvalidMaxResults(_)
                | ApiError::InvalidUrl { .. }
        )
    }

    /// HTTP status of a non-200 response, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
