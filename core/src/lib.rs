//! Blocking client for the bangumi (bgm.tv) catalog API.
//!
//! # Overview
//! Fetches a subject by id and searches subjects by keyword. Requests are
//! built as plain data (`HttpRequest`), executed by a `Transport`, and the
//! JSON payload is returned as a generic `JsonMap`.
//!
//! # Design
//! - `BangumiClient` is read-only after construction; the only shared
//!   mutable state is the optional `ConcurrencyLimiter`.
//! - Argument validation and the skip flag are checked before any I/O.
//! - Payloads may or may not be wrapped in a `{total, limit, offset, data}`
//!   envelope; both shapes decode to the same result.

pub mod cancel;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod limiter;
pub mod transport;
pub mod types;

pub use cancel::CancellationToken;
pub use client::BangumiClient;
pub use config::ClientConfig;
pub use envelope::{decode_map, decode_payload, parse_response};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use limiter::{ConcurrencyLimiter, Permit};
pub use transport::{Transport, UreqTransport};
pub use types::{JsonMap, ResponseGroup, SearchRequest, SubjectType};

pub type Result<T> = std::result::Result<T, ApiError>;
