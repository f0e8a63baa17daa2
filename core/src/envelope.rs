//! Response decoding with optional pagination envelope.
//!
//! Some endpoints wrap their payload as `{total, limit, offset, data}`,
//! others return the payload directly. Decoding first tries the envelope and
//! falls back to the whole body when it does not fit.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::types::JsonMap;

/// The pagination wrapper around a payload.
#[derive(Debug, Deserialize)]
pub struct Envelope<'a> {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(borrow, default)]
    pub data: Option<&'a RawValue>,
}

/// The JSON text holding the payload: the envelope's `data` when present,
/// otherwise the whole body.
pub fn payload(body: &str) -> &str {
    match serde_json::from_str::<Envelope<'_>>(body) {
        Ok(Envelope {
            data: Some(data), ..
        }) => data.get(),
        _ => body,
    }
}

/// Decode the payload into `O`.
pub fn decode_payload<O: DeserializeOwned>(body: &str) -> Result<O, ApiError> {
    Ok(serde_json::from_str(payload(body))?)
}

/// Decode the payload into a generic JSON object.
pub fn decode_map(body: &str) -> Result<JsonMap, ApiError> {
    decode_payload(body)
}

/// Check the status, then decode the payload.
pub fn parse_response<O: DeserializeOwned>(response: HttpResponse) -> Result<O, ApiError> {
    if !response.is_ok() {
        return Err(ApiError::Status {
            status: response.status,
            body: response.body,
        });
    }
    decode_payload(&response.body)
}
