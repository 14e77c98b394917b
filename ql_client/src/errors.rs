use ql_ledger::Refusal;
use serde::Deserialize;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Refused by the local admission check; no network I/O was performed
    #[error("Refused before dispatch: {0}")]
    RateLimitPrevention(Refusal),

    /// The remote service rejected the call for breaching a quota
    #[error("Rate limit violated: {code} - {message}")]
    RateLimitViolated { code: i64, message: String },

    #[error("Unauthorized: {code} - {message}")]
    Unauthorized { code: i64, message: String },

    /// Stale or replayed request signature window
    #[error("Request outdated: {code} - {message}")]
    RequestOutdated { code: i64, message: String },

    /// Remote-side fault; safe to retry per caller policy
    #[error("Upstream internal error: {code} - {message}")]
    UpstreamInternal { code: i64, message: String },

    #[error("Unknown response format: {0}")]
    UnknownResponseFormat(String),

    /// Structured validation rejection from the remote service
    #[error("Input rejected: {code} - {message}")]
    InputError { code: i64, message: String },

    #[error("Query cancelled")]
    Cancelled,

    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    /// Fallback carrying the raw remote code and message text
    #[error("API error: {code} - {message}")]
    Other { code: i64, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Structured error payload returned by the remote service
#[derive(Debug, Deserialize)]
struct RemoteErrorPayload {
    code: i64,
    msg: String,
}

/// Map a remote error code onto the typed taxonomy
///
/// Codes follow the venue's numeric table; anything unrecognized falls
/// through to `Other` with the original code and message preserved.
pub fn classify_remote_error(code: i64, message: String) -> ClientError {
    match code {
        -1003 | -1015 => ClientError::RateLimitViolated { code, message },
        -1021 => ClientError::RequestOutdated { code, message },
        -1002 | -1022 | -2014 | -2015 => ClientError::Unauthorized { code, message },
        -1000 | -1001 | -1006 | -1007 | -1008 => ClientError::UpstreamInternal { code, message },
        c if (-1199..=-1100).contains(&c) => ClientError::InputError { code, message },
        _ => ClientError::Other { code, message },
    }
}

/// Decode a failed response body into a typed error
///
/// An undecodable body surfaces as a generic failure wrapping the raw
/// payload text.
pub(crate) fn classify_error_body(body: &[u8]) -> ClientError {
    match serde_json::from_slice::<RemoteErrorPayload>(body) {
        Ok(payload) => classify_remote_error(payload.code, payload.msg),
        Err(_) => ClientError::Other { code: 0, message: String::from_utf8_lossy(body).into_owned() },
    }
}
