//! Unified broker error model and mapping helpers.
//! One taxonomy is used across token, client, session and permission code;
//! user-visible messages are generic and never explain which check failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// Missing or malformed startup configuration. Fatal; never recovered.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No credential, garbled credential, bad signature, expiry, or kind
    /// mismatch. Deliberately carries no detail about which check failed.
    #[error("unauthenticated")]
    Authentication,

    /// Valid principal, insufficient capability.
    #[error("forbidden")]
    Authorization,

    /// Transport-level failure classified as retryable (reset, timeout,
    /// 503, 429). Retried internally; callers only see it if retries
    /// exhaust, at which point it is escalated to `Database`.
    #[error("transient transport failure: {0}")]
    TransientTransport(String),

    /// Non-transient backing-store failure. Display stays generic; the
    /// detail is for server-side logs only.
    #[error("database operation failed")]
    Database(String),
}

impl BrokerError {
    /// Map to HTTP status code at the boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            BrokerError::Configuration(_) => 500,
            BrokerError::Authentication => 401,
            BrokerError::Authorization => 403,
            BrokerError::TransientTransport(_) => 503,
            BrokerError::Database(_) => 500,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::TransientTransport(_))
    }

    /// Classify a reqwest failure: connect/timeout errors are transient,
    /// as are resets on an already-established connection (a pooled
    /// connection the server half-closed surfaces mid-request, not at
    /// connect time). Anything else is a database failure.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || io_disconnect_in_chain(&err) {
            BrokerError::TransientTransport(err.to_string())
        } else {
            BrokerError::Database(err.to_string())
        }
    }

    /// Classify a non-success HTTP status from the backing store.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => BrokerError::Authentication,
            403 => BrokerError::Authorization,
            429 | 503 => BrokerError::TransientTransport(format!("HTTP {}", status)),
            _ => BrokerError::Database(format!("HTTP {}: {}", status, body)),
        }
    }
}

/// Walk an error's source chain looking for an I/O disconnect (reset,
/// broken pipe, abort, truncated response). reqwest wraps these deep in
/// hyper's error chain and reports them as plain request errors.
fn io_disconnect_in_chain(err: &(dyn std::error::Error + 'static)) -> bool {
    use std::io::ErrorKind;
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

pub type BrokerResult<T> = Result<T, BrokerError>;
