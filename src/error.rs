//! Error taxonomy for contract reads, tip submission and session handling.
//!
//! Every async failure is caught at the call site, logged, and degrades to
//! "keep the last good state". Nothing here is fatal to the process.

use thiserror::Error;

use crate::clarity::DecodeError;

#[derive(Debug, Error)]
pub enum TipJarError {
    /// Node unreachable, timed out, answered with a non-success status or `okay: false`.
    #[error("network error: {0}")]
    Network(String),

    /// The node answered, but not with the shape we expected.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The wallet declined to sign, or the request was cancelled / timed out.
    #[error("rejected by wallet: {0}")]
    UserRejected(String),

    /// Bad user input or an inconsistent request; nothing was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("session store error: {0}")]
    Session(String),

    /// Handoff directory I/O or a malformed wallet reply.
    #[error("wallet error: {0}")]
    Wallet(String),
}

impl From<reqwest::Error> for TipJarError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TipJarError::Network(format!("request timed out: {e}"))
        } else {
            TipJarError::Network(e.to_string())
        }
    }
}

#[cfg(feature = "native")]
impl From<rusqlite::Error> for TipJarError {
    fn from(e: rusqlite::Error) -> Self {
        TipJarError::Session(e.to_string())
    }
}

pub type Result<T, E = TipJarError> = std::result::Result<T, E>;
