//! The crate's single error taxonomy.
//!
//! Every fallible operation in this crate returns `Result<_, AntError>`. The
//! variants group by failure *kind* rather than by subsystem, since the
//! CLI's display logic only cares about that classification.

use std::fmt;

/// Errors produced by any component of the ant node.
#[derive(Debug, thiserror::Error)]
pub enum AntError {
    /// A requested record was not present in the state store.
    #[error("not found: {0}")]
    NotFound(String),

    /// A value failed to decode (hex, ABI, multiaddr, JSON).
    #[error("decode error: {0}")]
    Decode(String),

    /// A balance precondition was not met after the retry budget was exhausted.
    #[error("{0}")]
    InsufficientFunds(&'static str),

    /// An on-chain transaction was mined but reverted (`status != 1`).
    #[error("chain rejected transaction: {0}")]
    ChainRejected(String),

    /// The RPC endpoint or peer transport could not be reached, or failed mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// A semantic rule was violated (e.g. deleting the default wallet key).
    #[error("{0}")]
    Policy(&'static str),

    /// A signature failed to recover (wrong length, or cryptographic mismatch).
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl AntError {
    pub fn decode(err: impl fmt::Display) -> Self {
        AntError::Decode(err.to_string())
    }

    pub fn transport(err: impl fmt::Display) -> Self {
        AntError::Transport(err.to_string())
    }
}

pub type AntResult<T> = Result<T, AntError>;
