use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use solana_sdk::signer::SignerError;
use thiserror::Error;

use crate::quote::QuoteKind;

/// Errors raised while decoding or encoding the pool state record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The buffer does not cover the fixed span of the record.
    #[error("Buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    /// The active length field exceeds the fixed slot capacity.
    #[error("Token accounts length {0} exceeds maximum of {max}", max = crate::constants::MAX_N_COINS)]
    TokenAccountsLengthOutOfBounds(u32),

    /// A field held a value the layout does not allow (e.g. a bool byte of 2).
    #[error("Malformed pool state: {0}")]
    Malformed(String),
}

/// Opaque failure reported by the ledger transport.
///
/// Remote execution failures (rejected instructions, insufficient balances)
/// arrive here unclassified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transport error: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors returned by the pool client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Pool state bytes could not be decoded.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The pool state account does not exist.
    #[error("Pool account {0} not found")]
    PoolAccountNotFound(Pubkey),

    /// The pool state account is owned by another program.
    #[error("Pool account owned by {actual}, expected {expected}")]
    InvalidPoolOwner { expected: Pubkey, actual: Pubkey },

    /// The pool state decoded but is not marked initialized.
    #[error("Pool account {0} is not initialized")]
    UninitializedPool(Pubkey),

    /// A vault account could not be fetched or unpacked to find its mint.
    #[error("Could not resolve mint of token account {0}")]
    UnresolvedMint(Pubkey),

    /// A mint passed by the caller is not one of the pool's assets.
    #[error("Mint {0} is not part of the pool")]
    UnknownMint(Pubkey),

    /// Pools hold between one and `MAX_N_COINS` assets.
    #[error("Invalid number of pool tokens: {0}")]
    InvalidTokenCount(usize),

    /// A per-asset argument list does not line up with the pool's assets.
    #[error("{field}: expected {expected} entries, got {actual}")]
    ArityMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// No log line carried the expected result.
    #[error("Failed to find {operation} result in logs: {logs:?}")]
    MissingQuoteResult {
        operation: QuoteKind,
        logs: Vec<String>,
    },

    /// A result line matched but its payload did not fit the result shape.
    #[error("Malformed {operation} result: {reason}")]
    MalformedQuote { operation: QuoteKind, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building a token program instruction failed.
    #[error("Token instruction error: {0}")]
    Token(#[from] ProgramError),

    #[error("Signing error: {0}")]
    Signing(#[from] SignerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
