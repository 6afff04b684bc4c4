//! Error types shared across the substrate.

use thiserror::Error;

/// The default result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Failures of cryptographic operations.
///
/// All of these are non-fatal: the caller may discard the offending input
/// and carry on. Contract violations by the caller (e.g. a wrong-length key
/// handed to the trie) panic instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input bytes do not decode to a valid key.
    #[error("malformed key encoding")]
    MalformedKey,
    /// Input bytes do not decode to a valid signature.
    #[error("malformed signature encoding")]
    MalformedSignature,
    /// A threshold key byte stream is structurally broken.
    #[error("malformed threshold key encoding")]
    MalformedTss,
    /// A ciphertext is too short, truncated, or fails authentication.
    #[error("malformed ciphertext")]
    MalformedCiphertext,
    /// A cryptographic check did not pass.
    #[error("verification failed")]
    VerificationFailed,
    /// The same party tried to contribute twice.
    #[error("pid {0} already contributed a signature")]
    DuplicatePid(u16),
    /// The operation is not legal in the current state.
    #[error("{0}")]
    IllegalState(&'static str),
    /// A failure inside an external cryptographic backend.
    #[error("crypto backend failure: {0}")]
    Backend(String),
}

/// Failures of the reliable multicast protocol.
#[derive(Debug, Error)]
pub enum RmcError {
    /// Propagated unchanged from the underlying reader or writer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A cryptographic failure while validating protocol input.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The encoded id inside a data frame differs from the declared one.
    #[error("id in payload differs from the declared instance id")]
    IdMismatch,
    /// Data arrived that differs from a previously accepted payload.
    #[error("data differs from previously accepted payload")]
    DataConflict,
    /// The referenced instance does not exist.
    #[error("no instance with this id")]
    UnknownInstance,
    /// The operation is not legal in the instance's current state.
    #[error("{0}")]
    IllegalState(&'static str),
}
