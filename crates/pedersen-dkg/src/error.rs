//! Error types for DKG and threshold signing operations

use thiserror::Error;

/// Result type alias for DKG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during key generation, resharing or signing
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid generator or session configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation called in a phase that does not allow it
    #[error("Invalid phase: cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: &'static str,
    },

    /// Fewer bundles than nodes in the set
    #[error("Incomplete bundle set: expected {expected} bundles, got {got}")]
    IncompleteBundleSet { expected: usize, got: usize },

    /// A bundle is malformed (unknown dealer, duplicate, wrong session, bad shape)
    #[error("Invalid bundle from dealer {dealer}: {reason}")]
    InvalidBundle { dealer: u32, reason: String },

    /// The dealer signature over a bundle does not verify
    #[error("Invalid signature on bundle from dealer {0}")]
    InvalidBundleSignature(u32),

    /// A deal addressed to us could not be decrypted
    #[error("Failed to decrypt deal from dealer {dealer}")]
    DecryptionFailure { dealer: u32 },

    /// A decrypted share does not match its dealer's commitment
    #[error("Share from dealer {dealer} does not match its {curve} commitment")]
    ShareVerificationFailure { dealer: u32, curve: &'static str },

    /// A dealer slot is empty after a complete bundle set was accepted
    #[error("BUG: missing {curve} contribution from dealer {dealer}")]
    MissingDealerContribution { dealer: u32, curve: &'static str },

    /// Not enough distinct valid points for interpolation
    #[error("Insufficient shares for recovery: required {required}, got {got}")]
    InsufficientShares { required: usize, got: usize },

    /// Recovered private share does not match the recovered public polynomial
    #[error("Public polynomial check failed for node {index} on {curve}")]
    PublicPolyCheckFailure { index: u32, curve: &'static str },

    /// Polynomials of different length or base cannot be combined
    #[error("Polynomial mismatch: {0}")]
    PolynomialMismatch(String),

    /// Pairing check failed
    #[error("Signature verification failed")]
    SignatureVerificationFailure,

    /// Encryption of a deal failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error, including invalid point and scalar encodings
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Network/relay error
    #[error("Relay error: {0}")]
    Relay(String),

    /// Timeout waiting for bundles
    #[error("Timeout waiting for {0}")]
    Timeout(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
