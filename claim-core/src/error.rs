//! Error types shared by every claim crate.

use thiserror::Error;

/// Errors produced while building, proving or verifying a claim.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Length or framing violation in an encoded proof
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// The witness does not satisfy the claim relation, so no proof exists
    #[error("constraint unsatisfied: {0}")]
    ConstraintUnsatisfied(String),

    /// Public inputs differ from the recomputed claim, or the proof check failed
    #[error("verification mismatch: {0}")]
    VerificationMismatch(String),

    /// Ceremony digest mismatch, bad curve point or an undersized SRS
    #[error("setup integrity failure: {0}")]
    SetupIntegrityFailure(String),

    /// The verifier registry already holds a verifying key
    #[error("verifier registry already initialized")]
    AlreadyInitialized,

    /// The address decodes to a type no circuit can prove
    #[error("unsupported address: {0}")]
    UnsupportedAddress(String),

    /// A P2SH address wraps a script no circuit can prove
    #[error("unsupported script: {0}")]
    UnsupportedScript(String),

    /// Bad checksum, bad encoding or wrong network
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Identifier length does not match the circuit type
    #[error("invalid identifier for {circuit}: expected {expected} bytes, got {actual}")]
    InvalidIdentifier {
        circuit: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Signature or public key material that cannot be decoded
    #[error("invalid witness: {0}")]
    InvalidWitness(String),

    /// Proving backend failure unrelated to witness validity
    #[error("proof backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Setup artifact load/save failure with context
    #[error("setup artifact error: {0:#}")]
    Artifact(#[from] anyhow::Error),
}
