//! Claim Circuits - Halo2 circuits for Bitcoin address claims
//!
//! Every claim circuit proves two relations over a secp256k1 key pair:
//! a signature over the public claim message, and that the public key
//! derives the public address identifier. The five circuit variants differ
//! only in the signature scheme and the identifier derivation.
//!
//! The building blocks are halo2-base gadgets:
//!
//! * [`chips::bitwise`] - 32-bit word operations on single-bit wires
//! * [`chips::sha256`] / [`chips::ripemd160`] - hash chips over byte cells
//! * [`chips::ecdsa`] / [`chips::schnorr`] - signature chips on top of
//!   halo2-ecc's secp256k1 field and curve chips

pub mod chips;
pub mod claim;
pub mod config;
pub mod native;
pub mod witness;

pub use claim::{ClaimCircuit, IdentifierDerivation, SignatureScheme};
pub use config::CircuitConfig;
pub use witness::{sign_claim, ClaimSigner, ClaimWitness, SignerOutput};

pub use claim_core::{ClaimError, Result};
