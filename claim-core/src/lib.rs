//! Claim Core - Address decoding, claim binding and proof framing
//!
//! This crate holds everything about a Bitcoin claim proof that does not
//! depend on the proving backend:
//!
//! * Decoding Bitcoin addresses into a typed claim identifier
//! * The deterministic claim message that binds a proof to a script type,
//!   identifier, destination account, chain and protocol version
//! * The binary framing used to ship a proof and its public inputs
//!
//! # Usage
//!
//! ```no_run
//! use claim_core::{parse_address, ClaimParams};
//! use bitcoin::Network;
//!
//! let parsed = parse_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", Network::Bitcoin).unwrap();
//! let params = ClaimParams::new(parsed.identifier, "claimer-1", "test-chain-1");
//! println!("claim message: {}", hex::encode(params.message_hash()));
//! ```

pub mod address;
pub mod codec;
pub mod error;
pub mod message;
pub mod types;

pub use address::{parse_address, parse_p2sh_address, ParsedAddress};
pub use codec::{decode_proof, encode_proof, Proof, MAX_PROOF_LEN, MIN_PROOF_LEN};
pub use error::ClaimError;
pub use message::{
    chain_tag, compute_claim_message, destination_hash, verify_claim_message, CLAIM_VERSION,
};
pub use types::{AddressType, CircuitType, ClaimIdentifier, ClaimParams};

/// Result type for claim operations
pub type Result<T> = std::result::Result<T, ClaimError>;
