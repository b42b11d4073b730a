//! Address, circuit and claim parameter types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::{chain_tag, compute_claim_message, destination_hash};
use crate::{ClaimError, Result};

/// Bitcoin output script family an address decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    P2pkh,
    P2wpkh,
    P2sh,
    P2tr,
    P2pk,
    P2wsh,
    Unknown,
}

impl AddressType {
    /// Circuit able to prove control of this address type
    pub fn circuit_type(self) -> Result<CircuitType> {
        match self {
            AddressType::P2pkh | AddressType::P2wpkh => Ok(CircuitType::Ecdsa),
            AddressType::P2sh => Ok(CircuitType::P2shP2wpkh),
            AddressType::P2tr => Ok(CircuitType::Schnorr),
            AddressType::P2pk => Ok(CircuitType::P2pk),
            AddressType::P2wsh => Ok(CircuitType::P2wshSingleKey),
            AddressType::Unknown => Err(ClaimError::UnsupportedAddress(
                "address type has no claim circuit".into(),
            )),
        }
    }
}

/// Circuit variant a claim proof is generated against
///
/// Each variant proves a signature relation and an identifier relation.
/// The variant is never inferred from proof bytes; callers pick it from the
/// address type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CircuitType {
    /// ECDSA signature, identifier = Hash160(compressed pubkey) (P2PKH, P2WPKH)
    Ecdsa,
    /// BIP-340 signature, identifier = x-only pubkey (P2TR)
    Schnorr,
    /// ECDSA signature, identifier = Hash160(0x0014 || Hash160(pubkey))
    P2shP2wpkh,
    /// ECDSA signature, identifier = compressed pubkey
    P2pk,
    /// ECDSA signature, identifier = SHA256(<pubkey> OP_CHECKSIG)
    P2wshSingleKey,
}

impl CircuitType {
    /// All circuit variants in wire-tag order
    pub const ALL: [CircuitType; 5] = [
        CircuitType::Ecdsa,
        CircuitType::Schnorr,
        CircuitType::P2shP2wpkh,
        CircuitType::P2pk,
        CircuitType::P2wshSingleKey,
    ];

    /// Domain tag prepended to the claim message
    pub fn type_tag(self) -> &'static [u8] {
        match self {
            CircuitType::Ecdsa => b"ecdsa:",
            CircuitType::Schnorr => b"schnorr:",
            CircuitType::P2shP2wpkh => b"p2sh:",
            CircuitType::P2pk => b"p2pk:",
            CircuitType::P2wshSingleKey => b"p2wsh:",
        }
    }

    /// One-byte tag used in serialized setup artifacts
    pub fn wire_tag(self) -> u8 {
        match self {
            CircuitType::Ecdsa => 1,
            CircuitType::Schnorr => 2,
            CircuitType::P2shP2wpkh => 3,
            CircuitType::P2pk => 4,
            CircuitType::P2wshSingleKey => 5,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.wire_tag() == tag)
            .ok_or_else(|| ClaimError::MalformedProof(format!("unknown circuit tag {tag}")))
    }

    /// Identifier length in bytes
    pub fn identifier_len(self) -> usize {
        match self {
            CircuitType::Ecdsa | CircuitType::P2shP2wpkh => 20,
            CircuitType::Schnorr | CircuitType::P2wshSingleKey => 32,
            CircuitType::P2pk => 33,
        }
    }

    /// Short lowercase name, used in cache file names and logs
    pub fn name(self) -> &'static str {
        match self {
            CircuitType::Ecdsa => "ecdsa",
            CircuitType::Schnorr => "schnorr",
            CircuitType::P2shP2wpkh => "p2sh_p2wpkh",
            CircuitType::P2pk => "p2pk",
            CircuitType::P2wshSingleKey => "p2wsh_single_key",
        }
    }

    /// Whether the circuit checks a BIP-340 signature instead of ECDSA
    pub fn is_schnorr(self) -> bool {
        matches!(self, CircuitType::Schnorr)
    }

    /// Number of public input bytes: message, identifier, destination, chain
    pub fn public_input_len(self) -> usize {
        32 + self.identifier_len() + 32 + 8
    }
}

impl fmt::Display for CircuitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier a claim is made for, sized by its circuit type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdentifier")]
pub struct ClaimIdentifier {
    circuit_type: CircuitType,
    bytes: Vec<u8>,
}

/// Unchecked serde form of [`ClaimIdentifier`]
#[derive(Deserialize)]
struct RawIdentifier {
    circuit_type: CircuitType,
    bytes: Vec<u8>,
}

impl TryFrom<RawIdentifier> for ClaimIdentifier {
    type Error = ClaimError;

    fn try_from(raw: RawIdentifier) -> Result<Self> {
        Self::new(raw.circuit_type, raw.bytes)
    }
}

impl ClaimIdentifier {
    /// Create an identifier, rejecting lengths that do not fit the circuit type
    pub fn new(circuit_type: CircuitType, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() != circuit_type.identifier_len() {
            return Err(ClaimError::InvalidIdentifier {
                circuit: circuit_type.name(),
                expected: circuit_type.identifier_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { circuit_type, bytes })
    }

    pub fn circuit_type(&self) -> CircuitType {
        self.circuit_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Public claim parameters, known to both prover and verifier
///
/// The destination and chain id are hashed into the claim message; the proof
/// carries the message hash as a public input, so changing either one
/// invalidates the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimParams {
    /// Bitcoin-side identifier (hash, program or key)
    pub identifier: ClaimIdentifier,
    /// Destination account on the host chain
    pub destination: String,
    /// Host chain id
    pub chain_id: String,
}

impl ClaimParams {
    pub fn new(
        identifier: ClaimIdentifier,
        destination: impl Into<String>,
        chain_id: impl Into<String>,
    ) -> Self {
        Self {
            identifier,
            destination: destination.into(),
            chain_id: chain_id.into(),
        }
    }

    pub fn circuit_type(&self) -> CircuitType {
        self.identifier.circuit_type()
    }

    pub fn destination_hash(&self) -> [u8; 32] {
        destination_hash(&self.destination)
    }

    pub fn chain_tag(&self) -> [u8; 8] {
        chain_tag(&self.chain_id)
    }

    /// Claim message hash the signature must be made over
    pub fn message_hash(&self) -> [u8; 32] {
        compute_claim_message(
            self.circuit_type().type_tag(),
            self.identifier.as_bytes(),
            &self.destination_hash(),
            &self.chain_tag(),
        )
    }

    /// Public input bytes in circuit order: message, identifier, destination, chain
    pub fn public_inputs(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.circuit_type().public_input_len());
        out.extend_from_slice(&self.message_hash());
        out.extend_from_slice(self.identifier.as_bytes());
        out.extend_from_slice(&self.destination_hash());
        out.extend_from_slice(&self.chain_tag());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_type_mapping() {
        assert_eq!(AddressType::P2pkh.circuit_type().unwrap(), CircuitType::Ecdsa);
        assert_eq!(AddressType::P2wpkh.circuit_type().unwrap(), CircuitType::Ecdsa);
        assert_eq!(AddressType::P2sh.circuit_type().unwrap(), CircuitType::P2shP2wpkh);
        assert_eq!(AddressType::P2tr.circuit_type().unwrap(), CircuitType::Schnorr);
        assert_eq!(AddressType::P2pk.circuit_type().unwrap(), CircuitType::P2pk);
        assert_eq!(AddressType::P2wsh.circuit_type().unwrap(), CircuitType::P2wshSingleKey);
        assert!(matches!(
            AddressType::Unknown.circuit_type(),
            Err(ClaimError::UnsupportedAddress(_))
        ));
    }

    #[test]
    fn test_wire_tags_round_trip() {
        for t in CircuitType::ALL {
            assert_eq!(CircuitType::from_wire_tag(t.wire_tag()).unwrap(), t);
        }
        assert!(CircuitType::from_wire_tag(0).is_err());
        assert!(CircuitType::from_wire_tag(6).is_err());
    }

    #[test]
    fn test_identifier_length_checked() {
        assert!(ClaimIdentifier::new(CircuitType::Ecdsa, vec![0u8; 20]).is_ok());
        assert!(ClaimIdentifier::new(CircuitType::P2pk, vec![2u8; 33]).is_ok());

        let err = ClaimIdentifier::new(CircuitType::Schnorr, vec![0u8; 20]).unwrap_err();
        assert!(matches!(
            err,
            ClaimError::InvalidIdentifier { expected: 32, actual: 20, .. }
        ));
    }

    #[test]
    fn test_deserialize_checks_identifier_length() {
        let id = ClaimIdentifier::new(CircuitType::Ecdsa, vec![7u8; 20]).unwrap();
        let params = ClaimParams::new(id, "claimer-1", "test-chain-1");
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(serde_json::from_str::<ClaimParams>(&json).unwrap(), params);

        let short = json.replacen("7,", "", 1);
        let err = serde_json::from_str::<ClaimParams>(&short).unwrap_err();
        assert!(err.to_string().contains("expected 20 bytes, got 19"));
    }

    #[test]
    fn test_public_inputs_layout() {
        let id = ClaimIdentifier::new(CircuitType::Ecdsa, vec![7u8; 20]).unwrap();
        let params = ClaimParams::new(id, "claimer-1", "test-chain-1");
        let inputs = params.public_inputs();

        assert_eq!(inputs.len(), CircuitType::Ecdsa.public_input_len());
        assert_eq!(&inputs[..32], &params.message_hash());
        assert_eq!(&inputs[32..52], &[7u8; 20]);
        assert_eq!(&inputs[52..84], &params.destination_hash());
        assert_eq!(&inputs[84..], &params.chain_tag());
    }
}
