//! Claim message construction
//!
//! `SHA256(type_tag || identifier || destination_hash || chain_tag || version)`.
//! The circuits only prove a signature over whatever message hash is exposed
//! as a public input, so the verifier recomputes this value itself.

use sha2::{Digest, Sha256};

/// Protocol version suffix of every claim message
pub const CLAIM_VERSION: &[u8] = b"qbtc-claim-v1";

/// Compute the 32-byte claim message hash
pub fn compute_claim_message(
    type_tag: &[u8],
    identifier: &[u8],
    destination_hash: &[u8; 32],
    chain_tag: &[u8; 8],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(type_tag);
    hasher.update(identifier);
    hasher.update(destination_hash);
    hasher.update(chain_tag);
    hasher.update(CLAIM_VERSION);
    hasher.finalize().into()
}

/// Recompute the claim message and compare it with `hash`
pub fn verify_claim_message(
    hash: &[u8; 32],
    type_tag: &[u8],
    identifier: &[u8],
    destination_hash: &[u8; 32],
    chain_tag: &[u8; 8],
) -> bool {
    let expected = compute_claim_message(type_tag, identifier, destination_hash, chain_tag);
    expected == *hash
}

/// SHA-256 of the destination account string
pub fn destination_hash(destination: &str) -> [u8; 32] {
    Sha256::digest(destination.as_bytes()).into()
}

/// First 8 bytes of SHA-256 of the chain id
pub fn chain_tag(chain_id: &str) -> [u8; 8] {
    let digest = Sha256::digest(chain_id.as_bytes());
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&digest[..8]);
    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CircuitType;

    // Hash160 of the compressed public key for private key 1
    const G_HASH160: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    fn sample() -> (Vec<u8>, [u8; 32], [u8; 8]) {
        (
            hex::decode(G_HASH160).unwrap(),
            destination_hash("claimer-1"),
            chain_tag("test-chain-1"),
        )
    }

    #[test]
    fn test_message_is_deterministic() {
        let (id, dest, chain) = sample();
        let a = compute_claim_message(b"ecdsa:", &id, &dest, &chain);
        let b = compute_claim_message(b"ecdsa:", &id, &dest, &chain);
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_matches_formula() {
        let (id, dest, chain) = sample();

        let mut preimage = Vec::new();
        preimage.extend_from_slice(b"ecdsa:");
        preimage.extend_from_slice(&id);
        preimage.extend_from_slice(&Sha256::digest(b"claimer-1"));
        preimage.extend_from_slice(&Sha256::digest(b"test-chain-1")[..8]);
        preimage.extend_from_slice(b"qbtc-claim-v1");
        let expected: [u8; 32] = Sha256::digest(&preimage).into();

        assert_eq!(compute_claim_message(b"ecdsa:", &id, &dest, &chain), expected);
    }

    #[test]
    fn test_single_byte_flips_change_message() {
        let (id, dest, chain) = sample();
        let base = compute_claim_message(b"ecdsa:", &id, &dest, &chain);

        for i in 0..id.len() {
            let mut flipped = id.clone();
            flipped[i] ^= 0x01;
            assert_ne!(compute_claim_message(b"ecdsa:", &flipped, &dest, &chain), base, "identifier byte {i}");
        }
        for i in 0..32 {
            let mut flipped = dest;
            flipped[i] ^= 0x80;
            assert_ne!(compute_claim_message(b"ecdsa:", &id, &flipped, &chain), base, "destination byte {i}");
        }
        for i in 0..8 {
            let mut flipped = chain;
            flipped[i] ^= 0xff;
            assert_ne!(compute_claim_message(b"ecdsa:", &id, &dest, &flipped), base, "chain byte {i}");
        }
    }

    #[test]
    fn test_type_tags_separate_domains() {
        let id = [0x11u8; 32];
        let dest = destination_hash("claimer-1");
        let chain = chain_tag("test-chain-1");

        let schnorr = compute_claim_message(CircuitType::Schnorr.type_tag(), &id, &dest, &chain);
        let p2wsh = compute_claim_message(CircuitType::P2wshSingleKey.type_tag(), &id, &dest, &chain);
        assert_ne!(schnorr, p2wsh);
    }

    #[test]
    fn test_verify_claim_message() {
        let (id, dest, chain) = sample();
        let hash = compute_claim_message(b"ecdsa:", &id, &dest, &chain);

        assert!(verify_claim_message(&hash, b"ecdsa:", &id, &dest, &chain));
        assert!(!verify_claim_message(&hash, b"p2sh:", &id, &dest, &chain));
        assert!(!verify_claim_message(&hash, b"ecdsa:", &id, &destination_hash("claimer-2"), &chain));
    }
}
