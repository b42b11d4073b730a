//! Private claim witness
//!
//! Signature scalars and public key coordinates as 32-byte big-endian
//! values. The bytes are wiped when the witness is dropped.
//!
//! Witnesses come from raw signature parts or from an external signer that
//! implements [`ClaimSigner`].

use bitcoin::secp256k1::{Parity, PublicKey, XOnlyPublicKey};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use claim_core::{ClaimError, ClaimParams, Result};

/// Signature and public key a claim proof is generated from
///
/// For ECDSA `r` and `s` are the usual signature scalars. For BIP-340 `r`
/// is the x coordinate of the nonce point and `s` the response scalar.
///
/// Not `Clone`: the only copy lives in the [`crate::ClaimCircuit`] it is
/// moved into, and the signature chips read field elements from it during
/// synthesis.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClaimWitness {
    r: [u8; 32],
    s: [u8; 32],
    pubkey_x: [u8; 32],
    pubkey_y: [u8; 32],
}

impl ClaimWitness {
    pub fn new(r: [u8; 32], s: [u8; 32], pubkey_x: [u8; 32], pubkey_y: [u8; 32]) -> Self {
        Self {
            r,
            s,
            pubkey_x,
            pubkey_y,
        }
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    pub fn pubkey_x(&self) -> &[u8; 32] {
        &self.pubkey_x
    }

    pub fn pubkey_y(&self) -> &[u8; 32] {
        &self.pubkey_y
    }

    /// SEC1 compressed encoding of the public key
    pub fn compressed_pubkey(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = 0x02 | (self.pubkey_y[31] & 1);
        out[1..].copy_from_slice(&self.pubkey_x);
        out
    }
}

impl ClaimWitness {
    /// ECDSA witness from `(r, s)` and a SEC1 compressed public key
    pub fn ecdsa(r: [u8; 32], s: [u8; 32], compressed_pubkey: &[u8; 33]) -> Result<Self> {
        let key = PublicKey::from_slice(compressed_pubkey)
            .map_err(|e| ClaimError::InvalidWitness(format!("public key: {e}")))?;
        Ok(Self::from_key(r, s, &key))
    }

    /// BIP-340 witness from `(r, s)` and an x-only public key, lifted to its
    /// even-y point
    pub fn schnorr(r: [u8; 32], s: [u8; 32], xonly_pubkey: &[u8; 32]) -> Result<Self> {
        let xonly = XOnlyPublicKey::from_slice(xonly_pubkey)
            .map_err(|e| ClaimError::InvalidWitness(format!("x-only key: {e}")))?;
        Ok(Self::from_key(r, s, &xonly.public_key(Parity::Even)))
    }

    /// Witness from the output of an external signer
    pub fn from_signer_output(output: &SignerOutput) -> Result<Self> {
        if output.recovery_bit > 3 {
            return Err(ClaimError::InvalidWitness(format!(
                "recovery bit {} out of range",
                output.recovery_bit
            )));
        }
        Self::ecdsa(output.r, output.s, &output.compressed_pubkey)
    }

    fn from_key(r: [u8; 32], s: [u8; 32], key: &PublicKey) -> Self {
        let full = key.serialize_uncompressed();
        let mut pubkey_x = [0u8; 32];
        let mut pubkey_y = [0u8; 32];
        pubkey_x.copy_from_slice(&full[1..33]);
        pubkey_y.copy_from_slice(&full[33..]);
        Self::new(r, s, pubkey_x, pubkey_y)
    }
}

/// Result of signing a claim message hash
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SignerOutput {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_bit: u8,
    pub compressed_pubkey: [u8; 33],
}

impl fmt::Debug for SignerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerOutput")
            .field("recovery_bit", &self.recovery_bit)
            .field("compressed_pubkey", &hex::encode(self.compressed_pubkey))
            .finish_non_exhaustive()
    }
}

/// An ECDSA signer holding the key behind a claimed address, such as a
/// threshold signing service
pub trait ClaimSigner {
    /// Sign a 32-byte message hash as is, without hashing it again
    fn sign_hash(&self, hash: &[u8; 32]) -> Result<SignerOutput>;
}

/// Have `signer` sign the claim message for `params` and build the witness
pub fn sign_claim<S: ClaimSigner + ?Sized>(signer: &S, params: &ClaimParams) -> Result<ClaimWitness> {
    if params.circuit_type().is_schnorr() {
        return Err(ClaimError::InvalidWitness(
            "claim signers produce ECDSA signatures; Taproot claims need a BIP-340 witness".into(),
        ));
    }
    let output = signer.sign_hash(&params.message_hash())?;
    ClaimWitness::from_signer_output(&output)
}

impl fmt::Debug for ClaimWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimWitness").finish_non_exhaustive()
    }
}
