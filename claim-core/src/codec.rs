//! Proof wire format
//!
//! `[u32 BE proof length L][L bytes proof data][remaining bytes public inputs]`

use serde::{Deserialize, Serialize};

use crate::{ClaimError, Result};

/// Smallest accepted proof length
pub const MIN_PROOF_LEN: usize = 100;
/// Largest accepted proof length (1 MiB)
pub const MAX_PROOF_LEN: usize = 1_048_576;

const LEN_PREFIX: usize = 4;

/// Proof bytes plus the public inputs they were generated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    proof_data: Vec<u8>,
    public_inputs: Vec<u8>,
}

impl Proof {
    pub fn new(proof_data: Vec<u8>, public_inputs: Vec<u8>) -> Self {
        Self {
            proof_data,
            public_inputs,
        }
    }

    pub fn proof_data(&self) -> &[u8] {
        &self.proof_data
    }

    pub fn public_inputs(&self) -> &[u8] {
        &self.public_inputs
    }

    /// Encode into the wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_proof(self)
    }

    /// Decode from the wire format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_proof(bytes)
    }
}

fn check_proof_len(len: usize) -> Result<()> {
    if len < MIN_PROOF_LEN {
        return Err(ClaimError::MalformedProof(format!(
            "proof length {len} below minimum {MIN_PROOF_LEN}"
        )));
    }
    if len > MAX_PROOF_LEN {
        return Err(ClaimError::MalformedProof(format!(
            "proof length {len} exceeds maximum {MAX_PROOF_LEN}"
        )));
    }
    Ok(())
}

/// Frame a proof for transport
///
/// Proofs outside the accepted length bounds are refused here as well, so
/// every encoded proof decodes.
pub fn encode_proof(proof: &Proof) -> Result<Vec<u8>> {
    let len = proof.proof_data.len();
    check_proof_len(len)?;

    let mut out = Vec::with_capacity(LEN_PREFIX + len + proof.public_inputs.len());
    out.extend_from_slice(&(len as u32).to_be_bytes());
    out.extend_from_slice(&proof.proof_data);
    out.extend_from_slice(&proof.public_inputs);
    Ok(out)
}

/// Parse a framed proof, enforcing the length bounds before any allocation
pub fn decode_proof(bytes: &[u8]) -> Result<Proof> {
    if bytes.len() < LEN_PREFIX {
        return Err(ClaimError::MalformedProof(format!(
            "{} bytes is too short for the length prefix",
            bytes.len()
        )));
    }
    let mut prefix = [0u8; LEN_PREFIX];
    prefix.copy_from_slice(&bytes[..LEN_PREFIX]);
    let len = u32::from_be_bytes(prefix) as usize;
    check_proof_len(len)?;

    let body = &bytes[LEN_PREFIX..];
    if body.len() < len {
        return Err(ClaimError::MalformedProof(format!(
            "declared proof length {len} but only {} bytes follow",
            body.len()
        )));
    }

    let (proof_data, public_inputs) = body.split_at(len);
    tracing::debug!(
        "Decoded proof: {} proof bytes, {} public input bytes",
        proof_data.len(),
        public_inputs.len()
    );
    Ok(Proof::new(proof_data.to_vec(), public_inputs.to_vec()))
}
