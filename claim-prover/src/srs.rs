//! Structured reference strings
//!
//! An [`Srs`] pairs KZG parameters with where they came from. Test setups
//! sample the toxic waste locally and are flagged insecure everywhere they
//! show up; ceremony setups come from [`crate::ceremony`].

use halo2_base::halo2_proofs::{
    halo2curves::{
        bn256::{Bn256, G1Affine},
        serde::SerdeObject,
    },
    poly::{commitment::Params, kzg::commitment::ParamsKZG},
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Provenance of an SRS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SrsOrigin {
    /// Sampled locally; whoever ran the setup can forge proofs
    InsecureTest,
    /// Public powers-of-tau ceremony file with a pinned digest
    Ceremony { power: u32, sha256: [u8; 32] },
}

impl SrsOrigin {
    pub fn is_insecure(&self) -> bool {
        matches!(self, SrsOrigin::InsecureTest)
    }
}

impl fmt::Display for SrsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SrsOrigin::InsecureTest => f.write_str("INSECURE test setup (locally sampled tau)"),
            SrsOrigin::Ceremony { power, sha256 } => {
                write!(f, "ceremony power {} (sha256 {})", power, hex::encode(sha256))
            }
        }
    }
}

/// KZG parameters shared by every circuit of a setup
#[derive(Clone)]
pub struct Srs {
    params: Arc<ParamsKZG<Bn256>>,
    origin: SrsOrigin,
}

impl Srs {
    /// Sample a fresh SRS for `2^k` rows
    ///
    /// Proofs made against it are only meaningful for testing.
    pub fn insecure_test(k: u32) -> Self {
        tracing::warn!(
            "Generating INSECURE test SRS for k={}; do not use it for real claims",
            k
        );
        Self::from_params(ParamsKZG::<Bn256>::setup(k, OsRng), SrsOrigin::InsecureTest)
    }

    pub fn from_params(params: ParamsKZG<Bn256>, origin: SrsOrigin) -> Self {
        Self {
            params: Arc::new(params),
            origin,
        }
    }

    pub fn params(&self) -> &ParamsKZG<Bn256> {
        &self.params
    }

    pub fn shared_params(&self) -> Arc<ParamsKZG<Bn256>> {
        Arc::clone(&self.params)
    }

    pub fn origin(&self) -> SrsOrigin {
        self.origin
    }

    pub fn k(&self) -> u32 {
        self.params.k()
    }

    /// Digest of the parts of the SRS a verifier depends on
    pub fn fingerprint(&self) -> [u8; 32] {
        srs_fingerprint(&self.params)
    }
}

impl fmt::Debug for Srs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Srs")
            .field("k", &self.k())
            .field("origin", &self.origin)
            .finish()
    }
}

/// SHA-256 over `k`, `g[0]`, `g2` and `s·g2`
pub fn srs_fingerprint(params: &ParamsKZG<Bn256>) -> [u8; 32] {
    let g0: &G1Affine = &params.get_g()[0];
    let mut hasher = Sha256::new();
    hasher.update(params.k().to_le_bytes());
    hasher.update(g0.to_raw_bytes());
    hasher.update(params.g2().to_raw_bytes());
    hasher.update(params.s_g2().to_raw_bytes());
    hasher.finalize().into()
}
