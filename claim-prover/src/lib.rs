//! Claim Prover - Setup, proof generation and verification
//!
//! This crate connects the claim circuits to the Halo2 proving system:
//!
//! * Trusted setup: an INSECURE locally sampled SRS for tests, or a public
//!   powers-of-tau ceremony file checked against a pinned digest
//! * Per-circuit key generation with an on-disk cache
//! * [`Prover`], which refuses to prove claims the witness does not satisfy
//! * [`Verifier`], [`MultiVerifier`] and the write-once verifier registry
//!
//! # Usage
//!
//! ```no_run
//! use claim_circuits::{native::sample_claim, CircuitConfig};
//! use claim_core::CircuitType;
//! use claim_prover::{insecure_test_setup, Prover, Verifier};
//!
//! let setup = insecure_test_setup(CircuitType::Ecdsa, CircuitConfig::default()).unwrap();
//! let (witness, params) = sample_claim(CircuitType::Ecdsa).unwrap();
//!
//! let prover = Prover::new(setup);
//! let proof = prover.generate_proof(witness, &params).unwrap();
//!
//! let verifier = Verifier::new(&prover.setup().verifying_key_bundle(), &prover.setup().srs).unwrap();
//! verifier.verify(&proof, &params).unwrap();
//! ```

pub mod backend;
pub mod ceremony;
pub mod keygen;
pub mod registry;
pub mod srs;
pub mod verifier;

pub use ceremony::{load_ceremony_srs, CeremonyConfig};
pub use keygen::{ceremony_setup, insecure_test_setup, ConstraintSystem, SetupConfig, SetupResult};
pub use registry::{register_verifier, registered_verifier, VerifierRegistry};
pub use srs::{Srs, SrsOrigin};
pub use verifier::{MultiVerifier, Verifier, VerifyingKeyBundle, VerifyingKeySet};

pub use claim_core::{ClaimError, Proof, Result};

use halo2_base::{
    gates::circuit::builder::BaseCircuitBuilder, halo2_proofs::halo2curves::bn256::Fr,
};
use std::sync::Arc;

use claim_circuits::{native::check_claim, sign_claim, ClaimCircuit, ClaimSigner, ClaimWitness};
use claim_core::ClaimParams;

/// Generates claim proofs for one circuit type
#[derive(Debug, Clone)]
pub struct Prover {
    setup: Arc<SetupResult>,
}

impl Prover {
    pub fn new(setup: SetupResult) -> Self {
        Self::from_shared(Arc::new(setup))
    }

    pub fn from_shared(setup: Arc<SetupResult>) -> Self {
        if setup.srs.origin().is_insecure() {
            tracing::warn!(
                "{} prover uses an INSECURE test setup",
                setup.circuit_type()
            );
        }
        Self { setup }
    }

    pub fn setup(&self) -> &SetupResult {
        &self.setup
    }

    /// Prove that `witness` authorizes the claim in `params`
    ///
    /// Fails with `ConstraintUnsatisfied` when the signature does not verify
    /// over the claim message or the key does not derive the identifier. The
    /// witness is consumed and wiped on every path.
    pub fn generate_proof(&self, witness: ClaimWitness, params: &ClaimParams) -> Result<Proof> {
        let cs = &self.setup.constraint_system;
        let circuit_type = cs.circuit_type;
        tracing::info!(
            "Generating {} proof for destination {} on {}",
            circuit_type,
            params.destination,
            params.chain_id
        );

        check_claim(circuit_type, &witness, params)?;
        let circuit = ClaimCircuit::new(circuit_type, cs.config, witness, params)?;

        let mut builder =
            BaseCircuitBuilder::<Fr>::prover(cs.circuit_params.clone(), cs.break_points.clone());
        circuit.build(&mut builder)?;
        drop(circuit);

        let expected = params.public_inputs();
        let assigned = &builder.assigned_instances[0];
        let matches = assigned.len() == expected.len()
            && assigned
                .iter()
                .zip(&expected)
                .all(|(cell, byte)| *cell.value() == Fr::from(*byte as u64));
        if !matches {
            return Err(ClaimError::ConstraintUnsatisfied(
                "assigned public inputs differ from the claim".into(),
            ));
        }

        let instances = backend::byte_instances(&expected);
        let srs = &self.setup.srs;
        let proof_data = backend::prove(srs.params(), &self.setup.proving_key, builder, &instances)?;
        tracing::debug!("Proof size: {} bytes", proof_data.len());

        // Halo2 proves unsatisfied circuits too; only keep proofs that verify
        backend::verify(srs.params(), self.setup.verifying_key(), &proof_data, &instances)
            .map_err(|e| {
                ClaimError::ConstraintUnsatisfied(format!("proof failed self-verification: {e}"))
            })?;

        tracing::info!("{} proof generated", circuit_type);
        Ok(Proof::new(proof_data, expected))
    }

    /// Sign the claim message with `signer` and prove the result
    pub fn prove_with_signer<S: ClaimSigner + ?Sized>(
        &self,
        signer: &S,
        params: &ClaimParams,
    ) -> Result<Proof> {
        let witness = sign_claim(signer, params)?;
        self.generate_proof(witness, params)
    }
}
