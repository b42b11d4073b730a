//! Claim Circuit
//!
//! One circuit template instantiated per [`CircuitType`]. A variant is the
//! pair (signature scheme, identifier derivation); the message type tag is
//! bound outside the circuit through the public message hash.
//!
//! Public inputs, one byte per instance cell:
//! - Claim message hash (32)
//! - Address identifier (20, 32 or 33)
//! - Destination hash (32)
//! - Chain tag (8)
//!
//! Private witness:
//! - Signature scalars and the signer's public key coordinates

use halo2_base::{
    gates::{circuit::builder::BaseCircuitBuilder, GateChip, RangeChip, RangeInstructions},
    utils::BigPrimeField,
    AssignedValue, Context,
};

use claim_core::{CircuitType, ClaimParams};

use crate::chips::bytes::{constant_bytes, load_bytes};
use crate::chips::ripemd160::hash160;
use crate::chips::sha256::Sha256Chip;
use crate::chips::{EcdsaChip, SchnorrChip, SignatureChip, SignerKey};
use crate::native::sample_claim;
use crate::{CircuitConfig, ClaimError, ClaimWitness, Result};

/// Signature relation of a circuit variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ecdsa,
    Bip340,
}

/// How a circuit variant turns the signer key into the address identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierDerivation {
    /// Hash160(compressed key)
    KeyHash,
    /// x-only key bytes
    XOnlyKey,
    /// Hash160(0x00 0x14 || Hash160(compressed key))
    NestedKeyHash,
    /// compressed key bytes
    CompressedKey,
    /// SHA256(0x21 || compressed key || OP_CHECKSIG)
    CheckSigScriptHash,
}

impl SignatureScheme {
    pub fn of(circuit_type: CircuitType) -> Self {
        if circuit_type.is_schnorr() {
            SignatureScheme::Bip340
        } else {
            SignatureScheme::Ecdsa
        }
    }
}

impl IdentifierDerivation {
    pub fn of(circuit_type: CircuitType) -> Self {
        match circuit_type {
            CircuitType::Ecdsa => IdentifierDerivation::KeyHash,
            CircuitType::Schnorr => IdentifierDerivation::XOnlyKey,
            CircuitType::P2shP2wpkh => IdentifierDerivation::NestedKeyHash,
            CircuitType::P2pk => IdentifierDerivation::CompressedKey,
            CircuitType::P2wshSingleKey => IdentifierDerivation::CheckSigScriptHash,
        }
    }

    /// Constrain the identifier bytes from a verified signer key
    pub fn derive<F: BigPrimeField>(
        self,
        ctx: &mut Context<F>,
        gate: &GateChip<F>,
        key: &SignerKey<F>,
    ) -> Vec<AssignedValue<F>> {
        match self {
            IdentifierDerivation::KeyHash => {
                let compressed = key.compressed(ctx, gate);
                hash160(ctx, gate, &compressed)
            }
            IdentifierDerivation::XOnlyKey => key.x_only(),
            IdentifierDerivation::NestedKeyHash => {
                let compressed = key.compressed(ctx, gate);
                let mut redeem = constant_bytes(ctx, &[0x00, 0x14]);
                redeem.extend(hash160(ctx, gate, &compressed));
                hash160(ctx, gate, &redeem)
            }
            IdentifierDerivation::CompressedKey => key.compressed(ctx, gate),
            IdentifierDerivation::CheckSigScriptHash => {
                let mut script = constant_bytes(ctx, &[0x21]);
                script.extend(key.compressed(ctx, gate));
                script.extend(constant_bytes(ctx, &[0xac]));
                Sha256Chip::new(gate).digest(ctx, &script)
            }
        }
    }
}

/// Claim circuit with its private witness and public input bytes
///
/// Owns the witness, so the circuit is not `Clone` either; dropping it
/// wipes the witness.
#[derive(Debug)]
pub struct ClaimCircuit {
    circuit_type: CircuitType,
    config: CircuitConfig,
    witness: ClaimWitness,
    public_inputs: Vec<u8>,
}

impl ClaimCircuit {
    /// Create a circuit for a witness and the public claim parameters
    pub fn new(
        circuit_type: CircuitType,
        config: CircuitConfig,
        witness: ClaimWitness,
        params: &ClaimParams,
    ) -> Result<Self> {
        if params.circuit_type() != circuit_type {
            return Err(ClaimError::ConstraintUnsatisfied(format!(
                "claim is for {} but the circuit is {}",
                params.circuit_type(),
                circuit_type
            )));
        }
        config.validate()?;
        Ok(Self {
            circuit_type,
            config,
            witness,
            public_inputs: params.public_inputs(),
        })
    }

    /// Circuit filled with a fixed valid claim, for keygen
    pub fn sample(circuit_type: CircuitType, config: CircuitConfig) -> Result<Self> {
        let (witness, params) = sample_claim(circuit_type)?;
        Self::new(circuit_type, config, witness, &params)
    }

    pub fn circuit_type(&self) -> CircuitType {
        self.circuit_type
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    pub fn public_inputs(&self) -> &[u8] {
        &self.public_inputs
    }

    /// Synthesize the claim constraints
    ///
    /// Returns the public input cells in instance order.
    pub fn synthesize<F: BigPrimeField>(
        &self,
        ctx: &mut Context<F>,
        range: &RangeChip<F>,
    ) -> Result<Vec<AssignedValue<F>>> {
        let gate = range.gate();
        let id_len = self.circuit_type.identifier_len();
        if self.public_inputs.len() != self.circuit_type.public_input_len() {
            return Err(ClaimError::InvalidIdentifier {
                circuit: self.circuit_type.name(),
                expected: self.circuit_type.public_input_len(),
                actual: self.public_inputs.len(),
            });
        }

        let public = load_bytes(ctx, range, &self.public_inputs);
        let msg = &public[..32];
        let identifier = &public[32..32 + id_len];

        let key = match SignatureScheme::of(self.circuit_type) {
            SignatureScheme::Ecdsa => {
                EcdsaChip::from_witness(&self.witness)?.synthesize(ctx, range, &self.config, msg)?
            }
            SignatureScheme::Bip340 => {
                SchnorrChip::from_witness(&self.witness)?.synthesize(ctx, range, &self.config, msg)?
            }
        };

        let derived = IdentifierDerivation::of(self.circuit_type).derive(ctx, gate, &key);
        if derived.len() != id_len {
            return Err(ClaimError::InvalidIdentifier {
                circuit: self.circuit_type.name(),
                expected: id_len,
                actual: derived.len(),
            });
        }
        for (d, p) in derived.iter().zip(identifier) {
            ctx.constrain_equal(d, p);
        }

        tracing::debug!(
            "Synthesized {} claim circuit: {} advice cells",
            self.circuit_type,
            ctx.advice.len()
        );
        Ok(public)
    }

    /// Synthesize into a circuit builder and expose the public inputs on
    /// instance column 0
    pub fn build<F: BigPrimeField>(&self, builder: &mut BaseCircuitBuilder<F>) -> Result<()> {
        let range = builder.range_chip();
        let public = self.synthesize(builder.main(0), &range)?;
        builder.assigned_instances[0].extend(public);
        Ok(())
    }
}
