//! Claim Circuit Chips
//!
//! Gadgets the claim circuits are assembled from, and the trait every
//! signature chip implements.

use halo2_base::{
    gates::{GateInstructions, RangeChip},
    utils::BigPrimeField,
    AssignedValue, Context,
    QuantumCell::{Constant, Existing},
};
use crate::{CircuitConfig, Result};

/// Trait for signature chips
///
/// A signature chip constrains a valid signature over the 32 message byte
/// cells and hands back the signer's public key in serialized form, ready
/// for identifier derivation.
pub trait SignatureChip<F: BigPrimeField> {
    /// Synthesize the signature constraints
    ///
    /// # Arguments
    /// * `ctx` - Circuit context for assigning cells and constraints
    /// * `range` - Range chip backing the non-native field arithmetic
    /// * `config` - Limb layout and scalar multiplication windows
    /// * `msg` - Message hash as 32 big-endian byte cells
    fn synthesize(
        &self,
        ctx: &mut Context<F>,
        range: &RangeChip<F>,
        config: &CircuitConfig,
        msg: &[AssignedValue<F>],
    ) -> Result<SignerKey<F>>;
}

/// Public key of a verified signature
///
/// `x` holds the canonical big-endian x coordinate bytes and `y_parity` the
/// lowest bit of the canonical y coordinate.
#[derive(Debug, Clone)]
pub struct SignerKey<F: BigPrimeField> {
    pub x: Vec<AssignedValue<F>>,
    pub y_parity: AssignedValue<F>,
}

impl<F: BigPrimeField> SignerKey<F> {
    /// 33-byte SEC1 compressed encoding, prefix `0x02 + parity`
    pub fn compressed(
        &self,
        ctx: &mut Context<F>,
        gate: &impl GateInstructions<F>,
    ) -> Vec<AssignedValue<F>> {
        let prefix = gate.add(ctx, Existing(self.y_parity), Constant(F::from(2)));
        let mut out = Vec::with_capacity(33);
        out.push(prefix);
        out.extend_from_slice(&self.x);
        out
    }

    /// 32-byte x-only encoding
    pub fn x_only(&self) -> Vec<AssignedValue<F>> {
        self.x.clone()
    }
}

pub mod bitwise;
pub mod bytes;
pub mod ecdsa;
pub mod ripemd160;
pub mod schnorr;
pub mod sha256;

pub use bitwise::Word32;
pub use ecdsa::EcdsaChip;
pub use ripemd160::Ripemd160Chip;
pub use schnorr::SchnorrChip;
pub use sha256::Sha256Chip;
