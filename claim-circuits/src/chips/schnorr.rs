//! BIP-340 signature chip
//!
//! Constraints:
//! 1. The public key is a point on secp256k1 with even y
//! 2. `e = SHA256(SHA256(tag) || SHA256(tag) || r || px || m)`, computed
//!    in-circuit over byte cells and bound to a private scalar
//! 3. `R = s·G - e·P` has x coordinate `r` and even y
//!
//! `r` is loaded as a base field element, so it is compared with `R.x`
//! without crossing moduli.

use halo2_base::{
    gates::{GateInstructions, RangeChip, RangeInstructions},
    halo2_proofs::halo2curves::secp256k1::{Fp, Fq, Secp256k1Affine},
    utils::BigPrimeField,
    AssignedValue, Context,
};
use halo2_ecc::{
    ecc::EccChip,
    fields::{FieldChip, ProperCrtUint},
    secp256k1::{FpChip, FqChip},
};
use group::prime::PrimeCurveAffine;
use sha2::{Digest, Sha256};

use super::bytes::{bind_limbs_to_be_bytes, byte_values, constant_bytes, limbs_to_be_bytes, low_bit};
use super::ecdsa::signer_key;
use super::sha256::Sha256Chip;
use super::{SignatureChip, SignerKey};
use crate::native::{affine_xy, fe_from_be, scalar_from_hash, witness_pubkey, BIP340_CHALLENGE_TAG};
use crate::{ClaimError, ClaimWitness, CircuitConfig, Result};

/// BIP-340 Schnorr chip
#[derive(Debug, Clone)]
pub struct SchnorrChip {
    /// Nonce point x coordinate (witness)
    pub r: Fp,
    /// Response scalar (witness)
    pub s: Fq,
    /// Signer public key with even y (witness)
    pub pubkey: Secp256k1Affine,
}

impl SchnorrChip {
    pub fn new(r: Fp, s: Fq, pubkey: Secp256k1Affine) -> Self {
        Self { r, s, pubkey }
    }

    /// Read the signature and key from a claim witness
    pub fn from_witness(witness: &ClaimWitness) -> Result<Self> {
        let r = fe_from_be::<Fp>(witness.r())
            .ok_or_else(|| ClaimError::InvalidWitness("BIP-340 r is not below p".into()))?;
        let s = fe_from_be::<Fq>(witness.s())
            .ok_or_else(|| ClaimError::InvalidWitness("BIP-340 s is not below n".into()))?;
        Ok(Self::new(r, s, witness_pubkey(witness)?))
    }
}

impl<F: BigPrimeField> SignatureChip<F> for SchnorrChip {
    fn synthesize(
        &self,
        ctx: &mut Context<F>,
        range: &RangeChip<F>,
        config: &CircuitConfig,
        msg: &[AssignedValue<F>],
    ) -> Result<SignerKey<F>> {
        let gate = range.gate();
        let fp_chip = FpChip::<F>::new(range, config.limb_bits, config.num_limbs);
        let fq_chip = FqChip::<F>::new(range, config.limb_bits, config.num_limbs);
        let ecc_chip = EccChip::new(&fp_chip);

        let (px, py) = affine_xy(&self.pubkey)
            .ok_or_else(|| ClaimError::InvalidWitness("public key is the identity".into()))?;
        let pubkey = ecc_chip.load_private::<Secp256k1Affine>(ctx, (px, py));
        let key = signer_key(ctx, &fp_chip, &pubkey, config)?;
        gate.assert_is_const(ctx, &key.y_parity, &F::ZERO);

        let r = fp_chip.load_private(ctx, self.r);
        fp_chip.enforce_less_than(ctx, r.clone());
        let r_bytes = limbs_to_be_bytes(ctx, gate, r.limbs(), config.limb_bits)?;

        // Challenge
        let tag = Sha256::digest(BIP340_CHALLENGE_TAG);
        let mut preimage = constant_bytes(ctx, &tag);
        preimage.extend(constant_bytes(ctx, &tag));
        preimage.extend_from_slice(&r_bytes);
        preimage.extend_from_slice(&key.x);
        preimage.extend_from_slice(msg);
        let e_bytes = Sha256Chip::new(gate).digest(ctx, &preimage);

        let e_value: [u8; 32] = byte_values(&e_bytes)
            .try_into()
            .map_err(|_| ClaimError::Backend("challenge must be 32 byte cells".into()))?;
        let e = fq_chip.load_private(ctx, scalar_from_hash(&e_value).unwrap_or_default());
        bind_limbs_to_be_bytes(ctx, gate, e.limbs(), config.limb_bits, &e_bytes)?;

        let s = fq_chip.load_private(ctx, self.s);
        let s = canonical_scalar(ctx, &fq_chip, s);

        // R = s·G - e·P
        let s_g = ecc_chip.fixed_base_scalar_mult(
            ctx,
            &Secp256k1Affine::generator(),
            s.limbs().to_vec(),
            config.limb_bits,
            config.window_bits,
        );
        let e_p = ecc_chip.scalar_mult::<Secp256k1Affine>(
            ctx,
            pubkey,
            e.limbs().to_vec(),
            config.limb_bits,
            config.window_bits,
        );
        let big_r = ecc_chip.sub_unequal(ctx, s_g, e_p, true);

        fp_chip.enforce_less_than(ctx, big_r.x().clone());
        fp_chip.enforce_less_than(ctx, big_r.y().clone());
        fp_chip.assert_equal(ctx, big_r.x().clone(), r);
        let r_parity = low_bit(ctx, gate, big_r.y().limbs()[0], config.limb_bits);
        gate.assert_is_const(ctx, &r_parity, &F::ZERO);

        Ok(key)
    }
}

/// Constrain a scalar to its canonical form below n
///
/// Without it `s` and `s + n` would both satisfy the nonce equation.
pub(crate) fn canonical_scalar<F: BigPrimeField>(
    ctx: &mut Context<F>,
    fq_chip: &FqChip<F>,
    s: ProperCrtUint<F>,
) -> ProperCrtUint<F> {
    fq_chip.enforce_less_than(ctx, s.clone());
    s
}
