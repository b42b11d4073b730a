//! ECDSA signature chip
//!
//! Wraps halo2-ecc's secp256k1 ECDSA verification. The message scalar is a
//! private CRT value constrained limb by limb to the message byte cells, so
//! the signature is checked over exactly the public message hash.

use halo2_base::{
    gates::{GateInstructions, RangeChip, RangeInstructions},
    halo2_proofs::halo2curves::secp256k1::{Fp, Fq, Secp256k1Affine},
    utils::BigPrimeField,
    AssignedValue, Context,
};
use halo2_ecc::{
    ecc::{ecdsa::ecdsa_verify_no_pubkey_check, EccChip, EcPoint},
    fields::{FieldChip, ProperCrtUint},
    secp256k1::{FpChip, FqChip},
};

use super::bytes::{bind_limbs_to_be_bytes, byte_values, limbs_to_be_bytes, low_bit};
use super::{SignatureChip, SignerKey};
use crate::native::{affine_xy, fe_from_be, scalar_from_hash, witness_pubkey};
use crate::{ClaimError, ClaimWitness, CircuitConfig, Result};

/// ECDSA chip
///
/// Constraints:
/// 1. The public key is a point on secp256k1
/// 2. `m` (private scalar) equals the 32 message bytes
/// 3. `(r, s)` is a valid ECDSA signature over `m` for the key
#[derive(Debug, Clone)]
pub struct EcdsaChip {
    /// Signature `r` (witness)
    pub r: Fq,
    /// Signature `s` (witness)
    pub s: Fq,
    /// Signer public key (witness)
    pub pubkey: Secp256k1Affine,
}

impl EcdsaChip {
    pub fn new(r: Fq, s: Fq, pubkey: Secp256k1Affine) -> Self {
        Self { r, s, pubkey }
    }

    /// Read the signature and key from a claim witness
    pub fn from_witness(witness: &ClaimWitness) -> Result<Self> {
        let r = fe_from_be::<Fq>(witness.r())
            .ok_or_else(|| ClaimError::InvalidWitness("ECDSA r is not below n".into()))?;
        let s = fe_from_be::<Fq>(witness.s())
            .ok_or_else(|| ClaimError::InvalidWitness("ECDSA s is not below n".into()))?;
        Ok(Self::new(r, s, witness_pubkey(witness)?))
    }
}

impl<F: BigPrimeField> SignatureChip<F> for EcdsaChip {
    fn synthesize(
        &self,
        ctx: &mut Context<F>,
        range: &RangeChip<F>,
        config: &CircuitConfig,
        msg: &[AssignedValue<F>],
    ) -> Result<SignerKey<F>> {
        let fp_chip = FpChip::<F>::new(range, config.limb_bits, config.num_limbs);
        let fq_chip = FqChip::<F>::new(range, config.limb_bits, config.num_limbs);
        let ecc_chip = EccChip::new(&fp_chip);

        // Out-of-range hashes get a zero scalar; the byte binding then fails
        let msg_bytes: [u8; 32] = byte_values(msg)
            .try_into()
            .map_err(|_| ClaimError::Backend("message must be 32 byte cells".into()))?;
        let m_value = scalar_from_hash(&msg_bytes).unwrap_or_default();

        let m = fq_chip.load_private(ctx, m_value);
        bind_limbs_to_be_bytes(ctx, range.gate(), m.limbs(), config.limb_bits, msg)?;

        let r = fq_chip.load_private(ctx, self.r);
        let s = fq_chip.load_private(ctx, self.s);

        let (px, py) = affine_xy(&self.pubkey)
            .ok_or_else(|| ClaimError::InvalidWitness("public key is the identity".into()))?;
        let pubkey = ecc_chip.load_private::<Secp256k1Affine>(ctx, (px, py));
        let valid = ecdsa_verify_no_pubkey_check::<F, Fp, Fq, Secp256k1Affine>(
            &ecc_chip,
            ctx,
            pubkey.clone(),
            r,
            s,
            m,
            config.window_bits,
            config.window_bits,
        );
        range.gate().assert_is_const(ctx, &valid, &F::ONE);

        signer_key(ctx, &fp_chip, &pubkey, config)
    }
}

/// Serialize a loaded public key: canonical x bytes and y parity
pub fn signer_key<F: BigPrimeField>(
    ctx: &mut Context<F>,
    fp_chip: &FpChip<F>,
    point: &EcPoint<F, ProperCrtUint<F>>,
    config: &CircuitConfig,
) -> Result<SignerKey<F>> {
    let gate = fp_chip.range().gate();

    // Non-canonical limbs would let a coordinate serialize two ways
    fp_chip.enforce_less_than(ctx, point.x().clone());
    fp_chip.enforce_less_than(ctx, point.y().clone());

    let x = limbs_to_be_bytes(ctx, gate, point.x().limbs(), config.limb_bits)?;
    let y_parity = low_bit(ctx, gate, point.y().limbs()[0], config.limb_bits);
    Ok(SignerKey { x, y_parity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::bytes::load_bytes;
    use crate::native::sign_ecdsa;
    use ff::Field;
    use halo2_base::utils::ScalarField;
    use group::{prime::PrimeCurveAffine, Curve, Group};
    use halo2_base::halo2_proofs::halo2curves::secp256k1::Secp256k1;
    use halo2_base::utils::testing::base_test;

    fn run(chip: &EcdsaChip, msg: [u8; 32], expect: bool) -> Option<Vec<u8>> {
        let config = CircuitConfig::default();
        base_test()
            .k(config.k)
            .lookup_bits(config.lookup_bits)
            .expect_satisfied(expect)
            .run(|ctx, range| {
                let msg = load_bytes(ctx, range, &msg);
                let key = chip.synthesize(ctx, range, &config, &msg).ok()?;
                let mut out = byte_values(&key.x);
                out.push(key.y_parity.value().get_lower_64() as u8);
                Some(out)
            })
    }

    #[test]
    fn test_ecdsa_chip_valid_signature() {
        let secret = Fq::from(0x1337u64);
        let msg = [0x5au8; 32];
        let (r, s) = sign_ecdsa(secret, Fq::from(99), &msg).unwrap();
        let pubkey = (Secp256k1::generator() * secret).to_affine();
        let chip = EcdsaChip::new(
            fe_from_be(&r).unwrap(),
            fe_from_be(&s).unwrap(),
            pubkey,
        );

        let out = run(&chip, msg, true).unwrap();
        let (x, y) = affine_xy(&pubkey).unwrap();
        assert_eq!(&out[..32], &crate::native::fe_to_be(&x));
        assert_eq!(out[32], crate::native::fe_to_be(&y)[31] & 1);
    }

    #[test]
    fn test_ecdsa_chip_rejects_other_message() {
        let secret = Fq::from(0x1337u64);
        let (r, s) = sign_ecdsa(secret, Fq::from(99), &[0x5a; 32]).unwrap();
        let chip = EcdsaChip::new(
            fe_from_be(&r).unwrap(),
            fe_from_be(&s).unwrap(),
            (Secp256k1::generator() * secret).to_affine(),
        );
        run(&chip, [0x5b; 32], false);
    }

    #[test]
    fn test_from_witness_rejects_off_curve_key() {
        let g = Secp256k1Affine::generator();
        let (x, y) = affine_xy(&g).unwrap();
        let bad_y = y + Fp::ONE;
        let witness = ClaimWitness::new(
            [1; 32],
            [1; 32],
            crate::native::fe_to_be(&x),
            crate::native::fe_to_be(&bad_y),
        );
        assert!(matches!(
            EcdsaChip::from_witness(&witness),
            Err(ClaimError::InvalidWitness(_))
        ));
    }
}
