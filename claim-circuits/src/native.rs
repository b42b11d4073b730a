//! Native claim relations
//!
//! Out-of-circuit versions of what the claim circuits constrain. The prover
//! runs these before synthesis so an unsatisfiable witness is reported as
//! such instead of surfacing as a failed proof, and keygen uses the sample
//! claims to lay out the circuits.

use bitcoin::hashes::{hash160, Hash};
use ff::{Field, PrimeField};
use group::{prime::PrimeCurveAffine, Curve, Group};
use halo2_base::halo2_proofs::arithmetic::CurveAffine;
use halo2_base::halo2_proofs::halo2curves::secp256k1::{Fp, Fq, Secp256k1, Secp256k1Affine};
use halo2_base::utils::{biguint_to_fe, modulus};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use claim_core::{CircuitType, ClaimIdentifier, ClaimParams};

use crate::{ClaimError, ClaimWitness, Result};

/// BIP-340 challenge tag
pub const BIP340_CHALLENGE_TAG: &[u8] = b"BIP0340/challenge";

/// Parse a 32-byte big-endian value as a canonical field element
pub fn fe_from_be<F: PrimeField>(bytes: &[u8; 32]) -> Option<F> {
    let mut repr = F::Repr::default();
    let dst = repr.as_mut();
    if dst.len() != 32 {
        return None;
    }
    for (d, b) in dst.iter_mut().zip(bytes.iter().rev()) {
        *d = *b;
    }
    Option::from(F::from_repr(repr))
}

/// 32-byte big-endian encoding of a field element
pub fn fe_to_be<F: PrimeField>(fe: &F) -> [u8; 32] {
    let repr = fe.to_repr();
    let mut out = [0u8; 32];
    for (o, b) in out.iter_mut().zip(repr.as_ref().iter().rev()) {
        *o = *b;
    }
    out
}

/// Interpret 32 bytes as an integer below the group order n
pub fn scalar_from_hash(bytes: &[u8; 32]) -> Option<Fq> {
    let value = BigUint::from_bytes_be(bytes);
    (value < modulus::<Fq>()).then(|| biguint_to_fe(&value))
}

/// Affine coordinates, `None` for the point at infinity
pub fn affine_xy(point: &Secp256k1Affine) -> Option<(Fp, Fp)> {
    let coords: Option<_> = point.coordinates().into();
    coords.map(|c| (*c.x(), *c.y()))
}

fn is_odd(fe: &Fp) -> bool {
    fe_to_be(fe)[31] & 1 == 1
}

/// SEC1 compressed encoding
pub fn compressed_pubkey(point: &Secp256k1Affine) -> Option<[u8; 33]> {
    let (x, y) = affine_xy(point)?;
    let mut out = [0u8; 33];
    out[0] = 0x02 | is_odd(&y) as u8;
    out[1..].copy_from_slice(&fe_to_be(&x));
    Some(out)
}

/// The witness public key as a curve point
pub fn witness_pubkey(witness: &ClaimWitness) -> Result<Secp256k1Affine> {
    let x = fe_from_be::<Fp>(witness.pubkey_x())
        .ok_or_else(|| ClaimError::InvalidWitness("public key x is not canonical".into()))?;
    let y = fe_from_be::<Fp>(witness.pubkey_y())
        .ok_or_else(|| ClaimError::InvalidWitness("public key y is not canonical".into()))?;
    Option::from(Secp256k1Affine::from_xy(x, y))
        .ok_or_else(|| ClaimError::InvalidWitness("public key is not on secp256k1".into()))
}

/// Identifier a public key derives for a circuit type
pub fn derive_identifier(circuit_type: CircuitType, compressed: &[u8; 33]) -> Vec<u8> {
    let key_hash = || hash160::Hash::hash(compressed).to_byte_array();
    match circuit_type {
        CircuitType::Ecdsa => key_hash().to_vec(),
        CircuitType::Schnorr => compressed[1..].to_vec(),
        CircuitType::P2shP2wpkh => {
            let mut redeem = vec![0x00, 0x14];
            redeem.extend_from_slice(&key_hash());
            hash160::Hash::hash(&redeem).to_byte_array().to_vec()
        }
        CircuitType::P2pk => compressed.to_vec(),
        CircuitType::P2wshSingleKey => {
            let mut script = vec![0x21];
            script.extend_from_slice(compressed);
            script.push(0xac);
            Sha256::digest(&script).to_vec()
        }
    }
}

/// ECDSA verification with the message hash read as an integer below n
pub fn verify_ecdsa(msg: &[u8; 32], r: &[u8; 32], s: &[u8; 32], pubkey: &Secp256k1Affine) -> bool {
    let (Some(e), Some(r), Some(s)) = (scalar_from_hash(msg), fe_from_be::<Fq>(r), fe_from_be::<Fq>(s))
    else {
        return false;
    };
    if bool::from(r.is_zero()) || bool::from(s.is_zero()) {
        return false;
    }
    let Some(w) = Option::<Fq>::from(s.invert()) else {
        return false;
    };
    let point = (Secp256k1::generator() * (e * w) + *pubkey * (r * w)).to_affine();
    match affine_xy(&point) {
        Some((x, _)) => scalar_from_x(&x) == r,
        None => false,
    }
}

fn scalar_from_x(x: &Fp) -> Fq {
    let value = BigUint::from_bytes_be(&fe_to_be(x)) % modulus::<Fq>();
    biguint_to_fe(&value)
}

/// `SHA256(SHA256(tag) || SHA256(tag) || r || px || msg)`
pub fn bip340_challenge(r: &[u8; 32], px: &[u8; 32], msg: &[u8; 32]) -> [u8; 32] {
    let tag = Sha256::digest(BIP340_CHALLENGE_TAG);
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(tag);
    hasher.update(r);
    hasher.update(px);
    hasher.update(msg);
    hasher.finalize().into()
}

/// BIP-340 verification of `(r, s)` against a full point with even y
///
/// The challenge must be below n, matching the circuit which binds the
/// challenge bytes to a reduced scalar.
pub fn verify_bip340(msg: &[u8; 32], r: &[u8; 32], s: &[u8; 32], pubkey: &Secp256k1Affine) -> bool {
    let Some((px, py)) = affine_xy(pubkey) else {
        return false;
    };
    if is_odd(&py) {
        return false;
    }
    let (Some(r_fe), Some(s)) = (fe_from_be::<Fp>(r), fe_from_be::<Fq>(s)) else {
        return false;
    };
    let Some(e) = scalar_from_hash(&bip340_challenge(r, &fe_to_be(&px), msg)) else {
        return false;
    };
    let point = (Secp256k1::generator() * s - *pubkey * e).to_affine();
    match affine_xy(&point) {
        Some((x, y)) => x == r_fe && !is_odd(&y),
        None => false,
    }
}

/// Check a witness against public claim parameters
///
/// Mirrors the circuit: signature over the recomputed claim message, and a
/// public key deriving the claimed identifier.
pub fn check_claim(
    circuit_type: CircuitType,
    witness: &ClaimWitness,
    params: &ClaimParams,
) -> Result<()> {
    if params.circuit_type() != circuit_type {
        return Err(ClaimError::ConstraintUnsatisfied(format!(
            "claim is for {} but the circuit is {}",
            params.circuit_type(),
            circuit_type
        )));
    }
    let pubkey = witness_pubkey(witness)
        .map_err(|e| ClaimError::ConstraintUnsatisfied(e.to_string()))?;
    let compressed = compressed_pubkey(&pubkey)
        .ok_or_else(|| ClaimError::ConstraintUnsatisfied("public key is the identity".into()))?;

    let derived = derive_identifier(circuit_type, &compressed);
    if derived != params.identifier.as_bytes() {
        return Err(ClaimError::ConstraintUnsatisfied(format!(
            "public key derives {} identifier {}, claim is for {}",
            circuit_type,
            hex::encode(&derived),
            hex::encode(params.identifier.as_bytes())
        )));
    }

    let msg = params.message_hash();
    let valid = if circuit_type.is_schnorr() {
        verify_bip340(&msg, witness.r(), witness.s(), &pubkey)
    } else {
        verify_ecdsa(&msg, witness.r(), witness.s(), &pubkey)
    };
    if !valid {
        return Err(ClaimError::ConstraintUnsatisfied(format!(
            "{circuit_type} signature does not verify over the claim message"
        )));
    }
    Ok(())
}

/// ECDSA signature with an explicit nonce
pub fn sign_ecdsa(secret: Fq, nonce: Fq, msg: &[u8; 32]) -> Option<([u8; 32], [u8; 32])> {
    let e = scalar_from_hash(msg)?;
    let (x, _) = affine_xy(&(Secp256k1::generator() * nonce).to_affine())?;
    let r = scalar_from_x(&x);
    let k_inv = Option::<Fq>::from(nonce.invert())?;
    let s = k_inv * (e + r * secret);
    (!bool::from(r.is_zero()) && !bool::from(s.is_zero())).then(|| (fe_to_be(&r), fe_to_be(&s)))
}

/// BIP-340 signature with an explicit nonce; the secret is negated when
/// its public key has odd y
pub fn sign_bip340(secret: Fq, nonce: Fq, msg: &[u8; 32]) -> Option<([u8; 32], [u8; 32])> {
    let (px, py) = affine_xy(&(Secp256k1::generator() * secret).to_affine())?;
    let d = if is_odd(&py) { -secret } else { secret };
    let (rx, ry) = affine_xy(&(Secp256k1::generator() * nonce).to_affine())?;
    let k = if is_odd(&ry) { -nonce } else { nonce };

    let r = fe_to_be(&rx);
    let e = scalar_from_hash(&bip340_challenge(&r, &fe_to_be(&px), msg))?;
    Some((r, fe_to_be(&(k + e * d))))
}

/// A valid claim for the key pair `d = 1`, used to lay out circuits at keygen
pub fn sample_claim(circuit_type: CircuitType) -> Result<(ClaimWitness, ClaimParams)> {
    let secret = Fq::ONE;
    let generator = Secp256k1Affine::generator();
    let (gx, gy) = affine_xy(&generator)
        .ok_or_else(|| ClaimError::Backend("generator is the identity".into()))?;
    let compressed = compressed_pubkey(&generator)
        .ok_or_else(|| ClaimError::Backend("generator is the identity".into()))?;

    let identifier = ClaimIdentifier::new(circuit_type, derive_identifier(circuit_type, &compressed))?;
    let params = ClaimParams::new(identifier, "keygen", "keygen");
    let msg = params.message_hash();

    let nonce = Fq::from(7);
    let signature = if circuit_type.is_schnorr() {
        sign_bip340(secret, nonce, &msg)
    } else {
        sign_ecdsa(secret, nonce, &msg)
    };
    let (r, s) = signature
        .ok_or_else(|| ClaimError::Backend(format!("cannot sign the {circuit_type} sample claim")))?;

    Ok((ClaimWitness::new(r, s, fe_to_be(&gx), fe_to_be(&gy)), params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::{Keypair, Message, Secp256k1 as Ctx, SecretKey};

    fn secret_key(d: u64) -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&d.to_be_bytes());
        SecretKey::from_slice(&bytes).unwrap()
    }

    fn point_of(d: u64) -> Secp256k1Affine {
        (Secp256k1::generator() * Fq::from(d)).to_affine()
    }

    #[test]
    fn test_field_encoding() {
        let x = Fp::from(0x0102_0304u64);
        let bytes = fe_to_be(&x);
        assert_eq!(&bytes[28..], &[1, 2, 3, 4]);
        assert_eq!(fe_from_be::<Fp>(&bytes), Some(x));
        assert_eq!(fe_from_be::<Fp>(&[0xff; 32]), None);
        assert!(scalar_from_hash(&[0xff; 32]).is_none());
    }

    #[test]
    fn test_compressed_matches_libsecp() {
        let ctx = Ctx::new();
        for d in [1u64, 2, 3, 0xdead_beef] {
            let expected = secret_key(d).public_key(&ctx).serialize();
            assert_eq!(compressed_pubkey(&point_of(d)).unwrap(), expected);
        }
    }

    #[test]
    fn test_derive_identifier_vectors() {
        let compressed = compressed_pubkey(&Secp256k1Affine::generator()).unwrap();
        assert_eq!(
            hex::encode(derive_identifier(CircuitType::Ecdsa, &compressed)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert_eq!(
            hex::encode(derive_identifier(CircuitType::Schnorr, &compressed)),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            hex::encode(derive_identifier(CircuitType::P2wshSingleKey, &compressed)),
            "1863143c14c5166804bd19203356da136c985678cd4d27a1b8c6329604903262"
        );
        assert_eq!(derive_identifier(CircuitType::P2pk, &compressed), compressed.to_vec());
        assert_eq!(derive_identifier(CircuitType::P2shP2wpkh, &compressed).len(), 20);
    }

    #[test]
    fn test_ecdsa_agrees_with_libsecp() {
        let ctx = Ctx::new();
        let msg = [0x42u8; 32];
        let sig = ctx.sign_ecdsa(&Message::from_digest(msg), &secret_key(5));
        let compact = sig.serialize_compact();
        let (r, s) = compact.split_at(32);

        let pubkey = point_of(5);
        assert!(verify_ecdsa(&msg, r.try_into().unwrap(), s.try_into().unwrap(), &pubkey));
        assert!(!verify_ecdsa(&[0x43; 32], r.try_into().unwrap(), s.try_into().unwrap(), &pubkey));
        assert!(!verify_ecdsa(&msg, r.try_into().unwrap(), s.try_into().unwrap(), &point_of(6)));
    }

    #[test]
    fn test_bip340_agrees_with_libsecp() {
        let ctx = Ctx::new();
        let msg = [0x24u8; 32];
        let keypair = Keypair::from_secret_key(&ctx, &secret_key(9));
        let sig = ctx.sign_schnorr_no_aux_rand(&Message::from_digest(msg), &keypair);
        let bytes = sig.serialize();
        let (r, s) = bytes.split_at(32);

        // lift the x-only key to its even-y point
        let (xonly, _) = keypair.x_only_public_key();
        let mut even = [0x02u8; 33];
        even[1..].copy_from_slice(&xonly.serialize());
        let full = bitcoin::secp256k1::PublicKey::from_slice(&even).unwrap().serialize_uncompressed();
        let x = fe_from_be::<Fp>(full[1..33].try_into().unwrap()).unwrap();
        let y = fe_from_be::<Fp>(full[33..].try_into().unwrap()).unwrap();
        let pubkey = Secp256k1Affine::from_xy(x, y).unwrap();

        assert!(verify_bip340(&msg, r.try_into().unwrap(), s.try_into().unwrap(), &pubkey));
        assert!(!verify_bip340(&[0; 32], r.try_into().unwrap(), s.try_into().unwrap(), &pubkey));
    }

    #[test]
    fn test_own_signers_verify() {
        let msg = [0x11u8; 32];
        let (r, s) = sign_ecdsa(Fq::from(3), Fq::from(11), &msg).unwrap();
        assert!(verify_ecdsa(&msg, &r, &s, &point_of(3)));

        // d = 3 has odd y, so the signer negates it
        let (r, s) = sign_bip340(Fq::from(3), Fq::from(11), &msg).unwrap();
        let p = point_of(3);
        let (x, y) = affine_xy(&p).unwrap();
        let even = if is_odd(&y) { Secp256k1Affine::from_xy(x, -y).unwrap() } else { p };
        assert!(verify_bip340(&msg, &r, &s, &even));
    }

    #[test]
    fn test_sample_claims_satisfy_relation() {
        for circuit_type in CircuitType::ALL {
            let (witness, params) = sample_claim(circuit_type).unwrap();
            check_claim(circuit_type, &witness, &params).unwrap();
        }
    }

    #[test]
    fn test_check_claim_rejects_mismatch() {
        let (witness, params) = sample_claim(CircuitType::Ecdsa).unwrap();

        let wrong_id = ClaimIdentifier::new(CircuitType::Ecdsa, vec![0u8; 20]).unwrap();
        let wrong = ClaimParams::new(wrong_id, params.destination.clone(), params.chain_id.clone());
        assert!(matches!(
            check_claim(CircuitType::Ecdsa, &witness, &wrong),
            Err(ClaimError::ConstraintUnsatisfied(_))
        ));

        let other_dest = ClaimParams::new(params.identifier.clone(), "someone-else", params.chain_id.clone());
        assert!(matches!(
            check_claim(CircuitType::Ecdsa, &witness, &other_dest),
            Err(ClaimError::ConstraintUnsatisfied(_))
        ));

        assert!(check_claim(CircuitType::P2pk, &witness, &params).is_err());
    }
}
