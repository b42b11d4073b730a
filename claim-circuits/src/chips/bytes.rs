//! Byte cells
//!
//! Loading range-checked bytes, packing bytes into 32-bit words in either
//! endianness, and binding big-endian byte strings to the CRT limbs used by
//! halo2-ecc.

use halo2_base::{
    gates::{GateInstructions, RangeInstructions},
    utils::ScalarField,
    AssignedValue, Context,
    QuantumCell::Constant,
};

use super::bitwise::{Word32, WORD_BITS};
use crate::{ClaimError, Result};

/// Load witness bytes, range checking every cell to 8 bits
pub fn load_bytes<F: ScalarField>(
    ctx: &mut Context<F>,
    range: &impl RangeInstructions<F>,
    bytes: &[u8],
) -> Vec<AssignedValue<F>> {
    bytes
        .iter()
        .map(|b| {
            let cell = ctx.load_witness(F::from(*b as u64));
            range.range_check(ctx, cell, 8);
            cell
        })
        .collect()
}

pub fn constant_bytes<F: ScalarField>(ctx: &mut Context<F>, bytes: &[u8]) -> Vec<AssignedValue<F>> {
    bytes.iter().map(|b| ctx.load_constant(F::from(*b as u64))).collect()
}

/// Witness values of byte cells
pub fn byte_values<F: ScalarField>(cells: &[AssignedValue<F>]) -> Vec<u8> {
    cells.iter().map(|c| c.value().get_lower_64() as u8).collect()
}

/// Pack 4 byte cells into a word; `big_endian` puts the first byte on top
pub fn word_from_bytes<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    bytes: &[AssignedValue<F>],
    big_endian: bool,
) -> Word32<F> {
    let mut bits = Vec::with_capacity(WORD_BITS);
    // least significant byte first
    let ordered: Vec<_> = if big_endian {
        bytes.iter().rev().copied().collect()
    } else {
        bytes.to_vec()
    };
    for byte in ordered {
        bits.extend(gate.num_to_bits(ctx, byte, 8));
    }
    Word32(std::array::from_fn(|i| bits[i]))
}

/// Split a word back into 4 byte cells
pub fn word_to_bytes<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    word: &Word32<F>,
    big_endian: bool,
) -> Vec<AssignedValue<F>> {
    let mut out: Vec<_> = word
        .0
        .chunks(8)
        .map(|bits| {
            let powers = gate.pow_of_two()[..8].iter().map(|p| Constant(*p));
            gate.inner_product(ctx, bits.iter().copied(), powers)
        })
        .collect();
    if big_endian {
        out.reverse();
    }
    out
}

/// Byte ranges of a 32-byte big-endian value covered by each limb
fn limb_byte_ranges(limb_bits: usize, num_limbs: usize) -> Result<Vec<std::ops::Range<usize>>> {
    if limb_bits % 8 != 0 || limb_bits * num_limbs < 256 {
        return Err(ClaimError::Backend(format!(
            "cannot bind 32 bytes to {num_limbs} limbs of {limb_bits} bits"
        )));
    }
    let limb_bytes = limb_bits / 8;
    Ok((0..num_limbs)
        .map(|i| {
            let lo = (i * limb_bytes).min(32);
            let hi = ((i + 1) * limb_bytes).min(32);
            lo..hi
        })
        .collect())
}

/// Constrain CRT limbs to equal a 32-byte big-endian string
///
/// Limb `i` holds little-endian bytes `[i * limb_bits / 8, (i + 1) * limb_bits / 8)`
/// of the value. The byte cells must already be range checked.
pub fn bind_limbs_to_be_bytes<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    limbs: &[AssignedValue<F>],
    limb_bits: usize,
    bytes_be: &[AssignedValue<F>],
) -> Result<()> {
    if bytes_be.len() != 32 {
        return Err(ClaimError::Backend(format!(
            "expected 32 byte cells, got {}",
            bytes_be.len()
        )));
    }
    let le: Vec<_> = bytes_be.iter().rev().copied().collect();
    let base = F::from(256);

    for (limb, bytes) in limbs.iter().zip(limb_byte_ranges(limb_bits, limbs.len())?) {
        if bytes.is_empty() {
            gate.assert_is_const(ctx, limb, &F::ZERO);
            continue;
        }
        let mut coeff = F::ONE;
        let mut coeffs = Vec::with_capacity(bytes.len());
        for _ in bytes.clone() {
            coeffs.push(Constant(coeff));
            coeff *= base;
        }
        let packed = gate.inner_product(ctx, le[bytes].iter().copied(), coeffs);
        ctx.constrain_equal(&packed, limb);
    }
    Ok(())
}

/// Serialize CRT limbs of a value below 2^256 into 32 big-endian byte cells
///
/// Each limb is decomposed into bits, which also proves the top limb fits the
/// bits left over for it.
pub fn limbs_to_be_bytes<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    limbs: &[AssignedValue<F>],
    limb_bits: usize,
) -> Result<Vec<AssignedValue<F>>> {
    let ranges = limb_byte_ranges(limb_bits, limbs.len())?;
    let mut le = Vec::with_capacity(32);

    for (limb, bytes) in limbs.iter().zip(ranges) {
        let width = bytes.len() * 8;
        if width == 0 {
            gate.assert_is_const(ctx, limb, &F::ZERO);
            continue;
        }
        let bits = gate.num_to_bits(ctx, *limb, width);
        for chunk in bits.chunks(8) {
            let powers = gate.pow_of_two()[..8].iter().map(|p| Constant(*p));
            le.push(gate.inner_product(ctx, chunk.iter().copied(), powers));
        }
    }
    le.reverse();
    Ok(le)
}

/// Lowest bit of a limb that is known to fit in `limb_bits`
pub fn low_bit<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    limb: AssignedValue<F>,
    limb_bits: usize,
) -> AssignedValue<F> {
    gate.num_to_bits(ctx, limb, limb_bits)[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo2_base::halo2_proofs::halo2curves::bn256::Fr;
    use halo2_base::utils::{biguint_to_fe, testing::base_test};
    use num_bigint::BigUint;

    fn limb_values(value: &[u8; 32], limb_bits: usize, num_limbs: usize) -> Vec<Fr> {
        let v = BigUint::from_bytes_be(value);
        let mask = (BigUint::from(1u8) << limb_bits) - 1u8;
        (0..num_limbs)
            .map(|i| biguint_to_fe(&((&v >> (i * limb_bits)) & &mask)))
            .collect()
    }

    fn sample_value() -> [u8; 32] {
        std::array::from_fn(|i| (i as u8).wrapping_mul(37).wrapping_add(11))
    }

    #[test]
    fn test_word_packing() {
        base_test().k(10).lookup_bits(8).run(|ctx, range| {
            let bytes = load_bytes(ctx, range, &[0x12, 0x34, 0x56, 0x78]);
            let gate = range.gate();

            let be = word_from_bytes(ctx, gate, &bytes, true);
            let le = word_from_bytes(ctx, gate, &bytes, false);
            assert_eq!(be.value(), 0x1234_5678);
            assert_eq!(le.value(), 0x7856_3412);

            assert_eq!(byte_values(&word_to_bytes(ctx, gate, &be, true)), [0x12, 0x34, 0x56, 0x78]);
            assert_eq!(byte_values(&word_to_bytes(ctx, gate, &le, false)), [0x12, 0x34, 0x56, 0x78]);
        });
    }

    #[test]
    fn test_limb_binding() {
        let value = sample_value();
        base_test().k(11).lookup_bits(8).run(|ctx, range| {
            let bytes = load_bytes(ctx, range, &value);
            let limbs: Vec<_> = limb_values(&value, 88, 3)
                .into_iter()
                .map(|v| ctx.load_witness(v))
                .collect();
            bind_limbs_to_be_bytes(ctx, range.gate(), &limbs, 88, &bytes).unwrap();

            let out = limbs_to_be_bytes(ctx, range.gate(), &limbs, 88).unwrap();
            assert_eq!(byte_values(&out), value.to_vec());
        });
    }

    #[test]
    fn test_limb_binding_rejects_wrong_bytes() {
        let value = sample_value();
        let mut other = value;
        other[5] ^= 1;
        base_test().k(11).lookup_bits(8).expect_satisfied(false).run(|ctx, range| {
            let bytes = load_bytes(ctx, range, &other);
            let limbs: Vec<_> = limb_values(&value, 88, 3)
                .into_iter()
                .map(|v| ctx.load_witness(v))
                .collect();
            bind_limbs_to_be_bytes(ctx, range.gate(), &limbs, 88, &bytes).unwrap();
        });
    }

    #[test]
    fn test_unaligned_limbs_rejected() {
        assert!(limb_byte_ranges(90, 3).is_err());
        assert!(limb_byte_ranges(64, 3).is_err());
        assert_eq!(limb_byte_ranges(88, 3).unwrap(), vec![0..11, 11..22, 22..32]);
    }

    #[test]
    fn test_low_bit() {
        base_test().k(10).run_gate(|ctx, gate| {
            let odd = ctx.load_witness(Fr::from(0x1234_5679u64));
            let even = ctx.load_witness(Fr::from(0x1234_5678u64));
            assert_eq!(*low_bit(ctx, gate, odd, 88).value(), Fr::from(1));
            assert_eq!(*low_bit(ctx, gate, even, 88).value(), Fr::from(0));
        });
    }
}
