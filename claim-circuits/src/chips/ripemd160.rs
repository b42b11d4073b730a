//! RIPEMD-160 chip
//!
//! Two parallel 80-step lines over little-endian words, combined at the end
//! of every block. Padding is `0x80`, zero bytes and the 64-bit
//! little-endian bit length.

use halo2_base::{
    gates::{GateChip, GateInstructions},
    utils::ScalarField,
    AssignedValue, Context,
    QuantumCell::{Constant, Existing},
};

use super::bitwise::{
    add32, and32, constant_word, mod32, not32, or32, rotl32, word_value, xor32, Word32,
};
use super::bytes::{constant_bytes, word_from_bytes, word_to_bytes};
use super::sha256::Sha256Chip;

pub const BLOCK_BYTES: usize = 64;

const IV: [u32; 5] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

const K_LEFT: [u32; 5] = [0x00000000, 0x5a827999, 0x6ed9eba1, 0x8f1bbcdc, 0xa953fd4e];
const K_RIGHT: [u32; 5] = [0x50a28be6, 0x5c4dd124, 0x6d703ef3, 0x7a6d76e9, 0x00000000];

// Message word selection
const R_LEFT: [usize; 80] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
    7, 4, 13, 1, 10, 6, 15, 3, 12, 0, 9, 5, 2, 14, 11, 8,
    3, 10, 14, 4, 9, 15, 8, 1, 2, 7, 0, 6, 13, 11, 5, 12,
    1, 9, 11, 10, 0, 8, 12, 4, 13, 3, 7, 15, 14, 5, 6, 2,
    4, 0, 5, 9, 7, 12, 2, 10, 14, 1, 3, 8, 11, 6, 15, 13,
];
const R_RIGHT: [usize; 80] = [
    5, 14, 7, 0, 9, 2, 11, 4, 13, 6, 15, 8, 1, 10, 3, 12,
    6, 11, 3, 7, 0, 13, 5, 10, 14, 15, 8, 12, 4, 9, 1, 2,
    15, 5, 1, 3, 7, 14, 6, 9, 11, 8, 12, 2, 10, 0, 4, 13,
    8, 6, 4, 1, 3, 11, 15, 0, 5, 12, 2, 13, 9, 7, 10, 14,
    12, 15, 10, 4, 1, 5, 8, 7, 6, 2, 13, 14, 0, 3, 9, 11,
];

// Left rotation amounts
const S_LEFT: [u32; 80] = [
    11, 14, 15, 12, 5, 8, 7, 9, 11, 13, 14, 15, 6, 7, 9, 8,
    7, 6, 8, 13, 11, 9, 7, 15, 7, 12, 15, 9, 11, 7, 13, 12,
    11, 13, 6, 7, 14, 9, 13, 15, 14, 8, 13, 6, 5, 12, 7, 5,
    11, 12, 14, 15, 14, 15, 9, 8, 9, 14, 5, 6, 8, 6, 5, 12,
    9, 15, 5, 11, 6, 8, 13, 12, 5, 12, 13, 14, 11, 8, 5, 6,
];
const S_RIGHT: [u32; 80] = [
    8, 9, 9, 11, 13, 15, 15, 5, 7, 7, 8, 11, 14, 14, 12, 6,
    9, 13, 15, 7, 12, 8, 9, 11, 7, 7, 12, 7, 6, 15, 13, 11,
    9, 7, 15, 11, 8, 6, 6, 14, 12, 13, 5, 14, 13, 13, 7, 5,
    15, 5, 8, 11, 14, 14, 6, 14, 6, 9, 12, 9, 12, 5, 15, 8,
    8, 5, 12, 9, 12, 5, 14, 6, 8, 13, 6, 5, 15, 13, 11, 11,
];

/// Padding appended to a `len` byte message
pub fn ripemd160_padding(len: usize) -> Vec<u8> {
    let zeros = (BLOCK_BYTES - (len + 9) % BLOCK_BYTES) % BLOCK_BYTES;
    let mut pad = Vec::with_capacity(zeros + 9);
    pad.push(0x80);
    pad.resize(zeros + 1, 0);
    pad.extend_from_slice(&((len as u64) * 8).to_le_bytes());
    pad
}

#[derive(Debug, Clone, Copy)]
struct LineState<F: ScalarField> {
    a: Word32<F>,
    b: Word32<F>,
    c: Word32<F>,
    d: Word32<F>,
    e: Word32<F>,
}

/// RIPEMD-160 over byte cells
///
/// Input cells must hold bytes; the chip does not range check them.
#[derive(Debug, Clone, Copy)]
pub struct Ripemd160Chip<'a, F: ScalarField> {
    gate: &'a GateChip<F>,
}

impl<'a, F: ScalarField> Ripemd160Chip<'a, F> {
    pub fn new(gate: &'a GateChip<F>) -> Self {
        Self { gate }
    }

    /// Hash `input` and return the 20 digest byte cells
    pub fn digest(
        &self,
        ctx: &mut Context<F>,
        input: &[AssignedValue<F>],
    ) -> Vec<AssignedValue<F>> {
        let gate = self.gate;
        let mut padded = input.to_vec();
        padded.extend(constant_bytes(ctx, &ripemd160_padding(input.len())));

        let mut h: [Word32<F>; 5] = IV.map(|v| constant_word(ctx, v));
        for block in padded.chunks(BLOCK_BYTES) {
            let words: Vec<_> = block
                .chunks(4)
                .map(|b| word_from_bytes(ctx, gate, b, false))
                .collect();
            h = self.compress(ctx, &h, &words);
        }

        h.iter()
            .flat_map(|w| word_to_bytes(ctx, gate, w, false))
            .collect()
    }

    /// Boolean function `f_j` for round `round` (0..5)
    fn f(
        &self,
        ctx: &mut Context<F>,
        round: usize,
        x: &Word32<F>,
        y: &Word32<F>,
        z: &Word32<F>,
    ) -> Word32<F> {
        let gate = self.gate;
        match round {
            0 => {
                let xy = xor32(ctx, gate, x, y);
                xor32(ctx, gate, &xy, z)
            }
            1 => {
                let xy = and32(ctx, gate, x, y);
                let not_x = not32(ctx, gate, x);
                let nxz = and32(ctx, gate, &not_x, z);
                or32(ctx, gate, &xy, &nxz)
            }
            2 => {
                let not_y = not32(ctx, gate, y);
                let x_or_ny = or32(ctx, gate, x, &not_y);
                xor32(ctx, gate, &x_or_ny, z)
            }
            3 => {
                let xz = and32(ctx, gate, x, z);
                let not_z = not32(ctx, gate, z);
                let ynz = and32(ctx, gate, y, &not_z);
                or32(ctx, gate, &xz, &ynz)
            }
            _ => {
                let not_z = not32(ctx, gate, z);
                let y_or_nz = or32(ctx, gate, y, &not_z);
                xor32(ctx, gate, x, &y_or_nz)
            }
        }
    }

    /// One step: `T = rotl(A + f + X + K, s) + E`, then shift the registers
    fn step(
        &self,
        ctx: &mut Context<F>,
        st: LineState<F>,
        f: Word32<F>,
        x: AssignedValue<F>,
        k: u32,
        s: u32,
    ) -> LineState<F> {
        let gate = self.gate;
        let a = word_value(ctx, gate, &st.a);
        let f = word_value(ctx, gate, &f);
        let sum = gate.sum(ctx, [Existing(a), Existing(f), Existing(x), Constant(F::from(k as u64))]);
        let rotated = rotl32(&mod32(ctx, gate, sum, 4), s);

        let rotated = word_value(ctx, gate, &rotated);
        let e = word_value(ctx, gate, &st.e);
        let t = gate.add(ctx, rotated, e);

        LineState {
            a: st.e,
            b: mod32(ctx, gate, t, 2),
            c: st.b,
            d: rotl32(&st.c, 10),
            e: st.d,
        }
    }

    fn compress(
        &self,
        ctx: &mut Context<F>,
        h: &[Word32<F>; 5],
        block: &[Word32<F>],
    ) -> [Word32<F>; 5] {
        let gate = self.gate;
        let x: Vec<_> = block.iter().map(|w| word_value(ctx, gate, w)).collect();

        let init = LineState {
            a: h[0],
            b: h[1],
            c: h[2],
            d: h[3],
            e: h[4],
        };
        let mut left = init;
        let mut right = init;
        for j in 0..80 {
            let round = j / 16;

            let fl = self.f(ctx, round, &left.b, &left.c, &left.d);
            left = self.step(ctx, left, fl, x[R_LEFT[j]], K_LEFT[round], S_LEFT[j]);

            let fr = self.f(ctx, 4 - round, &right.b, &right.c, &right.d);
            right = self.step(ctx, right, fr, x[R_RIGHT[j]], K_RIGHT[round], S_RIGHT[j]);
        }

        [
            add32(ctx, gate, &[h[1], left.c, right.d], 0),
            add32(ctx, gate, &[h[2], left.d, right.e], 0),
            add32(ctx, gate, &[h[3], left.e, right.a], 0),
            add32(ctx, gate, &[h[4], left.a, right.b], 0),
            add32(ctx, gate, &[h[0], left.b, right.c], 0),
        ]
    }
}

/// RIPEMD160(SHA256(input)), 20 byte cells
pub fn hash160<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &GateChip<F>,
    input: &[AssignedValue<F>],
) -> Vec<AssignedValue<F>> {
    let sha = Sha256Chip::new(gate).digest(ctx, input);
    Ripemd160Chip::new(gate).digest(ctx, &sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::bytes::{byte_values, load_bytes};
    use bitcoin::hashes::{hash160 as native_hash160, ripemd160, Hash};
    use halo2_base::gates::RangeInstructions;
    use halo2_base::utils::testing::base_test;

    fn check(input: &[u8], k: u32) {
        let expected = ripemd160::Hash::hash(input).to_byte_array().to_vec();
        base_test().k(k).lookup_bits(8).run(|ctx, range| {
            let cells = load_bytes(ctx, range, input);
            let digest = Ripemd160Chip::new(range.gate()).digest(ctx, &cells);
            assert_eq!(byte_values(&digest), expected);
        });
    }

    #[test]
    fn test_padding_is_little_endian() {
        let pad = ripemd160_padding(3);
        assert_eq!(pad.len(), 61);
        assert_eq!(&pad[pad.len() - 8..], &24u64.to_le_bytes());
        assert_eq!(ripemd160_padding(56).len(), 72);
    }

    #[test]
    fn test_ripemd160_empty() {
        // 9c1185a5c5e9fc54612808977ee8f548b2258d31
        check(b"", 15);
    }

    #[test]
    fn test_ripemd160_abc() {
        check(b"abc", 15);
    }

    #[test]
    fn test_ripemd160_two_blocks() {
        check(b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq", 16);
    }

    #[test]
    fn test_hash160_compressed_generator() {
        let key = hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
            .unwrap();
        let expected = native_hash160::Hash::hash(&key).to_byte_array().to_vec();
        assert_eq!(hex::encode(&expected), "751e76e8199196d454941c45d1b3a323f1433bd6");

        base_test().k(16).lookup_bits(8).run(|ctx, range| {
            let cells = load_bytes(ctx, range, &key);
            let digest = hash160(ctx, range.gate(), &cells);
            assert_eq!(byte_values(&digest), expected);
        });
    }
}
