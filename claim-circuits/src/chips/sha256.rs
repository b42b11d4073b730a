//! SHA-256 chip
//!
//! FIPS 180-4 compression over [`Word32`] wires. Message bytes are packed
//! into big-endian words and padded with `0x80`, zero bytes and the 64-bit
//! big-endian bit length.

use halo2_base::{
    gates::{GateChip, GateInstructions},
    utils::ScalarField,
    AssignedValue, Context,
    QuantumCell::{Constant, Existing},
};

use super::bitwise::{
    add32, ch32, constant_word, maj32, mod32, rotr32, shr32, word_value, xor32, Word32,
};
use super::bytes::{constant_bytes, word_from_bytes, word_to_bytes};

pub const BLOCK_BYTES: usize = 64;

const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// Padding appended to a `len` byte message
pub fn sha256_padding(len: usize) -> Vec<u8> {
    let zeros = (BLOCK_BYTES - (len + 9) % BLOCK_BYTES) % BLOCK_BYTES;
    let mut pad = Vec::with_capacity(zeros + 9);
    pad.push(0x80);
    pad.resize(zeros + 1, 0);
    pad.extend_from_slice(&((len as u64) * 8).to_be_bytes());
    pad
}

/// SHA-256 over byte cells
///
/// Input cells must hold bytes; the chip does not range check them.
#[derive(Debug, Clone, Copy)]
pub struct Sha256Chip<'a, F: ScalarField> {
    gate: &'a GateChip<F>,
}

impl<'a, F: ScalarField> Sha256Chip<'a, F> {
    pub fn new(gate: &'a GateChip<F>) -> Self {
        Self { gate }
    }

    /// Hash `input` and return the 32 digest byte cells
    pub fn digest(
        &self,
        ctx: &mut Context<F>,
        input: &[AssignedValue<F>],
    ) -> Vec<AssignedValue<F>> {
        let gate = self.gate;
        let mut padded = input.to_vec();
        padded.extend(constant_bytes(ctx, &sha256_padding(input.len())));

        let mut state: [Word32<F>; 8] = IV.map(|v| constant_word(ctx, v));
        for block in padded.chunks(BLOCK_BYTES) {
            let words: Vec<_> = block
                .chunks(4)
                .map(|b| word_from_bytes(ctx, gate, b, true))
                .collect();
            state = self.compress(ctx, &state, &words);
        }

        state
            .iter()
            .flat_map(|w| word_to_bytes(ctx, gate, w, true))
            .collect()
    }

    fn xor3(
        &self,
        ctx: &mut Context<F>,
        a: &Word32<F>,
        b: &Word32<F>,
        c: &Word32<F>,
    ) -> Word32<F> {
        let ab = xor32(ctx, self.gate, a, b);
        xor32(ctx, self.gate, &ab, c)
    }

    fn compress(
        &self,
        ctx: &mut Context<F>,
        state: &[Word32<F>; 8],
        block: &[Word32<F>],
    ) -> [Word32<F>; 8] {
        let gate = self.gate;

        // Message schedule
        let mut w = block.to_vec();
        for t in 16..64 {
            let s0 = {
                let x = w[t - 15];
                let shifted = shr32(ctx, &x, 3);
                self.xor3(ctx, &rotr32(&x, 7), &rotr32(&x, 18), &shifted)
            };
            let s1 = {
                let x = w[t - 2];
                let shifted = shr32(ctx, &x, 10);
                self.xor3(ctx, &rotr32(&x, 17), &rotr32(&x, 19), &shifted)
            };
            let next = add32(ctx, gate, &[s1, w[t - 7], s0, w[t - 16]], 0);
            w.push(next);
        }

        let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;
        for t in 0..64 {
            let big_s1 = self.xor3(ctx, &rotr32(&e, 6), &rotr32(&e, 11), &rotr32(&e, 25));
            let ch = ch32(ctx, gate, &e, &f, &g);
            let big_s0 = self.xor3(ctx, &rotr32(&a, 2), &rotr32(&a, 13), &rotr32(&a, 22));
            let maj = maj32(ctx, gate, &a, &b, &c);

            let t1_terms: Vec<_> = [h, big_s1, ch, w[t]]
                .iter()
                .map(|word| Existing(word_value(ctx, gate, word)))
                .chain(std::iter::once(Constant(F::from(K[t] as u64))))
                .collect();
            let t1 = gate.sum(ctx, t1_terms);
            let s0_value = word_value(ctx, gate, &big_s0);
            let maj_value = word_value(ctx, gate, &maj);
            let t2 = gate.add(ctx, s0_value, maj_value);

            let d_value = word_value(ctx, gate, &d);
            let e_sum = gate.add(ctx, d_value, t1);
            let a_sum = gate.add(ctx, t1, t2);

            h = g;
            g = f;
            f = e;
            e = mod32(ctx, gate, e_sum, 6);
            d = c;
            c = b;
            b = a;
            a = mod32(ctx, gate, a_sum, 7);
        }

        let working = [a, b, c, d, e, f, g, h];
        std::array::from_fn(|i| add32(ctx, gate, &[state[i], working[i]], 0))
    }
}
