//! 32-bit word gadgets
//!
//! Words live on 32 boolean wires, least significant bit first. Boolean
//! operations work bit by bit, rotations and shifts only reorder wires, and
//! modular addition recomposes the words, adds them natively and decomposes
//! the sum again, keeping the low 32 bits.

use halo2_base::{
    gates::GateInstructions,
    utils::ScalarField,
    AssignedValue, Context,
    QuantumCell::{self, Constant, Existing},
};

pub const WORD_BITS: usize = 32;

/// A 32-bit word as boolean wires, index 0 is the least significant bit
#[derive(Debug, Clone, Copy)]
pub struct Word32<F: ScalarField>(pub [AssignedValue<F>; WORD_BITS]);

impl<F: ScalarField> Word32<F> {
    pub fn bits(&self) -> &[AssignedValue<F>; WORD_BITS] {
        &self.0
    }

    pub fn bit(&self, i: usize) -> AssignedValue<F> {
        self.0[i]
    }

    /// Witness value of the word
    pub fn value(&self) -> u32 {
        self.0
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 1) | (b.value().get_lower_64() as u32 & 1))
    }
}

fn from_fn<F: ScalarField>(f: impl FnMut(usize) -> AssignedValue<F>) -> Word32<F> {
    Word32(std::array::from_fn(f))
}

/// Decompose a cell known to hold a value below 2^32
pub fn word_from_cell<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    value: AssignedValue<F>,
) -> Word32<F> {
    let bits = gate.num_to_bits(ctx, value, WORD_BITS);
    from_fn(|i| bits[i])
}

/// Load a constant word, one constant cell per bit
pub fn constant_word<F: ScalarField>(ctx: &mut Context<F>, value: u32) -> Word32<F> {
    from_fn(|i| ctx.load_constant(F::from(((value >> i) & 1) as u64)))
}

/// Recompose a word into one cell
pub fn word_value<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    word: &Word32<F>,
) -> AssignedValue<F> {
    let powers = gate.pow_of_two()[..WORD_BITS].iter().map(|p| Constant(*p));
    gate.inner_product(ctx, word.0.iter().copied(), powers)
}

pub fn and32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    a: &Word32<F>,
    b: &Word32<F>,
) -> Word32<F> {
    from_fn(|i| gate.and(ctx, a.0[i], b.0[i]))
}

pub fn or32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    a: &Word32<F>,
    b: &Word32<F>,
) -> Word32<F> {
    from_fn(|i| gate.or(ctx, a.0[i], b.0[i]))
}

/// a + b - 2ab per bit
pub fn xor_bit<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    a: AssignedValue<F>,
    b: AssignedValue<F>,
) -> AssignedValue<F> {
    let one_minus_2a = gate.mul_add(ctx, a, Constant(-F::from(2)), Constant(F::ONE));
    gate.mul_add(ctx, b, one_minus_2a, a)
}

pub fn xor32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    a: &Word32<F>,
    b: &Word32<F>,
) -> Word32<F> {
    from_fn(|i| xor_bit(ctx, gate, a.0[i], b.0[i]))
}

pub fn not32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    a: &Word32<F>,
) -> Word32<F> {
    from_fn(|i| gate.not(ctx, a.0[i]))
}

/// Bitwise choice: `x ? y : z` per bit, i.e. `(x & y) ^ (!x & z)`
pub fn ch32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    x: &Word32<F>,
    y: &Word32<F>,
    z: &Word32<F>,
) -> Word32<F> {
    from_fn(|i| gate.select(ctx, y.0[i], z.0[i], x.0[i]))
}

/// Bitwise majority: `x ? (y | z) : (y & z)` per bit
pub fn maj32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    x: &Word32<F>,
    y: &Word32<F>,
    z: &Word32<F>,
) -> Word32<F> {
    from_fn(|i| {
        let either = gate.or(ctx, y.0[i], z.0[i]);
        let both = gate.and(ctx, y.0[i], z.0[i]);
        gate.select(ctx, either, both, x.0[i])
    })
}

pub fn rotl32<F: ScalarField>(a: &Word32<F>, n: u32) -> Word32<F> {
    let n = n as usize % WORD_BITS;
    from_fn(|i| a.0[(i + WORD_BITS - n) % WORD_BITS])
}

pub fn rotr32<F: ScalarField>(a: &Word32<F>, n: u32) -> Word32<F> {
    let n = n as usize % WORD_BITS;
    from_fn(|i| a.0[(i + n) % WORD_BITS])
}

/// Logical right shift; vacated high bits are tied to a constant zero cell
pub fn shr32<F: ScalarField>(ctx: &mut Context<F>, a: &Word32<F>, n: u32) -> Word32<F> {
    let n = n as usize;
    let zero = ctx.load_zero();
    from_fn(|i| if i + n < WORD_BITS { a.0[i + n] } else { zero })
}

/// Reduce a sum of at most `terms` 32-bit values modulo 2^32
pub fn mod32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    sum: AssignedValue<F>,
    terms: usize,
) -> Word32<F> {
    let carry_bits = terms.max(1).next_power_of_two().trailing_zeros() as usize;
    let bits = gate.num_to_bits(ctx, sum, WORD_BITS + carry_bits);
    from_fn(|i| bits[i])
}

/// Sum of words plus a constant, modulo 2^32
pub fn add32<F: ScalarField>(
    ctx: &mut Context<F>,
    gate: &impl GateInstructions<F>,
    words: &[Word32<F>],
    constant: u32,
) -> Word32<F> {
    let mut terms: Vec<QuantumCell<F>> = words
        .iter()
        .map(|w| Existing(word_value(ctx, gate, w)))
        .collect();
    if constant != 0 {
        terms.push(Constant(F::from(constant as u64)));
    }
    let count = terms.len();
    let sum = gate.sum(ctx, terms);
    mod32(ctx, gate, sum, count)
}
