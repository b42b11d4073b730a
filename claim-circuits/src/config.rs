//! Circuit sizing parameters

use serde::{Deserialize, Serialize};

use crate::{ClaimError, Result};

/// Halo2 and halo2-ecc parameters shared by every claim circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Circuit has 2^k rows
    pub k: u32,
    /// Bits covered by the range-check lookup table
    pub lookup_bits: usize,
    /// Bits per CRT limb of a secp256k1 field element
    pub limb_bits: usize,
    /// Limbs per secp256k1 field element
    pub num_limbs: usize,
    /// Window size for the fixed- and variable-base scalar multiplications
    pub window_bits: usize,
}

impl CircuitConfig {
    pub fn new(k: u32, lookup_bits: usize) -> Self {
        Self {
            k,
            lookup_bits,
            ..Self::default()
        }
    }

    /// Check the parameters describe a circuit the chips can build
    ///
    /// Limbs must be byte aligned so that 32-byte values bind to them with
    /// plain inner products, and must cover 256 bits.
    pub fn validate(&self) -> Result<()> {
        if self.lookup_bits == 0 || self.lookup_bits >= self.k as usize {
            return Err(ClaimError::Backend(format!(
                "lookup_bits {} must be in 1..{}",
                self.lookup_bits, self.k
            )));
        }
        if self.limb_bits % 8 != 0 || self.limb_bits > 128 {
            return Err(ClaimError::Backend(format!(
                "limb_bits {} must be a multiple of 8 no larger than 128",
                self.limb_bits
            )));
        }
        if self.limb_bits * self.num_limbs < 256 {
            return Err(ClaimError::Backend(format!(
                "{} limbs of {} bits cannot hold a 256-bit value",
                self.num_limbs, self.limb_bits
            )));
        }
        if self.window_bits == 0 {
            return Err(ClaimError::Backend("window_bits must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            k: 19, // 2^19 = 524,288 rows
            lookup_bits: 18,
            limb_bits: 88,
            num_limbs: 3,
            window_bits: 4,
        }
    }
}
