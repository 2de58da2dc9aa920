// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::hash::Hash;

use crate::sketch_impl::hash::{fibonacci_hash, item_hash, rho};
use crate::sketch_impl::hyperloglog::{corrected_estimate, HyperLogLog};
use crate::sketch_impl::result::Error;
use crate::sketch_impl::Word;

const COMPRESSION_LEVEL: i32 = 1;

/// HyperLogLog that keeps its register bytes zstd-compressed.
///
/// A baseline for general-purpose compression of the register array: every
/// effective write decompresses, updates, and recompresses the whole block,
/// and every read decompresses into a fresh buffer. Estimates and exported
/// registers match [`HyperLogLog`] exactly.
pub struct HyperLogLogZstd {
    m: usize,
    log_m: u32,
    compressed: Vec<u8>,
    /// Minimum register rank; incoming ranks below it cannot change any
    /// register, so the block is not even decompressed.
    lower_bound: u8,
}

impl HyperLogLogZstd {
    /// Creates a sketch with `m` registers. `m` must be a power of two.
    pub fn new(m: usize) -> Result<Self, Error> {
        if !m.is_power_of_two() {
            return Err(Error::invalid_parameter(format!(
                "register count must be a power of two, but was {m}"
            )));
        }
        let mut sketch = HyperLogLogZstd {
            m,
            log_m: m.ilog2(),
            compressed: Vec::new(),
            lower_bound: 0,
        };
        sketch.recompress(&vec![0; m]);
        Ok(sketch)
    }

    /// Returns the size of the compressed register block in bits.
    pub fn bit_size(&self) -> usize {
        self.compressed.len() * 8
    }

    /// Returns the number of registers.
    pub fn register_count(&self) -> usize {
        self.m
    }

    /// Adds an item to the sketch.
    pub fn add<T: Hash + ?Sized>(&mut self, item: &T) {
        self.add_hash(item_hash(item));
    }

    /// Adds a prehashed item.
    pub fn add_hash(&mut self, x: Word) {
        self.add_jr(fibonacci_hash(x, self.log_m) as usize, rho(x));
    }

    /// Feeds a precomputed register index and rank. `j` must be below the
    /// register count and `r` at most 64; no checks are made.
    pub fn add_jr(&mut self, j: usize, r: u8) {
        if r < self.lower_bound {
            return;
        }
        let mut registers = self.decompress();
        if r > registers[j] {
            registers[j] = r;
            self.recompress(&registers);
        }
    }

    /// Returns the register values as one byte per register.
    pub fn export_registers(&self) -> Vec<u8> {
        self.decompress()
    }

    /// Returns the present cardinality estimate.
    pub fn estimate(&self) -> f64 {
        let mut inverse_sum = 0.0;
        let mut zero_registers = 0;
        for r in self.decompress() {
            if r == 0 {
                zero_registers += 1;
            }
            inverse_sum += 1.0 / (1u64 << r) as f64;
        }
        let m = self.m as f64;
        corrected_estimate(
            self.m,
            HyperLogLog::alpha(self.m) * m * m / inverse_sum,
            zero_registers,
        )
    }

    /// Merges this sketch with another into a new sketch whose registers
    /// are the pointwise maxima.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if self.m != other.m {
            return Err(Error::shape_mismatch("mismatch in the number of registers"));
        }
        let ours = self.decompress();
        let theirs = other.decompress();
        let maxima: Vec<u8> = ours.iter().zip(&theirs).map(|(a, b)| *a.max(b)).collect();
        let mut merged = HyperLogLogZstd {
            m: self.m,
            log_m: self.log_m,
            compressed: Vec::new(),
            lower_bound: 0,
        };
        merged.recompress(&maxima);
        Ok(merged)
    }

    fn decompress(&self) -> Vec<u8> {
        zstd::bulk::decompress(&self.compressed, self.m)
            .expect("the stored register block always decompresses")
    }

    fn recompress(&mut self, registers: &[u8]) {
        self.compressed = zstd::bulk::compress(registers, COMPRESSION_LEVEL)
            .expect("compressing an in-memory register block cannot fail");
        self.lower_bound = registers.iter().copied().min().unwrap_or(0);
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn test_matches_hyperloglog() {
        let m = 128;
        let mut plain = HyperLogLog::new(m).unwrap();
        let mut compressed = HyperLogLogZstd::new(m).unwrap();
        let mut rng = StdRng::seed_from_u64(123874);
        for i in 0..1000u64 {
            let x: u64 = rng.gen();
            plain.add(&x);
            compressed.add(&x);
            if i % 100 == 0 {
                assert_eq!(plain.estimate(), compressed.estimate());
                assert_eq!(plain.export_registers(), compressed.export_registers());
            }
        }
        assert_eq!(plain.estimate(), compressed.estimate());
        assert_eq!(plain.export_registers(), compressed.export_registers());
    }

    #[test]
    fn test_merge_equals_union() {
        let m = 64;
        let mut union = HyperLogLog::new(m).unwrap();
        let mut first = HyperLogLogZstd::new(m).unwrap();
        let mut second = HyperLogLogZstd::new(m).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            let x: u64 = rng.gen();
            union.add(&x);
            first.add(&x);
        }
        for _ in 0..1000 {
            let x: u64 = rng.gen();
            union.add(&x);
            second.add(&x);
        }
        assert_ne!(union.export_registers(), first.export_registers());
        assert_ne!(union.export_registers(), second.export_registers());
        let merged = first.merge(&second).unwrap();
        assert_eq!(union.estimate(), merged.estimate());
        assert_eq!(union.export_registers(), merged.export_registers());
    }

    #[test]
    fn test_merge_rejects_mismatched_register_count() {
        let a = HyperLogLogZstd::new(64).unwrap();
        let b = HyperLogLogZstd::new(128).unwrap();
        assert!(a.merge(&b).is_err());
    }
}
