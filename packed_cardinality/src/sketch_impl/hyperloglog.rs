// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::hash::Hash;

use crate::sketch_impl::hash::{fibonacci_hash, item_hash, rho};
use crate::sketch_impl::packed_vector::PackedVector;
use crate::sketch_impl::result::Error;
use crate::sketch_impl::{Word, RANK_BITS};

/// Classical HyperLogLog with registers bit-packed at six bits apiece.
///
/// Each of the `m` registers holds the maximum rank (leading-zero count
/// plus one) seen among the items hashed to it; the harmonic mean of the
/// register values yields the cardinality estimate.
///
/// ```rust
/// use packed_cardinality::HyperLogLog;
///
/// let mut sketch = HyperLogLog::new(64).unwrap();
/// assert_eq!(sketch.bit_size(), 64 * 6);
/// for i in 0u64..1000 {
///     sketch.add(&i);
/// }
/// assert!((sketch.estimate() - 1000.0).abs() < 500.0);
/// ```
#[derive(Clone, Debug)]
pub struct HyperLogLog {
    m: usize,
    log_m: u32,
    registers: PackedVector,
}

impl HyperLogLog {
    /// Creates a sketch with `m` registers. `m` must be a power of two.
    pub fn new(m: usize) -> Result<Self, Error> {
        if !m.is_power_of_two() {
            return Err(Error::invalid_parameter(format!(
                "register count must be a power of two, but was {m}"
            )));
        }
        Ok(Self::new_unchecked(m))
    }

    pub(crate) fn new_unchecked(m: usize) -> Self {
        HyperLogLog {
            m,
            log_m: m.ilog2(),
            registers: PackedVector::new(RANK_BITS, m),
        }
    }

    /// Returns the size of the sketch in bits.
    pub fn bit_size(&self) -> usize {
        self.registers.bit_size()
    }

    /// Returns the number of registers.
    pub fn register_count(&self) -> usize {
        self.m
    }

    /// Adds an item to the sketch.
    pub fn add<T: Hash + ?Sized>(&mut self, item: &T) {
        self.add_hash(item_hash(item));
    }

    /// Adds a prehashed item. Useful when a different hashing scheme is
    /// applied outside the sketch.
    pub fn add_hash(&mut self, x: Word) {
        self.add_jr(fibonacci_hash(x, self.log_m) as usize, rho(x));
    }

    /// Feeds a precomputed register index and rank. `j` must be below the
    /// register count and `r` at most 64; no checks are made.
    pub fn add_jr(&mut self, j: usize, r: u8) {
        if Word::from(r) > self.registers.get(j) {
            self.registers.set(j, Word::from(r));
        }
    }

    /// Returns the register values as one byte per register.
    pub fn export_registers(&self) -> Vec<u8> {
        (0..self.m).map(|j| self.registers.get(j) as u8).collect()
    }

    /// Returns the present cardinality estimate.
    pub fn estimate(&self) -> f64 {
        let mut inverse_sum = 0.0;
        let mut zero_registers = 0;
        for j in 0..self.m {
            let r = self.registers.get(j);
            if r == 0 {
                zero_registers += 1;
            }
            inverse_sum += 1.0 / (1u64 << r) as f64;
        }
        let m = self.m as f64;
        corrected_estimate(self.m, Self::alpha(self.m) * m * m / inverse_sum, zero_registers)
    }

    /// Merges this sketch with another into a new sketch whose registers
    /// are the pointwise maxima. Both sketches must have been fed through
    /// the same hash functions for the result to be meaningful.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if self.m != other.m {
            return Err(Error::shape_mismatch("mismatch in the number of registers"));
        }
        let mut merged = Self::new_unchecked(self.m);
        for j in 0..self.m {
            merged
                .registers
                .set(j, self.registers.get(j).max(other.registers.get(j)));
        }
        Ok(merged)
    }

    /// Returns the bias correction coefficient for `m` registers.
    pub(crate) fn alpha(m: usize) -> f64 {
        match m {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m as f64),
        }
    }
}

/// Applies the small and large range corrections to a raw estimate.
pub(crate) fn corrected_estimate(m: usize, raw: f64, zero_registers: usize) -> f64 {
    const LARGE_RANGE_CUTOFF: u64 = (1 << 32) / 30;
    let m = m as f64;
    if raw <= 2.5 * m && zero_registers != 0 {
        m * (m / zero_registers as f64).ln()
    } else if raw <= LARGE_RANGE_CUTOFF as f64 {
        raw
    } else {
        let two_pow_32 = (1u64 << 32) as f64;
        -two_pow_32 * (1.0 - raw / two_pow_32).ln()
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn test_new_rejects_non_power_of_two() {
        assert!(HyperLogLog::new(15).is_err());
        assert!(HyperLogLog::new(0).is_err());
        assert!(HyperLogLog::new(16).is_ok());
        assert!(HyperLogLog::new(1024).is_ok());
    }

    #[test]
    fn test_empty_sketch() {
        let sketch = HyperLogLog::new(16).unwrap();
        assert_eq!(sketch.bit_size(), 96);
        assert_eq!(sketch.register_count(), 16);
        assert_eq!(sketch.export_registers(), vec![0; 16]);
        assert_eq!(sketch.estimate(), 0.0);
    }

    #[test]
    fn test_registers_hold_maximum_rank() {
        let m = 16;
        let mut sketch = HyperLogLog::new(m).unwrap();
        let mut shadow = vec![0u8; m];
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..1000 {
            let item: u64 = rng.gen();
            let x = item_hash(&item);
            let j = fibonacci_hash(x, m.ilog2()) as usize;
            shadow[j] = shadow[j].max(rho(x));
            sketch.add(&item);
        }
        assert_eq!(sketch.export_registers(), shadow);
    }

    #[test]
    fn test_add_jr_keeps_maximum() {
        let mut sketch = HyperLogLog::new(16).unwrap();
        sketch.add_jr(3, 5);
        sketch.add_jr(3, 2);
        sketch.add_jr(3, 5);
        sketch.add_jr(7, 1);
        let registers = sketch.export_registers();
        assert_eq!(registers[3], 5);
        assert_eq!(registers[7], 1);
        assert!(registers.iter().enumerate().all(|(j, r)| *r == 0 || j == 3 || j == 7));
    }

    #[test]
    fn test_alpha_table() {
        assert_eq!(HyperLogLog::alpha(16), 0.673);
        assert_eq!(HyperLogLog::alpha(32), 0.697);
        assert_eq!(HyperLogLog::alpha(64), 0.709);
        assert_eq!(HyperLogLog::alpha(128), 0.7213 / (1.0 + 1.079 / 128.0));
    }

    #[test]
    fn test_small_range_correction() {
        // a single occupied register keeps the estimate in linear counting
        let mut sketch = HyperLogLog::new(16).unwrap();
        sketch.add_jr(0, 1);
        let m = 16.0f64;
        assert_eq!(sketch.estimate(), m * (m / 15.0f64).ln());
    }

    #[test]
    fn test_estimate_range_corrections() {
        let m = 1024;
        // below the cutoff the raw estimate passes through untouched
        assert_eq!(corrected_estimate(m, 1_000_000.0, 0), 1_000_000.0);
        // past the cutoff the large range correction kicks in
        let cutoff = ((1u64 << 32) / 30) as f64;
        let raw = cutoff + 1.0;
        let two_pow_32 = (1u64 << 32) as f64;
        assert_eq!(
            corrected_estimate(m, raw, 0),
            -two_pow_32 * (1.0 - raw / two_pow_32).ln()
        );
        // small estimates with occupied zero registers use linear counting
        let m_f = m as f64;
        assert_eq!(corrected_estimate(m, 100.0, 512), m_f * (m_f / 512.0).ln());
        // small estimates without zero registers do not
        assert_eq!(corrected_estimate(m, 100.0, 0), 100.0);
    }

    #[test]
    fn test_merge_is_pointwise_maximum() {
        let m = 64;
        let mut a = HyperLogLog::new(m).unwrap();
        let mut b = HyperLogLog::new(m).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..500 {
            a.add(&rng.gen::<u64>());
            b.add(&rng.gen::<u64>());
        }
        let merged = a.merge(&b).unwrap();
        let (ra, rb, rm) = (a.export_registers(), b.export_registers(), merged.export_registers());
        for j in 0..m {
            assert_eq!(rm[j], ra[j].max(rb[j]));
        }
    }

    #[test]
    fn test_merge_rejects_mismatched_register_count() {
        let a = HyperLogLog::new(64).unwrap();
        let b = HyperLogLog::new(128).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_merge_equals_union() {
        let m = 256;
        let mut a = HyperLogLog::new(m).unwrap();
        let mut b = HyperLogLog::new(m).unwrap();
        let mut union = HyperLogLog::new(m).unwrap();
        let mut rng = StdRng::seed_from_u64(31337);
        for _ in 0..5000 {
            let x: u64 = rng.gen();
            a.add(&x);
            union.add(&x);
        }
        for _ in 0..5000 {
            let x: u64 = rng.gen();
            b.add(&x);
            union.add(&x);
        }
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.export_registers(), union.export_registers());
        assert_eq!(merged.estimate(), union.estimate());
    }

    #[test]
    fn test_estimate_statistical_accuracy() {
        // averaged over many replicates the raw estimator is close to
        // unbiased for n well above the linear counting range
        let n = 1000u64;
        let replicates = 5000u64;
        let mut rng = StdRng::seed_from_u64(0xACC);
        let mut total = 0.0;
        for _ in 0..replicates {
            let mut sketch = HyperLogLog::new(64).unwrap();
            for _ in 0..n {
                sketch.add(&rng.gen::<u64>());
            }
            total += sketch.estimate();
        }
        let average = total / replicates as f64;
        assert!(
            (average - n as f64).abs() < 10.0,
            "average estimate {average} drifted from {n}"
        );
    }
}
