// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::collections::BTreeSet;
use std::hash::Hash;
use std::ops::BitOr;

use crate::sketch_impl::hash::{fibonacci_hash, item_hash, rho};
use crate::sketch_impl::hyperloglog::{corrected_estimate, HyperLogLog};
use crate::sketch_impl::packed_map::PackedMap;
use crate::sketch_impl::packed_vector::PackedVector;
use crate::sketch_impl::result::Error;
use crate::sketch_impl::{Word, RANK_BITS};

/// Compression policy of a [`HyperLogLogLog`] sketch.
///
/// A policy combines a trigger (when to attempt compression) with a
/// compression type (how to pick the new base). Flags are combined with
/// `|`; supplying only one side fills in the default for the other at
/// construction. [`BOTTOM`](CompressionFlags::BOTTOM) is a standalone
/// policy and cannot be combined with anything else.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CompressionFlags(u8);

impl CompressionFlags {
    /// Attempt compression after every register increase.
    pub const WHEN_ALWAYS: CompressionFlags = CompressionFlags(0x1);
    /// Attempt compression only when an increase grew the exception store.
    pub const WHEN_APPEND: CompressionFlags = CompressionFlags(0x2);
    /// Search every candidate base for the smallest exception store.
    pub const TYPE_FULL: CompressionFlags = CompressionFlags(0x4);
    /// Only consider raising the base.
    pub const TYPE_INCREASE: CompressionFlags = CompressionFlags(0x8);
    /// Keep the base pinned to the minimum register value. Standalone.
    pub const BOTTOM: CompressionFlags = CompressionFlags(0x10);
    /// Full compression after every register increase. This gives the
    /// space guarantees but can be slow while the sketch is young.
    pub const DEFAULT: CompressionFlags = CompressionFlags(0x1 | 0x4);

    fn contains(self, flag: CompressionFlags) -> bool {
        self.0 & flag.0 != 0
    }

    /// Applies the construction defaulting rules: a lone compression type
    /// gains [`WHEN_ALWAYS`](Self::WHEN_ALWAYS), a lone trigger gains
    /// [`TYPE_FULL`](Self::TYPE_FULL). Any combination that still lacks a
    /// trigger or a type, or that pairs [`BOTTOM`](Self::BOTTOM) with
    /// another flag, is rejected.
    fn normalize(self) -> Result<CompressionFlags, Error> {
        let mut flags = self;
        if flags == Self::TYPE_FULL || flags == Self::TYPE_INCREASE {
            flags = flags | Self::WHEN_ALWAYS;
        }
        if flags == Self::WHEN_ALWAYS || flags == Self::WHEN_APPEND {
            flags = flags | Self::TYPE_FULL;
        }
        if flags.contains(Self::BOTTOM) {
            if flags != Self::BOTTOM {
                return Err(Error::invalid_parameter_static(
                    "the bottom policy cannot be combined with other compression flags",
                ));
            }
            return Ok(flags);
        }
        if !(flags.contains(Self::TYPE_FULL) || flags.contains(Self::TYPE_INCREASE))
            || !(flags.contains(Self::WHEN_ALWAYS) || flags.contains(Self::WHEN_APPEND))
        {
            return Err(Error::invalid_parameter_static(
                "compression flags must combine a trigger with a compression type",
            ));
        }
        Ok(flags)
    }
}

impl BitOr for CompressionFlags {
    type Output = CompressionFlags;

    fn bitor(self, rhs: CompressionFlags) -> CompressionFlags {
        CompressionFlags(self.0 | rhs.0)
    }
}

/// Self-compressing HyperLogLog.
///
/// Register ranks are stored as a single byte base `B` plus a dense array
/// of two- or three-bit offsets; registers whose rank falls outside
/// `[B, B + max_offset]` live in a sorted packed exception store keyed by
/// register index. After every change the configured compression policy
/// may pick a new base and redistribute registers between the two stores,
/// keeping [`bit_size`](Self::bit_size) near the smallest encoding the
/// current register distribution admits.
///
/// Estimates, exported registers, and merges are identical to those of a
/// [`HyperLogLog`] fed the same input, under every policy.
#[derive(Clone, Debug)]
pub struct HyperLogLogLog {
    m: usize,
    log_m: u32,
    m_bits: usize,
    s_bits: usize,
    flags: CompressionFlags,
    dense: PackedVector,
    sparse: PackedMap,
    /// No register rank is below this; incoming ranks at or below it are
    /// dropped without touching the stores.
    lower_bound: u8,
    /// Number of registers still at `lower_bound`. Only the bottom policy
    /// relies on it, and outside that policy it may drift negative.
    min_value_count: isize,
    base: u8,
    max_offset: u8,
    compress_count: u64,
    rebase_count: u64,
}

impl HyperLogLogLog {
    /// Creates a sketch with `m` registers, three-bit dense offsets, and
    /// the default compression policy. `m` must be a power of two.
    pub fn new(m: usize) -> Result<Self, Error> {
        Self::with_options(m, 3, CompressionFlags::DEFAULT)
    }

    /// Creates a sketch with `m` registers (a power of two), `m_bits` bits
    /// per dense offset (2 or 3), and the given compression policy.
    pub fn with_options(m: usize, m_bits: usize, flags: CompressionFlags) -> Result<Self, Error> {
        if !m.is_power_of_two() {
            return Err(Error::invalid_parameter(format!(
                "register count must be a power of two, but was {m}"
            )));
        }
        if !(2..=3).contains(&m_bits) {
            return Err(Error::invalid_parameter(format!(
                "dense offset width must be 2 or 3 bits, but was {m_bits}"
            )));
        }
        let flags = flags.normalize()?;
        let log_m = m.ilog2();
        Ok(HyperLogLogLog {
            m,
            log_m,
            m_bits,
            s_bits: RANK_BITS,
            flags,
            dense: PackedVector::new(m_bits, m),
            sparse: PackedMap::new(log_m as usize, RANK_BITS),
            lower_bound: 0,
            min_value_count: m as isize,
            base: 0,
            max_offset: (1 << m_bits) - 1,
            compress_count: 0,
            rebase_count: 0,
        })
    }

    /// Returns the size of the sketch in bits: the dense store plus the
    /// occupied part of the exception store. Buffer slack is not counted.
    pub fn bit_size(&self) -> usize {
        self.dense.bit_size() + self.sparse.bit_size()
    }

    /// Returns the number of registers.
    pub fn register_count(&self) -> usize {
        self.m
    }

    /// Returns how many times the compression routine has run.
    pub fn compress_count(&self) -> u64 {
        self.compress_count
    }

    /// Returns how many times compression rebased onto a different base.
    pub fn rebase_count(&self) -> u64 {
        self.rebase_count
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
        if r <= self.lower_bound {
            return;
        }

        let mut updated = false;
        let mut size_increased = false;
        let idx = self.sparse.find(j as Word);
        let r0 = match idx {
            Some(i) => self.sparse.at(i) as u8,
            None => self.dense.get(j) as u8 + self.base,
        };
        if r0 < r {
            if self.base <= r && r <= self.base + self.max_offset {
                if let Some(i) = idx {
                    self.sparse.erase_at(i);
                }
                self.dense.set(j, Word::from(r - self.base));
            } else {
                self.sparse.add(j as Word, Word::from(r));
                size_increased = idx.is_none();
            }

            if r0 == self.lower_bound {
                self.min_value_count -= 1;
            }

            updated = true;
        }

        if (updated && self.flags.contains(CompressionFlags::WHEN_ALWAYS))
            || (size_increased && self.flags.contains(CompressionFlags::WHEN_APPEND))
            || (self.min_value_count == 0 && self.flags == CompressionFlags::BOTTOM)
        {
            self.compress();
        }
    }

    /// Returns the register values as one byte per register.
    pub fn export_registers(&self) -> Vec<u8> {
        (0..self.m).map(|j| self.register(j)).collect()
    }

    /// Returns the present cardinality estimate.
    pub fn estimate(&self) -> f64 {
        let mut inverse_sum = 0.0;
        let mut zero_registers = 0;
        self.for_each_register(|_, r| {
            if r == 0 {
                zero_registers += 1;
            }
            inverse_sum += 1.0 / (1u64 << r) as f64;
        });
        let m = self.m as f64;
        corrected_estimate(
            self.m,
            HyperLogLog::alpha(self.m) * m * m / inverse_sum,
            zero_registers,
        )
    }

    /// Merges this sketch with another into a new sketch, register by
    /// register, and compresses the result. Both sketches must agree on
    /// shape and policy, and must have been fed through the same hash
    /// functions for the result to be meaningful.
    ///
    /// The walk advances through both exception stores and the dense index
    /// in lock step, so no uncompressed register array is ever
    /// materialized.
    pub fn merge(&self, other: &Self) -> Result<Self, Error> {
        if self.m != other.m {
            return Err(Error::shape_mismatch("mismatch in the number of registers"));
        }
        if self.m_bits != other.m_bits {
            return Err(Error::shape_mismatch("mismatch in the dense offset width"));
        }
        if self.s_bits != other.s_bits {
            return Err(Error::shape_mismatch("mismatch in the sparse rank width"));
        }
        if self.flags != other.flags {
            return Err(Error::shape_mismatch("mismatch in the compression flags"));
        }

        let mut merged = HyperLogLogLog::with_options(self.m, self.m_bits, self.flags)?;
        // dense ranks of both operands are bounded by base + max_offset, so
        // every gap register lands in the merged dense band
        merged.base = self.base.max(other.base);

        let mut j = 0;
        let mut i1 = 0;
        let mut i2 = 0;
        while i1 < self.sparse.len() && i2 < other.sparse.len() {
            let k1 = self.sparse.key_at(i1) as usize;
            let k2 = other.sparse.key_at(i2) as usize;
            let k = k1.min(k2);
            while j < k {
                let r1 = self.dense.get(j) as u8 + self.base;
                let r2 = other.dense.get(j) as u8 + other.base;
                merged.dense.set(j, Word::from(r1.max(r2) - merged.base));
                j += 1;
            }
            let r1 = if k1 == k {
                let r = self.sparse.at(i1) as u8;
                i1 += 1;
                r
            } else {
                self.dense.get(j) as u8 + self.base
            };
            let r2 = if k2 == k {
                let r = other.sparse.at(i2) as u8;
                i2 += 1;
                r
            } else {
                other.dense.get(j) as u8 + other.base
            };
            merged.place(j, r1.max(r2));
            j += 1;
        }
        while i1 < self.sparse.len() {
            let k = self.sparse.key_at(i1) as usize;
            while j < k {
                let r1 = self.dense.get(j) as u8 + self.base;
                let r2 = other.dense.get(j) as u8 + other.base;
                merged.dense.set(j, Word::from(r1.max(r2) - merged.base));
                j += 1;
            }
            let r1 = self.sparse.at(i1) as u8;
            i1 += 1;
            let r2 = other.dense.get(j) as u8 + other.base;
            merged.place(j, r1.max(r2));
            j += 1;
        }
        while i2 < other.sparse.len() {
            let k = other.sparse.key_at(i2) as usize;
            while j < k {
                let r1 = self.dense.get(j) as u8 + self.base;
                let r2 = other.dense.get(j) as u8 + other.base;
                merged.dense.set(j, Word::from(r1.max(r2) - merged.base));
                j += 1;
            }
            let r1 = self.dense.get(j) as u8 + self.base;
            let r2 = other.sparse.at(i2) as u8;
            i2 += 1;
            merged.place(j, r1.max(r2));
            j += 1;
        }
        while j < self.m {
            let r1 = self.dense.get(j) as u8 + self.base;
            let r2 = other.dense.get(j) as u8 + other.base;
            merged.dense.set(j, Word::from(r1.max(r2) - merged.base));
            j += 1;
        }

        merged.compress();
        Ok(merged)
    }

    /// Converts the sketch into an uncompressed HyperLogLog.
    pub fn to_hyper_log_log(&self) -> HyperLogLog {
        let mut hll = HyperLogLog::new_unchecked(self.m);
        self.for_each_register(|j, r| hll.add_jr(j, r));
        hll
    }

    /// Builds a compressed sketch from an uncompressed HyperLogLog by
    /// replaying its registers.
    pub fn from_hyper_log_log(
        hll: &HyperLogLog,
        m_bits: usize,
        flags: CompressionFlags,
    ) -> Result<Self, Error> {
        let mut hlll = HyperLogLogLog::with_options(hll.register_count(), m_bits, flags)?;
        for (j, r) in hll.export_registers().into_iter().enumerate() {
            hlll.add_jr(j, r);
        }
        Ok(hlll)
    }

    /// Returns the rank of register `j`.
    fn register(&self, j: usize) -> u8 {
        match self.sparse.find(j as Word) {
            Some(i) => self.sparse.at(i) as u8,
            None => self.dense.get(j) as u8 + self.base,
        }
    }

    /// Calls `f` with every `(j, rank)` pair in ascending register order,
    /// merging the dense array and the exception store in one pass.
    fn for_each_register<F: FnMut(usize, u8)>(&self, mut f: F) {
        let mut j = 0;
        for i in 0..self.sparse.len() {
            let k = self.sparse.key_at(i) as usize;
            while j < k {
                f(j, self.dense.get(j) as u8 + self.base);
                j += 1;
            }
            f(j, self.sparse.at(i) as u8);
            j += 1;
        }
        while j < self.m {
            f(j, self.dense.get(j) as u8 + self.base);
            j += 1;
        }
    }

    /// Stores rank `r` for register `j` on the dense or sparse side,
    /// whichever the current base band dictates.
    fn place(&mut self, j: usize, r: u8) {
        if self.base <= r && r <= self.base + self.max_offset {
            self.dense.set(j, Word::from(r - self.base));
        } else {
            self.sparse.add(j as Word, Word::from(r));
        }
    }

    fn compress(&mut self) {
        if self.flags.contains(CompressionFlags::TYPE_FULL) {
            self.compress_full();
        } else if self.flags.contains(CompressionFlags::TYPE_INCREASE) {
            self.compress_increase();
        } else {
            self.compress_bottom();
        }
        self.compress_count += 1;
    }

    /// Walks candidate bases in ascending rank order and rebases onto the
    /// one leaving the fewest registers out of band. Ties keep the lowest
    /// base since the walk ascends and only strict improvements win.
    fn compress_full(&mut self) {
        let rank_limit: u8 = 1 << self.s_bits;

        let mut best_ns = self.sparse.len();
        let mut best_base = self.base;

        let mut candidate = rank_limit;
        let mut next_candidate = candidate;
        self.for_each_register(|_, r| {
            if r < candidate {
                next_candidate = candidate;
                candidate = r;
            } else if r < next_candidate {
                next_candidate = r;
            }
        });
        self.lower_bound = candidate;

        // every register at or below the current candidate is out of band
        // for all later candidates, so their count bounds any later ns
        let mut n_at_or_below = 0;
        while n_at_or_below < best_ns && candidate < rank_limit {
            next_candidate = rank_limit;
            let mut ns = 0;
            let max_offset = self.max_offset;
            self.for_each_register(|_, r| {
                if r < candidate || r > candidate + max_offset {
                    ns += 1;
                }
                if r == candidate {
                    n_at_or_below += 1;
                }
                if r > candidate && r < next_candidate {
                    next_candidate = r;
                }
            });

            if ns < best_ns {
                best_ns = ns;
                best_base = candidate;
            }

            candidate = next_candidate;
        }

        if best_base != self.base {
            self.rebase(best_base);
        }
    }

    /// Considers only the smallest rank strictly above the current base and
    /// rebases onto it when that shrinks the exception store.
    fn compress_increase(&mut self) {
        let rank_limit: u8 = 1 << self.s_bits;
        let base = self.base;
        let mut candidate = rank_limit;
        let mut lower_bound = rank_limit;
        self.for_each_register(|_, r| {
            if base < r && r < candidate {
                candidate = r;
            }
            if r < lower_bound {
                lower_bound = r;
            }
        });
        self.lower_bound = lower_bound;

        let mut ns = 0;
        let max_offset = self.max_offset;
        self.for_each_register(|_, r| {
            if r < candidate || r > candidate + max_offset {
                ns += 1;
            }
        });

        if ns < self.sparse.len() {
            self.rebase(candidate);
        }
    }

    /// Recounts the bottom registers and raises the base to the minimum
    /// rank once no register sits below it.
    fn compress_bottom(&mut self) {
        let rank_limit: u8 = 1 << self.s_bits;
        let mut lower_bound = rank_limit;
        self.for_each_register(|_, r| {
            if r < lower_bound {
                lower_bound = r;
            }
        });
        let mut min_value_count = 0;
        self.for_each_register(|_, r| {
            if r == lower_bound {
                min_value_count += 1;
            }
        });
        self.lower_bound = lower_bound;
        self.min_value_count = min_value_count;

        if lower_bound > self.base {
            self.rebase(lower_bound);
        }
    }

    /// Redistributes every register between the dense and sparse stores
    /// relative to `new_base`. The dense slot of a register that moves to
    /// the exception store keeps its stale offset; it is ignored while the
    /// register stays sparse.
    fn rebase(&mut self, new_base: u8) {
        for j in 0..self.m {
            let idx = self.sparse.find(j as Word);
            let r = match idx {
                Some(i) => self.sparse.at(i) as u8,
                None => self.dense.get(j) as u8 + self.base,
            };
            if new_base <= r && r <= new_base + self.max_offset {
                self.dense.set(j, Word::from(r - new_base));
                if let Some(i) = idx {
                    self.sparse.erase_at(i);
                }
            } else {
                self.sparse.add(j as Word, Word::from(r));
            }
        }
        self.base = new_base;
        self.rebase_count += 1;
    }
}

/// Returns the smallest encoding in bits that any base admits for the
/// register snapshot: `m·m_bits` for the dense offsets plus
/// `ns·(log2(m) + s_bits)` for the registers no base band can cover.
/// Candidate bases are the distinct register values.
pub fn minimum_bits(registers: &[u8], m_bits: usize, s_bits: usize) -> usize {
    let m = registers.len();
    debug_assert!(m.is_power_of_two());
    let log_m = m.ilog2() as usize;
    let max_offset = (1u32 << m_bits) - 1;
    let bases: BTreeSet<u8> = registers.iter().copied().collect();
    let mut best_ns = m;
    for base in bases {
        let band_top = base as u32 + max_offset;
        let ns = registers
            .iter()
            .filter(|&&r| (r as u32) < base as u32 || (r as u32) > band_top)
            .count();
        best_ns = best_ns.min(ns);
    }
    m * m_bits + best_ns * (log_m + s_bits)
}
