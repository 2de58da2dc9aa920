// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

//! packed_cardinality provides approximate distinct-count estimation with an
//! emphasis on the memory footprint of individual sketches. The centerpiece
//! is [`HyperLogLogLog`], a HyperLogLog variant that re-encodes its register
//! array on the fly as a shared byte base plus narrow per-register offsets,
//! spilling out-of-band registers into a sorted packed exception store. The
//! in-memory size tracks the smallest encoding the current register
//! distribution admits, while estimates stay bit-for-bit identical to the
//! classical [`HyperLogLog`] fed the same input.
//!
//! Counting distinct items:
//!
//! ```rust
//! use packed_cardinality::HyperLogLogLog;
//!
//! let mut sketch = HyperLogLogLog::new(1024).unwrap();
//! for i in 0u64..10_000 {
//!     sketch.add(&i);
//! }
//!
//! let estimate = sketch.estimate();
//! assert!((estimate - 10_000.0).abs() < 1_000.0);
//! // a plain HyperLogLog with 1024 registers would occupy 6144 bits
//! assert!(sketch.bit_size() < 6144);
//! ```
//!
//! Sketches over disjoint streams combine losslessly:
//!
//! ```rust
//! use packed_cardinality::HyperLogLogLog;
//!
//! let mut left = HyperLogLogLog::new(256).unwrap();
//! let mut right = HyperLogLogLog::new(256).unwrap();
//! for i in 0u64..5_000 {
//!     left.add(&i);
//!     right.add(&(i + 5_000));
//! }
//!
//! let merged = left.merge(&right).unwrap();
//! assert!(merged.estimate() > left.estimate());
//! ```
//!
//! Any [`Hash`](std::hash::Hash) item can be counted; hashing is
//! deterministic within a build, so independently constructed sketches agree
//! on every item. Callers with their own hashing scheme can feed sketches
//! through `add_hash` or `add_jr` instead.

pub use sketch_impl::hash::{fibonacci_hash, item_hash, rho};
pub use sketch_impl::hyperloglog::HyperLogLog;
#[cfg(feature = "zstd")]
pub use sketch_impl::hyperloglog_zstd::HyperLogLogZstd;
pub use sketch_impl::hyperlogloglog::{minimum_bits, CompressionFlags, HyperLogLogLog};
pub use sketch_impl::packed_map::PackedMap;
pub use sketch_impl::packed_vector::PackedVector;
pub use sketch_impl::result::Cause as ErrorCause;
pub use sketch_impl::result::Error;
pub use sketch_impl::{Word, WORD_BITS};

pub(crate) mod sketch_impl;
