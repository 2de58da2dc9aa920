// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

pub(crate) mod hash;
pub(crate) mod hyperloglog;
#[cfg(feature = "zstd")]
pub(crate) mod hyperloglog_zstd;
pub(crate) mod hyperlogloglog;
pub(crate) mod packed_map;
pub(crate) mod packed_vector;
pub(crate) mod result;

/// Word type shared by every sketch and packed container in this crate.
/// Hashes are this wide, and packed storage is addressed in these units.
pub type Word = u64;

/// Number of bits in a [`Word`].
pub const WORD_BITS: usize = Word::BITS as usize;

/// Bits required to store a register rank, `log2(WORD_BITS)`.
pub(crate) const RANK_BITS: usize = WORD_BITS.ilog2() as usize;

/// Returns a word with the `bits` lowest bits set.
pub(crate) fn low_mask(bits: usize) -> Word {
    if bits >= WORD_BITS {
        Word::MAX
    } else {
        (1 << bits) - 1
    }
}
