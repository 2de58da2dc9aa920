// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::hash::Hash;

use ahash::RandomState;

use super::Word;

/// Multiplier for [`fibonacci_hash`], the odd constant closest to `φ·2^64`.
const FIBONACCI_MULTIPLIER: Word = 0x9e3779b97f4a7c15;

/// Every sketch must map a given item to the same register, so the hasher
/// seeds are pinned rather than drawn per instance.
fn hasher_state() -> RandomState {
    RandomState::with_seeds(
        0xD4D1C62E748C6F9F,
        0x6AB3CDB8BD6660B5,
        0x252E7AFD38FC5B30,
        0xD47C5724DAD72AD1,
    )
}

/// Hashes an item to a full-width word. Deterministic within a build;
/// sketches fed through differently built binaries are not comparable.
pub fn item_hash<T: Hash + ?Sized>(item: &T) -> Word {
    hasher_state().hash_one(item)
}

/// Returns the top `b` bits of a Fibonacci multiplicative mix of `x`.
/// `b` must not exceed the word width; `b = 0` yields 0.
pub fn fibonacci_hash(x: Word, b: u32) -> Word {
    debug_assert!(b <= Word::BITS);
    FIBONACCI_MULTIPLIER
        .wrapping_mul(x)
        .checked_shr(Word::BITS - b)
        .unwrap_or(0)
}

/// One plus the number of leading zero bits of `x`, the register rank of a
/// hashed item. Ranges over `[1, 65]`.
pub fn rho(x: Word) -> u8 {
    (x.leading_zeros() + 1) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fibonacci_hash_known_values() {
        let xs: [Word; 10] = [
            0xfa8b7cc9187b3f05,
            0x0c3d39ea865ce393,
            0x88ec64e255f60c69,
            0x0b970d98db3ac6b3,
            0x448ed96f193bc53c,
            0xc979ba5fadd89285,
            0xdea1255738927cdb,
            0x36cb7571d0d769ab,
            0xdc58de1397c0b0f8,
            0x360ff1813c04971f,
        ];
        let hs: [Word; 10] = [
            0x8515c3db67149769,
            0x5ecc354cb957df0f,
            0x118f6a5ce88be09d,
            0x40c4e1a5b0cf00af,
            0xacfa7cd1ccc83dec,
            0x637f12757f2e70e9,
            0x7d82131a54cc51f7,
            0x6f6f2ec1d9487f07,
            0xdbfb45d2f836a458,
            0x38d2e55f3589698b,
        ];
        for (x, h) in xs.iter().zip(hs.iter()) {
            assert_eq!(fibonacci_hash(*x, 64), *h);
        }
    }

    #[test]
    fn test_fibonacci_hash_takes_top_bits() {
        let x = 0xdea1255738927cdb;
        let full = fibonacci_hash(x, 64);
        for b in 0..=64u32 {
            let expected = if b == 0 { 0 } else { full >> (64 - b) };
            assert_eq!(fibonacci_hash(x, b), expected);
        }
    }

    #[test]
    fn test_item_hash_is_deterministic() {
        assert_eq!(item_hash(&42u64), item_hash(&42u64));
        assert_eq!(item_hash("qwerty"), item_hash("qwerty"));
        assert_ne!(item_hash(&1u64), item_hash(&2u64));
        assert_ne!(item_hash("a"), item_hash("b"));
    }

    #[test]
    fn test_rho() {
        assert_eq!(rho(0), 65);
        assert_eq!(rho(1), 64);
        assert_eq!(rho(1 << 63), 1);
        assert_eq!(rho(0x00f0000000000000), 9);
        for i in 0..64 {
            assert_eq!(rho(1 << i), (64 - i) as u8);
        }
    }

    fn assert_bit_statistics(hashes: impl Iterator<Item = Word>) {
        const N: u64 = 1_000_000;
        let mut bit_counts = [0u32; 64];
        let mut pair_counts = [[0u32; 64]; 64];
        let mut n = 0u64;
        for h in hashes {
            n += 1;
            let mut remaining = h;
            while remaining != 0 {
                let i = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                bit_counts[i] += 1;
                let mut other = h;
                while other != 0 {
                    let j = other.trailing_zeros() as usize;
                    other &= other - 1;
                    pair_counts[i][j] += 1;
                }
            }
        }
        assert_eq!(n, N);

        for count in bit_counts {
            assert!(count >= 498_000, "bit count {count} below bound");
            assert!(count <= 502_000, "bit count {count} above bound");
        }
        for i in 0..64 {
            for j in 0..64 {
                if i == j {
                    assert_eq!(pair_counts[i][j], bit_counts[i]);
                } else {
                    let count = pair_counts[i][j];
                    assert!(count >= 248_000, "pair count {count} below bound");
                    assert!(count <= 252_000, "pair count {count} above bound");
                }
            }
        }
    }

    #[test]
    fn test_item_hash_bit_statistics() {
        assert_bit_statistics((0u64..1_000_000).map(|x| item_hash(&x)));
    }

    #[test]
    fn test_fibonacci_hash_bit_statistics() {
        assert_bit_statistics((0u64..1_000_000).map(|x| fibonacci_hash(x, 64)));
    }
}
