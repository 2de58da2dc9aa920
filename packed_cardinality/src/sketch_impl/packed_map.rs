// This file is part of packed_cardinality. Copyright © 2026 packed_cardinality contributors.
// packed_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use super::{low_mask, Word};
use crate::sketch_impl::packed_vector::PackedVector;

/// A sorted map of narrow unsigned keys to narrow unsigned values, packed
/// into a [`PackedVector`] with one element per pair (the key occupies the
/// high bits). Keys are unique and kept strictly ascending, so lookup is a
/// binary search and insertion shifts at most the tail of the array.
///
/// Intended for small maps measured in tens of entries; a tree or hash
/// backed map would waste the bits this crate exists to save.
#[derive(Clone, Debug)]
pub struct PackedMap {
    value_size: usize,
    key_mask: Word,
    value_mask: Word,
    arr: PackedVector,
}

impl PackedMap {
    /// Creates an empty map with `key_size` bits per key and `value_size`
    /// bits per value.
    pub fn new(key_size: usize, value_size: usize) -> Self {
        PackedMap {
            value_size,
            key_mask: low_mask(key_size),
            value_mask: low_mask(value_size),
            arr: PackedVector::new(key_size + value_size, 0),
        }
    }

    /// Returns the number of stored pairs.
    pub fn len(&self) -> usize {
        self.arr.len()
    }

    /// Returns `true` when the map holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.arr.is_empty()
    }

    /// Returns the number of bits occupied by the stored pairs. Buffer
    /// slack is not counted.
    pub fn bit_size(&self) -> usize {
        self.arr.bit_size()
    }

    /// Returns the value of the `i`-th pair in key order.
    pub fn at(&self, i: usize) -> Word {
        self.arr.get(i) & self.value_mask
    }

    /// Returns the key of the `i`-th pair in key order.
    pub fn key_at(&self, i: usize) -> Word {
        self.arr.get(i) >> self.value_size
    }

    /// Returns the index of `key`, or `None` if it is not present.
    pub fn find(&self, key: Word) -> Option<usize> {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let k = self.key_at(mid);
            if k < key {
                lo = mid + 1;
            } else if k > key {
                hi = mid;
            } else {
                return Some(mid);
            }
        }
        None
    }

    /// Maps `key` to `value`, replacing any previous value. A new pair is
    /// appended and then rotated left until the array is sorted again; the
    /// rest of the array was already in order, so only the new element
    /// moves.
    pub fn add(&mut self, key: Word, value: Word) {
        let packed = self.pack(key, value);
        match self.find(key) {
            Some(i) => self.arr.set(i, packed),
            None => {
                self.arr.append(packed);
                let mut i = self.len() - 1;
                while i > 0 && self.key_at(i - 1) > key {
                    let displaced = self.arr.get(i - 1);
                    self.arr.set(i, displaced);
                    i -= 1;
                }
                self.arr.set(i, packed);
            }
        }
    }

    /// Removes `key` if present.
    pub fn erase(&mut self, key: Word) {
        if let Some(i) = self.find(key) {
            self.erase_at(i);
        }
    }

    /// Removes the pair at index `i`.
    pub fn erase_at(&mut self, i: usize) {
        self.arr.erase(i);
    }

    fn pack(&self, key: Word, value: Word) -> Word {
        ((key & self.key_mask) << self.value_size) | (value & self.value_mask)
    }
}
