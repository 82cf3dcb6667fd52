//! Dirty bitmask of arbitrary width.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Largest bit count the generated code can express as a plain JS number.
/// Bitwise operators there work on signed 32-bit integers, so bit 31 is
/// already unusable.
pub const NUMBER_MASK_BITS: u32 = 31;

/// Set of variable bits. Word-backed so a component tracking more than 64
/// variables needs no special handling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirtyMask {
    words: Vec<u64>,
}

impl DirtyMask {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bit(index: u32) -> Self {
        let mut mask = Self::empty();
        mask.insert(index);
        mask
    }

    pub fn insert(&mut self, index: u32) {
        let word = (index / 64) as usize;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % 64);
    }

    pub fn contains(&self, index: u32) -> bool {
        self.words
            .get((index / 64) as usize)
            .map(|w| w & (1u64 << (index % 64)) != 0)
            .unwrap_or(false)
    }

    pub fn union_with(&mut self, other: &DirtyMask) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= b;
        }
    }

    pub fn intersects(&self, other: &DirtyMask) -> bool {
        self.words.iter().zip(&other.words).any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn is_superset_of(&self, other: &DirtyMask) -> bool {
        other
            .words
            .iter()
            .enumerate()
            .all(|(i, b)| self.words.get(i).copied().unwrap_or(0) & b == *b)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, w)| {
            (0..64u32)
                .filter(move |b| w & (1u64 << b) != 0)
                .map(move |b| i as u32 * 64 + b)
        })
    }

    /// Hex literal for generated code: `0x5` for number masks, `0x5n` once the
    /// component needs `bigint` masks.
    pub fn to_literal(&self, wide: bool) -> String {
        let significant = self
            .words
            .iter()
            .rposition(|w| *w != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        let mut out = String::from("0x");
        if significant == 0 {
            out.push('0');
        } else {
            let _ = write!(out, "{:x}", self.words[significant - 1]);
            for w in self.words[..significant - 1].iter().rev() {
                let _ = write!(out, "{:016x}", w);
            }
        }
        if wide {
            out.push('n');
        }
        out
    }
}

impl FromIterator<u32> for DirtyMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut mask = DirtyMask::empty();
        for bit in iter {
            mask.insert(bit);
        }
        mask
    }
}
