//!
//! # Bloom filter
//!
//! Fixed-width bit array probed through four derived hash positions. Used to
//! skip slices that definitively do not contain a key; a false positive only
//! costs a scan, never a wrong answer.
//!

use crate::hash;

/// Memory target of one slice-companion filter, header included: 1% of a
/// 32 KiB L1 cache.
pub const BLOOM_TARGET_MEMORY: usize = 32768 / 100;

const NUM_HASHES: u64 = 4;

#[derive(Clone, Debug)]
pub struct Bloom {
    words: Vec<u64>,
    nbits: usize,
}

impl Bloom {
    pub fn with_bits(nbits: usize) -> Self {
        let nbits = nbits.max(64);
        Self {
            words: vec![0u64; nbits.div_ceil(64)],
            nbits,
        }
    }

    /// Filter sized to [`BLOOM_TARGET_MEMORY`] minus its own header.
    pub fn slice_companion() -> Self {
        Self::with_bits((BLOOM_TARGET_MEMORY - std::mem::size_of::<Self>()) * 8)
    }

    #[inline(always)]
    pub fn nbits(&self) -> usize {
        self.nbits
    }

    pub fn set(&mut self, key: &[u8]) {
        let (h1, h2) = Self::base_hashes(key);
        for k in 0..NUM_HASHES {
            let bit = Self::position(h1, h2, k, self.nbits);
            self.words[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    /// `false` means definitively absent; `true` means maybe present.
    pub fn test(&self, key: &[u8]) -> bool {
        let (h1, h2) = Self::base_hashes(key);
        (0..NUM_HASHES).all(|k| {
            let bit = Self::position(h1, h2, k, self.nbits);
            self.words[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    /// Set all positions and report the prior maybe-present state.
    pub fn test_and_set(&mut self, key: &[u8]) -> bool {
        let (h1, h2) = Self::base_hashes(key);
        let mut seen = true;
        for k in 0..NUM_HASHES {
            let bit = Self::position(h1, h2, k, self.nbits);
            let mask = 1u64 << (bit % 64);
            seen &= self.words[bit / 64] & mask != 0;
            self.words[bit / 64] |= mask;
        }
        seen
    }

    // Two independent base hashes; the k-th probe is the usual
    // double-hashing permutation of the pair.
    #[inline(always)]
    fn base_hashes(key: &[u8]) -> (u64, u64) {
        (hash::fnv(key), hash::sax(key) | 1)
    }

    #[inline(always)]
    fn position(h1: u64, h2: u64, k: u64, nbits: usize) -> usize {
        (h1.wrapping_add(k.wrapping_mul(h2)) % nbits as u64) as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let mut filter = Bloom::with_bits(2048);
        let keys = (0..500u32)
            .map(|i| format!("key-{}", i).into_bytes())
            .collect::<Vec<_>>();
        for k in &keys {
            filter.set(k);
        }
        for k in &keys {
            assert!(filter.test(k));
        }
    }

    #[test]
    fn fresh_filter_rejects() {
        let filter = Bloom::with_bits(2048);
        assert!(!filter.test(b"anything"));
    }

    #[test]
    fn test_and_set_reports_prior_state() {
        let mut filter = Bloom::with_bits(2048);
        assert!(!filter.test_and_set(b"alpha"));
        assert!(filter.test_and_set(b"alpha"));
    }

    #[test]
    fn companion_fits_the_memory_target() {
        let filter = Bloom::slice_companion();
        assert!(filter.nbits() / 8 + std::mem::size_of::<Bloom>() <= BLOOM_TARGET_MEMORY);
    }
}
