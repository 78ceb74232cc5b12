use crate::{common::StringId, hash::Hash64};
use std::{mem, sync::Arc};

/// Memory target of one slice: 10% of a 32 KiB L1 cache.
pub const SLICE_TARGET_MEMORY: usize = 32768 / 10;

const SLICE_HEADER: usize = 16;
const PER_ELEM: usize = mem::size_of::<Option<Arc<[u8]>>>() + 2 * mem::size_of::<u64>();

/// Elements per slice; three parallel columns share the memory target.
pub const SLICE_CAP: usize = (SLICE_TARGET_MEMORY - SLICE_HEADER) / PER_ELEM;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupStrat {
    Scan,
    BinarySearch,
}

/// Fixed-capacity structure-of-arrays holding interned keys, their
/// precomputed hashes, and the assigned string ids.
///
/// The columns are kept dense: removal physically compacts them, so `len`
/// alone delimits live data and no per-element presence flag is needed.
pub struct Slice {
    strat: LookupStrat,
    len: u32,
    cache_idx: Option<u32>,
    keys: [Option<Arc<[u8]>>; SLICE_CAP],
    hashes: [Hash64; SLICE_CAP],
    ids: [StringId; SLICE_CAP],
}

impl Slice {
    pub fn new() -> Self {
        Self {
            strat: LookupStrat::Scan,
            len: 0,
            cache_idx: None,
            keys: std::array::from_fn(|_| None),
            hashes: [0; SLICE_CAP],
            ids: [0; SLICE_CAP],
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.len as usize == SLICE_CAP
    }

    #[inline(always)]
    pub fn strat(&self) -> LookupStrat {
        self.strat
    }

    #[inline(always)]
    pub fn id_at(&self, pos: u32) -> StringId {
        self.ids[pos as usize]
    }

    #[inline(always)]
    pub fn hashes(&self) -> &[Hash64] {
        &self.hashes[..self.len as usize]
    }

    pub fn lookup(&mut self, hash: Hash64, key: &[u8]) -> Option<u32> {
        match self.strat {
            LookupStrat::Scan => self.scan(hash, key),
            LookupStrat::BinarySearch => self.bsearch(hash, key),
        }
    }

    // Single-needle scan: the last-hit cache is probed first, then the hash
    // column is walked with the byte compare reserved for hash matches.
    fn scan(&mut self, hash: Hash64, key: &[u8]) -> Option<u32> {
        if let Some(c) = self.cache_idx {
            let i = c as usize;
            if self.hashes[i] == hash && self.keys[i].as_deref() == Some(key) {
                return Some(c);
            }
        }
        for i in 0..self.len as usize {
            if self.hashes[i] == hash && self.keys[i].as_deref() == Some(key) {
                self.cache_idx = Some(i as u32);
                return Some(i as u32);
            }
        }
        None
    }

    // Sealed slices keep the hash column sorted; the equal-hash neighborhood
    // is confirmed linearly and the lowest index wins.
    fn bsearch(&self, hash: Hash64, key: &[u8]) -> Option<u32> {
        let n = self.len as usize;
        let lo = self.hashes[..n].partition_point(|h| *h < hash);
        for i in lo..n {
            if self.hashes[i] != hash {
                break;
            }
            if self.keys[i].as_deref() == Some(key) {
                return Some(i as u32);
            }
        }
        None
    }

    /// Append one entry; the slice must not be full.
    pub fn append(&mut self, key: Arc<[u8]>, hash: Hash64, id: StringId) {
        let i = self.len as usize;
        assert!(i < SLICE_CAP, "append into a sealed slice");
        self.keys[i] = Some(key);
        self.hashes[i] = hash;
        self.ids[i] = id;
        self.len += 1;
    }

    /// Sort the columns by hash and switch to binary-search lookups.
    pub fn seal(&mut self) {
        let n = self.len as usize;
        let mut order = (0..n).collect::<Vec<_>>();
        order.sort_by_key(|i| self.hashes[*i]);

        let mut keys = order
            .iter()
            .map(|i| self.keys[*i].take())
            .collect::<Vec<_>>();
        let hashes = order.iter().map(|i| self.hashes[*i]).collect::<Vec<_>>();
        let ids = order.iter().map(|i| self.ids[*i]).collect::<Vec<_>>();
        for i in 0..n {
            self.keys[i] = keys[i].take();
            self.hashes[i] = hashes[i];
            self.ids[i] = ids[i];
        }

        self.cache_idx = None;
        self.strat = LookupStrat::BinarySearch;
    }

    /// Compact the columns over the removed position.
    pub fn remove_at(&mut self, pos: u32) {
        let n = self.len as usize;
        let pos = pos as usize;
        assert!(pos < n, "remove past the live region");
        for i in pos..n - 1 {
            self.keys[i] = self.keys[i + 1].take();
            self.hashes[i] = self.hashes[i + 1];
            self.ids[i] = self.ids[i + 1];
        }
        self.keys[n - 1] = None;
        self.len -= 1;
        self.cache_idx = None;
    }
}
