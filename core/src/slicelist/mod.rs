//!
//! # Slice list
//!
//! Ordered collection of fixed-capacity slices, each accompanied by a Bloom
//! filter, a min/max hash-bounds pair, and advisory read statistics. Exactly
//! one slice — the appender — accepts new entries; a filled appender is
//! sealed (sorted, binary-searchable) and a fresh one is opened.
//!

mod slice;


pub use slice::{LookupStrat, Slice, SLICE_CAP, SLICE_TARGET_MEMORY};

use crate::{
    alloc::AllocHandle,
    bloom::Bloom,
    common::StringId,
    hash::{self, Hash64},
    vector::VecBuf,
};
use ruc::*;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
struct SliceDescriptor {
    reads_all: u64,
    reads_hit: u64,
}

#[derive(Clone, Copy, Debug)]
struct HashBounds {
    min: Hash64,
    max: Hash64,
}

impl HashBounds {
    // Empty bounds exclude every probe until the first append widens them.
    const EMPTY: Self = Self {
        min: Hash64::MAX,
        max: 0,
    };

    #[inline(always)]
    fn contains(&self, hash: Hash64) -> bool {
        self.min <= hash && hash <= self.max
    }

    #[inline(always)]
    fn widen(&mut self, hash: Hash64) {
        self.min = self.min.min(hash);
        self.max = self.max.max(hash);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceHit {
    pub slice_idx: usize,
    pub value: StringId,
}

/// Writer exclusion is the caller's business: every mutator takes `&mut
/// self`, and the owning dictionary serializes behind its spinlock.
pub struct SliceList {
    slices: VecBuf<Slice>,
    descriptors: VecBuf<SliceDescriptor>,
    filters: VecBuf<Bloom>,
    bounds: VecBuf<HashBounds>,
    appender_idx: usize,
}

impl SliceList {
    pub fn new(alloc: AllocHandle, slice_capacity: usize) -> Result<Self> {
        let cap = slice_capacity.max(1);
        let mut list = Self {
            slices: VecBuf::with_capacity(alloc.clone(), cap).c(d!())?,
            descriptors: VecBuf::with_capacity(alloc.clone(), cap).c(d!())?,
            filters: VecBuf::with_capacity(alloc.clone(), cap).c(d!())?,
            bounds: VecBuf::with_capacity(alloc, cap).c(d!())?,
            appender_idx: 0,
        };
        list.appender_new().c(d!())?;
        Ok(list)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.slices.iter().all(|s| s.len() == 0)
    }

    #[inline(always)]
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    /// Advisory `(reads_all, reads_hit)` of one slice.
    pub fn slice_stats(&self, i: usize) -> (u64, u64) {
        let d = self.descriptors.at(i);
        (d.reads_all, d.reads_hit)
    }

    /// Insert key/id pairs; keys already present must carry the id they were
    /// registered with (dictionary contract).
    pub fn insert(&mut self, pairs: &[(Arc<[u8]>, StringId)]) -> Result<()> {
        for (key, id) in pairs {
            let hash = hash::additive(key);
            if let Some(hit) = self.lookup_with(hash, key) {
                assert_eq!(hit.value, *id, "one key bound to two ids");
                continue;
            }

            let idx = self.appender_idx;
            self.slices.at_mut(idx).append(Arc::clone(key), hash, *id);
            self.filters.at_mut(idx).set(&hash.to_le_bytes());
            self.bounds.at_mut(idx).widen(hash);

            if self.slices.at(idx).is_full() {
                self.slices.at_mut(idx).seal();
                self.appender_new().c(d!())?;
            }
        }
        Ok(())
    }

    pub fn lookup(&mut self, key: &[u8]) -> Option<SliceHit> {
        self.lookup_with(hash::additive(key), key)
    }

    fn lookup_with(&mut self, hash: Hash64, key: &[u8]) -> Option<SliceHit> {
        for i in 0..self.slices.len() {
            self.descriptors.at_mut(i).reads_all += 1;

            if self.slices.at(i).len() == 0 || !self.bounds.at(i).contains(hash) {
                continue;
            }
            if !self.filters.at(i).test(&hash.to_le_bytes()) {
                continue;
            }
            if let Some(pos) = self.slices.at_mut(i).lookup(hash, key) {
                self.descriptors.at_mut(i).reads_hit += 1;
                return Some(SliceHit {
                    slice_idx: i,
                    value: self.slices.at(i).id_at(pos),
                });
            }
        }
        None
    }

    /// Physically remove a key, rebuilding the owning slice's filter and
    /// bounds. Returns false when the key is absent.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let hash = hash::additive(key);
        for i in 0..self.slices.len() {
            if self.slices.at(i).len() == 0 || !self.bounds.at(i).contains(hash) {
                continue;
            }
            if let Some(pos) = self.slices.at_mut(i).lookup(hash, key) {
                self.slices.at_mut(i).remove_at(pos);
                self.rebuild_guards(i);
                return true;
            }
        }
        false
    }

    fn rebuild_guards(&mut self, i: usize) {
        let mut filter = Bloom::slice_companion();
        let mut bounds = HashBounds::EMPTY;
        for h in self.slices.at(i).hashes() {
            filter.set(&h.to_le_bytes());
            bounds.widen(*h);
        }
        self.filters.set(i, filter);
        self.bounds.set(i, bounds);
    }

    fn appender_new(&mut self) -> Result<()> {
        self.slices.push(Slice::new()).c(d!())?;
        self.descriptors.push(SliceDescriptor::default()).c(d!())?;
        self.filters.push(Bloom::slice_companion()).c(d!())?;
        self.bounds.push(HashBounds::EMPTY).c(d!())?;
        self.appender_idx = self.slices.len() - 1;
        log::debug!(
            "slice list opened appender #{} ({} entries per slice, {} B target)",
            self.appender_idx,
            SLICE_CAP,
            SLICE_TARGET_MEMORY
        );
        Ok(())
    }
}
