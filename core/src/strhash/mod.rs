//!
//! # In-memory string hash
//!
//! Bucket vector routing keys by a Bernstein hash; each bucket owns one
//! slice list. This is the index structure of the dictionaries: it maps a
//! byte string back to the id the contents vector assigned to it.
//!


use crate::{
    alloc::AllocHandle,
    common::{Locate, StringId, NULL_STRING_ID},
    hash,
    slicelist::SliceList,
    vector::VecBuf,
};
use ruc::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Probe statistics, aggregated over all buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrHashCounters {
    pub num_reads: u64,
    pub num_read_hits: u64,
    pub num_read_misses: u64,
    pub num_puts: u64,
}

impl StrHashCounters {
    pub fn merge(&mut self, other: &Self) {
        self.num_reads += other.num_reads;
        self.num_read_hits += other.num_read_hits;
        self.num_read_misses += other.num_read_misses;
        self.num_puts += other.num_puts;
    }
}

struct Bucket {
    list: SliceList,
}

pub struct StrHash {
    buckets: VecBuf<Bucket>,
    counters: StrHashCounters,
}

impl StrHash {
    pub fn new(alloc: AllocHandle, num_buckets: usize, bucket_cap: usize) -> Result<Self> {
        let num_buckets = num_buckets.max(1);
        let mut buckets = VecBuf::with_capacity(alloc.clone(), num_buckets).c(d!())?;
        for _ in 0..num_buckets {
            buckets
                .push(Bucket {
                    list: SliceList::new(alloc.clone(), bucket_cap.max(1)).c(d!())?,
                })
                .c(d!())?;
        }
        Ok(Self {
            buckets,
            counters: StrHashCounters::default(),
        })
    }

    // The empty key is defined to hash to 0.
    #[inline(always)]
    fn bucket_of(&self, key: &[u8]) -> usize {
        let h = if key.is_empty() { 0 } else { hash::bernstein(key) };
        (h % self.buckets.len() as u64) as usize
    }

    pub fn put_bulk(&mut self, keys: &[Arc<[u8]>], ids: &[StringId]) -> Result<()> {
        assert_eq!(keys.len(), ids.len(), "key/id arity mismatch");
        for (key, id) in keys.iter().zip(ids) {
            self.put_exact(Arc::clone(key), *id).c(d!())?;
        }
        Ok(())
    }

    pub fn put_exact(&mut self, key: Arc<[u8]>, id: StringId) -> Result<()> {
        let b = self.bucket_of(&key);
        self.counters.num_puts += 1;
        self.buckets.at_mut(b).list.insert(&[(key, id)]).c(d!())
    }

    pub fn get_bulk(&mut self, keys: &[&[u8]]) -> Locate {
        let mut out = Locate::with_capacity(keys.len());
        for key in keys {
            match self.get_exact(key) {
                Some(id) => {
                    out.ids.push(id);
                    out.found_mask.push(true);
                }
                None => {
                    out.ids.push(NULL_STRING_ID);
                    out.found_mask.push(false);
                    out.num_not_found += 1;
                }
            }
        }
        out
    }

    pub fn get_exact(&mut self, key: &[u8]) -> Option<StringId> {
        let b = self.bucket_of(key);
        self.counters.num_reads += 1;
        match self.buckets.at_mut(b).list.lookup(key) {
            Some(hit) => {
                self.counters.num_read_hits += 1;
                Some(hit.value)
            }
            None => {
                self.counters.num_read_misses += 1;
                None
            }
        }
    }

    pub fn remove_bulk(&mut self, keys: &[&[u8]]) {
        for key in keys {
            let b = self.bucket_of(key);
            self.buckets.at_mut(b).list.remove(key);
        }
    }

    #[inline(always)]
    pub fn counters(&self) -> StrHashCounters {
        self.counters
    }

    #[inline(always)]
    pub fn reset_counters(&mut self) {
        self.counters = StrHashCounters::default();
    }

    #[inline(always)]
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }
}
