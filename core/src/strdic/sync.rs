//!
//! # Sync dictionary
//!
//! Single-partition dictionary: a freelist-managed contents vector owning the
//! string bytes, a string-hash index mapping bytes back to ids, and one
//! spinlock serializing the public surface.
//!

use super::StrDic;
use crate::{
    alloc::{std_allocator, AllocHandle},
    bloom::Bloom,
    common::{Locate, RawBytes, StringId, NULL_STRING_ID, NULL_TEXT},
    hash,
    spinlock::Spinlock,
    strhash::{StrHash, StrHashCounters},
    vector::{MemAdvice, VecBuf},
};
use ruc::*;
use std::{cell::UnsafeCell, sync::Arc};

const DEFAULT_CAPACITY: usize = 4096;
const DEFAULT_BUCKETS: usize = 64;
const DEFAULT_BUCKET_CAP: usize = 8;

// Batch-duplicate filters get this many bits per expected new string.
const BATCH_BLOOM_BITS_PER_KEY: usize = 22;

#[derive(Clone, Default)]
struct Entry {
    // None ⇔ the slot is on the freelist.
    bytes: Option<Arc<[u8]>>,
}

struct SyncInner {
    contents: VecBuf<Entry>,
    freelist: VecBuf<StringId>,
    index: StrHash,
}

/// See the module docs.
///
/// Interior mutability behind the spinlock keeps every method `&self`, which
/// is what lets async carriers share one instance per shard. The lock is
/// only ever taken at the public boundary, never while already held.
pub struct SyncDic {
    lock: Spinlock,
    inner: UnsafeCell<SyncInner>,
}

// Guarded by the spinlock.
unsafe impl Send for SyncDic {}
unsafe impl Sync for SyncDic {}

impl Default for SyncDic {
    fn default() -> Self {
        pnk!(Self::new(
            std_allocator(),
            DEFAULT_CAPACITY,
            DEFAULT_BUCKETS,
            DEFAULT_BUCKET_CAP,
        ))
    }
}

impl SyncDic {
    pub fn new(
        alloc: AllocHandle,
        capacity: usize,
        num_buckets: usize,
        bucket_cap: usize,
    ) -> Result<Self> {
        let capacity = capacity.max(1);
        let mut contents = VecBuf::with_capacity(alloc.clone(), capacity).c(d!())?;
        contents.repeated_push(Entry::default(), capacity).c(d!())?;
        let mut freelist = VecBuf::with_capacity(alloc.clone(), capacity).c(d!())?;
        for i in 0..capacity as StringId {
            freelist.push(i).c(d!())?;
        }
        Ok(Self {
            lock: Spinlock::new(),
            inner: UnsafeCell::new(SyncInner {
                contents,
                freelist,
                index: StrHash::new(alloc, num_buckets, bucket_cap).c(d!())?,
            }),
        })
    }

    /// Live `(string, id)` pairs in id order.
    pub fn contents(&self) -> Vec<(RawBytes, StringId)> {
        let _hold = self.lock.acquire();
        let inner = unsafe { &*self.inner.get() };
        inner
            .contents
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.bytes.as_ref().map(|b| (b.to_vec(), i as StringId)))
            .collect()
    }

    fn freelist_pop(inner: &mut SyncInner) -> Result<StringId> {
        if inner.freelist.is_empty() {
            let created = inner.freelist.grow().c(d!())?;
            inner.contents.grow().c(d!())?;
            assert_eq!(
                inner.freelist.capacity(),
                inner.contents.capacity(),
                "freelist and contents diverged"
            );
            for _ in 0..created {
                let pos = inner.contents.len() as StringId;
                inner.freelist.push(pos).c(d!())?;
                inner.contents.push(Entry::default()).c(d!())?;
            }
        }
        // the freelist was just refilled
        Ok(inner.freelist.pop().expect("freelist refill failed"))
    }
}

impl StrDic for SyncDic {
    fn insert(&self, strings: &[&[u8]]) -> Result<Vec<StringId>> {
        let _hold = self.lock.acquire();
        let inner = unsafe { &mut *self.inner.get() };

        // One bulk probe up front skips everything the dictionary already
        // knows about.
        let known = inner.index.get_bulk(strings);

        // Strings new to the dictionary may still repeat within this batch;
        // the filter makes the recheck cheap for the common unique case.
        let mut batch_seen =
            Bloom::with_bits(BATCH_BLOOM_BITS_PER_KEY * known.num_not_found.max(1));

        let mut out = Vec::with_capacity(strings.len());
        for (i, key) in strings.iter().enumerate() {
            if known.found_mask[i] {
                out.push(known.ids[i]);
                continue;
            }

            // Hash of the key instead of the key itself keeps the filter
            // probe O(1) in the string length.
            let probe = if key.is_empty() { 0 } else { hash::fnv(key) };
            if batch_seen.test_and_set(&probe.to_le_bytes()) {
                if let Some(id) = inner.index.get_exact(key) {
                    out.push(id);
                    continue;
                }
            }

            let id = Self::freelist_pop(inner).c(d!())?;
            let entry = inner.contents.at_mut(id as usize);
            assert!(entry.bytes.is_none(), "freelist handed out a live slot");
            let owned: Arc<[u8]> = Arc::from(*key);
            entry.bytes = Some(Arc::clone(&owned));
            inner.index.put_exact(owned, id).c(d!())?;
            out.push(id);
        }

        Ok(out)
    }

    fn remove(&self, ids: &[StringId]) -> Result<()> {
        let _hold = self.lock.acquire();
        let inner = unsafe { &mut *self.inner.get() };

        let mut unindex = Vec::with_capacity(ids.len());
        for id in ids {
            if *id as usize >= inner.contents.len() {
                return Err(eg!(format!("InvalidArgument: unknown string id {}", id)));
            }
            // duplicate ids in the batch take this branch only once
            if let Some(bytes) = inner.contents.at_mut(*id as usize).bytes.take() {
                unindex.push(bytes);
                inner.freelist.push(*id).c(d!())?;
            }
        }

        let refs = unindex.iter().map(|b| &b[..]).collect::<Vec<_>>();
        inner.index.remove_bulk(&refs);
        Ok(())
    }

    fn locate_safe(&self, keys: &[&[u8]]) -> Result<Locate> {
        let _hold = self.lock.acquire();
        let inner = unsafe { &mut *self.inner.get() };
        Ok(inner.index.get_bulk(keys))
    }

    fn extract(&self, ids: &[StringId]) -> Result<Vec<RawBytes>> {
        let _hold = self.lock.acquire();
        let inner = unsafe { &mut *self.inner.get() };

        // id-indexed access lands all over the contents buffer
        inner.contents.memadvice(MemAdvice::Random);

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if *id == NULL_STRING_ID {
                out.push(NULL_TEXT.to_vec());
                continue;
            }
            let bytes = inner
                .contents
                .get(*id as usize)
                .and_then(|e| e.bytes.as_ref())
                .ok_or_else(|| eg!(format!("InvalidArgument: unknown string id {}", id)))?;
            out.push(bytes.to_vec());
        }
        Ok(out)
    }

    fn num_distinct(&self) -> usize {
        let _hold = self.lock.acquire();
        let inner = unsafe { &*self.inner.get() };
        inner.contents.iter().filter(|e| e.bytes.is_some()).count()
    }

    fn counters(&self) -> StrHashCounters {
        let _hold = self.lock.acquire();
        let inner = unsafe { &*self.inner.get() };
        inner.index.counters()
    }

    fn reset_counters(&self) {
        let _hold = self.lock.acquire();
        let inner = unsafe { &mut *self.inner.get() };
        inner.index.reset_counters();
    }
}
