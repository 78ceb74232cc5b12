//!
//! # Async dictionary
//!
//! Sharded N-way dictionary. A batch is hash-partitioned across carriers,
//! fanned out to a long-lived worker pool, and joined; carrier-local ids are
//! composed with the carrier index into global ids that preserve the input
//! order: `ids[i]` always answers `strings[i]`.
//!

use super::{global_id, local_part, owner_part, sync::SyncDic, StrDic, LOCAL_MASK, MAX_CARRIERS};
use crate::{
    alloc::{std_allocator, AllocHandle},
    common::{Locate, RawBytes, StringId, NULL_STRING_ID, NULL_TEXT},
    hash,
    spinlock::Spinlock,
    strhash::StrHashCounters,
};
use ruc::*;
use std::sync::{mpsc, Arc};
use threadpool::ThreadPool;

const DEFAULT_CAPACITY: usize = 4096;
const DEFAULT_BUCKETS: usize = 64;
const DEFAULT_BUCKET_CAP: usize = 8;
const DEFAULT_CARRIERS: usize = 8;

struct Carrier {
    id: usize,
    dic: SyncDic,
}

pub struct AsyncDic {
    lock: Spinlock,
    carriers: Vec<Arc<Carrier>>,
    pool: ThreadPool,
}

impl Default for AsyncDic {
    fn default() -> Self {
        pnk!(Self::new(
            std_allocator(),
            DEFAULT_CAPACITY,
            DEFAULT_BUCKETS,
            DEFAULT_BUCKET_CAP,
            DEFAULT_CARRIERS,
        ))
    }
}

impl AsyncDic {
    pub fn new(
        alloc: AllocHandle,
        capacity: usize,
        num_buckets: usize,
        bucket_cap: usize,
        num_carriers: usize,
    ) -> Result<Self> {
        if num_carriers == 0 {
            return Err(eg!("InvalidArgument: at least one carrier required"));
        }
        if num_carriers > MAX_CARRIERS {
            return Err(eg!(format!(
                "CapacityExceeded: {} carriers requested, at most {} encodable",
                num_carriers, MAX_CARRIERS
            )));
        }

        let carriers = (0..num_carriers)
            .map(|id| {
                SyncDic::new(
                    alloc.clone(),
                    capacity.div_ceil(num_carriers),
                    num_buckets.div_ceil(num_carriers),
                    bucket_cap,
                )
                .c(d!())
                .map(|dic| Arc::new(Carrier { id, dic }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            lock: Spinlock::new(),
            carriers,
            pool: ThreadPool::new(num_carriers),
        })
    }

    #[inline(always)]
    pub fn num_carriers(&self) -> usize {
        self.carriers.len()
    }

    /// Live `(string, global id)` pairs across all carriers.
    pub fn contents(&self) -> Vec<(RawBytes, StringId)> {
        let _hold = self.lock.acquire();
        let mut out = vec![];
        for c in &self.carriers {
            for (s, local) in c.dic.contents() {
                out.push((s, global_id(c.id as u64, local)));
            }
        }
        out
    }

    #[inline(always)]
    fn carrier_of(&self, key: &[u8]) -> usize {
        (hash::sax(key) % self.carriers.len() as u64) as usize
    }

    fn carrier_checked(&self, id: StringId) -> Result<usize> {
        let owner = owner_part(id) as usize;
        if owner >= self.carriers.len() {
            return Err(eg!(format!("InvalidArgument: id {} names no carrier", id)));
        }
        Ok(owner)
    }

    /// Fan a per-carrier workload out to the pool and fold the per-carrier
    /// answers in as they arrive. `positions[c]` keeps the original index of
    /// every element shipped to carrier `c`.
    fn fan_out<I, O, W, F>(
        &self,
        batches: Vec<Vec<I>>,
        positions: &[Vec<usize>],
        work: W,
        mut fold: F,
    ) -> Result<()>
    where
        I: Send + 'static,
        O: Send + 'static,
        W: Fn(&SyncDic, Vec<I>) -> Result<O> + Send + Sync + 'static,
        F: FnMut(usize, &[usize], O) -> Result<()>,
    {
        let (tx, rx) = mpsc::channel();
        let work = Arc::new(work);
        let mut active = 0;

        for (c, batch) in batches.into_iter().enumerate() {
            if batch.is_empty() {
                log::debug!("carrier {} had nothing to do", c);
                continue;
            }
            active += 1;
            let carrier = Arc::clone(&self.carriers[c]);
            let work = Arc::clone(&work);
            let tx = tx.clone();
            self.pool.execute(move || {
                log::debug!("carrier {} spawned for {} elements", carrier.id, batch.len());
                // errors cross the channel as plain strings
                let res = work(&carrier.dic, batch).map_err(|e| e.to_string());
                // the receiver outlives every worker of this batch
                tx.send((carrier.id, res)).ok();
            });
        }
        drop(tx);

        for _ in 0..active {
            let (c, res) = rx.recv().c(d!())?;
            let output = res.map_err(|e| eg!(e)).c(d!())?;
            fold(c, &positions[c], output)?;
        }
        Ok(())
    }
}

impl StrDic for AsyncDic {
    fn insert(&self, strings: &[&[u8]]) -> Result<Vec<StringId>> {
        let _hold = self.lock.acquire();
        let n = self.carriers.len();

        let mut batches: Vec<Vec<RawBytes>> = vec![Vec::new(); n];
        let mut positions: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, s) in strings.iter().enumerate() {
            let c = self.carrier_of(s);
            batches[c].push(s.to_vec());
            positions[c].push(i);
        }

        let mut out = vec![NULL_STRING_ID; strings.len()];
        self.fan_out(
            batches,
            &positions,
            |dic, batch| {
                let refs = batch.iter().map(|b| b.as_slice()).collect::<Vec<_>>();
                dic.insert(&refs)
            },
            |c, pos, local_ids| {
                for (j, local) in local_ids.iter().enumerate() {
                    assert_eq!(local & !LOCAL_MASK, 0, "local id overflows 54 bits");
                    out[pos[j]] = global_id(c as u64, *local);
                }
                Ok(())
            },
        )?;
        Ok(out)
    }

    fn remove(&self, ids: &[StringId]) -> Result<()> {
        let _hold = self.lock.acquire();
        let n = self.carriers.len();

        let mut batches: Vec<Vec<StringId>> = vec![Vec::new(); n];
        let mut positions: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, id) in ids.iter().enumerate() {
            let c = self.carrier_checked(*id)?;
            batches[c].push(local_part(*id));
            positions[c].push(i);
        }

        self.fan_out(
            batches,
            &positions,
            |dic, batch| dic.remove(&batch),
            |_, _, ()| Ok(()),
        )
    }

    fn locate_safe(&self, keys: &[&[u8]]) -> Result<Locate> {
        let _hold = self.lock.acquire();
        let n = self.carriers.len();

        let mut batches: Vec<Vec<RawBytes>> = vec![Vec::new(); n];
        let mut positions: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, k) in keys.iter().enumerate() {
            let c = self.carrier_of(k);
            batches[c].push(k.to_vec());
            positions[c].push(i);
        }

        let mut out = Locate {
            ids: vec![NULL_STRING_ID; keys.len()],
            found_mask: vec![false; keys.len()],
            num_not_found: 0,
        };
        self.fan_out(
            batches,
            &positions,
            |dic, batch| {
                let refs = batch.iter().map(|b| b.as_slice()).collect::<Vec<_>>();
                dic.locate_safe(&refs)
            },
            |c, pos, located| {
                out.num_not_found += located.num_not_found;
                for (j, found) in located.found_mask.iter().enumerate() {
                    out.found_mask[pos[j]] = *found;
                    if *found {
                        out.ids[pos[j]] = global_id(c as u64, located.ids[j]);
                    }
                }
                Ok(())
            },
        )?;
        Ok(out)
    }

    fn extract(&self, ids: &[StringId]) -> Result<Vec<RawBytes>> {
        let _hold = self.lock.acquire();
        let n = self.carriers.len();

        let mut batches: Vec<Vec<StringId>> = vec![Vec::new(); n];
        let mut positions: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut out = vec![RawBytes::new(); ids.len()];
        for (i, id) in ids.iter().enumerate() {
            if *id == NULL_STRING_ID {
                out[i] = NULL_TEXT.to_vec();
                continue;
            }
            let c = self.carrier_checked(*id)?;
            batches[c].push(local_part(*id));
            positions[c].push(i);
        }

        self.fan_out(
            batches,
            &positions,
            |dic, batch| dic.extract(&batch),
            |_, pos, strings| {
                for (j, s) in strings.into_iter().enumerate() {
                    out[pos[j]] = s;
                }
                Ok(())
            },
        )?;
        Ok(out)
    }

    fn num_distinct(&self) -> usize {
        self.carriers.iter().map(|c| c.dic.num_distinct()).sum()
    }

    fn counters(&self) -> StrHashCounters {
        let _hold = self.lock.acquire();
        let mut total = StrHashCounters::default();
        for c in &self.carriers {
            total.merge(&c.dic.counters());
        }
        total
    }

    fn reset_counters(&self) {
        let _hold = self.lock.acquire();
        for c in &self.carriers {
            c.dic.reset_counters();
        }
    }
}
