//!
//! # String dictionaries
//!
//! Front-ends that intern byte strings into compact 64-bit identifiers. The
//! [`sync`] dictionary is a single partition; the [`asynchronous`] dictionary
//! shards a batch across up to 1024 carriers and composes global ids from
//! the carrier index and the carrier-local id.
//!

pub mod asynchronous;
pub mod sync;


use crate::common::{Locate, RawBytes, StringId};
use crate::strhash::StrHashCounters;
use ruc::*;

/// Upper bits of a global id naming the owning carrier.
pub const CARRIER_BITS: u32 = 10;

/// Lower bits of a global id naming the carrier-local id.
pub const LOCAL_BITS: u32 = 54;

pub const MAX_CARRIERS: usize = 1 << CARRIER_BITS;

pub const LOCAL_MASK: u64 = (1u64 << LOCAL_BITS) - 1;

#[inline(always)]
pub fn global_id(carrier: u64, local: StringId) -> StringId {
    debug_assert_eq!(local & !LOCAL_MASK, 0);
    (carrier << LOCAL_BITS) | local
}

#[inline(always)]
pub fn owner_part(id: StringId) -> u64 {
    id >> LOCAL_BITS
}

#[inline(always)]
pub fn local_part(id: StringId) -> StringId {
    id & LOCAL_MASK
}

/// Common surface of the dictionary variants.
///
/// All operations take `&self`; implementations serialize internally and are
/// safe to share across threads.
pub trait StrDic: Send + Sync {
    /// Intern a batch, returning one id per input string; duplicates map to
    /// equal ids.
    fn insert(&self, strings: &[&[u8]]) -> Result<Vec<StringId>>;

    fn remove(&self, ids: &[StringId]) -> Result<()>;

    fn locate_safe(&self, keys: &[&[u8]]) -> Result<Locate>;

    /// [`Self::locate_safe`] with the found-mask discarded.
    fn locate_fast(&self, keys: &[&[u8]]) -> Result<Vec<StringId>> {
        self.locate_safe(keys).map(|l| l.ids)
    }

    /// Resolve ids back to strings; the null sentinel renders as `_nil`.
    fn extract(&self, ids: &[StringId]) -> Result<Vec<RawBytes>>;

    fn num_distinct(&self) -> usize;

    fn counters(&self) -> StrHashCounters;

    fn reset_counters(&self);
}
