#![doc = include_str!("../README.md")]

#![deny(warnings)]
#![cfg_attr(test, allow(warnings))]

pub mod alloc;
pub mod bloom;
pub mod common;
pub mod hash;
pub mod slicelist;
pub mod spinlock;
pub mod strdic;
pub mod strhash;
pub mod vector;

pub use alloc::{global_tracer, std_allocator, Alloc, AllocHandle, TraceAlloc, TraceStats};
pub use bloom::Bloom;
pub use common::{Locate, RawBytes, StringId, NULL_STRING_ID, NULL_TEXT};
pub use spinlock::Spinlock;
pub use strdic::{
    asynchronous::AsyncDic, global_id, local_part, owner_part, sync::SyncDic, StrDic,
    MAX_CARRIERS,
};
pub use strhash::{StrHash, StrHashCounters};
pub use vector::VecBuf;
