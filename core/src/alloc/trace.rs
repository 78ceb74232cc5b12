use super::{std_allocator, Alloc, AllocHandle};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use ruc::*;
use serde::{Deserialize, Serialize};
use std::{alloc::Layout, fmt::Write as _, ptr::NonNull, sync::Arc};

/// Process-wide tracer over the standard allocator. Initialized on first
/// use; callers that never trace never observe it. `reset` is the teardown.
pub fn global_tracer() -> &'static TraceAlloc {
    static GLOBAL: Lazy<TraceAlloc> = Lazy::new(|| TraceAlloc::new(std_allocator()));
    &GLOBAL
}

/// Counter snapshot of a [`TraceAlloc`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStats {
    pub num_alloc: u64,
    pub num_realloc: u64,
    pub num_free: u64,
    pub bytes_in_flight: u64,
}

#[derive(Clone, Copy, Debug)]
enum Event {
    Alloc,
    Realloc,
    Free,
}

impl Event {
    const fn name(self) -> &'static str {
        match self {
            Event::Alloc => "alloc",
            Event::Realloc => "realloc",
            Event::Free => "free",
        }
    }
}

#[derive(Default)]
struct TraceState {
    stats: TraceStats,
    // (event, size, bytes_in_flight after the event)
    samples: Vec<(Event, u64, u64)>,
}

/// Counting wrapper around another allocator.
///
/// Each allocation is prefixed with a header carrying the caller-requested
/// size, so reallocation and free can account bytes without asking the caller
/// to thread sizes through.
pub struct TraceAlloc {
    backing: AllocHandle,
    state: Mutex<TraceState>,
}

impl TraceAlloc {
    pub fn new(backing: AllocHandle) -> Self {
        Self {
            backing,
            state: Mutex::new(TraceState::default()),
        }
    }

    /// Independent tracer with fresh counters over the same backing allocator.
    pub fn fork(&self) -> Self {
        Self::new(Arc::clone(&self.backing))
    }

    #[inline(always)]
    pub fn snapshot(&self) -> TraceStats {
        self.state.lock().stats
    }

    pub fn reset(&self) {
        *self.state.lock() = TraceState::default();
    }

    /// Sample rows as `seq,event,size,bytes_in_flight`.
    pub fn csv(&self) -> String {
        let state = self.state.lock();
        let mut out = String::from("seq,event,size,bytes_in_flight\n");
        for (seq, (ev, size, in_flight)) in state.samples.iter().enumerate() {
            let _ = writeln!(out, "{},{},{},{}", seq, ev.name(), size, in_flight);
        }
        out
    }

    fn record(&self, ev: Event, size: u64, delta: i64) {
        let mut state = self.state.lock();
        match ev {
            Event::Alloc => state.stats.num_alloc += 1,
            Event::Realloc => state.stats.num_realloc += 1,
            Event::Free => state.stats.num_free += 1,
        }
        state.stats.bytes_in_flight = state
            .stats
            .bytes_in_flight
            .checked_add_signed(delta)
            .expect("allocation accounting underflow");
        let in_flight = state.stats.bytes_in_flight;
        state.samples.push((ev, size, in_flight));
    }

    // The header is one usize, padded so that the caller's payload keeps its
    // alignment.
    fn header_size(layout: Layout) -> usize {
        layout.align().max(std::mem::size_of::<u64>())
    }

    fn outer_layout(layout: Layout, size: usize) -> Result<Layout> {
        Layout::from_size_align(Self::header_size(layout) + size, layout.align()).c(d!())
    }
}

impl Alloc for TraceAlloc {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        let header = Self::header_size(layout);
        let outer = Self::outer_layout(layout, layout.size())?;
        let ptr = self.backing.alloc(outer).c(d!())?;
        unsafe {
            (ptr.as_ptr() as *mut u64).write_unaligned(layout.size() as u64);
        }
        self.record(Event::Alloc, layout.size() as u64, layout.size() as i64);
        Ok(unsafe { NonNull::new_unchecked(ptr.as_ptr().add(header)) })
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        let header = Self::header_size(layout);
        let base = NonNull::new_unchecked(ptr.as_ptr().sub(header));
        let old_size = (base.as_ptr() as *const u64).read_unaligned() as usize;
        let outer_old = Self::outer_layout(layout, old_size)?;
        let moved = self
            .backing
            .realloc(base, outer_old, header + new_size)
            .c(d!())?;
        (moved.as_ptr() as *mut u64).write_unaligned(new_size as u64);
        self.record(
            Event::Realloc,
            new_size as u64,
            new_size as i64 - old_size as i64,
        );
        Ok(NonNull::new_unchecked(moved.as_ptr().add(header)))
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        let header = Self::header_size(layout);
        let base = NonNull::new_unchecked(ptr.as_ptr().sub(header));
        let size = (base.as_ptr() as *const u64).read_unaligned() as usize;
        let outer = Layout::from_size_align(header + size, layout.align())
            .expect("header layout already validated on alloc");
        self.record(Event::Free, size as u64, -(size as i64));
        self.backing.dealloc(base, outer);
    }
}
