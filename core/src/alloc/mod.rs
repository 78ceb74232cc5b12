//!
//! # Pluggable allocation
//!
//! Every buffer in this crate allocates through an [`Alloc`] handle instead
//! of a fixed global. Two implementations ship here: [`StdAlloc`] forwards to
//! the system allocator, and [`TraceAlloc`] wraps any other allocator with
//! counting instrumentation.
//!

mod trace;


pub use trace::{global_tracer, TraceAlloc, TraceStats};

use once_cell::sync::Lazy;
use ruc::*;
use std::{alloc::Layout, ptr::NonNull, sync::Arc};

/// Object-safe allocation interface.
///
/// # Safety
///
/// `realloc` and `dealloc` must be called with a pointer previously returned
/// by the same allocator together with the layout it was created with, the
/// usual `std::alloc` contract.
pub trait Alloc: Send + Sync {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>>;

    /// # Safety
    ///
    /// See the trait-level contract.
    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>>;

    /// # Safety
    ///
    /// See the trait-level contract.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Clonable, shareable allocator value.
pub type AllocHandle = Arc<dyn Alloc>;

/// The process-wide standard allocator.
#[inline(always)]
pub fn std_allocator() -> AllocHandle {
    static STD: Lazy<AllocHandle> = Lazy::new(|| Arc::new(StdAlloc));
    Arc::clone(&STD)
}

/// Thin shim over `std::alloc`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdAlloc;

impl Alloc for StdAlloc {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            return Err(eg!("InvalidArgument: zero-sized allocation"));
        }
        NonNull::new(unsafe { std::alloc::alloc(layout) })
            .ok_or_else(|| eg!(format!("AllocationFailed: {} bytes", layout.size())))
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        if new_size == 0 {
            return Err(eg!("InvalidArgument: zero-sized reallocation"));
        }
        NonNull::new(std::alloc::realloc(ptr.as_ptr(), layout, new_size))
            .ok_or_else(|| eg!(format!("AllocationFailed: {} bytes", new_size)))
    }

    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }
}
