//!
//! # Spinlock
//!
//! Test-and-set lock that records its owning thread and is reentrant for the
//! owner. Serializes the public surface of the dictionaries; uncontended in
//! the common single-writer case, which is why it beats a full mutex there.
//!

use std::{
    sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

// Acquisitions slower than this surface a warning event.
const SOFT_THRESHOLD: Duration = Duration::from_millis(10);

static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

#[inline(always)]
fn thread_tag() -> u64 {
    THREAD_TAG.with(|t| *t)
}

#[derive(Default)]
pub struct Spinlock {
    flag: AtomicBool,
    owner: AtomicU64, // 0 = unowned
    depth: AtomicUsize,
}

impl Spinlock {
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            owner: AtomicU64::new(0),
            depth: AtomicUsize::new(0),
        }
    }

    /// Busy-wait until the lock is held by the calling thread.
    pub fn acquire(&self) -> SpinGuard<'_> {
        let tag = thread_tag();
        if self.owner.load(Ordering::Acquire) == tag {
            self.depth.fetch_add(1, Ordering::Relaxed);
            return SpinGuard { lock: self };
        }
        let begin = Instant::now();
        while self
            .flag
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        self.owner.store(tag, Ordering::Release);
        self.depth.store(1, Ordering::Relaxed);
        let waited = begin.elapsed();
        if waited > SOFT_THRESHOLD {
            log::warn!(
                "spinlock acquisition took exceptionally long: {:?} (thread tag {})",
                waited,
                tag
            );
        }
        SpinGuard { lock: self }
    }

    #[inline(always)]
    pub fn is_held(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn release(&self) {
        debug_assert_eq!(self.owner.load(Ordering::Relaxed), thread_tag());
        if self.depth.fetch_sub(1, Ordering::Relaxed) == 1 {
            self.owner.store(0, Ordering::Relaxed);
            self.flag.store(false, Ordering::Release);
        }
    }
}

/// Releases the (outermost) hold on drop.
#[must_use]
pub struct SpinGuard<'a> {
    lock: &'a Spinlock,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn exclusion_under_contention() {
        let lock = Arc::new(Spinlock::new());
        let counter = Arc::new(AtomicU64::new(0));
        let handles = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let _g = lock.acquire();
                        let v = counter.load(Ordering::Relaxed);
                        counter.store(v + 1, Ordering::Relaxed);
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 8000);
        assert!(!lock.is_held());
    }

    #[test]
    fn reentrant_for_owner() {
        let lock = Spinlock::new();
        let g1 = lock.acquire();
        let g2 = lock.acquire();
        drop(g2);
        assert!(lock.is_held());
        drop(g1);
        assert!(!lock.is_held());
    }
}
