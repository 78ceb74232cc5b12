use super::*;
use ruc::*;
use crate::alloc::{std_allocator, TraceAlloc};
use std::sync::Arc;

fn buf<T>(cap: usize) -> VecBuf<T> {
    pnk!(VecBuf::with_capacity(std_allocator(), cap))
}

#[test]
fn push_pop_roundtrip() {
    let mut v = buf::<u64>(4);
    for i in 0..100u64 {
        pnk!(v.push(i));
    }
    assert_eq!(v.len(), 100);
    assert!(v.capacity() >= 100);
    for i in (0..100u64).rev() {
        assert_eq!(v.pop(), Some(i));
    }
    assert_eq!(v.pop(), None);
}

#[test]
fn growth_reports_new_slots() {
    let mut v = buf::<u8>(10);
    let created = pnk!(v.grow());
    assert_eq!(v.capacity(), 10 + created);
    assert_eq!(created, 7); // 10 * 1.7 = 17
}

#[test]
fn repeated_push_and_enlarge() {
    let mut v = buf::<u32>(8);
    pnk!(v.repeated_push(7, 5));
    assert_eq!(v.as_slice(), &[7, 7, 7, 7, 7]);
    pnk!(v.enlarge_to_capacity());
    assert_eq!(v.len(), v.capacity());
    assert_eq!(v.as_slice()[5..], [0, 0, 0]);
}

#[test]
fn order_survives_growth() {
    let mut v = buf::<String>(1);
    for i in 0..50 {
        pnk!(v.push(format!("s{}", i)));
    }
    for i in 0..50 {
        assert_eq!(v.at(i), &format!("s{}", i));
    }
}

#[test]
fn duplicate_is_deep() {
    let mut v = buf::<Vec<u8>>(2);
    pnk!(v.push(vec![1, 2]));
    let mut w = pnk!(v.duplicate());
    pnk!(w.push(vec![3]));
    assert_eq!(v.len(), 1);
    assert_eq!(w.len(), 2);
}

#[test]
fn truncate_drops_tail() {
    let mut v = buf::<Arc<u8>>(4);
    let tracked = Arc::new(1u8);
    for _ in 0..4 {
        pnk!(v.push(Arc::clone(&tracked)));
    }
    v.truncate(1);
    assert_eq!(Arc::strong_count(&tracked), 2); // local + the survivor
    v.clear();
    assert_eq!(Arc::strong_count(&tracked), 1);
}

#[test]
fn shrink_to_fit_keeps_content() {
    let mut v = buf::<u16>(64);
    pnk!(v.extend_from_slice(&[1, 2, 3]));
    pnk!(v.shrink_to_fit());
    assert_eq!(v.capacity(), 3);
    assert_eq!(v.as_slice(), &[1, 2, 3]);
}

#[test]
fn traced_allocations_balance_out() {
    let tracer = Arc::new(TraceAlloc::new(std_allocator()));
    {
        let mut v: VecBuf<u64> = pnk!(VecBuf::with_capacity(tracer.clone(), 4));
        for i in 0..100 {
            pnk!(v.push(i));
        }
        let stats = tracer.snapshot();
        assert_eq!(stats.num_alloc, 1);
        assert!(stats.num_realloc > 0);
        assert!(stats.bytes_in_flight >= 800);
    }
    let stats = tracer.snapshot();
    assert_eq!(stats.num_free, 1);
    assert_eq!(stats.bytes_in_flight, 0);
}
