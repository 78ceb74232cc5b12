//!
//! Cross-thread behavior of the dictionary front-ends.
//!

use carbon_core::{AsyncDic, StrDic, SyncDic};
use ruc::*;
use std::sync::Arc;

#[test]
fn concurrent_callers_agree_on_ids() {
    let dic = Arc::new(AsyncDic::default());
    let shared = (0..200)
        .map(|i| format!("shared-{}", i).into_bytes())
        .collect::<Vec<_>>();

    let handles = (0..4)
        .map(|_| {
            let dic = Arc::clone(&dic);
            let shared = shared.clone();
            std::thread::spawn(move || {
                let refs = shared.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
                pnk!(dic.insert(&refs))
            })
        })
        .collect::<Vec<_>>();

    let mut results = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Vec<_>>();

    // every caller observed the same interning
    let first = results.pop().unwrap();
    for other in results {
        assert_eq!(first, other);
    }
    assert_eq!(dic.num_distinct(), 200);
}

#[test]
fn sync_dictionary_is_shareable() {
    let dic = Arc::new(SyncDic::default());
    let handles = (0..4)
        .map(|t| {
            let dic = Arc::clone(&dic);
            std::thread::spawn(move || {
                let strings = (0..100)
                    .map(|i| format!("t{}-{}", t, i).into_bytes())
                    .collect::<Vec<_>>();
                let refs = strings.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
                let ids = pnk!(dic.insert(&refs));
                assert_eq!(pnk!(dic.extract(&ids)), strings);
            })
        })
        .collect::<Vec<_>>();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(dic.num_distinct(), 400);
}

#[test]
fn interning_is_stable_across_batches() {
    let dic = AsyncDic::default();
    let strings = (0..300)
        .map(|i| format!("stable-{}", i % 60).into_bytes())
        .collect::<Vec<_>>();
    let refs = strings.iter().map(|s| s.as_slice()).collect::<Vec<_>>();

    let a = pnk!(dic.insert(&refs));
    let b = pnk!(dic.insert(&refs));
    assert_eq!(a, b);
    assert_eq!(dic.num_distinct(), 60);
}
