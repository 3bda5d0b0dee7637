use super::*;

fn buf(w: u32, h: u32) -> FrameBuffer {
    FrameBuffer::from_fn(w, h, "test", |_, _| image::Rgba([0.5, 0.5, 0.5, 1.0]))
}

fn node(i: u32) -> NodeId {
    NodeId::new(i, 0)
}

#[test]
fn checkout_counts_hits_and_misses() {
    let cache = FrameBufferCache::new(CacheOpts::default());
    let key = CacheKey::new("src:1");
    assert!(cache.checkout(&key, node(0)).is_none());
    let r = cache.insert_checked_out(key.clone(), node(0), buf(2, 2));
    let again = cache.checkout(&key, node(0)).unwrap();
    assert_eq!(r.serial(), again.serial());
    let st = cache.stats();
    assert_eq!(st.hits, 1);
    assert_eq!(st.misses, 1);
    assert_eq!(st.inserts, 1);
    assert_eq!(st.outstanding_checkouts, 2);
    cache.checkin_all(&[r, again]);
    assert_eq!(cache.outstanding_checkouts(), 0);
}

#[test]
fn eviction_skips_checked_out_entries() {
    let one = buf(4, 4).byte_len();
    let cache = FrameBufferCache::new(CacheOpts {
        max_bytes: one * 2,
        max_entries: 16,
    });
    let held = cache.insert_checked_out(CacheKey::new("a"), node(0), buf(4, 4));
    let b = cache.insert_checked_out(CacheKey::new("b"), node(0), buf(4, 4));
    cache.checkin(&b);
    let c = cache.insert_checked_out(CacheKey::new("c"), node(0), buf(4, 4));
    cache.checkin(&c);

    assert!(cache.contains(&CacheKey::new("a")));
    assert!(!cache.contains(&CacheKey::new("b")));
    assert!(cache.contains(&CacheKey::new("c")));
    assert_eq!(cache.stats().evictions, 1);
    cache.checkin(&held);
}

#[test]
fn eviction_is_least_recently_used() {
    let one = buf(4, 4).byte_len();
    let cache = FrameBufferCache::new(CacheOpts {
        max_bytes: one * 2,
        max_entries: 16,
    });
    let a = cache.insert_checked_out(CacheKey::new("a"), node(0), buf(4, 4));
    let b = cache.insert_checked_out(CacheKey::new("b"), node(0), buf(4, 4));
    cache.checkin_all(&[a, b]);
    let touch = cache.checkout(&CacheKey::new("a"), node(0)).unwrap();
    cache.checkin(&touch);
    let c = cache.insert_checked_out(CacheKey::new("c"), node(0), buf(4, 4));
    cache.checkin(&c);
    assert_eq!(cache.keys(), vec![CacheKey::new("a"), CacheKey::new("c")]);
}

#[test]
fn entry_limit_is_enforced() {
    let cache = FrameBufferCache::new(CacheOpts {
        max_bytes: usize::MAX,
        max_entries: 2,
    });
    for k in ["a", "b", "c"] {
        let r = cache.insert_checked_out(CacheKey::new(k), node(0), buf(1, 1));
        cache.checkin(&r);
    }
    assert_eq!(cache.stats().entries, 2);
}

#[test]
fn flush_removes_only_entries_owned_by_the_given_nodes() {
    let cache = FrameBufferCache::new(CacheOpts::default());
    let a = cache.insert_checked_out(CacheKey::new("a"), node(1), buf(1, 1));
    let b = cache.insert_checked_out(CacheKey::new("b"), node(2), buf(1, 1));
    cache.checkin_all(&[a, b]);

    let removed = cache.flush_owned_by(&BTreeSet::from([node(1)]));
    assert_eq!(removed, 1);
    assert_eq!(cache.keys(), vec![CacheKey::new("b")]);
}

#[test]
fn flushed_checked_out_entries_wait_in_trash() {
    let cache = FrameBufferCache::new(CacheOpts::default());
    let held = cache.insert_checked_out(CacheKey::new("a"), node(1), buf(2, 2));
    assert_eq!(cache.flush_all(), 1);

    let st = cache.stats();
    assert_eq!(st.entries, 0);
    assert_eq!(st.trash, 1);
    assert_eq!(st.outstanding_checkouts, 1);
    assert!(st.used > 0);
    assert!(!cache.contains(&CacheKey::new("a")));

    // A fresh entry under the same key is independent of the trashed one.
    let fresh = cache.insert_checked_out(CacheKey::new("a"), node(1), buf(2, 2));
    assert_ne!(fresh.serial(), held.serial());

    cache.checkin(&held);
    let st = cache.stats();
    assert_eq!(st.trash, 0);
    assert_eq!(st.outstanding_checkouts, 1);
    cache.checkin(&fresh);
    assert_eq!(cache.stats().used, buf(2, 2).byte_len());
}
