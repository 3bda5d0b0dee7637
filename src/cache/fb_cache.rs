use crate::cache::buffer::{CacheKey, FbRef, FrameBuffer};
use crate::config::CacheOpts;
use crate::foundation::core::NodeId;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of cache occupancy and activity.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Byte budget.
    pub capacity: usize,
    /// Bytes held, including trashed entries that are still checked out.
    pub used: usize,
    /// Live (lookup-able) entries.
    pub entries: usize,
    /// Checkouts not yet checked back in, across live and trashed entries.
    pub outstanding_checkouts: u64,
    /// Checkouts served from an existing entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries inserted.
    pub inserts: u64,
    /// Entries dropped to respect the budget.
    pub evictions: u64,
    /// Entries removed by flushes.
    pub flushed: u64,
    /// Flushed entries waiting for their last checkin.
    pub trash: usize,
}

struct Entry {
    serial: u64,
    buffer: Arc<FrameBuffer>,
    owners: BTreeSet<NodeId>,
    checkouts: u32,
    last_used: u64,
    bytes: usize,
}

struct TrashEntry {
    checkouts: u32,
    bytes: usize,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    trash: HashMap<u64, TrashEntry>,
    used_bytes: usize,
    tick: u64,
    next_serial: u64,
    stats: CacheStats,
}

/// Frame-buffer store shared by every evaluator of a graph.
///
/// All state sits behind one mutex. Every [`FbRef`] handed out by [`Self::checkout`] or
/// [`Self::insert_checked_out`] must be returned through [`Self::checkin`] exactly once; entries
/// with outstanding checkouts are never evicted, and flushed ones move to a trash list until
/// their last checkin.
pub struct FrameBufferCache {
    opts: CacheOpts,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for FrameBufferCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBufferCache")
            .field("opts", &self.opts)
            .field("stats", &self.stats())
            .finish()
    }
}

impl FrameBufferCache {
    /// Empty cache with the given budget.
    pub fn new(opts: CacheOpts) -> Self {
        Self {
            opts,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check out the entry for `key`, recording `owner` as a node that references it.
    pub fn checkout(&self, key: &CacheKey, owner: NodeId) -> Option<FbRef> {
        let mut g = self.lock();
        g.tick += 1;
        let tick = g.tick;
        let Some(e) = g.entries.get_mut(key) else {
            g.stats.misses = g.stats.misses.saturating_add(1);
            return None;
        };
        e.checkouts += 1;
        e.last_used = tick;
        e.owners.insert(owner);
        let r = FbRef {
            key: key.clone(),
            serial: e.serial,
            buffer: Arc::clone(&e.buffer),
        };
        g.stats.hits = g.stats.hits.saturating_add(1);
        Some(r)
    }

    /// Insert `buffer` under `key` and return it checked out.
    ///
    /// If another caller inserted the same key first, that entry is checked out instead.
    pub fn insert_checked_out(&self, key: CacheKey, owner: NodeId, buffer: FrameBuffer) -> FbRef {
        let mut g = self.lock();
        g.tick += 1;
        let tick = g.tick;
        if let Some(e) = g.entries.get_mut(&key) {
            e.checkouts += 1;
            e.last_used = tick;
            e.owners.insert(owner);
            return FbRef {
                key,
                serial: e.serial,
                buffer: Arc::clone(&e.buffer),
            };
        }

        let bytes = buffer.byte_len();
        self.evict_for(&mut g, bytes);

        g.next_serial += 1;
        let serial = g.next_serial;
        let buffer = Arc::new(buffer);
        g.entries.insert(
            key.clone(),
            Entry {
                serial,
                buffer: Arc::clone(&buffer),
                owners: BTreeSet::from([owner]),
                checkouts: 1,
                last_used: tick,
                bytes,
            },
        );
        g.used_bytes = g.used_bytes.saturating_add(bytes);
        g.stats.inserts = g.stats.inserts.saturating_add(1);
        FbRef {
            key,
            serial,
            buffer,
        }
    }

    fn evict_for(&self, g: &mut Inner, incoming: usize) {
        loop {
            let over_bytes = g.used_bytes.saturating_add(incoming) > self.opts.max_bytes;
            let over_entries = g.entries.len() >= self.opts.max_entries;
            if !over_bytes && !over_entries {
                return;
            }
            let victim = g
                .entries
                .iter()
                .filter(|(_, e)| e.checkouts == 0)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            let Some(k) = victim else {
                tracing::debug!(
                    used = g.used_bytes,
                    incoming,
                    "cache over budget with every entry checked out"
                );
                return;
            };
            if let Some(e) = g.entries.remove(&k) {
                g.used_bytes = g.used_bytes.saturating_sub(e.bytes);
                g.stats.evictions = g.stats.evictions.saturating_add(1);
                tracing::debug!(key = %k, bytes = e.bytes, "evicted frame buffer");
            }
        }
    }

    /// Return one checkout.
    pub fn checkin(&self, r: &FbRef) {
        let mut g = self.lock();
        Self::checkin_locked(&mut g, r);
    }

    /// Return several checkouts under one lock acquisition.
    pub fn checkin_all(&self, refs: &[FbRef]) {
        if refs.is_empty() {
            return;
        }
        let mut g = self.lock();
        for r in refs {
            Self::checkin_locked(&mut g, r);
        }
    }

    fn checkin_locked(g: &mut Inner, r: &FbRef) {
        if let Some(e) = g.entries.get_mut(&r.key)
            && e.serial == r.serial
        {
            if e.checkouts == 0 {
                tracing::warn!(key = %r.key, "checkin without matching checkout");
            }
            e.checkouts = e.checkouts.saturating_sub(1);
            return;
        }
        let Some(t) = g.trash.get_mut(&r.serial) else {
            tracing::warn!(key = %r.key, "checkin of unknown frame buffer");
            return;
        };
        t.checkouts = t.checkouts.saturating_sub(1);
        if t.checkouts == 0 {
            let bytes = t.bytes;
            g.trash.remove(&r.serial);
            g.used_bytes = g.used_bytes.saturating_sub(bytes);
        }
    }

    fn remove_entries(g: &mut Inner, keys: Vec<CacheKey>) -> usize {
        let mut n = 0;
        for k in keys {
            let Some(e) = g.entries.remove(&k) else {
                continue;
            };
            n += 1;
            g.stats.flushed = g.stats.flushed.saturating_add(1);
            if e.checkouts > 0 {
                g.trash.insert(
                    e.serial,
                    TrashEntry {
                        checkouts: e.checkouts,
                        bytes: e.bytes,
                    },
                );
            } else {
                g.used_bytes = g.used_bytes.saturating_sub(e.bytes);
            }
        }
        n
    }

    /// Remove every entry referenced by any node in `nodes`. Returns the number removed.
    pub fn flush_owned_by(&self, nodes: &BTreeSet<NodeId>) -> usize {
        let mut g = self.lock();
        let keys: Vec<CacheKey> = g
            .entries
            .iter()
            .filter(|(_, e)| !e.owners.is_disjoint(nodes))
            .map(|(k, _)| k.clone())
            .collect();
        Self::remove_entries(&mut g, keys)
    }

    /// Remove every entry. Returns the number removed.
    pub fn flush_all(&self) -> usize {
        let mut g = self.lock();
        let keys: Vec<CacheKey> = g.entries.keys().cloned().collect();
        Self::remove_entries(&mut g, keys)
    }

    /// `true` if `key` is currently lookup-able.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Live keys in sorted order.
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.lock().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Sum of checkouts not yet returned.
    pub fn outstanding_checkouts(&self) -> u64 {
        let g = self.lock();
        Self::outstanding_locked(&g)
    }

    fn outstanding_locked(g: &Inner) -> u64 {
        let live: u64 = g.entries.values().map(|e| u64::from(e.checkouts)).sum();
        let trashed: u64 = g.trash.values().map(|t| u64::from(t.checkouts)).sum();
        live + trashed
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        let g = self.lock();
        CacheStats {
            capacity: self.opts.max_bytes,
            used: g.used_bytes,
            entries: g.entries.len(),
            outstanding_checkouts: Self::outstanding_locked(&g),
            trash: g.trash.len(),
            ..g.stats.clone()
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cache/fb_cache.rs"]
mod tests;
