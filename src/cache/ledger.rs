use crate::cache::buffer::{CacheKey, FbRef, FrameBuffer};
use crate::cache::fb_cache::FrameBufferCache;
use crate::foundation::core::NodeId;
use std::sync::Arc;

/// Every checkout made during one evaluation call.
///
/// Dropping the ledger checks each recorded checkout back in, so an evaluation that unwinds
/// through `?` cannot leak a reference.
#[derive(Debug)]
pub struct CheckoutLedger {
    cache: Arc<FrameBufferCache>,
    refs: Vec<FbRef>,
}

impl CheckoutLedger {
    pub(crate) fn new(cache: Arc<FrameBufferCache>) -> Self {
        Self {
            cache,
            refs: Vec::new(),
        }
    }

    /// Check out `key` and record it.
    pub fn checkout(&mut self, key: &CacheKey, owner: NodeId) -> Option<FbRef> {
        let r = self.cache.checkout(key, owner)?;
        self.refs.push(r.clone());
        Some(r)
    }

    /// Insert `buffer`, record the resulting checkout and return it.
    pub fn insert(&mut self, key: CacheKey, owner: NodeId, buffer: FrameBuffer) -> FbRef {
        let r = self.cache.insert_checked_out(key, owner, buffer);
        self.refs.push(r.clone());
        r
    }

    /// Number of checkouts held.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// `true` if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Check everything back in now. Returns the number released.
    pub fn release(&mut self) -> usize {
        let n = self.refs.len();
        self.cache.checkin_all(&self.refs);
        self.refs.clear();
        n
    }
}

impl Drop for CheckoutLedger {
    fn drop(&mut self) {
        self.release();
    }
}
