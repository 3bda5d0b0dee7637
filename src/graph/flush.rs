use super::Graph;
use crate::foundation::core::NodeId;
use crate::foundation::error::GraphResult;

impl Graph {
    /// Evict cache entries owned by `id` and everything upstream of it, and invalidate the
    /// descriptors of that subtree and of every dependent. Returns the number of entries evicted.
    ///
    /// Entries owned by sibling subtrees are untouched.
    #[tracing::instrument(skip(self))]
    pub fn flush(&mut self, id: NodeId) -> GraphResult<usize> {
        self.node(id)?;
        let subtree = self.upstream_subtree(id);
        let evicted = self.cache.flush_owned_by(&subtree);
        self.with_edit_infallible(|g| {
            for &n in &subtree {
                g.touch(n);
            }
        });
        tracing::debug!(subtree = subtree.len(), evicted, "flushed subtree");
        Ok(evicted)
    }

    /// Evict every cache entry and invalidate every node.
    #[tracing::instrument(skip(self))]
    pub fn flush_all(&mut self) -> usize {
        let evicted = self.cache.flush_all();
        let ids: Vec<NodeId> = self
            .slots
            .iter()
            .filter_map(|s| s.node.as_ref().map(|n| n.id()))
            .collect();
        self.with_edit_infallible(|g| {
            for id in ids {
                g.touch(id);
            }
        });
        evicted
    }

    fn with_edit_infallible(&mut self, f: impl FnOnce(&mut Self)) {
        self.begin_graph_edit();
        f(self);
        self.end_graph_edit();
    }
}
