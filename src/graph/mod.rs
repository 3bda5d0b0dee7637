//! The graph container: node ownership, root, structural edits and evaluation entry points.

mod edit;
mod evaluate;
mod flush;

pub use edit::GraphEdit;

use crate::cache::fb_cache::FrameBufferCache;
use crate::config::GraphOpts;
use crate::definition::NodeRegistry;
use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::group::{GroupState, SubGraphChain};
use crate::media::{DefaultMediaReader, MediaReader};
use crate::node::Node;
use crate::node::info::StructureInfo;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, RwLock};

/// Graph behind a read/write lock: evaluators take read locks, structural edits the write lock.
pub type SharedGraph = Arc<RwLock<Graph>>;

/// Counters of structural activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct GraphStats {
    /// Invalidation passes run at the end of outermost edits.
    pub propagation_passes: u64,
    /// Nodes notified across all passes.
    pub edit_notifications: u64,
    /// Nodes created, internal ones included.
    pub nodes_created: u64,
    /// Nodes deleted, internal ones included.
    pub nodes_deleted: u64,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Default)]
struct EditState {
    depth: u32,
    pending: BTreeSet<NodeId>,
}

/// Owner of every node, the root selection, the frame-buffer cache and edit transactions.
#[derive(Debug)]
pub struct Graph {
    opts: GraphOpts,
    registry: Arc<NodeRegistry>,
    media: Arc<dyn MediaReader>,
    cache: Arc<FrameBufferCache>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    names: BTreeMap<String, NodeId>,
    root: Option<NodeId>,
    edit: EditState,
    name_serial: u64,
    stats: GraphStats,
}

impl Graph {
    /// Empty graph over `registry`, reading media through `media`.
    pub fn new(
        opts: GraphOpts,
        registry: NodeRegistry,
        media: Arc<dyn MediaReader>,
    ) -> GraphResult<Self> {
        opts.validate()?;
        let cache = Arc::new(FrameBufferCache::new(opts.cache));
        Ok(Self {
            opts,
            registry: Arc::new(registry),
            media,
            cache,
            slots: Vec::new(),
            free: Vec::new(),
            names: BTreeMap::new(),
            root: None,
            edit: EditState::default(),
            name_serial: 0,
            stats: GraphStats::default(),
        })
    }

    /// Empty graph with default options, the built-in node kinds and the default media reader.
    pub fn with_defaults() -> GraphResult<Self> {
        Self::new(
            GraphOpts::default(),
            NodeRegistry::with_builtins()?,
            DefaultMediaReader::shared(),
        )
    }

    /// Wrap into a [`SharedGraph`].
    pub fn into_shared(self) -> SharedGraph {
        Arc::new(RwLock::new(self))
    }

    /// Options the graph was built with.
    pub fn opts(&self) -> &GraphOpts {
        &self.opts
    }

    /// Registered node types.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Mutable registry, for registering types after construction.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        Arc::make_mut(&mut self.registry)
    }

    /// Media boundary.
    pub fn media(&self) -> &dyn MediaReader {
        self.media.as_ref()
    }

    /// Shared frame-buffer cache.
    pub fn cache(&self) -> &FrameBufferCache {
        &self.cache
    }

    pub(crate) fn cache_handle(&self) -> Arc<FrameBufferCache> {
        Arc::clone(&self.cache)
    }

    /// Structural counters.
    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Current root node.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Shape used when nothing upstream provides one.
    pub fn default_structure(&self) -> StructureInfo {
        StructureInfo::new(
            self.opts.default_view.width,
            self.opts.default_view.height,
            8,
        )
    }

    /// Live node behind `id`.
    pub fn node(&self, id: NodeId) -> GraphResult<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
            .ok_or_else(|| GraphError::not_found(format!("node {id}")))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or_else(|| GraphError::not_found(format!("node {id}")))
    }

    /// Resolve a top-level node name. Fails once the node has been deleted.
    pub fn find_node(&self, name: &str) -> GraphResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::not_found(format!("node '{name}'")))
    }

    /// Top-level nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.names.values().filter_map(|&id| self.node(id).ok())
    }

    /// Number of live nodes, internal ones included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    /// Fixed member `role` of `group`.
    ///
    /// A dotted role (`color_pipeline.color`) walks into nested groups. A plain role that is not
    /// a direct member is looked up in nested groups too, nearest first.
    pub fn group_member(&self, group: NodeId, role: &str) -> GraphResult<NodeId> {
        let node = self.node(group)?;
        let missing = || GraphError::not_found(format!("member '{role}' of '{}'", node.name()));
        if let Some((outer, rest)) = role.split_once('.') {
            let nested = self.group_member(group, outer).map_err(|_| missing())?;
            return self.group_member(nested, rest).map_err(|_| missing());
        }
        let mut queue = VecDeque::from([group]);
        while let Some(cur) = queue.pop_front() {
            let Some(state) = self.node(cur)?.group_state() else {
                continue;
            };
            if let Some(&id) = state.members.get(role) {
                return Ok(id);
            }
            queue.extend(
                state
                    .members
                    .values()
                    .copied()
                    .filter(|&m| self.node(m).is_ok_and(Node::is_group)),
            );
        }
        Err(missing())
    }

    /// Internal root of `group`.
    pub fn group_root(&self, group: NodeId) -> GraphResult<NodeId> {
        let node = self.node(group)?;
        node.group_state()
            .and_then(|s| s.root)
            .ok_or_else(|| GraphError::not_found(format!("root of '{}'", node.name())))
    }

    /// Every internal node of `group`, fixed members first.
    pub fn group_members(&self, group: NodeId) -> GraphResult<Vec<NodeId>> {
        Ok(self
            .node(group)?
            .group_state()
            .map(GroupState::all_members)
            .unwrap_or_default())
    }

    /// Adaptor-to-head chains of `group`, in external input order.
    pub fn group_chains(&self, group: NodeId) -> GraphResult<Vec<SubGraphChain>> {
        Ok(self
            .node(group)?
            .group_state()
            .map(|s| s.chains.clone())
            .unwrap_or_default())
    }

    pub(crate) fn group_state_mut(&mut self, group: NodeId) -> GraphResult<&mut GroupState> {
        let node = self.node_mut(group)?;
        let name = node.name.clone();
        node.group_state
            .as_mut()
            .ok_or_else(|| GraphError::validation(format!("node '{name}' is not a group")))
    }

    /// Nodes `id` depends on directly: its inputs plus the node it forwards to.
    pub(crate) fn upstream(&self, id: NodeId) -> Vec<NodeId> {
        let Ok(node) = self.node(id) else {
            return Vec::new();
        };
        let mut out = node.inputs().to_vec();
        if let Some(f) = node.behavior.forwarded_input(node, self) {
            out.push(f);
        }
        out
    }

    /// `id` and everything it depends on, transitively.
    pub fn upstream_subtree(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if seen.insert(cur) {
                stack.extend(self.upstream(cur));
            }
        }
        seen
    }

    /// Independent copy for another thread: same options, registry, media and cache, fresh
    /// behaviors, empty descriptor caches and zeroed counters.
    pub fn fork(&self) -> GraphResult<Self> {
        let mut slots = Vec::with_capacity(self.slots.len());
        for s in &self.slots {
            let node = match &s.node {
                Some(n) => {
                    let (_, behavior) = self.registry.instantiate(n.type_name())?;
                    Some(n.fork(behavior))
                }
                None => None,
            };
            slots.push(Slot {
                generation: s.generation,
                node,
            });
        }
        Ok(Self {
            opts: self.opts.clone(),
            registry: Arc::clone(&self.registry),
            media: Arc::clone(&self.media),
            cache: Arc::clone(&self.cache),
            slots,
            free: self.free.clone(),
            names: self.names.clone(),
            root: self.root,
            edit: EditState::default(),
            name_serial: self.name_serial,
            stats: GraphStats::default(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/graph.rs"]
mod tests;
