//! Graph nodes: storage, the behavior trait, descriptor caching and evaluation scope.

pub(crate) mod behavior;
pub(crate) mod info;
pub(crate) mod kinds;
pub(crate) mod scope;

use crate::definition::NodeDefinition;
use crate::eval::context::Context;
use crate::foundation::core::{Frame, NodeId};
use crate::group::GroupState;
use crate::node::behavior::NodeBehavior;
use crate::node::info::{RangeInfo, StructureInfo};
use crate::property::PropertyContainer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Counters observed by tests and tooling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct NodeStats {
    /// `evaluate` calls.
    pub evaluations: u64,
    /// `evaluate_identifier` calls.
    pub identifier_evaluations: u64,
    /// `audio_fill_buffer` calls.
    pub audio_fills: u64,
    /// Range descriptor computations.
    pub range_recomputes: u64,
    /// Structure descriptor computations.
    pub structure_recomputes: u64,
}

#[derive(Debug, Default)]
struct NodeCounters {
    evaluations: AtomicU64,
    identifier_evaluations: AtomicU64,
    audio_fills: AtomicU64,
    range_recomputes: AtomicU64,
    structure_recomputes: AtomicU64,
}

/// Structures vary per frame through cuts; long scrubs must not grow the map without bound.
const MAX_CACHED_STRUCTURES: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StructureKey {
    frame: Frame,
    eye: u8,
    component: String,
    view: (u32, u32),
}

impl StructureKey {
    fn new(ctx: &Context) -> Self {
        Self {
            frame: ctx.frame,
            eye: ctx.eye.tag(),
            component: ctx.component.to_string(),
            view: (ctx.view_width, ctx.view_height),
        }
    }
}

/// Clean/Dirty state of a node's cached descriptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorState {
    /// Cached descriptors, if any, are current.
    Clean,
    /// Cached descriptors are discarded on the next query.
    Dirty,
}

#[derive(Debug, Default)]
struct DescriptorCache {
    dirty: bool,
    range: Option<RangeInfo>,
    structures: HashMap<StructureKey, StructureInfo>,
}

impl DescriptorCache {
    fn clean(&mut self) {
        if self.dirty {
            self.range = None;
            self.structures.clear();
            self.dirty = false;
        }
    }
}

/// A vertex of the processing graph.
///
/// Nodes are owned by their [`crate::Graph`]; inputs and outputs are handles into the same
/// graph's node table.
#[derive(Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) definition: Arc<NodeDefinition>,
    pub(crate) behavior: Box<dyn NodeBehavior>,
    pub(crate) properties: PropertyContainer,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) outputs: Vec<NodeId>,
    pub(crate) group: Option<NodeId>,
    pub(crate) group_state: Option<GroupState>,
    descriptors: Mutex<DescriptorCache>,
    counters: NodeCounters,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        name: String,
        definition: Arc<NodeDefinition>,
        behavior: Box<dyn NodeBehavior>,
        group: Option<NodeId>,
    ) -> Self {
        let properties = definition.default_properties();
        Self {
            id,
            name,
            definition,
            behavior,
            properties,
            inputs: Vec::new(),
            outputs: Vec::new(),
            group,
            group_state: None,
            descriptors: Mutex::new(DescriptorCache::default()),
            counters: NodeCounters::default(),
        }
    }

    /// Copy for another graph, with a fresh behavior and empty caches.
    pub(crate) fn fork(&self, behavior: Box<dyn NodeBehavior>) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            definition: Arc::clone(&self.definition),
            behavior,
            properties: self.properties.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            group: self.group,
            group_state: self.group_state.clone(),
            descriptors: Mutex::new(DescriptorCache::default()),
            counters: NodeCounters::default(),
        }
    }

    /// Handle of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name, unique among top-level nodes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered type name.
    pub fn type_name(&self) -> &str {
        &self.definition.type_name
    }

    /// Type definition.
    pub fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    /// Current property values.
    pub fn properties(&self) -> &PropertyContainer {
        &self.properties
    }

    /// Ordered inputs.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Nodes that list this node as an input, plus the owning group for a group root.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Enclosing group for internal nodes.
    pub fn group(&self) -> Option<NodeId> {
        self.group
    }

    /// `true` for nodes that own a sub-graph.
    pub fn is_group(&self) -> bool {
        self.group_state.is_some()
    }

    pub(crate) fn group_state(&self) -> Option<&GroupState> {
        self.group_state.as_ref()
    }

    /// Type plus a digest of every property; equal for equally configured nodes of one type.
    pub fn settings_id(&self) -> String {
        format!("{}:{}", self.type_name(), self.properties.fingerprint())
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> NodeStats {
        let c = &self.counters;
        NodeStats {
            evaluations: c.evaluations.load(Ordering::Relaxed),
            identifier_evaluations: c.identifier_evaluations.load(Ordering::Relaxed),
            audio_fills: c.audio_fills.load(Ordering::Relaxed),
            range_recomputes: c.range_recomputes.load(Ordering::Relaxed),
            structure_recomputes: c.structure_recomputes.load(Ordering::Relaxed),
        }
    }

    /// Descriptor state.
    pub fn descriptor_state(&self) -> DescriptorState {
        if self.lock_descriptors().dirty {
            DescriptorState::Dirty
        } else {
            DescriptorState::Clean
        }
    }

    fn lock_descriptors(&self) -> MutexGuard<'_, DescriptorCache> {
        self.descriptors.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.descriptors
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .dirty = true;
    }

    pub(crate) fn cached_range(&self) -> Option<RangeInfo> {
        let mut d = self.lock_descriptors();
        d.clean();
        d.range
    }

    pub(crate) fn store_range(&self, range: RangeInfo) {
        self.counters.range_recomputes.fetch_add(1, Ordering::Relaxed);
        self.lock_descriptors().range = Some(range);
    }

    pub(crate) fn cached_structure(&self, ctx: &Context) -> Option<StructureInfo> {
        let mut d = self.lock_descriptors();
        d.clean();
        d.structures.get(&StructureKey::new(ctx)).copied()
    }

    pub(crate) fn store_structure(&self, ctx: &Context, info: StructureInfo) {
        self.counters
            .structure_recomputes
            .fetch_add(1, Ordering::Relaxed);
        let mut d = self.lock_descriptors();
        if d.structures.len() >= MAX_CACHED_STRUCTURES {
            d.structures.clear();
        }
        d.structures.insert(StructureKey::new(ctx), info);
    }

    pub(crate) fn count_evaluation(&self) {
        self.counters.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_identifier(&self) {
        self.counters
            .identifier_evaluations
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_audio_fill(&self) {
        self.counters.audio_fills.fetch_add(1, Ordering::Relaxed);
    }
}
