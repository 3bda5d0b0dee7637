//! Group composition: nodes that own a private sub-graph.
//!
//! A group exposes the arity declared by its definition. Internally it is a fixed part (for
//! example a source pipeline, or the root of a stack) plus one chain per external input, each
//! starting at an [`adaptor`] that forwards to the group's input. The fixed part is built once,
//! unless the policy rebuilds it on a property change as pipeline groups do.

pub(crate) mod adaptor;
pub(crate) mod policies;

use crate::audio::buffer::AudioBuffer;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use crate::property::PropertyValue;
use smallvec::smallvec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Internal nodes serving one external input of a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubGraphChain {
    /// External input the chain reads through its adaptor.
    pub input: NodeId,
    /// Adaptor at the start of the chain.
    pub adaptor: NodeId,
    /// Last node of the chain; this is what the group's fixed part connects to.
    pub head: NodeId,
    /// Every node of the chain, adaptor first.
    pub members: Vec<NodeId>,
}

impl SubGraphChain {
    /// Chain made of a lone adaptor.
    pub fn adaptor_only(input: NodeId, adaptor: NodeId) -> Self {
        Self {
            input,
            adaptor,
            head: adaptor,
            members: vec![adaptor],
        }
    }
}

/// Sub-graph bookkeeping stored on a group node.
#[derive(Clone, Debug)]
pub(crate) struct GroupState {
    pub(crate) policy: Arc<dyn SubGraphPolicy>,
    pub(crate) root: Option<NodeId>,
    pub(crate) members: BTreeMap<String, NodeId>,
    pub(crate) chains: Vec<SubGraphChain>,
}

impl GroupState {
    pub(crate) fn new(policy: Arc<dyn SubGraphPolicy>) -> Self {
        Self {
            policy,
            root: None,
            members: BTreeMap::new(),
            chains: Vec::new(),
        }
    }

    /// Fixed members followed by chain members.
    pub(crate) fn all_members(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.members.values().copied().collect();
        for c in &self.chains {
            out.extend(c.members.iter().copied());
        }
        out
    }
}

/// How a group kind builds and adapts its sub-graph.
pub trait SubGraphPolicy: Send + Sync + std::fmt::Debug {
    /// Create the nodes that do not depend on external inputs and set the group root.
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()>;

    /// Build a chain for a newly connected external input at `index`.
    fn new_sub_graph_for_input(
        &self,
        b: &mut GroupBuilder<'_>,
        index: usize,
        input: NodeId,
    ) -> GraphResult<SubGraphChain> {
        let adaptor = b.add_adaptor(index)?;
        Ok(SubGraphChain::adaptor_only(input, adaptor))
    }

    /// Adapt the chain of an input that is still connected but may have moved to `index`.
    /// The chain's nodes, and any state they carry, are kept.
    fn modify_sub_graph_for_input(
        &self,
        b: &mut GroupBuilder<'_>,
        index: usize,
        chain: &SubGraphChain,
    ) -> GraphResult<()> {
        b.set_adaptor_index(chain.adaptor, index)
    }

    /// Connect chain heads, in external input order, to the fixed part.
    fn connect_chains(&self, b: &mut GroupBuilder<'_>, heads: &[NodeId]) -> GraphResult<()> {
        let root = b.root()?;
        b.connect(root, heads.to_vec())
    }

    /// `true` when a change of the group's `property` replaces the fixed part.
    fn rebuilds_on(&self, _property: &str) -> bool {
        false
    }
}

/// Edit access to one group's sub-graph, used by [`SubGraphPolicy`] implementations.
pub struct GroupBuilder<'a> {
    graph: &'a mut Graph,
    group: NodeId,
}

impl<'a> GroupBuilder<'a> {
    pub(crate) fn new(graph: &'a mut Graph, group: NodeId) -> Self {
        Self { graph, group }
    }

    /// Group being built.
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// Create a fixed member under `role`.
    pub fn add_member(&mut self, role: &str, type_name: &str) -> GraphResult<NodeId> {
        let id = self.graph.create_internal(self.group, role, type_name)?;
        self.graph
            .group_state_mut(self.group)?
            .members
            .insert(role.to_owned(), id);
        Ok(id)
    }

    /// Create a chain node; the caller records it in the returned [`SubGraphChain`].
    pub fn add_chain_node(&mut self, type_name: &str) -> GraphResult<NodeId> {
        let role = self.graph.next_internal_role(type_name);
        self.graph.create_internal(self.group, &role, type_name)
    }

    /// Create an adaptor forwarding to external input `index`.
    pub fn add_adaptor(&mut self, index: usize) -> GraphResult<NodeId> {
        let id = self.add_chain_node("Adaptor")?;
        self.set_adaptor_index(id, index)?;
        Ok(id)
    }

    /// Point an adaptor at external input `index`.
    pub fn set_adaptor_index(&mut self, adaptor: NodeId, index: usize) -> GraphResult<()> {
        let index = i32::try_from(index)
            .map_err(|_| GraphError::validation("adaptor index out of range"))?;
        self.graph
            .set_property(adaptor, adaptor::INDEX, PropertyValue::int(index))?;
        Ok(())
    }

    /// Replace the inputs of an internal node.
    pub fn connect(&mut self, node: NodeId, inputs: Vec<NodeId>) -> GraphResult<()> {
        self.graph.set_inputs(node, inputs)
    }

    /// Write a property of an internal node.
    pub fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: PropertyValue,
    ) -> GraphResult<()> {
        self.graph.set_property(node, name, value).map(|_| ())
    }

    /// Make `node` the group's root. The root reports changes to the group.
    pub fn set_root(&mut self, node: NodeId) -> GraphResult<()> {
        self.graph.set_group_root(self.group, node)
    }

    /// Current root.
    pub fn root(&self) -> GraphResult<NodeId> {
        self.graph
            .node(self.group)?
            .group_state()
            .and_then(|s| s.root)
            .ok_or_else(|| GraphError::validation("group has no root"))
    }

    /// String array property of the group itself.
    pub fn group_strings(&self, name: &str) -> GraphResult<Vec<String>> {
        Ok(self.graph.node(self.group)?.properties().strings(name).to_vec())
    }

    /// Fixed member registered under `role`.
    pub fn member(&self, role: &str) -> GraphResult<NodeId> {
        self.graph.group_member(self.group, role)
    }
}

impl std::fmt::Debug for GroupBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("group", &self.group)
            .finish()
    }
}

/// Behavior shared by every group kind: all calls are delegated to the internal root.
#[derive(Debug)]
pub(crate) struct GroupNode {
    policy: Arc<dyn SubGraphPolicy>,
}

impl GroupNode {
    pub(crate) fn new(policy: Arc<dyn SubGraphPolicy>) -> Self {
        Self { policy }
    }

    fn root(node: &Node) -> Option<NodeId> {
        node.group_state().and_then(|s| s.root)
    }
}

impl NodeBehavior for GroupNode {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        match Self::root(node) {
            Some(root) => call.evaluate_node(root, ctx),
            None => Ok(call.arena_mut().no_image(Some(node.id()))),
        }
    }

    fn input_contexts(
        &self,
        node: &Node,
        _graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        Ok(match Self::root(node) {
            Some(root) => smallvec![(root, ctx.clone())],
            None => InputContexts::new(),
        })
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        match Self::root(node) {
            Some(root) => graph.image_range_info(root),
            None => Ok(RangeInfo::placeholder(graph.opts().default_view.fps)),
        }
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        match Self::root(node) {
            Some(root) => graph.image_structure_info(root, ctx),
            None => Ok(graph.default_structure()),
        }
    }

    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        match Self::root(node) {
            Some(root) => graph.node_audio_fill(root, actx, out),
            None => Ok(0),
        }
    }

    /// Walks the chain of `input_index` from its adaptor up to the root, mapping at every step.
    fn map_input_to_eval_frames(
        &self,
        node: &Node,
        graph: &Graph,
        input_index: usize,
        frames: &[Frame],
    ) -> GraphResult<Vec<Frame>> {
        let Some(state) = node.group_state() else {
            return Ok(frames.to_vec());
        };
        let Some(chain) = state.chains.get(input_index) else {
            return Err(GraphError::not_found(format!(
                "input {input_index} of group '{}'",
                node.name()
            )));
        };
        let mut frames = frames.to_vec();
        let mut cur = chain.adaptor;
        while Some(cur) != state.root {
            let consumer = graph
                .node(cur)?
                .outputs()
                .iter()
                .copied()
                .find(|&o| graph.node(o).is_ok_and(|n| n.group() == Some(node.id())));
            let Some(next) = consumer else {
                break;
            };
            let index = graph
                .node(next)?
                .inputs()
                .iter()
                .position(|&i| i == cur)
                .unwrap_or(0);
            frames = graph.map_input_to_eval_frames(next, index, &frames)?;
            cur = next;
        }
        Ok(frames)
    }

    fn forwarded_input(&self, node: &Node, _graph: &Graph) -> Option<NodeId> {
        Self::root(node)
    }

    fn sub_graph_policy(&self) -> Option<Arc<dyn SubGraphPolicy>> {
        Some(Arc::clone(&self.policy))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/group/group.rs"]
mod tests;
