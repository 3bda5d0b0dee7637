use crate::audio::buffer::AudioBuffer;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::GraphResult;
use crate::graph::Graph;
use crate::group::SubGraphPolicy;
use crate::image::arena::ImageId;
use crate::image::identifier::IdentifierNode;
use crate::node::Node;
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use crate::property::PropertyContainer;
use smallvec::SmallVec;
use std::sync::Arc;

/// Inputs an evaluation visits, each with the context it is asked for.
pub type InputContexts = SmallVec<[(NodeId, Context); 4]>;

/// What a property write invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidation {
    /// Nothing downstream can observe the change.
    None,
    /// Range/structure descriptors of the node and its dependents.
    Descriptors,
    /// Descriptors plus every cache entry the node owns.
    Flush,
}

/// Per-kind behavior of a graph node.
///
/// Only [`NodeBehavior::evaluate`] is required. The defaults describe a single-input node that
/// passes range, structure and audio of its first input through unchanged.
///
/// Behaviors receive the [`Node`] they are attached to; any state a behavior derives from its
/// properties lives behind interior mutability because evaluation only borrows the graph.
pub trait NodeBehavior: Send + Sync + std::fmt::Debug {
    /// Build this node's render-tree fragment for `ctx`. Never returns a null result: empty
    /// inputs produce a no-image leaf.
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId>;

    /// Inputs `evaluate` visits for `ctx`, in evaluation order.
    fn input_contexts(
        &self,
        node: &Node,
        _graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        Ok(node.inputs().iter().map(|&i| (i, ctx.clone())).collect())
    }

    /// Pixel-free identity of `evaluate(ctx)`.
    fn evaluate_identifier(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<IdentifierNode> {
        let children = self
            .input_contexts(node, graph, ctx)?
            .into_iter()
            .map(|(id, c)| graph.node_identifier(id, &c))
            .collect::<GraphResult<Vec<_>>>()?;
        Ok(IdentifierNode::with_children(node.settings_id(), children))
    }

    /// Valid frame span.
    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        match node.inputs().first() {
            Some(&input) => graph.image_range_info(input),
            None => Ok(RangeInfo::placeholder(graph.opts().default_view.fps)),
        }
    }

    /// Output shape for `ctx`.
    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        match node.inputs().first() {
            Some(&input) => graph.image_structure_info(input, ctx),
            None => Ok(graph.default_structure()),
        }
    }

    /// Called after `name` changed. Derived state is refreshed here.
    fn property_changed(&self, _node: &Node, _name: &str) -> Invalidation {
        Invalidation::Descriptors
    }

    /// Fill `out` with the window `actx` addressed to this node. Returns samples written per
    /// channel.
    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        match node.inputs().first() {
            Some(&input) => graph.node_audio_fill(input, actx, out),
            None => Ok(0),
        }
    }

    /// Frames of this node at which `frames` of input `input_index` are shown.
    fn map_input_to_eval_frames(
        &self,
        _node: &Node,
        _graph: &Graph,
        _input_index: usize,
        frames: &[Frame],
    ) -> GraphResult<Vec<Frame>> {
        Ok(frames.to_vec())
    }

    /// Kind-specific checks on a proposed input list, after arity and type checks passed.
    fn test_inputs(&self, _node: &Node, _graph: &Graph, _inputs: &[NodeId]) -> GraphResult<()> {
        Ok(())
    }

    /// Node evaluated in place of real inputs, for pass-through kinds.
    fn forwarded_input(&self, _node: &Node, _graph: &Graph) -> Option<NodeId> {
        None
    }

    /// Upgrade properties read from a description written with `version` of `type_name`.
    fn read_completed(
        &self,
        _props: &mut PropertyContainer,
        _type_name: &str,
        _version: u32,
    ) -> GraphResult<()> {
        Ok(())
    }

    /// Add transient properties before a description is written.
    fn prepare_for_write(&self, _props: &mut PropertyContainer) -> GraphResult<()> {
        Ok(())
    }

    /// Undo `prepare_for_write`.
    fn write_completed(&self, _props: &mut PropertyContainer) {}

    /// Sub-graph policy for group kinds.
    fn sub_graph_policy(&self) -> Option<Arc<dyn SubGraphPolicy>> {
        None
    }
}
