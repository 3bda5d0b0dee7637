use crate::audio::buffer::AudioBuffer;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::NodeId;
use crate::foundation::error::GraphResult;
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use smallvec::smallvec;

/// Index of the enclosing group's input an adaptor forwards to.
pub(crate) const INDEX: &str = "adaptor.index";

/// Pass-through boundary between a group's sub-graph and the outer graph.
///
/// With an input of its own the adaptor forwards to it; otherwise it forwards to the enclosing
/// group's input selected by `adaptor.index`. It keeps no state of its own. Its descriptors are
/// cached like any node's and go stale with the group: a change upstream of an external input
/// reaches the group through its inputs, and the group marks every member dirty.
#[derive(Debug, Default)]
pub(crate) struct Adaptor;

impl Adaptor {
    fn target(node: &Node, graph: &Graph) -> Option<NodeId> {
        if let Some(&own) = node.inputs().first() {
            return Some(own);
        }
        let group = graph.node(node.group()?).ok()?;
        let index = usize::try_from(node.properties().int_or(INDEX, 0)).ok()?;
        group.inputs().get(index).copied()
    }
}

impl NodeBehavior for Adaptor {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        match Self::target(node, call.graph()) {
            Some(target) => call.evaluate_node(target, ctx),
            None => Ok(call.arena_mut().no_image(Some(node.id()))),
        }
    }

    fn input_contexts(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        Ok(match Self::target(node, graph) {
            Some(t) => smallvec![(t, ctx.clone())],
            None => InputContexts::new(),
        })
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        match Self::target(node, graph) {
            Some(t) => graph.image_range_info(t),
            None => Ok(RangeInfo::placeholder(graph.opts().default_view.fps)),
        }
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        match Self::target(node, graph) {
            Some(t) => graph.image_structure_info(t, ctx),
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
        match Self::target(node, graph) {
            Some(t) => graph.node_audio_fill(t, actx, out),
            None => Ok(0),
        }
    }

    fn forwarded_input(&self, node: &Node, graph: &Graph) -> Option<NodeId> {
        if node.inputs().is_empty() {
            Self::target(node, graph)
        } else {
            None
        }
    }
}
