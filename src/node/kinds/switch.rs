use crate::audio::buffer::AudioBuffer;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::GraphResult;
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use smallvec::smallvec;

pub(crate) const ACTIVE_INPUT: &str = "output.activeInput";
pub(crate) const ALIGN_START: &str = "mode.alignStartFrames";

/// Shows exactly one input; the others are never evaluated.
#[derive(Debug, Default)]
pub(crate) struct Switch;

impl Switch {
    fn active(node: &Node) -> Option<(usize, NodeId)> {
        let index = usize::try_from(node.properties().int_or(ACTIVE_INPUT, 0)).ok()?;
        node.inputs().get(index).map(|&id| (index, id))
    }

    /// Offset added to this node's frames to get the active input's frames.
    fn shift(node: &Node, graph: &Graph, input: NodeId) -> GraphResult<Frame> {
        if !node.properties().flag(ALIGN_START, false) {
            return Ok(0);
        }
        Ok(graph.image_range_info(input)?.start - 1)
    }
}

impl NodeBehavior for Switch {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        match self.input_contexts(node, call.graph(), ctx)?.first() {
            Some((id, c)) => call.evaluate_node(*id, c),
            None => Ok(call.arena_mut().no_image(Some(node.id()))),
        }
    }

    fn input_contexts(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        let Some((_, input)) = Self::active(node) else {
            return Ok(InputContexts::new());
        };
        let shift = Self::shift(node, graph, input)?;
        Ok(smallvec![(input, ctx.with_frame(ctx.frame + shift))])
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        let Some((_, input)) = Self::active(node) else {
            return Ok(RangeInfo::placeholder(graph.opts().default_view.fps));
        };
        let r = graph.image_range_info(input)?;
        let shift = Self::shift(node, graph, input)?;
        Ok(RangeInfo {
            start: r.start - shift,
            end: r.end - shift,
            cut_in: r.cut_in - shift,
            cut_out: r.cut_out - shift,
            ..r
        })
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        match Self::active(node) {
            Some((_, input)) => graph.image_structure_info(input, ctx),
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
        match Self::active(node) {
            Some((_, input)) => graph.node_audio_fill(input, actx, out),
            None => Ok(0),
        }
    }

    fn map_input_to_eval_frames(
        &self,
        node: &Node,
        graph: &Graph,
        input_index: usize,
        frames: &[Frame],
    ) -> GraphResult<Vec<Frame>> {
        match Self::active(node) {
            Some((index, input)) if index == input_index => {
                let shift = Self::shift(node, graph, input)?;
                Ok(frames.iter().map(|f| f - shift).collect())
            }
            _ => Ok(Vec::new()),
        }
    }
}
