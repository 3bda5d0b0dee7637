use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::{frame_to_sample, sample_to_frame};
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::image::identifier::IdentifierNode;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use crate::shader::compose::{MergeSpec, build_merge};
use crate::shader::expr::ShaderValue;
use crate::shader::function::{DISSOLVE, ShaderFunction, WIPE};
use crate::shader::usage::Accumulator;
use smallvec::smallvec;

pub(crate) const KIND: &str = "transition.type";
pub(crate) const START: &str = "parameters.startFrame";
pub(crate) const NUM_FRAMES: &str = "parameters.numFrames";
pub(crate) const WIPE_ANGLE: &str = "wipe.angle";

/// Two-input transition from input 0 to input 1 over `parameters.numFrames` frames.
#[derive(Debug, Default)]
pub(crate) struct Transition;

impl Transition {
    /// Progress at `frame`: 0 shows only the outgoing input, 1 only the incoming one.
    pub(crate) fn progress(node: &Node, frame: Frame) -> f32 {
        let p = node.properties();
        let start = p.int_or(START, 1);
        let num = p.int_or(NUM_FRAMES, 10);
        if num <= 0 {
            return if frame >= start { 1.0 } else { 0.0 };
        }
        ((frame - start) as f32 / num as f32).clamp(0.0, 1.0)
    }

    fn function(node: &Node) -> GraphResult<&'static ShaderFunction> {
        let name = node.properties().string_or(KIND, "dissolve");
        match name.trim().to_ascii_lowercase().as_str() {
            "dissolve" | "crossfade" => Ok(&DISSOLVE),
            "wipe" => Ok(&WIPE),
            _ => Err(GraphError::evaluation(
                node.name(),
                format!("unknown transition '{name}'"),
            )),
        }
    }

    fn pair(node: &Node) -> Option<(NodeId, NodeId)> {
        match node.inputs() {
            [a, b] => Some((*a, *b)),
            _ => None,
        }
    }
}

impl NodeBehavior for Transition {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let function = Self::function(node)?;
        let inputs = self.input_contexts(node, call.graph(), ctx)?;
        let mut images = Vec::with_capacity(2);
        for (id, c) in &inputs {
            images.push(call.evaluate_node(*id, c)?);
        }
        match images.as_slice() {
            [] => return Ok(call.arena_mut().no_image(Some(node.id()))),
            [single] => return Ok(*single),
            _ => {}
        }

        let t = Self::progress(node, ctx.frame);
        let mut params = vec![ShaderValue::Float(t)];
        if function == &WIPE {
            params.push(ShaderValue::Float(
                node.properties().float_or(WIPE_ANGLE, 0.0),
            ));
        }
        let size = images
            .iter()
            .map(|&i| call.arena().get(i))
            .filter(|n| !n.is_no_image())
            .map(|n| (n.width, n.height))
            .reduce(|a, b| (a.0.max(b.0), a.1.max(b.1)))
            .unwrap_or((ctx.view_width, ctx.view_height));
        let limits = call.limits();
        build_merge(
            call.arena_mut(),
            Some(node.id()),
            size,
            images,
            MergeSpec {
                function,
                params,
                accumulator: Accumulator::Filter,
            },
            limits,
        )
    }

    fn input_contexts(
        &self,
        node: &Node,
        _graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        let Some((a, b)) = Self::pair(node) else {
            return Ok(InputContexts::new());
        };
        let t = Self::progress(node, ctx.frame);
        Ok(if t <= 0.0 {
            smallvec![(a, ctx.clone())]
        } else if t >= 1.0 {
            smallvec![(b, ctx.clone())]
        } else {
            smallvec![(a, ctx.clone()), (b, ctx.clone())]
        })
    }

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
        Ok(IdentifierNode::with_children(
            format!("{}|t={}", node.settings_id(), Self::progress(node, ctx.frame)),
            children,
        ))
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        match Self::pair(node) {
            Some((a, b)) => Ok(graph.image_range_info(a)?.union(&graph.image_range_info(b)?)),
            None => Ok(RangeInfo::placeholder(graph.opts().default_view.fps)),
        }
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        match Self::pair(node) {
            Some((a, b)) => Ok(graph
                .image_structure_info(a, ctx)?
                .max(&graph.image_structure_info(b, ctx)?)),
            None => Ok(graph.default_structure()),
        }
    }

    /// Crossfade weighted by the progress of the frame each sample belongs to.
    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let Some((a, b)) = Self::pair(node) else {
            return Ok(0);
        };
        let range = self.image_range_info(node, graph)?;
        let mut from = AudioBuffer::silent(actx);
        let mut to = AudioBuffer::silent(actx);
        let window = |input: NodeId| -> GraphResult<AudioContext> {
            let start = graph.image_range_info(input)?.start;
            let delay = frame_to_sample(
                i64::from(start) - i64::from(range.start),
                range.fps,
                actx.sample_rate,
            );
            Ok(actx.shifted(-delay))
        };
        let na = graph.node_audio_fill(a, &window(a)?, &mut from)?;
        let nb = graph.node_audio_fill(b, &window(b)?, &mut to)?;

        let ch = usize::from(actx.channels.max(1));
        let frames = from.samples.chunks_exact(ch).zip(to.samples.chunks_exact(ch));
        for (i, ((fa, fb), dst)) in frames.zip(out.samples.chunks_exact_mut(ch)).enumerate() {
            let sample = actx.start_sample + i as i64;
            let frame = range.start + sample_to_frame(sample, range.fps, actx.sample_rate) as Frame;
            let t = Self::progress(node, frame);
            for c in 0..ch {
                dst[c] += fa[c] * (1.0 - t) + fb[c] * t;
            }
        }
        Ok(na.max(nb))
    }

    fn test_inputs(&self, node: &Node, _graph: &Graph, inputs: &[NodeId]) -> GraphResult<()> {
        if let [a, b] = inputs
            && a == b
        {
            return Err(GraphError::rewire(
                node.name(),
                "transition needs two different inputs",
            ));
        }
        Ok(())
    }
}
