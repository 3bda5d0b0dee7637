use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::frame_to_sample;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use crate::shader::compose::{MergeSpec, build_merge};
use crate::shader::function::composite_function;
use crate::shader::usage::Accumulator;

pub(crate) const COMPOSITE: &str = "composite.type";
pub(crate) const STRICT_RANGES: &str = "mode.strictFrameRanges";
pub(crate) const CHOSEN_AUDIO: &str = "output.chosenAudioInput";

/// Layered composite; input 0 is on top.
///
/// Frames are global: every input is asked for the same frame. With strict frame ranges an
/// input outside its own range is left out instead of holding its nearest frame.
#[derive(Debug, Default)]
pub(crate) struct Stack;

impl Stack {
    fn chosen_audio(node: &Node) -> Option<usize> {
        usize::try_from(node.properties().int_or(CHOSEN_AUDIO, -1)).ok()
    }
}

impl NodeBehavior for Stack {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let inputs = self.input_contexts(node, call.graph(), ctx)?;
        let mut images = Vec::with_capacity(inputs.len());
        for (id, c) in &inputs {
            images.push(call.evaluate_node(*id, c)?);
        }
        match images.as_slice() {
            [] => return Ok(call.arena_mut().no_image(Some(node.id()))),
            [single] => return Ok(*single),
            _ => {}
        }

        let name = node.properties().string_or(COMPOSITE, "over");
        let Some(function) = composite_function(name) else {
            return Err(GraphError::evaluation(
                node.name(),
                format!("unknown composite type '{name}'"),
            ));
        };
        let size = images
            .iter()
            .map(|&i| call.arena().get(i))
            .filter(|n| !n.is_no_image())
            .fold(None, |acc: Option<(u32, u32)>, n| {
                Some(acc.map_or((n.width, n.height), |(w, h)| {
                    (w.max(n.width), h.max(n.height))
                }))
            })
            .unwrap_or((ctx.view_width, ctx.view_height));
        let limits = call.limits();
        build_merge(
            call.arena_mut(),
            Some(node.id()),
            size,
            images,
            MergeSpec {
                function,
                params: Vec::new(),
                accumulator: Accumulator::Merge,
            },
            limits,
        )
    }

    fn input_contexts(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        let strict = node.properties().flag(STRICT_RANGES, false);
        let mut out = InputContexts::new();
        for &input in node.inputs() {
            if strict && !graph.image_range_info(input)?.frames().contains(ctx.frame) {
                continue;
            }
            out.push((input, ctx.clone()));
        }
        Ok(out)
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        let mut acc: Option<RangeInfo> = None;
        for &input in node.inputs() {
            let r = graph.image_range_info(input)?;
            acc = Some(match acc {
                Some(a) => a.union(&r),
                None => r,
            });
        }
        Ok(acc.unwrap_or_else(|| RangeInfo::placeholder(graph.opts().default_view.fps)))
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        let mut acc: Option<StructureInfo> = None;
        for &input in node.inputs() {
            let s = graph.image_structure_info(input, ctx)?;
            acc = Some(match acc {
                Some(a) => a.max(&s),
                None => s,
            });
        }
        Ok(acc.unwrap_or_else(|| graph.default_structure()))
    }

    /// Inputs are mixed additively, each delayed by its start relative to the stack.
    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let range = self.image_range_info(node, graph)?;
        let chosen = Self::chosen_audio(node);
        let mut written = 0;
        for (index, &input) in node.inputs().iter().enumerate() {
            if chosen.is_some_and(|c| c != index) {
                continue;
            }
            let start = graph.image_range_info(input)?.start;
            let delay = frame_to_sample(
                i64::from(start) - i64::from(range.start),
                range.fps,
                actx.sample_rate,
            );
            let n = graph.node_audio_fill(input, &actx.shifted(-delay), out)?;
            written = written.max(n);
        }
        Ok(written)
    }
}
