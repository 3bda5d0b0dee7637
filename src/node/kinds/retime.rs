use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::{mix_into, resample_linear};
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Frame, FrameRange};
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::{EdgePolicy, scaled_len};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::RangeInfo;
use crate::node::scope::EvalCall;
use crate::property::{PropertyContainer, PropertyValue};
use smallvec::smallvec;
use std::collections::BTreeSet;

pub(crate) const SPEED: &str = "visual.speed";
pub(crate) const OFFSET: &str = "visual.offset";
pub(crate) const EDGE_POLICY: &str = "edge.policy";
pub(crate) const OUTPUT_FPS: &str = "output.fps";
const SCALE_V1: &str = "visual.scale";

/// Frame mapping between a retime node and its input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RetimeMap {
    input: FrameRange,
    offset: Frame,
    ratio: f64,
    out_fps: f64,
    out_len: u32,
}

impl RetimeMap {
    pub(crate) fn new(node: &Node, input: &RangeInfo) -> GraphResult<Self> {
        let p = node.properties();
        let speed = f64::from(p.float_or(SPEED, 1.0));
        if !(speed.is_finite() && speed > 0.0) {
            return Err(GraphError::evaluation(
                node.name(),
                format!("speed must be positive, got {speed}"),
            ));
        }
        let requested = f64::from(p.float_or(OUTPUT_FPS, 0.0));
        let out_fps = if requested > 0.0 { requested } else { input.fps };
        let ratio = speed * input.fps / out_fps;
        let policy = EdgePolicy::parse(p.string_or(EDGE_POLICY, "floor"));
        Ok(Self {
            input: input.frames(),
            offset: p.int_or(OFFSET, 0),
            ratio,
            out_fps,
            out_len: scaled_len(input.len_frames(), ratio, policy),
        })
    }

    pub(crate) fn output(&self) -> FrameRange {
        let start = self.input.start + self.offset;
        FrameRange {
            start,
            end: start + self.out_len.saturating_sub(1) as Frame,
        }
    }

    /// Input frame shown at output frame `frame`.
    pub(crate) fn input_frame(&self, frame: Frame) -> Frame {
        let local = f64::from(frame - self.output().start) * self.ratio;
        self.input.clamp(self.input.start + local.floor() as Frame)
    }
}

/// Speed change, frame offset and frame-rate conversion of one input.
#[derive(Debug, Default)]
pub(crate) struct Retime;

impl Retime {
    fn map(node: &Node, graph: &Graph) -> GraphResult<Option<RetimeMap>> {
        match node.inputs().first() {
            Some(&input) => Ok(Some(RetimeMap::new(node, &graph.image_range_info(input)?)?)),
            None => Ok(None),
        }
    }
}

impl NodeBehavior for Retime {
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
        let (Some(&input), Some(map)) = (node.inputs().first(), Self::map(node, graph)?) else {
            return Ok(InputContexts::new());
        };
        Ok(smallvec![(input, ctx.with_frame(map.input_frame(ctx.frame)))])
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        let Some(map) = Self::map(node, graph)? else {
            return Ok(RangeInfo::placeholder(graph.opts().default_view.fps));
        };
        let out = map.output();
        Ok(RangeInfo::new(out.start, out.end, map.out_fps))
    }

    /// Audio follows the speed only; it is stretched by linear resampling.
    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let Some(&input) = node.inputs().first() else {
            return Ok(0);
        };
        let speed = f64::from(node.properties().float_or(SPEED, 1.0));
        if !(speed.is_finite() && speed > 0.0) {
            return Ok(0);
        }
        if speed == 1.0 {
            return graph.node_audio_fill(input, actx, out);
        }

        let start = (actx.start_sample as f64 * speed).round() as i64;
        let len = ((actx.num_samples as f64 * speed).round() as usize).max(1);
        let window = AudioContext::new(start, len, actx.sample_rate, actx.channels);
        let mut src = AudioBuffer::silent(&window);
        let n = graph.node_audio_fill(input, &window, &mut src)?;
        if n == 0 {
            return Ok(0);
        }
        let mut stretched = AudioBuffer::silent(actx);
        resample_linear(&src, &mut stretched);
        mix_into(out, &stretched, 1.0);
        Ok(((n as f64 / speed).round() as usize).min(actx.num_samples))
    }

    fn map_input_to_eval_frames(
        &self,
        node: &Node,
        graph: &Graph,
        _input_index: usize,
        frames: &[Frame],
    ) -> GraphResult<Vec<Frame>> {
        let Some(map) = Self::map(node, graph)? else {
            return Ok(Vec::new());
        };
        let wanted: BTreeSet<Frame> = frames.iter().copied().collect();
        let out = map.output();
        Ok((out.start..=out.end)
            .filter(|&f| wanted.contains(&map.input_frame(f)))
            .collect())
    }

    fn read_completed(
        &self,
        props: &mut PropertyContainer,
        _type_name: &str,
        version: u32,
    ) -> GraphResult<()> {
        if version < 2
            && let Some(PropertyValue::Float(scale)) = props.remove(SCALE_V1)
            && let Some(&s) = scale.first()
            && s > 0.0
        {
            props.set(SPEED, PropertyValue::float(1.0 / s))?;
        }
        Ok(())
    }
}
