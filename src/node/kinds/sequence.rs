use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::{frame_to_sample, mix_at};
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::Frame;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use smallvec::smallvec;

pub(crate) const AUTO_EDL: &str = "mode.autoEDL";
pub(crate) const EDL_SOURCE: &str = "edl.source";
pub(crate) const EDL_FRAME: &str = "edl.frame";
pub(crate) const EDL_IN: &str = "edl.in";
pub(crate) const EDL_OUT: &str = "edl.out";

/// One cut of an edit decision list: input frames `[in_frame, out_frame]` of input `source`
/// shown starting at sequence frame `frame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct EdlSegment {
    pub(crate) source: usize,
    pub(crate) frame: Frame,
    pub(crate) in_frame: Frame,
    pub(crate) out_frame: Frame,
}

impl EdlSegment {
    pub(crate) fn len(&self) -> Frame {
        self.out_frame - self.in_frame + 1
    }

    pub(crate) fn last(&self) -> Frame {
        self.frame + self.len() - 1
    }
}

/// Inputs played one after another.
///
/// With `mode.autoEDL` set the inputs are concatenated in index order starting at frame 1;
/// otherwise the `edl.*` arrays describe the cuts explicitly.
#[derive(Debug, Default)]
pub(crate) struct Sequence;

impl Sequence {
    pub(crate) fn edl(node: &Node, graph: &Graph) -> GraphResult<Vec<EdlSegment>> {
        let p = node.properties();
        if p.flag(AUTO_EDL, true) {
            let mut frame = 1;
            let mut out = Vec::with_capacity(node.inputs().len());
            for (source, &input) in node.inputs().iter().enumerate() {
                let r = graph.image_range_info(input)?;
                let seg = EdlSegment {
                    source,
                    frame,
                    in_frame: r.cut_in,
                    out_frame: r.cut_out.max(r.cut_in),
                };
                frame += seg.len();
                out.push(seg);
            }
            return Ok(out);
        }

        let (sources, frames, ins, outs) = (
            p.ints(EDL_SOURCE),
            p.ints(EDL_FRAME),
            p.ints(EDL_IN),
            p.ints(EDL_OUT),
        );
        let bad = |msg: String| GraphError::evaluation(node.name(), msg);
        if frames.len() != sources.len() || ins.len() != sources.len() || outs.len() != sources.len()
        {
            return Err(bad("edl arrays differ in length".to_owned()));
        }
        let mut out: Vec<EdlSegment> = Vec::with_capacity(sources.len());
        for i in 0..sources.len() {
            let source = usize::try_from(sources[i])
                .ok()
                .filter(|&s| s < node.inputs().len())
                .ok_or_else(|| bad(format!("edl cut {i} names missing input {}", sources[i])))?;
            let seg = EdlSegment {
                source,
                frame: frames[i],
                in_frame: ins[i],
                out_frame: outs[i],
            };
            if seg.out_frame < seg.in_frame {
                return Err(bad(format!("edl cut {i} ends before it starts")));
            }
            if out.last().is_some_and(|prev| prev.last() >= seg.frame) {
                return Err(bad(format!("edl cut {i} overlaps the previous cut")));
            }
            out.push(seg);
        }
        Ok(out)
    }

    /// Cut showing `frame`; frames outside the sequence hold the nearest cut.
    fn segment_at(edl: &[EdlSegment], frame: Frame) -> Option<&EdlSegment> {
        let first = edl.first()?;
        if frame < first.frame {
            return Some(first);
        }
        edl.iter().rev().find(|s| s.frame <= frame)
    }
}

impl NodeBehavior for Sequence {
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
        let edl = Self::edl(node, graph)?;
        let Some(seg) = Self::segment_at(&edl, ctx.frame) else {
            return Ok(InputContexts::new());
        };
        let local = (seg.in_frame + (ctx.frame - seg.frame)).clamp(seg.in_frame, seg.out_frame);
        Ok(smallvec![(node.inputs()[seg.source], ctx.with_frame(local))])
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        let edl = Self::edl(node, graph)?;
        let (Some(first), Some(last)) = (edl.first(), edl.last()) else {
            return Ok(RangeInfo::placeholder(graph.opts().default_view.fps));
        };
        let fps = graph.image_range_info(node.inputs()[first.source])?.fps;
        Ok(RangeInfo::new(first.frame, last.last(), fps))
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        match self.input_contexts(node, graph, ctx)?.first() {
            Some((input, local)) => graph.image_structure_info(*input, local),
            None => Ok(graph.default_structure()),
        }
    }

    /// Each cut contributes the part of the window it covers.
    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let edl = Self::edl(node, graph)?;
        let Some(first) = edl.first() else {
            return Ok(0);
        };
        let range = self.image_range_info(node, graph)?;
        let rate = actx.sample_rate;
        let to_sample = |f: Frame| frame_to_sample(i64::from(f - first.frame), range.fps, rate);
        let window_end = actx.start_sample + actx.num_samples as i64;
        let mut written = 0;
        for seg in &edl {
            let seg_start = to_sample(seg.frame);
            let seg_end = to_sample(seg.last() + 1);
            let lo = seg_start.max(actx.start_sample);
            let hi = seg_end.min(window_end);
            if lo >= hi {
                continue;
            }
            let input = node.inputs()[seg.source];
            let input_start = graph.image_range_info(input)?.start;
            let in_sample = frame_to_sample(i64::from(seg.in_frame - input_start), range.fps, rate);
            let window = AudioContext::new(
                in_sample + (lo - seg_start),
                (hi - lo) as usize,
                rate,
                actx.channels,
            );
            let mut tmp = AudioBuffer::silent(&window);
            graph.node_audio_fill(input, &window, &mut tmp)?;
            let offset = (lo - actx.start_sample) as usize;
            mix_at(out, &tmp, offset);
            written = written.max(offset + tmp.num_samples());
        }
        Ok(written)
    }

    fn map_input_to_eval_frames(
        &self,
        node: &Node,
        graph: &Graph,
        input_index: usize,
        frames: &[Frame],
    ) -> GraphResult<Vec<Frame>> {
        let mut out: Vec<Frame> = Self::edl(node, graph)?
            .iter()
            .filter(|s| s.source == input_index)
            .flat_map(|s| {
                frames
                    .iter()
                    .filter(|&&g| s.in_frame <= g && g <= s.out_frame)
                    .map(|&g| s.frame + (g - s.in_frame))
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }
}
