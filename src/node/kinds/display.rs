use crate::eval::context::Context;
use crate::foundation::core::{Eye, StereoContext};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{InputContexts, NodeBehavior};
use crate::node::info::StructureInfo;
use crate::node::kinds::{apply_filter, image_size};
use crate::node::scope::EvalCall;
use crate::shader::compose::{MergeSpec, build_merge, insert_intermediate_renders_for_paint};
use crate::shader::expr::ShaderValue;
use crate::shader::function::{ANAGLYPH, DISPLAY_TRANSFORM, SIDE_BY_SIDE};
use crate::shader::usage::Accumulator;
use smallvec::smallvec;

pub(crate) const ACTIVE: &str = "display.active";
pub(crate) const GAMMA: &str = "display.gamma";
pub(crate) const BRIGHTNESS: &str = "display.brightness";
pub(crate) const CHANNEL_ORDER: &str = "display.channelOrder";

/// Source channel index for each output channel, e.g. `"BGRA"` gives `[2, 1, 0, 3]`.
pub(crate) fn channel_order(s: &str) -> Option<[f32; 4]> {
    let mut out = [0.0; 4];
    let mut chars = s.trim().chars();
    for slot in &mut out {
        *slot = match chars.next()?.to_ascii_uppercase() {
            'R' => 0.0,
            'G' => 1.0,
            'B' => 2.0,
            'A' => 3.0,
            _ => return None,
        };
    }
    chars.next().is_none().then_some(out)
}

/// Final display correction at the top of a display pipeline.
///
/// Paint reaching this node is moved into an intermediate buffer so erase strokes never touch
/// the main target.
#[derive(Debug, Default)]
pub(crate) struct Display;

impl NodeBehavior for Display {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let p = node.properties();
        if !p.flag(ACTIVE, true) {
            return Ok(child);
        }
        let order_name = p.string_or(CHANNEL_ORDER, "RGBA");
        let Some(order) = channel_order(order_name) else {
            return Err(GraphError::evaluation(
                node.name(),
                format!("bad channel order '{order_name}'"),
            ));
        };
        let gamma = p.float_or(GAMMA, 1.0);
        let brightness = p.float_or(BRIGHTNESS, 0.0);

        let top = if gamma == 1.0 && brightness == 0.0 && order == [0.0, 1.0, 2.0, 3.0] {
            child
        } else {
            apply_filter(
                call,
                node,
                child,
                &DISPLAY_TRANSFORM,
                [
                    ShaderValue::Float(gamma),
                    ShaderValue::Float(brightness),
                    ShaderValue::Vec4(order),
                ],
            )?
        };
        let size = image_size(call, top, (ctx.view_width, ctx.view_height));
        Ok(insert_intermediate_renders_for_paint(
            call.arena_mut(),
            top,
            size,
            Some(node.id()),
        ))
    }
}

pub(crate) const STEREO_TYPE: &str = "stereo.type";
pub(crate) const SWAP: &str = "stereo.swap";
pub(crate) const RELATIVE_OFFSET: &str = "stereo.relativeOffset";
pub(crate) const RIGHT_OFFSET: &str = "stereo.rightOffset";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StereoMode {
    Off,
    Mono,
    Left,
    Right,
    Pair,
    Anaglyph,
}

impl StereoMode {
    fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "off" => Self::Off,
            "mono" => Self::Mono,
            "left" => Self::Left,
            "right" => Self::Right,
            "pair" | "sidebyside" => Self::Pair,
            "anaglyph" => Self::Anaglyph,
            _ => return None,
        })
    }
}

/// Stereo presentation: picks one eye or combines both eyes of the same input.
#[derive(Debug, Default)]
pub(crate) struct DisplayStereo;

impl DisplayStereo {
    fn mode(node: &Node) -> GraphResult<StereoMode> {
        let name = node.properties().string_or(STEREO_TYPE, "off");
        StereoMode::parse(name).ok_or_else(|| {
            GraphError::evaluation(node.name(), format!("unknown stereo type '{name}'"))
        })
    }
}

impl NodeBehavior for DisplayStereo {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let mode = Self::mode(node)?;
        let inputs = self.input_contexts(node, call.graph(), ctx)?;
        let mut images = Vec::with_capacity(inputs.len());
        for (id, c) in &inputs {
            images.push(call.evaluate_node(*id, c)?);
        }
        let function = match (mode, images.as_slice()) {
            (_, []) => return Ok(call.arena_mut().no_image(Some(node.id()))),
            (_, [single]) => return Ok(*single),
            (StereoMode::Anaglyph, _) => &ANAGLYPH,
            _ => &SIDE_BY_SIDE,
        };
        let (w, h) = image_size(call, images[0], (ctx.view_width, ctx.view_height));
        let width = if mode == StereoMode::Pair { w * 2 } else { w };
        let limits = call.limits();
        build_merge(
            call.arena_mut(),
            Some(node.id()),
            (width, h),
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
        _graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<InputContexts> {
        let Some(&input) = node.inputs().first() else {
            return Ok(InputContexts::new());
        };
        let mode = Self::mode(node)?;
        if mode == StereoMode::Off {
            return Ok(smallvec![(input, ctx.clone())]);
        }
        let p = node.properties();
        let swap = p.flag(SWAP, false);
        let stereo = StereoContext {
            active: true,
            swap,
            offset: p.float_or(RELATIVE_OFFSET, 0.0),
            right_offset: p.float_or(RIGHT_OFFSET, 0.0),
            ..StereoContext::default()
        };
        let base = ctx.with_stereo(stereo);
        let (left, right) = if swap {
            (Eye::Right, Eye::Left)
        } else {
            (Eye::Left, Eye::Right)
        };
        Ok(match mode {
            StereoMode::Off | StereoMode::Mono | StereoMode::Left => {
                smallvec![(input, base.with_eye(left))]
            }
            StereoMode::Right => smallvec![(input, base.with_eye(right))],
            StereoMode::Pair | StereoMode::Anaglyph => {
                smallvec![(input, base.with_eye(left)), (input, base.with_eye(right))]
            }
        })
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        let Some(&input) = node.inputs().first() else {
            return Ok(graph.default_structure());
        };
        let s = graph.image_structure_info(input, ctx)?;
        Ok(match Self::mode(node)? {
            StereoMode::Pair => StructureInfo {
                width: s.width * 2,
                ..s
            },
            _ => s,
        })
    }
}
