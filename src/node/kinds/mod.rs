//! Built-in node kinds.
//!
//! Each kind is a [`NodeBehavior`] registered under the type name used in
//! `builtin_nodes.json`. Single-input kinds share [`apply_filter`], which stacks a shader on top
//! of whatever the input produced without breaking the render-tree invariants.

pub(crate) mod color;
pub(crate) mod display;
pub(crate) mod paint;
pub(crate) mod retime;
pub(crate) mod sequence;
pub(crate) mod soundtrack;
pub(crate) mod source;
pub(crate) mod stack;
pub(crate) mod switch;
pub(crate) mod transform;
pub(crate) mod transition;

use crate::definition::NodeFactory;
use crate::foundation::error::GraphResult;
use crate::group::adaptor::Adaptor;
use crate::group::policies::{
    DisplayGroupPolicy, PipelineGroupPolicy, SequenceGroupPolicy, SourceGroupPolicy,
    StackGroupPolicy, SwitchGroupPolicy,
};
use crate::group::{GroupNode, SubGraphPolicy};
use crate::image::arena::{Destination, ImageId, ImageNode};
use crate::node::Node;
use crate::node::behavior::NodeBehavior;
use crate::node::scope::EvalCall;
use crate::shader::compose::filter_input;
use crate::shader::expr::{Expr, ShaderValue};
use crate::shader::function::ShaderFunction;
use std::sync::Arc;

fn plain<B: NodeBehavior + Default + 'static>() -> NodeFactory {
    Arc::new(|| Box::new(B::default()) as Box<dyn NodeBehavior>)
}

fn group<P: SubGraphPolicy + Default + 'static>() -> NodeFactory {
    Arc::new(|| Box::new(GroupNode::new(Arc::new(P::default()))) as Box<dyn NodeBehavior>)
}

/// Behavior factory for a built-in type name.
pub(crate) fn builtin_factory(type_name: &str) -> Option<NodeFactory> {
    let f = match type_name {
        "ImageSource" => plain::<source::ImageSource>(),
        "Color" => plain::<color::ColorAdjust>(),
        "Lut" => plain::<color::Lut>(),
        "Linearize" => plain::<color::Linearize>(),
        "Transform2D" => plain::<transform::Transform2D>(),
        "Format" => plain::<transform::Format>(),
        "Paint" => plain::<paint::Paint>(),
        "Overlay" => plain::<paint::Overlay>(),
        "Display" => plain::<display::Display>(),
        "DisplayStereo" => plain::<display::DisplayStereo>(),
        "SoundTrack" => plain::<soundtrack::SoundTrack>(),
        "Stack" => plain::<stack::Stack>(),
        "Switch" => plain::<switch::Switch>(),
        "Sequence" => plain::<sequence::Sequence>(),
        "Transition" => plain::<transition::Transition>(),
        "Retime" => plain::<retime::Retime>(),
        "Adaptor" => plain::<Adaptor>(),
        "PipelineGroup" => group::<PipelineGroupPolicy>(),
        "SourceGroup" => group::<SourceGroupPolicy>(),
        "SequenceGroup" => group::<SequenceGroupPolicy>(),
        "StackGroup" => group::<StackGroupPolicy>(),
        "SwitchGroup" => group::<SwitchGroupPolicy>(),
        "DisplayGroup" => group::<DisplayGroupPolicy>(),
        _ => return None,
    };
    Some(f)
}

/// Stack `function` on top of `child`, produced by `node`.
///
/// A raster child with a shader is inlined: its expression becomes the argument and its
/// placement moves up to the new node. Anything else is resolved into an intermediate buffer and
/// sampled. An empty child is returned unchanged.
pub(crate) fn apply_filter(
    call: &mut EvalCall<'_>,
    node: &Node,
    child: ImageId,
    function: &'static ShaderFunction,
    params: impl IntoIterator<Item = ShaderValue>,
) -> GraphResult<ImageId> {
    let arena = call.arena_mut();
    let Some((input, holder)) = filter_input(arena, child) else {
        return Ok(child);
    };
    let (w, h, pixel_aspect, transform, inlined) = {
        let n = arena.get(holder);
        (
            n.width,
            n.height,
            n.pixel_aspect,
            n.transform,
            n.destination == Destination::RasterBuffer,
        )
    };
    let mut img = ImageNode::blend(w, h, Some(node.id()));
    img.pixel_aspect = pixel_aspect;
    if inlined {
        img.transform = transform;
        arena.get_mut(holder).transform = glam::Mat4::IDENTITY;
    }
    img.set_shader(Expr::wrap(function, input, params))?;
    let id = arena.alloc(img);
    arena.append_child(id, holder);
    Ok(id)
}

/// Width and height of `id`, or the fallback for an empty image.
pub(crate) fn image_size(call: &EvalCall<'_>, id: ImageId, fallback: (u32, u32)) -> (u32, u32) {
    let n = call.arena().get(id);
    if n.is_no_image() {
        fallback
    } else {
        (n.width, n.height)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/node/kinds.rs"]
mod tests;
