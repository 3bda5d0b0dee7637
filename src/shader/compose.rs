use crate::config::ShaderLimits;
use crate::foundation::core::{NodeId, Rgba};
use crate::foundation::error::GraphResult;
use crate::image::arena::{Destination, ImageArena, ImageId, ImageNode, RenderType};
use crate::shader::expr::{Expr, ShaderValue};
use crate::shader::function::ShaderFunction;
use crate::shader::usage::{Accumulator, ResourceUsage};
use std::collections::BTreeSet;

/// Merge function and parameters for a multi-input composite.
#[derive(Clone, Debug)]
pub(crate) struct MergeSpec {
    pub(crate) function: &'static ShaderFunction,
    pub(crate) params: Vec<ShaderValue>,
    pub(crate) accumulator: Accumulator,
}

/// A blend container with children but no expression of its own.
pub(crate) fn will_convert_to_intermediate(img: &ImageNode) -> bool {
    img.render_type() == RenderType::Blend
        && img.shader().is_none()
        && img.merge.is_none()
        && img.has_children()
        && !img.no_intermediate
}

/// Resolve a blend container into its own off-screen buffer so it can be merged.
pub(crate) fn convert_blend_to_intermediate(arena: &mut ImageArena, id: ImageId) -> bool {
    let img = arena.get_mut(id);
    if !will_convert_to_intermediate(img) {
        return false;
    }
    img.destination = Destination::IntermediateBuffer;
    img.resource_usage = ResourceUsage::flattened();
    true
}

/// Flatten the heaviest inputs into intermediate buffers until the combined usage is within
/// `limits`. Inputs that cannot be reduced further are left alone; this never fails.
pub(crate) fn balance_resource_usage(
    arena: &mut ImageArena,
    images: &[ImageId],
    accumulator: Accumulator,
    limits: &ShaderLimits,
    incoming_samplers: usize,
    modified: &mut BTreeSet<ImageId>,
) {
    type Field = fn(&ResourceUsage) -> usize;
    let fields: [(&str, Field, usize); 3] = [
        ("buffers", |u| u.buffers, limits.max_buffers + incoming_samplers),
        ("coords", |u| u.coords, limits.max_coords),
        ("fetches", |u| u.fetches, limits.max_fetches),
    ];

    for (label, field, max) in fields {
        loop {
            let total = accumulator.total(images.iter().map(|&i| arena.get(i).resource_usage));
            if field(&total) <= max {
                break;
            }
            let candidate = images
                .iter()
                .copied()
                .filter(|&i| {
                    let n = arena.get(i);
                    field(&n.resource_usage) > 1
                        && (n.merge.is_some() || n.shader().is_some())
                        && !modified.contains(&i)
                })
                .max_by(|&a, &b| {
                    field(&arena.get(a).resource_usage)
                        .cmp(&field(&arena.get(b).resource_usage))
                        .then(b.cmp(&a))
                });
            let Some(id) = candidate else {
                tracing::debug!(label, total = field(&total), max, "usage over limit, nothing left to flatten");
                break;
            };
            let img = arena.get_mut(id);
            img.destination = Destination::IntermediateBuffer;
            img.resource_usage = ResourceUsage::flattened();
            modified.insert(id);
            tracing::debug!(label, image = id.index(), "flattened input to intermediate buffer");
        }
    }
}

/// Produce one merge argument per input, in input order.
///
/// Raster inputs with a shader are inlined (their shader moves into the merge); everything
/// else is resolved into an intermediate buffer and sampled. Inputs carrying paint commands are
/// wrapped in a new intermediate so the strokes land in a buffer of their own; `images` is
/// updated to the wrapper in that case.
pub(crate) fn assemble_merge_expressions(
    arena: &mut ImageArena,
    images: &mut [ImageId],
    modified: &BTreeSet<ImageId>,
) -> Vec<Expr> {
    let mut exprs = Vec::with_capacity(images.len());
    for slot in images.iter_mut() {
        let mut id = *slot;
        let needs_wrap = {
            let n = arena.get(id);
            !n.paint.is_empty() || n.render_type() == RenderType::Group
        };
        if needs_wrap {
            id = wrap_in_intermediate(arena, id);
            *slot = id;
        }

        let n = arena.get_mut(id);
        let expr = if n.is_no_image() {
            Expr::solid(Rgba::new(0.0, 0.0, 0.0, 0.0))
        } else if modified.contains(&id) || n.destination == Destination::IntermediateBuffer {
            Expr::source(id)
        } else if n.merge.is_some() {
            n.destination = Destination::IntermediateBuffer;
            n.resource_usage = ResourceUsage::flattened();
            Expr::source(id)
        } else if let Some(shader) = n.take_shader() {
            shader
        } else {
            Expr::source(id)
        };
        exprs.push(expr);
    }
    exprs
}

/// Input expression for a single-input filter applied on top of `child`.
///
/// Returns `None` for an empty input.
pub(crate) fn filter_input(arena: &mut ImageArena, child: ImageId) -> Option<(Expr, ImageId)> {
    let n = arena.get(child);
    if n.is_no_image() {
        return None;
    }
    let has_paint = !n.paint.is_empty();
    let is_group = n.render_type() == RenderType::Group;
    let inline = n.render_type() == RenderType::Blend
        && n.destination == Destination::RasterBuffer
        && !has_paint
        && n.shader().is_some();
    if inline {
        let shader = arena.get_mut(child).take_shader()?;
        return Some((shader, child));
    }

    let target = if is_group || has_paint {
        wrap_in_intermediate(arena, child)
    } else {
        let m = arena.get_mut(child);
        m.destination = Destination::IntermediateBuffer;
        m.resource_usage = ResourceUsage::flattened();
        child
    };
    Some((Expr::source(target), target))
}

fn wrap_in_intermediate(arena: &mut ImageArena, child: ImageId) -> ImageId {
    let (w, h, creator) = {
        let n = arena.get(child);
        (n.width, n.height, n.creator)
    };
    let mut wrapper = ImageNode::intermediate(w, h, creator);
    wrapper.resource_usage = ResourceUsage::flattened();
    let id = arena.alloc(wrapper);
    arena.append_child(id, child);
    id
}

/// Build a merge node over `inputs` (input 0 is top-most) following the normalization steps:
/// convert blend containers, balance usage, then assemble arguments in order.
///
/// More inputs than `limits.max_buffers` are first collapsed: consecutive groups of at most
/// that many inputs are merged into intermediate buffers, repeatedly, until the top merge
/// samples few enough of them.
pub(crate) fn build_merge(
    arena: &mut ImageArena,
    creator: Option<NodeId>,
    size: (u32, u32),
    inputs: Vec<ImageId>,
    spec: MergeSpec,
    limits: &ShaderLimits,
) -> GraphResult<ImageId> {
    let group = limits.max_buffers.max(2);
    if inputs.len() <= group {
        return build_flat_merge(arena, creator, size, inputs, spec, limits);
    }

    let mut collapsed = Vec::with_capacity(inputs.len().div_ceil(group));
    for chunk in inputs.chunks(group) {
        if let [single] = chunk {
            collapsed.push(*single);
            continue;
        }
        let id = build_flat_merge(arena, creator, size, chunk.to_vec(), spec.clone(), limits)?;
        let sub = arena.get_mut(id);
        sub.destination = Destination::IntermediateBuffer;
        sub.resource_usage = ResourceUsage::flattened();
        collapsed.push(id);
    }
    tracing::debug!(
        inputs = inputs.len(),
        groups = collapsed.len(),
        "collapsed merge inputs into intermediate groups"
    );
    build_merge(arena, creator, size, collapsed, spec, limits)
}

fn build_flat_merge(
    arena: &mut ImageArena,
    creator: Option<NodeId>,
    size: (u32, u32),
    mut inputs: Vec<ImageId>,
    spec: MergeSpec,
    limits: &ShaderLimits,
) -> GraphResult<ImageId> {
    let mut modified = BTreeSet::new();
    for &id in &inputs {
        if convert_blend_to_intermediate(arena, id) {
            modified.insert(id);
        }
    }
    balance_resource_usage(
        arena,
        &inputs,
        spec.accumulator,
        limits,
        0,
        &mut modified,
    );
    let exprs = assemble_merge_expressions(arena, &mut inputs, &modified);

    let merge = Expr::merge(spec.function, exprs, spec.params);
    let mut node = ImageNode::merge(size.0, size.1, creator);
    node.resource_usage = merge.resource_usage();
    node.merge = Some(merge);
    let root = arena.alloc(node);
    for id in inputs {
        arena.append_child(root, id);
    }
    Ok(root)
}

fn needs_intermediate_for_paint(arena: &ImageArena, id: ImageId) -> bool {
    let n = arena.get(id);
    if !n.paint.is_empty() {
        return true;
    }
    if n.destination == Destination::IntermediateBuffer {
        return false;
    }
    arena
        .children(id)
        .any(|c| needs_intermediate_for_paint(arena, c))
}

/// Put `root` inside an intermediate buffer when paint would otherwise be drawn straight into
/// the main target, so erase strokes can read back what is under them.
pub(crate) fn insert_intermediate_renders_for_paint(
    arena: &mut ImageArena,
    root: ImageId,
    size: (u32, u32),
    creator: Option<NodeId>,
) -> ImageId {
    if arena.get(root).destination == Destination::IntermediateBuffer
        || arena.get(root).is_no_image()
        || !needs_intermediate_for_paint(arena, root)
    {
        return root;
    }
    let mut wrapper = ImageNode::intermediate(size.0, size.1, creator);
    wrapper.resource_usage = ResourceUsage::flattened();
    let id = arena.alloc(wrapper);
    arena.append_child(id, root);
    id
}

#[cfg(test)]
#[path = "../../tests/unit/shader/compose.rs"]
mod tests;
