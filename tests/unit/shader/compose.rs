use super::*;
use crate::image::paint::PaintCommand;
use crate::shader::expr::Arg;
use crate::shader::function::{COLOR_ADJUST, LUT_1D, OVER};
use std::sync::Arc;

fn leaf(arena: &mut ImageArena) -> ImageId {
    let id = arena.alloc(ImageNode::blend(16, 16, None));
    arena
        .get_mut(id)
        .set_shader(Expr::source(id))
        .unwrap();
    id
}

fn lut_leaf(arena: &mut ImageArena) -> ImageId {
    let src = leaf(arena);
    let shader = arena.get_mut(src).take_shader().unwrap();
    let id = arena.alloc(ImageNode::blend(16, 16, None));
    arena.append_child(id, src);
    arena
        .get_mut(id)
        .set_shader(Expr::wrap(
            &LUT_1D,
            shader,
            [
                ShaderValue::Table(Arc::from(vec![0.0f32, 1.0])),
                ShaderValue::Float(1.0),
            ],
        ))
        .unwrap();
    id
}

fn over() -> MergeSpec {
    MergeSpec {
        function: &OVER,
        params: Vec::new(),
        accumulator: Accumulator::Merge,
    }
}

#[test]
fn blend_containers_convert_to_intermediate() {
    let mut arena = ImageArena::new();
    let inner = leaf(&mut arena);
    let container = arena.alloc(ImageNode::blend(16, 16, None));
    arena.append_child(container, inner);
    assert!(convert_blend_to_intermediate(&mut arena, container));
    assert_eq!(
        arena.get(container).destination,
        Destination::IntermediateBuffer
    );
    // A leaf with a shader is not a container.
    assert!(!convert_blend_to_intermediate(&mut arena, inner));
}

#[test]
fn no_intermediate_flag_blocks_conversion() {
    let mut arena = ImageArena::new();
    let inner = leaf(&mut arena);
    let container = arena.alloc(ImageNode::blend(16, 16, None));
    arena.append_child(container, inner);
    arena.get_mut(container).no_intermediate = true;
    assert!(!convert_blend_to_intermediate(&mut arena, container));
}

#[test]
fn merge_arguments_follow_input_order() {
    let mut arena = ImageArena::new();
    let a = leaf(&mut arena);
    let b = leaf(&mut arena);
    let c = leaf(&mut arena);
    let root = build_merge(
        &mut arena,
        None,
        (16, 16),
        vec![a, b, c],
        over(),
        &ShaderLimits::default(),
    )
    .unwrap();
    let merge = arena.get(root).merge.clone().unwrap();
    assert_eq!(merge.samplers(), vec![a, b, c]);
    assert_eq!(arena.children(root).collect::<Vec<_>>(), vec![a, b, c]);
    // Inlined inputs give up their shader to the merge.
    assert!(arena.get(a).shader().is_none());
    arena.validate(root).unwrap();
}

#[test]
fn balancing_flattens_heaviest_inputs_instead_of_failing() {
    let mut arena = ImageArena::new();
    let inputs: Vec<ImageId> = (0..5).map(|_| lut_leaf(&mut arena)).collect();
    // Each LUT input binds two buffers: 10 in total against a limit of 8.
    let root = build_merge(
        &mut arena,
        None,
        (16, 16),
        inputs.clone(),
        over(),
        &ShaderLimits::default(),
    )
    .unwrap();
    let flattened: Vec<ImageId> = inputs
        .iter()
        .copied()
        .filter(|&i| arena.get(i).destination == Destination::IntermediateBuffer)
        .collect();
    assert_eq!(flattened, inputs[..2].to_vec());
    let usage = arena.get(root).resource_usage;
    assert!(usage.buffers <= 8, "{usage:?}");
    // Flattened inputs keep their own shader and are sampled by the merge.
    assert!(arena.get(inputs[0]).shader().is_some());
}

#[test]
fn tight_limits_still_produce_a_frame() {
    let mut arena = ImageArena::new();
    let inputs: Vec<ImageId> = (0..4).map(|_| leaf(&mut arena)).collect();
    let limits = ShaderLimits {
        max_buffers: 1,
        max_coords: 1,
        max_fetches: 1,
    };
    let root = build_merge(&mut arena, None, (16, 16), inputs, over(), &limits).unwrap();
    assert!(arena.get(root).merge.is_some());
    arena.validate(root).unwrap();
}

fn assert_all_merges_fit(arena: &ImageArena, root: ImageId, limits: &ShaderLimits) {
    for id in arena.preorder(root) {
        if let Some(merge) = &arena.get(id).merge {
            let usage = merge.resource_usage();
            assert!(!usage.exceeds(limits), "image {} uses {usage:?}", id.index());
        }
    }
}

#[test]
fn wide_merges_collapse_into_intermediate_groups() {
    let mut arena = ImageArena::new();
    let inputs: Vec<ImageId> = (0..20).map(|_| leaf(&mut arena)).collect();
    let limits = ShaderLimits::default();
    let root = build_merge(&mut arena, None, (16, 16), inputs.clone(), over(), &limits).unwrap();

    // 8 + 8 + 4 inputs, each group rendered into its own buffer.
    let groups: Vec<ImageId> = arena.children(root).collect();
    assert_eq!(groups.len(), 3);
    for &g in &groups {
        let n = arena.get(g);
        assert!(n.merge.is_some());
        assert_eq!(n.destination, Destination::IntermediateBuffer);
    }
    assert_eq!(arena.get(root).merge.as_ref().unwrap().samplers(), groups);
    assert_eq!(arena.children(groups[0]).collect::<Vec<_>>(), inputs[..8].to_vec());
    assert!(!arena.get(root).resource_usage.exceeds(&limits));
    assert_all_merges_fit(&arena, root, &limits);
    arena.validate(root).unwrap();
}

#[test]
fn collapsing_repeats_until_the_top_merge_fits() {
    let mut arena = ImageArena::new();
    let inputs: Vec<ImageId> = (0..65).map(|_| lut_leaf(&mut arena)).collect();
    let limits = ShaderLimits::default();
    let root = build_merge(&mut arena, None, (16, 16), inputs, over(), &limits).unwrap();
    // 65 inputs give 8 full groups plus a single one; the 9 are collapsed again.
    assert_eq!(arena.children(root).count(), 2);
    assert_all_merges_fit(&arena, root, &limits);
    arena.validate(root).unwrap();
}

#[test]
fn empty_inputs_become_transparent_constants() {
    let mut arena = ImageArena::new();
    let a = leaf(&mut arena);
    let empty = arena.no_image(None);
    let root = build_merge(
        &mut arena,
        None,
        (16, 16),
        vec![empty, a],
        over(),
        &ShaderLimits::default(),
    )
    .unwrap();
    let merge = arena.get(root).merge.clone().unwrap();
    let first = merge.expr_args().next().unwrap();
    assert_eq!(first.function().name, "solid_color");
}

#[test]
fn painted_inputs_get_their_own_intermediate() {
    let mut arena = ImageArena::new();
    let a = leaf(&mut arena);
    arena.get_mut(a).paint.push(PaintCommand::Rect {
        min: [0.0, 0.0],
        max: [0.5, 0.5],
        color: [1.0; 4],
    });
    let root = build_merge(
        &mut arena,
        None,
        (16, 16),
        vec![a],
        over(),
        &ShaderLimits::default(),
    )
    .unwrap();
    let child = arena.children(root).next().unwrap();
    assert_ne!(child, a);
    assert_eq!(arena.get(child).destination, Destination::IntermediateBuffer);
    assert_eq!(arena.children(child).collect::<Vec<_>>(), vec![a]);
}

#[test]
fn filter_input_inlines_raster_shaders() {
    let mut arena = ImageArena::new();
    let a = leaf(&mut arena);
    let (expr, child) = filter_input(&mut arena, a).unwrap();
    assert_eq!(child, a);
    assert_eq!(expr, Expr::source(a));
    let wrapped = Expr::wrap(&COLOR_ADJUST, expr, [ShaderValue::Float(0.0)]);
    assert!(matches!(wrapped.args()[0], Arg::Expr(_)));
}

#[test]
fn filter_input_resolves_merges_to_buffers() {
    let mut arena = ImageArena::new();
    let a = leaf(&mut arena);
    let b = leaf(&mut arena);
    let m = build_merge(
        &mut arena,
        None,
        (16, 16),
        vec![a, b],
        over(),
        &ShaderLimits::default(),
    )
    .unwrap();
    let (expr, child) = filter_input(&mut arena, m).unwrap();
    assert_eq!(child, m);
    assert_eq!(expr, Expr::source(m));
    assert_eq!(arena.get(m).destination, Destination::IntermediateBuffer);
    let empty = arena.no_image(None);
    assert!(filter_input(&mut arena, empty).is_none());
}

#[test]
fn paint_without_intermediate_ancestor_inserts_one() {
    let mut arena = ImageArena::new();
    let a = leaf(&mut arena);
    let top = arena.alloc(ImageNode::blend(16, 16, None));
    arena.append_child(top, a);
    assert_eq!(
        insert_intermediate_renders_for_paint(&mut arena, top, (16, 16), None),
        top
    );
    arena.get_mut(a).paint.push(PaintCommand::Stroke {
        points: vec![[0.0, 0.0], [1.0, 1.0]],
        color: [1.0; 4],
        width: 0.01,
        erase: true,
    });
    let wrapped = insert_intermediate_renders_for_paint(&mut arena, top, (16, 16), None);
    assert_ne!(wrapped, top);
    assert_eq!(
        arena.get(wrapped).destination,
        Destination::IntermediateBuffer
    );
}
