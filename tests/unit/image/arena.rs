use super::*;
use crate::shader::expr::Expr;

#[test]
fn children_iterate_in_append_order() {
    let mut arena = ImageArena::new();
    let root = arena.alloc(ImageNode::merge(4, 4, None));
    let a = arena.alloc(ImageNode::blend(4, 4, None));
    let b = arena.alloc(ImageNode::blend(4, 4, None));
    let c = arena.no_image(None);
    arena.append_child(root, a);
    arena.append_child(root, b);
    arena.append_child(root, c);
    assert_eq!(arena.children(root).collect::<Vec<_>>(), vec![a, b, c]);
    assert_eq!(arena.preorder(root), vec![root, a, b, c]);
}

#[test]
fn group_images_reject_shaders() {
    let mut node = ImageNode::group(2, 2, None);
    assert!(node.set_shader(Expr::source(ImageId(0))).is_err());
    assert!(node.shader().is_none());
}

#[test]
fn validate_accepts_canonical_leaves() {
    let mut arena = ImageArena::new();
    let root = arena.alloc(ImageNode::group(2, 2, None));
    let leaf = arena.no_image(None);
    let err = arena.error_leaf("source", "missing");
    arena.append_child(root, leaf);
    arena.append_child(root, err);
    arena.validate(root).unwrap();
    assert_eq!(arena.get(err).error.as_ref().unwrap().node, "source");
    assert!(arena.get(err).is_no_image());
}

#[test]
fn validate_rejects_no_buffer_on_drawable_nodes() {
    let mut arena = ImageArena::new();
    let root = arena.alloc(ImageNode::blend(2, 2, None));
    arena.get_mut(root).destination = Destination::NoBuffer;
    assert!(arena.validate(root).is_err());
}

#[test]
fn set_shader_records_usage() {
    let mut node = ImageNode::blend(2, 2, None);
    node.set_shader(Expr::source(ImageId(0))).unwrap();
    assert_eq!(node.resource_usage, ResourceUsage::flattened());
}

#[test]
fn dump_mirrors_tree_shape() {
    let mut arena = ImageArena::new();
    let root = arena.alloc(ImageNode::merge(8, 8, None));
    let a = arena.alloc(ImageNode::blend(8, 8, None));
    arena.append_child(root, a);
    let dump = arena.dump(root);
    assert_eq!(dump.children.len(), 1);
    assert_eq!(dump.children[0].id, a.index());
    let json = serde_json::to_value(&dump).unwrap();
    assert_eq!(json["render_type"], "Merge");
}
