use super::*;
use crate::definition::NodeDefinition;
use crate::eval::context::Context;
use crate::group::{GroupBuilder, GroupNode, SubGraphPolicy};
use crate::node::DescriptorState;
use crate::node::behavior::NodeBehavior;
use crate::property::PropertyValue;

const CHECKER: &str = "checker:64x32@24:1-10";

fn source(g: &mut Graph, name: &str, path: &str) -> NodeId {
    let id = g.new_node("ImageSource", Some(name)).unwrap();
    g.set_string(id, "media.path", path).unwrap();
    id
}

#[test]
fn names_are_unique_and_generated_when_missing() {
    let mut g = Graph::with_defaults().unwrap();
    let a = g.new_node("Color", Some("grade")).unwrap();
    assert_eq!(g.find_node("grade").unwrap(), a);
    assert!(matches!(
        g.new_node("Color", Some("grade")),
        Err(GraphError::Validation(_))
    ));
    assert!(g.new_node("Color", Some("  ")).is_err());

    let b = g.new_node("Color", None).unwrap();
    let name = g.node(b).unwrap().name().to_owned();
    assert!(name.starts_with("color"), "{name}");
    assert_ne!(a, b);
    assert!(matches!(
        g.new_node("NoSuchKind", None),
        Err(GraphError::NotFound(_))
    ));
}

#[test]
fn rewire_rejections_leave_the_graph_unchanged() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    let b = source(&mut g, "b", CHECKER);
    let t = g.new_node("Transition", Some("t")).unwrap();

    let err = g.set_inputs(t, vec![a]).unwrap_err();
    assert!(matches!(err, GraphError::Rewire { .. }));
    assert!(g.node(t).unwrap().inputs().is_empty());

    let err = g.set_inputs(t, vec![a, a]).unwrap_err();
    assert_eq!(err.node_name(), Some("t"));

    g.set_inputs(t, vec![a, b]).unwrap();
    assert_eq!(g.node(t).unwrap().inputs(), &[a, b]);
    assert_eq!(g.node(a).unwrap().outputs(), &[t]);

    assert!(g.set_inputs(a, vec![b]).is_err());
}

#[test]
fn cycles_are_rejected() {
    let mut g = Graph::with_defaults().unwrap();
    let s = source(&mut g, "s", CHECKER);
    let c1 = g.new_node("Color", Some("c1")).unwrap();
    let c2 = g.new_node("Color", Some("c2")).unwrap();
    g.set_inputs(c1, vec![s]).unwrap();
    g.set_inputs(c2, vec![c1]).unwrap();
    let err = g.set_inputs(c1, vec![c2]).unwrap_err();
    assert!(err.to_string().contains("cycle"), "{err}");
    assert!(g.set_inputs(c1, vec![c1]).is_err());
    assert_eq!(g.node(c1).unwrap().inputs(), &[s]);
}

#[test]
fn insert_remove_and_disconnect() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    let b = source(&mut g, "b", CHECKER);
    let c = source(&mut g, "c", CHECKER);
    let st = g.new_node("Stack", Some("stack")).unwrap();
    g.append_input(st, a).unwrap();
    g.append_input(st, c).unwrap();
    g.insert_input(st, 1, b).unwrap();
    assert_eq!(g.node(st).unwrap().inputs(), &[a, b, c]);
    assert!(g.insert_input(st, 9, a).is_err());

    assert_eq!(g.remove_input(st, 0).unwrap(), a);
    assert_eq!(g.node(st).unwrap().inputs(), &[b, c]);
    assert!(g.node(a).unwrap().outputs().is_empty());
    assert!(g.remove_input(st, 5).is_err());

    let t = g.new_node("Transition", Some("t")).unwrap();
    g.set_inputs(t, vec![b, c]).unwrap();
    g.disconnect_inputs(t).unwrap();
    assert!(g.node(t).unwrap().inputs().is_empty());
}

#[test]
fn delete_keeps_remaining_inputs_in_order() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    let b = source(&mut g, "b", CHECKER);
    let c = source(&mut g, "c", CHECKER);
    let st = g.new_node("Stack", Some("stack")).unwrap();
    g.set_inputs(st, vec![a, b, c]).unwrap();
    g.set_root(b).unwrap();

    g.delete_node(b).unwrap();
    assert_eq!(g.node(st).unwrap().inputs(), &[a, c]);
    assert!(matches!(g.node(b), Err(GraphError::NotFound(_))));
    assert!(g.find_node("b").is_err());
    assert_eq!(g.root(), None);

    // A new node may reuse the slot; the stale handle must still miss.
    let d = g.new_node("Color", Some("d")).unwrap();
    assert_ne!(d, b);
    assert!(g.node(b).is_err());
    assert_eq!(g.stats().nodes_deleted, 1);
}

#[test]
fn bracketed_edits_propagate_once() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    let b = source(&mut g, "b", CHECKER);
    let st = g.new_node("Stack", Some("stack")).unwrap();

    let before = g.stats().propagation_passes;
    for i in 0..5 {
        let inputs = if i % 2 == 0 { vec![a, b] } else { vec![b, a] };
        g.set_inputs(st, inputs).unwrap();
    }
    assert_eq!(g.stats().propagation_passes - before, 5);

    let before = g.stats().propagation_passes;
    {
        let mut edit = g.edit();
        for i in 0..5 {
            let inputs = if i % 2 == 0 { vec![a, b] } else { vec![b, a] };
            edit.set_inputs(st, inputs).unwrap();
        }
        assert!(edit.in_graph_edit());
    }
    assert_eq!(g.stats().propagation_passes - before, 1);
    assert!(!g.in_graph_edit());
}

#[test]
fn unmatched_end_edit_is_ignored() {
    let mut g = Graph::with_defaults().unwrap();
    g.end_graph_edit();
    assert!(!g.in_graph_edit());
    g.begin_graph_edit();
    g.begin_graph_edit();
    g.end_graph_edit();
    assert!(g.in_graph_edit());
    g.end_graph_edit();
    assert!(!g.in_graph_edit());
}

#[test]
fn descriptors_recompute_only_when_dirty() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    let c = g.new_node("Color", Some("c")).unwrap();
    g.set_inputs(c, vec![a]).unwrap();

    let r1 = g.image_range_info(c).unwrap();
    let r2 = g.image_range_info(c).unwrap();
    assert_eq!(r1, r2);
    assert_eq!((r1.start, r1.end), (1, 10));
    assert_eq!(g.node(c).unwrap().stats().range_recomputes, 1);
    assert_eq!(g.node(c).unwrap().descriptor_state(), DescriptorState::Clean);

    g.set_property(a, "cut.in", PropertyValue::int(4)).unwrap();
    assert_eq!(g.node(c).unwrap().descriptor_state(), DescriptorState::Dirty);
    let r3 = g.image_range_info(c).unwrap();
    assert_eq!(r3.start, 4);
    assert_eq!(g.node(c).unwrap().stats().range_recomputes, 2);
}

#[test]
fn property_writes_are_type_checked() {
    let mut g = Graph::with_defaults().unwrap();
    let c = g.new_node("Color", Some("c")).unwrap();
    assert!(g.set_float(c, "color.gamma", 2.2).unwrap());
    assert!(!g.set_float(c, "color.gamma", 2.2).unwrap());
    assert!(g.set_string(c, "color.gamma", "x").is_err());
    assert!(g.set_int(c, "color.undeclared", 1).is_err());
}

#[test]
fn flush_evicts_only_the_subtree() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    let b = source(&mut g, "b", "ramp:16x16@24:1-10");
    let st = g.new_node("Stack", Some("stack")).unwrap();
    g.set_inputs(st, vec![a, b]).unwrap();
    g.set_root(st).unwrap();

    drop(g.evaluate(&Context::new(1)).unwrap());
    assert_eq!(g.cache().keys().len(), 2);

    assert_eq!(g.flush(a).unwrap(), 1);
    let keys = g.cache().keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].as_str().starts_with("b/"));

    drop(g.evaluate(&Context::new(1)).unwrap());
    assert_eq!(g.flush_all(), 2);
    assert_eq!(g.cache().outstanding_checkouts(), 0);
}

#[test]
fn internal_nodes_cannot_be_root_or_deleted() {
    let mut g = Graph::with_defaults().unwrap();
    let grp = g.new_node("SourceGroup", Some("clip")).unwrap();
    let member = g.group_member(grp, "source").unwrap();
    assert!(g.set_root(member).is_err());
    assert!(g.delete_node(member).is_err());
    assert_eq!(g.node(member).unwrap().group(), Some(grp));
}

#[test]
fn fork_shares_cache_but_not_counters() {
    let mut g = Graph::with_defaults().unwrap();
    let a = source(&mut g, "a", CHECKER);
    g.set_root(a).unwrap();
    drop(g.evaluate(&Context::new(2)).unwrap());

    let f = g.fork().unwrap();
    assert_eq!(f.node(a).unwrap().stats().evaluations, 0);
    assert_eq!(f.find_node("a").unwrap(), a);
    drop(f.evaluate(&Context::new(2)).unwrap());
    assert_eq!(g.cache().stats().hits, 1);
}

/// Stack group that refuses a chain for any input past the first.
#[derive(Debug, Default)]
struct SingleChainPolicy;

impl SubGraphPolicy for SingleChainPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let root = b.add_member("stack", "Stack")?;
        b.set_root(root)
    }

    fn new_sub_graph_for_input(
        &self,
        b: &mut GroupBuilder<'_>,
        index: usize,
        input: NodeId,
    ) -> GraphResult<SubGraphChain> {
        if index > 0 {
            return Err(GraphError::validation("one chain only"));
        }
        let adaptor = b.add_adaptor(index)?;
        Ok(SubGraphChain::adaptor_only(input, adaptor))
    }
}

#[test]
fn failed_group_rewires_restore_inputs_and_back_references() {
    let mut g = Graph::with_defaults().unwrap();
    let mut def = NodeDefinition::new("SingleChain").with_inputs(0, None);
    def.is_group = true;
    g.registry_mut()
        .register(
            def,
            Arc::new(|| {
                Box::new(GroupNode::new(Arc::new(SingleChainPolicy))) as Box<dyn NodeBehavior>
            }),
        )
        .unwrap();

    let a = source(&mut g, "a", CHECKER);
    let b = source(&mut g, "b", CHECKER);
    let grp = g.new_node("SingleChain", Some("grp")).unwrap();
    g.set_inputs(grp, vec![a]).unwrap();
    let chains = g.group_chains(grp).unwrap();
    let count = g.node_count();

    let err = g.set_inputs(grp, vec![a, b]).unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
    assert_eq!(g.node(grp).unwrap().inputs(), &[a]);
    assert!(g.node(a).unwrap().outputs().contains(&grp));
    assert!(!g.node(b).unwrap().outputs().contains(&grp));
    assert_eq!(g.group_chains(grp).unwrap(), chains);
    assert_eq!(g.node_count(), count);
    let root = g.group_root(grp).unwrap();
    assert_eq!(g.node(root).unwrap().inputs(), &[chains[0].head]);

    g.set_inputs(grp, vec![b]).unwrap();
    assert!(!g.node(a).unwrap().outputs().contains(&grp));
    assert_eq!(g.group_chains(grp).unwrap()[0].input, b);
}
