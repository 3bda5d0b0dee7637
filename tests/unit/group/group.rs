use super::*;
use crate::group::policies::{PIPELINE_NODES, SOURCE_ROLES};
use crate::node::DescriptorState;

const CLIP: &str = "checker:64x32@24:1-10";

fn clip(g: &mut Graph, name: &str, path: &str) -> NodeId {
    let id = g.new_node("SourceGroup", Some(name)).unwrap();
    let src = g.group_member(id, "source").unwrap();
    g.set_string(src, "media.path", path).unwrap();
    id
}

#[test]
fn source_group_builds_its_pipeline() {
    let mut g = Graph::with_defaults().unwrap();
    let c = clip(&mut g, "clip", CLIP);
    let members = g.group_members(c).unwrap();
    assert_eq!(members.len(), SOURCE_ROLES.len());
    assert_eq!(g.group_root(c).unwrap(), g.group_member(c, "paint").unwrap());

    let format = g.group_member(c, "format").unwrap();
    let transform = g.group_member(c, "transform").unwrap();
    assert_eq!(g.node(format).unwrap().inputs(), &[transform]);

    let r = g.image_range_info(c).unwrap();
    assert_eq!((r.start, r.end, r.fps), (1, 10, 24.0));
    let s = g.image_structure_info(c, &Context::new(1)).unwrap();
    assert_eq!((s.width, s.height), (64, 32));
    assert!(g.group_chains(c).unwrap().is_empty());
}

#[test]
fn source_group_takes_no_inputs() {
    let mut g = Graph::with_defaults().unwrap();
    let a = clip(&mut g, "a", CLIP);
    let b = clip(&mut g, "b", CLIP);
    assert!(matches!(
        g.set_inputs(a, vec![b]),
        Err(GraphError::Rewire { .. })
    ));
}

#[test]
fn stack_group_keeps_chains_across_reorders() {
    let mut g = Graph::with_defaults().unwrap();
    let a = clip(&mut g, "a", CLIP);
    let b = clip(&mut g, "b", CLIP);
    let st = g.new_node("StackGroup", Some("stack")).unwrap();
    g.set_inputs(st, vec![a, b]).unwrap();

    let chains = g.group_chains(st).unwrap();
    assert_eq!(chains.len(), 2);
    for (i, chain) in chains.iter().enumerate() {
        assert_eq!(chain.members.len(), 3);
        assert_eq!(chain.adaptor, chain.members[0]);
        let adaptor = g.node(chain.adaptor).unwrap();
        assert_eq!(adaptor.type_name(), "Adaptor");
        assert_eq!(adaptor.properties().int_or(adaptor::INDEX, -1), i as i32);
    }
    let heads: Vec<NodeId> = chains.iter().map(|c| c.head).collect();
    let root = g.group_root(st).unwrap();
    assert_eq!(g.node(root).unwrap().inputs(), heads.as_slice());

    g.set_inputs(st, vec![b, a]).unwrap();
    let swapped = g.group_chains(st).unwrap();
    assert_eq!(swapped[0].members, chains[1].members);
    assert_eq!(swapped[1].members, chains[0].members);
    let first = g.node(swapped[0].adaptor).unwrap();
    assert_eq!(first.properties().int_or(adaptor::INDEX, -1), 0);
    assert_eq!(
        g.node(root).unwrap().inputs(),
        &[swapped[0].head, swapped[1].head]
    );
}

#[test]
fn removed_inputs_drop_their_chain() {
    let mut g = Graph::with_defaults().unwrap();
    let a = clip(&mut g, "a", CLIP);
    let b = clip(&mut g, "b", CLIP);
    let st = g.new_node("StackGroup", Some("stack")).unwrap();
    g.set_inputs(st, vec![a, b]).unwrap();
    let before = g.node_count();
    let gone = g.group_chains(st).unwrap()[0].members.clone();

    g.remove_input(st, 0).unwrap();
    assert_eq!(g.node_count(), before - 3);
    for m in gone {
        assert!(g.node(m).is_err());
    }
    assert_eq!(g.group_chains(st).unwrap()[0].input, b);

    g.delete_node(b).unwrap();
    assert!(g.group_chains(st).unwrap().is_empty());
}

#[test]
fn deleting_a_group_deletes_its_members() {
    let mut g = Graph::with_defaults().unwrap();
    let c = clip(&mut g, "clip", CLIP);
    let members = g.group_members(c).unwrap();
    g.delete_node(c).unwrap();
    assert_eq!(g.node_count(), 0);
    for m in members {
        assert!(g.node(m).is_err());
    }
}

#[test]
fn sequence_group_maps_input_frames_through_its_chain() {
    let mut g = Graph::with_defaults().unwrap();
    let a = clip(&mut g, "a", CLIP);
    let b = clip(&mut g, "b", "ramp:64x32@24:1-5");
    let seq = g.new_node("SequenceGroup", Some("seq")).unwrap();
    g.set_inputs(seq, vec![a, b]).unwrap();

    let r = g.image_range_info(seq).unwrap();
    assert_eq!((r.start, r.end), (1, 15));
    assert_eq!(g.map_input_to_eval_frames(seq, 1, &[1, 5]).unwrap(), vec![11, 15]);
    assert_eq!(g.map_input_to_eval_frames(seq, 0, &[3]).unwrap(), vec![3]);
    assert!(g.map_input_to_eval_frames(seq, 2, &[1]).is_err());
}

#[test]
fn group_evaluation_reaches_the_external_input() {
    let mut g = Graph::with_defaults().unwrap();
    let a = clip(&mut g, "a", CLIP);
    let sw = g.new_node("SwitchGroup", Some("switch")).unwrap();
    g.set_inputs(sw, vec![a]).unwrap();
    g.set_root(sw).unwrap();

    let frame = g.evaluate(&Context::new(3)).unwrap();
    assert!(!frame.is_no_image());
    let path = g.evaluation_path(sw, &Context::new(3)).unwrap();
    let src = g.group_member(a, "source").unwrap();
    assert_eq!(path.last(), Some(&(src, 3)));
    assert_eq!(path.first(), Some(&(sw, 3)));
}

#[test]
fn display_group_feeds_chains_into_the_soundtrack() {
    let mut g = Graph::with_defaults().unwrap();
    let a = clip(&mut g, "a", CLIP);
    let d = g.new_node("DisplayGroup", Some("out")).unwrap();
    g.set_inputs(d, vec![a]).unwrap();
    let soundtrack = g.group_member(d, "soundtrack").unwrap();
    let chain = &g.group_chains(d).unwrap()[0];
    assert_eq!(g.node(soundtrack).unwrap().inputs(), &[chain.head]);
    assert_eq!(g.group_root(d).unwrap(), g.group_member(d, "display").unwrap());
}

#[test]
fn source_group_stages_are_editable_pipelines() {
    let mut g = Graph::with_defaults().unwrap();
    let c = clip(&mut g, "clip", CLIP);
    let linearize = g.group_member(c, "linearize_pipeline").unwrap();
    let pipe = g.group_member(c, "color_pipeline").unwrap();
    let lut = g.group_member(c, "lut").unwrap();
    assert_eq!(g.node(pipe).unwrap().type_name(), "PipelineGroup");
    assert_eq!(g.node(pipe).unwrap().inputs(), &[linearize]);
    assert_eq!(g.node(lut).unwrap().inputs(), &[pipe]);

    let color = g.group_member(c, "color").unwrap();
    assert_eq!(g.group_member(c, "color_pipeline.color").unwrap(), color);
    assert_eq!(g.group_root(pipe).unwrap(), color);
    assert_eq!(
        g.node(g.group_member(c, "linearize").unwrap())
            .unwrap()
            .type_name(),
        "Linearize"
    );
    assert!(g.group_member(c, "color_pipeline.paint").is_err());
}

#[test]
fn pipeline_rebuilds_keep_the_external_wiring() {
    let mut g = Graph::with_defaults().unwrap();
    let c = clip(&mut g, "clip", CLIP);
    let linearize = g.group_member(c, "linearize_pipeline").unwrap();
    let pipe = g.group_member(c, "color_pipeline").unwrap();
    let lut = g.group_member(c, "lut").unwrap();
    let old_color = g.group_member(pipe, "color").unwrap();
    let chain = g.group_chains(pipe).unwrap()[0].clone();

    let nodes = vec!["Color".to_owned(), "Lut".to_owned()];
    assert!(
        g.set_property(pipe, PIPELINE_NODES, PropertyValue::String(nodes.clone()))
            .unwrap()
    );
    assert!(g.node(old_color).is_err());
    let first = g.group_member(pipe, "color").unwrap();
    let second = g.group_member(pipe, "lut").unwrap();
    assert_eq!(g.group_chains(pipe).unwrap(), vec![chain.clone()]);
    assert_eq!(g.node(first).unwrap().inputs(), &[chain.head]);
    assert_eq!(g.node(second).unwrap().inputs(), &[first]);
    assert_eq!(g.group_root(pipe).unwrap(), second);

    assert_eq!(g.node(pipe).unwrap().inputs(), &[linearize]);
    assert!(g.node(linearize).unwrap().outputs().contains(&pipe));
    assert_eq!(g.node(lut).unwrap().inputs(), &[pipe]);
    assert!(g.node(pipe).unwrap().outputs().contains(&lut));

    let ctx = Context::new(4);
    let path = g.evaluation_path(c, &ctx).unwrap();
    let src = g.group_member(c, "source").unwrap();
    assert!(path.iter().any(|&(n, _)| n == second));
    assert_eq!(path.last(), Some(&(src, 4)));
    let r = g.image_range_info(c).unwrap();
    assert_eq!((r.start, r.end), (1, 10));

    let err = g.set_property(pipe, PIPELINE_NODES, PropertyValue::string("NoSuchKind"));
    assert!(err.is_err());
    assert_eq!(g.node(pipe).unwrap().properties().strings(PIPELINE_NODES), nodes);
    let root = g.group_root(pipe).unwrap();
    assert_eq!(g.node(root).unwrap().type_name(), "Lut");
    assert_eq!(g.node(lut).unwrap().inputs(), &[pipe]);

    g.set_property(pipe, PIPELINE_NODES, PropertyValue::String(Vec::new()))
        .unwrap();
    let path = g.evaluation_path(c, &ctx).unwrap();
    assert_eq!(path.last(), Some(&(src, 4)));
    assert!(!path.iter().any(|&(n, _)| g.node(n).is_ok_and(|n| n.type_name() == "Color")));
}

#[test]
fn pipeline_node_lists_survive_a_description_round_trip() {
    let mut g = Graph::with_defaults().unwrap();
    let c = clip(&mut g, "clip", CLIP);
    let pipe = g.group_member(c, "color_pipeline").unwrap();
    g.set_property(
        pipe,
        PIPELINE_NODES,
        PropertyValue::String(vec!["Color".to_owned(), "Color".to_owned()]),
    )
    .unwrap();
    let second = g.group_member(pipe, "color2").unwrap();
    g.set_float(second, "color.exposure", 2.0).unwrap();
    g.set_root(c).unwrap();

    let desc = g.save_description().unwrap();
    let clip_desc = desc.nodes.iter().find(|n| n.name == "clip").unwrap();
    assert!(clip_desc.members.contains_key("color_pipeline.color2"));

    let mut copy = Graph::with_defaults().unwrap();
    copy.load_description(&desc).unwrap();
    let copied = copy.find_node("clip").unwrap();
    let second = copy.group_member(copied, "color_pipeline.color2").unwrap();
    assert_eq!(
        copy.node(second).unwrap().properties().floats("color.exposure"),
        &[2.0]
    );
    let ctx = Context::new(2);
    assert_eq!(
        g.evaluate_identifier(&ctx).unwrap().fingerprint(),
        copy.evaluate_identifier(&ctx).unwrap().fingerprint()
    );
}

#[test]
fn adaptor_descriptors_follow_the_external_input() {
    let mut g = Graph::with_defaults().unwrap();
    let a = g.new_node("ImageSource", Some("a")).unwrap();
    g.set_string(a, "media.path", CLIP).unwrap();
    let sw = g.new_node("SwitchGroup", Some("switch")).unwrap();
    g.set_inputs(sw, vec![a]).unwrap();
    let adaptor = g.group_chains(sw).unwrap()[0].adaptor;

    assert_eq!(g.image_range_info(adaptor).unwrap().end, 10);
    let computed = g.node(adaptor).unwrap().stats().range_recomputes;
    assert_eq!(g.image_range_info(adaptor).unwrap().end, 10);
    assert_eq!(g.node(adaptor).unwrap().stats().range_recomputes, computed);

    g.set_int(a, "cut.out", 6).unwrap();
    assert_eq!(
        g.node(adaptor).unwrap().descriptor_state(),
        DescriptorState::Dirty
    );
    assert_eq!(g.image_range_info(adaptor).unwrap().end, 6);
    assert_eq!(
        g.node(adaptor).unwrap().stats().range_recomputes,
        computed + 1
    );
    assert_eq!(g.image_range_info(sw).unwrap().end, 6);
}
