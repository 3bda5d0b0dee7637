use super::*;
use crate::eval::context::Context;

fn build() -> Graph {
    let mut g = Graph::with_defaults().unwrap();
    let clip = g.new_node("SourceGroup", Some("clip")).unwrap();
    let src = g.group_member(clip, "source").unwrap();
    g.set_string(src, "media.path", "checker:64x32@24:1-10").unwrap();
    let color = g.group_member(clip, "color").unwrap();
    g.set_float(color, "color.exposure", 0.5).unwrap();
    let lut = g.group_member(clip, "lut").unwrap();
    g.set_int(lut, "lut.active", 1).unwrap();

    let other = g.new_node("ImageSource", Some("other")).unwrap();
    g.set_string(other, "media.path", "ramp:64x32@24:1-10").unwrap();

    let stack = g.new_node("StackGroup", Some("stack")).unwrap();
    g.set_inputs(stack, vec![clip, other]).unwrap();
    let chain = &g.group_chains(stack).unwrap()[1];
    let transform = chain.members[1];
    g.set_property(
        transform,
        "transform.translate",
        PropertyValue::Float(vec![8.0, 2.0]),
    )
    .unwrap();
    g.set_root(stack).unwrap();
    g
}

#[test]
fn save_and_load_preserve_the_render() {
    let mut g = build();
    let desc = g.save_description().unwrap();
    assert_eq!(desc.version, DESCRIPTION_VERSION);
    assert_eq!(desc.root.as_deref(), Some("stack"));
    assert_eq!(desc.nodes.len(), 3);

    let stack = desc.nodes.iter().find(|n| n.name == "stack").unwrap();
    assert_eq!(stack.inputs, vec!["clip".to_owned(), "other".to_owned()]);
    assert_eq!(stack.chains.len(), 2);
    assert_eq!(stack.chains[0][0].type_name, "Adaptor");
    assert!(stack.members.contains_key("stack"));

    let json = desc.to_json_string().unwrap();
    let parsed = GraphDescription::from_json_str(&json).unwrap();
    assert_eq!(parsed, desc);

    let mut copy = Graph::with_defaults().unwrap();
    copy.load_description(&parsed).unwrap();
    for f in [1, 5, 10] {
        let ctx = Context::new(f);
        assert_eq!(
            g.evaluate_identifier(&ctx).unwrap().fingerprint(),
            copy.evaluate_identifier(&ctx).unwrap().fingerprint()
        );
    }
    assert_eq!(copy.save_description().unwrap(), desc);
}

#[test]
fn transient_properties_appear_only_in_the_description() {
    let mut g = build();
    let desc = g.save_description().unwrap();
    let clip = desc.nodes.iter().find(|n| n.name == "clip").unwrap();
    assert!(clip.members["lut"].properties.contains_key("lut.checksum"));

    let id = g.find_node("clip").unwrap();
    let lut = g.group_member(id, "lut").unwrap();
    assert!(!g.node(lut).unwrap().properties().contains("lut.checksum"));
}

#[test]
fn older_versions_are_upgraded_on_read() {
    let json = r#"{
        "nodes": [
            { "name": "r", "type": "Retime", "version": 1,
              "properties": { "visual.scale": { "float": [2.0] } } }
        ]
    }"#;
    let mut g = Graph::with_defaults().unwrap();
    g.load_description(&GraphDescription::from_json_str(json).unwrap())
        .unwrap();
    let r = g.find_node("r").unwrap();
    let props = g.node(r).unwrap().properties();
    assert_eq!(props.float_or("visual.speed", 0.0), 0.5);
    assert!(!props.contains("visual.scale"));
}

#[test]
fn failed_loads_leave_nothing_behind() {
    let json = r#"{
        "root": "missing",
        "nodes": [
            { "name": "clip", "type": "SourceGroup" },
            { "name": "c", "type": "Color", "inputs": ["clip"] }
        ]
    }"#;
    let mut g = Graph::with_defaults().unwrap();
    let desc = GraphDescription::from_json_str(json).unwrap();
    assert!(matches!(
        g.load_description(&desc),
        Err(GraphError::NotFound(_))
    ));
    assert_eq!(g.node_count(), 0);
    assert!(g.find_node("clip").is_err());
    assert!(!g.in_graph_edit());
}

#[test]
fn member_type_mismatch_is_rejected() {
    let mut g = build();
    let mut desc = g.save_description().unwrap();
    let clip = desc.nodes.iter_mut().find(|n| n.name == "clip").unwrap();
    clip.members.get_mut("lut").unwrap().type_name = "Color".to_owned();

    let mut copy = Graph::with_defaults().unwrap();
    assert!(matches!(
        copy.load_description(&desc),
        Err(GraphError::Validation(_))
    ));
    assert_eq!(copy.node_count(), 0);
}

#[test]
fn newer_formats_are_refused() {
    let desc = GraphDescription {
        version: DESCRIPTION_VERSION + 1,
        ..GraphDescription::default()
    };
    let mut g = Graph::with_defaults().unwrap();
    assert!(g.load_description(&desc).is_err());
}
