use super::*;
use crate::eval::context::Context;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::scope::EvalCall;

#[derive(Debug, Default)]
struct Blank;

impl NodeBehavior for Blank {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, _ctx: &Context) -> GraphResult<ImageId> {
        Ok(call.arena_mut().no_image(Some(node.id())))
    }
}

fn blank() -> NodeFactory {
    Arc::new(|| Box::new(Blank) as Box<dyn NodeBehavior>)
}

#[test]
fn builtins_cover_every_kind() {
    let reg = NodeRegistry::with_builtins().unwrap();
    for ty in [
        "ImageSource",
        "Color",
        "Lut",
        "Linearize",
        "Transform2D",
        "Format",
        "Paint",
        "Overlay",
        "Display",
        "SoundTrack",
        "Stack",
        "Switch",
        "Sequence",
        "Transition",
        "DisplayStereo",
        "Retime",
        "Adaptor",
        "PipelineGroup",
        "SourceGroup",
        "SequenceGroup",
        "StackGroup",
        "SwitchGroup",
        "DisplayGroup",
    ] {
        assert!(reg.contains(ty), "{ty}");
    }
    assert_eq!(reg.len(), 23);
    let t = reg.definition("Transition").unwrap();
    assert_eq!((t.min_inputs, t.max_inputs), (2, Some(2)));
    assert!(reg.definition("StackGroup").unwrap().is_group);
}

#[test]
fn definition_validation() {
    assert!(NodeDefinition::new(" ").validate().is_err());
    assert!(NodeDefinition::new("X").with_inputs(3, Some(1)).validate().is_err());
    assert!(NodeDefinition::new("X").with_inputs(1, Some(1)).validate().is_ok());

    let mut reg = NodeRegistry::empty();
    let err = reg
        .register(NodeDefinition::new("Bad").with_inputs(2, Some(0)), blank())
        .unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
    assert!(reg.is_empty());
}

#[test]
fn arity_and_kind_checks() {
    let mut def = NodeDefinition::new("Mix").with_inputs(1, Some(2));
    assert!(!def.accepts_input_count(0));
    assert!(def.accepts_input_count(2));
    assert!(!def.accepts_input_count(3));
    assert!(def.accepts_input_kind("Anything"));
    def.allowed_input_kinds = Some(vec!["ImageSource".to_owned()]);
    assert!(def.accepts_input_kind("ImageSource"));
    assert!(!def.accepts_input_kind("Color"));
}

#[test]
fn register_json_and_instantiate() {
    let mut reg = NodeRegistry::empty();
    reg.register_json(
        r#"{ "type_name": "Gain", "max_inputs": 1,
             "properties": { "gain.amount": { "float": [2.0] } } }"#,
        blank(),
    )
    .unwrap();
    let (def, _behavior) = reg.instantiate("Gain").unwrap();
    assert_eq!(def.version, 1);
    let props = def.default_properties();
    assert_eq!(props.float_or("gain.amount", 0.0), 2.0);
    assert!(matches!(
        reg.instantiate("Missing"),
        Err(GraphError::NotFound(_))
    ));
    assert_eq!(reg.type_names().collect::<Vec<_>>(), vec!["Gain"]);
}
