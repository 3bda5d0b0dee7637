use super::*;

fn container() -> PropertyContainer {
    let mut p = PropertyContainer::new();
    p.declare("output.input", PropertyValue::int(0));
    p.declare("visual.speed", PropertyValue::float(1.0));
    p.declare("media.path", PropertyValue::string(""));
    p
}

#[test]
fn set_reports_change_only_when_value_differs() {
    let mut p = container();
    assert!(p.set("output.input", PropertyValue::int(2)).unwrap());
    assert!(!p.set("output.input", PropertyValue::int(2)).unwrap());
    assert_eq!(p.int_or("output.input", -1), 2);
}

#[test]
fn set_rejects_type_mismatch_and_unknown_names() {
    let mut p = container();
    assert!(matches!(
        p.set("output.input", PropertyValue::float(1.0)),
        Err(GraphError::Validation(_))
    ));
    assert!(matches!(
        p.set("nope", PropertyValue::int(1)),
        Err(GraphError::NotFound(_))
    ));
}

#[test]
fn typed_getters_fall_back_to_defaults() {
    let p = container();
    assert_eq!(p.float_or("visual.speed", 0.0), 1.0);
    assert_eq!(p.float_or("output.input", 7.0), 7.0);
    assert_eq!(p.string_or("missing", "x"), "x");
    assert!(!p.flag("output.input", true));
    assert!(p.ints("media.path").is_empty());
}

#[test]
fn fingerprint_tracks_values() {
    let mut p = container();
    let a = p.fingerprint();
    assert_eq!(a, container().fingerprint());
    p.set("visual.speed", PropertyValue::float(2.0)).unwrap();
    assert_ne!(a, p.fingerprint());
}

#[test]
fn serializes_as_plain_map() {
    let p = container();
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["output.input"], serde_json::json!({ "int": [0] }));
    let back: PropertyContainer = serde_json::from_value(json).unwrap();
    assert_eq!(back, p);
}
