use super::*;

#[test]
fn helpers_build_expected_variants() {
    assert!(matches!(
        GraphError::validation("bad"),
        GraphError::Validation(msg) if msg == "bad"
    ));
    assert!(matches!(GraphError::not_found("x"), GraphError::NotFound(_)));
    assert!(matches!(GraphError::serde("x"), GraphError::Serde(_)));
}

#[test]
fn evaluation_error_names_the_node() {
    let err = GraphError::evaluation("sourceGroup000001_source", "missing media");
    assert_eq!(err.node_name(), Some("sourceGroup000001_source"));
    assert_eq!(
        err.to_string(),
        "evaluation error in node 'sourceGroup000001_source': missing media"
    );
}

#[test]
fn rewire_error_names_the_node() {
    let err = GraphError::rewire("switch", "too many inputs");
    assert_eq!(err.node_name(), Some("switch"));
    assert!(GraphError::validation("v").node_name().is_none());
}

#[test]
fn serde_json_errors_convert() {
    let parsed: Result<u32, _> = serde_json::from_str("{");
    let err: GraphError = parsed.unwrap_err().into();
    assert!(matches!(err, GraphError::Serde(_)));
}

#[test]
fn anyhow_errors_are_transparent() {
    let err: GraphError = anyhow::anyhow!("disk gone").into();
    assert_eq!(err.to_string(), "disk gone");
}
