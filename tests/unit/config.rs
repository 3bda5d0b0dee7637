use super::*;

#[test]
fn empty_json_yields_defaults() {
    let opts = GraphOpts::from_json_str("{}").unwrap();
    assert_eq!(opts, GraphOpts::default());
    assert_eq!(opts.shader_limits.max_buffers, 8);
    assert_eq!(opts.shader_limits.max_coords, 8);
    assert_eq!(opts.shader_limits.max_fetches, 81);
}

#[test]
fn partial_json_overrides_only_named_fields() {
    let opts = GraphOpts::from_json_str(
        r#"{ "cache": { "max_bytes": 1024 }, "shader_limits": { "max_buffers": 2 } }"#,
    )
    .unwrap();
    assert_eq!(opts.cache.max_bytes, 1024);
    assert_eq!(opts.cache.max_entries, CacheOpts::default().max_entries);
    assert_eq!(opts.shader_limits.max_buffers, 2);
    assert_eq!(opts.shader_limits.max_fetches, 81);
}

#[test]
fn invalid_options_are_rejected() {
    assert!(GraphOpts::from_json_str(r#"{ "audio": { "sample_rate": 0 } }"#).is_err());
    assert!(GraphOpts::from_json_str(r#"{ "shader_limits": { "max_coords": 0 } }"#).is_err());
    assert!(GraphOpts::from_json_str(r#"{ "default_view": { "fps": -1.0 } }"#).is_err());
    assert!(GraphOpts::from_json_str("[").is_err());
}
