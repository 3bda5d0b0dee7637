use super::*;

#[test]
fn stable_hasher_is_deterministic() {
    let mut a = StableHasher::new();
    a.write_str("source");
    a.write_i32(12);
    let mut b = StableHasher::new();
    b.write_str("source");
    b.write_i32(12);
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn stable_hasher_separates_string_boundaries() {
    let mut a = StableHasher::new();
    a.write_str("ab");
    a.write_str("c");
    let mut b = StableHasher::new();
    b.write_str("a");
    b.write_str("bc");
    assert_ne!(a.finish(), b.finish());
}

#[test]
fn affine_translation_lands_in_last_column() {
    let m = affine_to_mat4(kurbo::Affine::translate((3.0, -2.0)));
    let p = m.transform_point3(glam::Vec3::new(1.0, 1.0, 0.5));
    assert_eq!(p, glam::Vec3::new(4.0, -1.0, 0.5));
}

#[test]
fn affine_scale_round_trips_through_mat4() {
    let m = affine_to_mat4(kurbo::Affine::scale_non_uniform(2.0, 0.5));
    let p = m.transform_point3(glam::Vec3::new(1.0, 4.0, 0.0));
    assert_eq!(p, glam::Vec3::new(2.0, 2.0, 0.0));
}

#[test]
fn scaled_len_honors_edge_policy() {
    assert_eq!(scaled_len(10, 3.0, EdgePolicy::Floor), 3);
    assert_eq!(scaled_len(10, 3.0, EdgePolicy::Round), 3);
    assert_eq!(scaled_len(10, 3.0, EdgePolicy::Ceil), 4);
    assert_eq!(scaled_len(10, 0.5, EdgePolicy::Floor), 20);
    assert_eq!(scaled_len(1, 4.0, EdgePolicy::Floor), 1);
}

#[test]
fn edge_policy_parse_defaults_to_floor() {
    assert_eq!(EdgePolicy::parse("CEIL"), EdgePolicy::Ceil);
    assert_eq!(EdgePolicy::parse("nearest"), EdgePolicy::Round);
    assert_eq!(EdgePolicy::parse("whatever"), EdgePolicy::Floor);
}
