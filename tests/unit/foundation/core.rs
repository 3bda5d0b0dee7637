use super::*;

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(10, 1).is_err());
    let r = FrameRange::new(1, 1).unwrap();
    assert_eq!(r.len_frames(), 1);
}

#[test]
fn frame_range_is_inclusive() {
    let r = FrameRange::new(1, 10).unwrap();
    assert_eq!(r.len_frames(), 10);
    assert!(r.contains(1));
    assert!(r.contains(10));
    assert!(!r.contains(11));
    assert_eq!(r.clamp(42), 10);
    assert_eq!(r.clamp(-3), 1);
}

#[test]
fn frame_range_union_and_shift() {
    let a = FrameRange::new(1, 10).unwrap();
    let b = FrameRange::new(5, 24).unwrap();
    assert_eq!(a.union(b), FrameRange::new(1, 24).unwrap());
    assert_eq!(a.shift(5), FrameRange::new(6, 15).unwrap());
}

#[test]
fn component_display_is_unambiguous() {
    assert_eq!(ImageComponent::None.to_string(), "None:");
    assert_eq!(
        ImageComponent::Layer {
            view: "left".into(),
            layer: "beauty".into()
        }
        .to_string(),
        "Layer:left,beauty"
    );
}

#[test]
fn rgba_from_slice_defaults_alpha() {
    assert_eq!(
        Rgba::from_slice(&[0.1, 0.2, 0.3]),
        Some(Rgba::new(0.1, 0.2, 0.3, 1.0))
    );
    assert_eq!(Rgba::from_slice(&[0.1]), None);
}

#[test]
fn node_id_display_includes_generation() {
    let id = NodeId::new(3, 7);
    assert_eq!(id.to_string(), "#3v7");
    assert_eq!(id.index(), 3);
}
