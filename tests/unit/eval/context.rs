use super::*;

#[test]
fn with_frame_keeps_base_frame() {
    let ctx = Context::new(10);
    let remapped = ctx.with_frame(3);
    assert_eq!(remapped.frame, 3);
    assert_eq!(remapped.base_frame, 10);
    assert_eq!(ctx.frame, 10);
}

#[test]
fn with_eye_copies_other_fields() {
    let ctx = Context::new(4).with_view(64, 32);
    let right = ctx.with_eye(Eye::Right);
    assert_eq!(right.eye, Eye::Right);
    assert_eq!((right.view_width, right.view_height), (64, 32));
    assert_eq!(ctx.eye, Eye::Left);
}

#[test]
fn audio_window_shift_and_seconds() {
    let a = AudioContext::new(48_000, 1024, 48_000, 2);
    assert_eq!(a.start_seconds(), 1.0);
    let b = a.shifted(-48_000);
    assert_eq!(b.start_sample, 0);
    assert_eq!(b.num_samples, 1024);
    assert_eq!(a.with_len(8).num_samples, 8);
}
