use super::*;

#[test]
fn parse_full_descriptor() {
    let d = SyntheticReader::parse("checker:64x48@24:1-100:tone=440:stereo").unwrap();
    assert_eq!(d.pattern, Pattern::Checker);
    assert_eq!((d.width, d.height), (64, 48));
    assert_eq!(d.fps, 24.0);
    assert_eq!((d.start, d.end), (1, 100));
    assert_eq!(d.tone_hz, Some(440.0));
    assert!(d.stereo);
}

#[test]
fn parse_rejects_malformed_descriptors() {
    for bad in [
        "plaid:8x8@24:1-2",
        "solid:8@24:1-2",
        "solid:8x8:1-2",
        "solid:8x8@0:1-2",
        "solid:8x8@24:5-2",
        "solid:8x8@24:1-2:loud",
    ] {
        assert!(SyntheticReader::parse(bad).is_err(), "{bad}");
    }
}

#[test]
fn info_reports_views_and_audio() {
    let r = SyntheticReader::default();
    let info = r.info("solid:4x4@30:10-20:stereo").unwrap();
    assert_eq!((info.start, info.end), (10, 20));
    assert_eq!(info.views, vec!["left".to_owned(), "right".to_owned()]);
    assert!(!info.has_audio);
}

#[test]
fn frames_are_deterministic_and_counted() {
    let r = SyntheticReader::default();
    let a = r.read_frame("ramp:8x4@24:1-10", 3, None).unwrap();
    let b = r.read_frame("ramp:8x4@24:1-10", 3, None).unwrap();
    assert_eq!(a.pixels, b.pixels);
    assert_eq!((a.width(), a.height()), (8, 4));
    assert_eq!(r.frame_reads(), 2);
    assert!(r.read_frame("ramp:8x4@24:1-10", 11, None).is_err());
}

#[test]
fn views_produce_different_pixels() {
    let r = SyntheticReader::default();
    let l = r.read_frame("solid:2x2@24:1-1:stereo", 1, Some("left")).unwrap();
    let rt = r.read_frame("solid:2x2@24:1-1:stereo", 1, Some("right")).unwrap();
    assert_ne!(l.pixels, rt.pixels);
}

#[test]
fn tone_fills_only_inside_media_duration() {
    let r = SyntheticReader::default();
    // 2 frames at 24 fps and 48 kHz is 4000 samples.
    let mut out = vec![0.0f32; 2 * 100];
    let n = r
        .read_audio("solid:2x2@24:1-2:tone=1000", 3950, &mut out, 2, 48_000)
        .unwrap();
    assert_eq!(n, 50);
    assert!(out[..100].iter().any(|s| *s != 0.0));
    assert!(out[100..].iter().all(|s| *s == 0.0));

    let mut silent = vec![0.0f32; 8];
    assert_eq!(
        r.read_audio("solid:2x2@24:1-2", 0, &mut silent, 2, 48_000)
            .unwrap(),
        0
    );
}
