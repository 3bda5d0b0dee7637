use super::*;
use crate::eval::context::AudioContext;

fn buf(samples: Vec<f32>, channels: u16) -> AudioBuffer {
    AudioBuffer {
        samples,
        channels,
        sample_rate: 48_000,
        start_sample: 0,
    }
}

#[test]
fn mix_into_is_additive() {
    let mut dst = buf(vec![0.1, 0.2, 0.3, 0.4], 2);
    mix_into(&mut dst, &buf(vec![1.0, 1.0, 1.0, 1.0], 2), 0.5);
    assert_eq!(dst.samples, vec![0.6, 0.7, 0.8, 0.9]);
}

#[test]
fn mix_at_offsets_by_frames() {
    let mut dst = AudioBuffer::silent(&AudioContext::new(0, 4, 48_000, 2));
    mix_at(&mut dst, &buf(vec![1.0; 4], 2), 3);
    assert_eq!(dst.samples, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
    mix_at(&mut dst, &buf(vec![1.0; 4], 2), 9);
    assert_eq!(dst.peak(), 1.0);
}

#[test]
fn balance_pans_stereo() {
    let mut b = buf(vec![1.0, 1.0], 2);
    apply_gain(&mut b, 1.0, 1.0);
    assert_eq!(b.samples, vec![0.0, 1.0]);
    let mut b = buf(vec![1.0, 1.0], 2);
    apply_gain(&mut b, 0.5, -1.0);
    assert_eq!(b.samples, vec![0.5, 0.0]);
}

#[test]
fn clamp_limits_range() {
    let mut b = buf(vec![-3.0, 0.25, 2.0], 1);
    clamp_samples(&mut b);
    assert_eq!(b.samples, vec![-1.0, 0.25, 1.0]);
}

#[test]
fn resample_linear_interpolates_endpoints() {
    let src = buf(vec![0.0, 1.0], 1);
    let mut dst = buf(vec![0.0; 3], 1);
    resample_linear(&src, &mut dst);
    assert_eq!(dst.samples, vec![0.0, 0.5, 1.0]);
}

#[test]
fn frame_sample_conversions_round_trip() {
    assert_eq!(frame_to_sample(24, 24.0, 48_000), 48_000);
    assert_eq!(frame_to_sample(1, 29.97, 48_000), 1602);
    assert_eq!(sample_to_frame(48_000, 24.0, 48_000), 24);
    assert_eq!(sample_to_frame(1999, 24.0, 48_000), 0);
    assert_eq!(sample_to_frame(2000, 24.0, 48_000), 1);
}
