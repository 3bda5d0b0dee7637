use crate::audio::buffer::AudioBuffer;

/// Add `src` into `dst` sample-by-sample; both must share a layout.
pub(crate) fn mix_into(dst: &mut AudioBuffer, src: &AudioBuffer, gain: f32) {
    for (d, s) in dst.samples.iter_mut().zip(src.samples.iter()) {
        *d += *s * gain;
    }
}

/// Copy `src` into `dst` starting at per-channel sample `offset`, additively.
pub(crate) fn mix_at(dst: &mut AudioBuffer, src: &AudioBuffer, offset: usize) {
    let ch = usize::from(dst.channels.max(1));
    let start = offset * ch;
    if start >= dst.samples.len() {
        return;
    }
    for (d, s) in dst.samples[start..].iter_mut().zip(src.samples.iter()) {
        *d += *s;
    }
}

/// Apply volume and a linear left/right balance in `[-1, 1]`.
pub(crate) fn apply_gain(buf: &mut AudioBuffer, volume: f32, balance: f32) {
    let ch = usize::from(buf.channels.max(1));
    let balance = balance.clamp(-1.0, 1.0);
    let left = volume * (1.0 - balance.max(0.0));
    let right = volume * (1.0 + balance.min(0.0));
    for frame in buf.samples.chunks_exact_mut(ch) {
        if ch >= 2 {
            frame[0] *= left;
            frame[1] *= right;
            for s in &mut frame[2..] {
                *s *= volume;
            }
        } else {
            frame[0] *= volume;
        }
    }
}

/// Clamp every sample to `[-1, 1]`.
pub(crate) fn clamp_samples(buf: &mut AudioBuffer) {
    for s in &mut buf.samples {
        *s = s.clamp(-1.0, 1.0);
    }
}

/// Resample `src` onto `dst`'s length with linear interpolation. `dst` is overwritten.
pub(crate) fn resample_linear(src: &AudioBuffer, dst: &mut AudioBuffer) {
    let ch = usize::from(dst.channels.max(1));
    let src_frames = src.num_samples();
    let dst_frames = dst.num_samples();
    if src_frames == 0 || dst_frames == 0 {
        dst.clear();
        return;
    }
    let step = if dst_frames > 1 {
        (src_frames - 1) as f64 / (dst_frames - 1) as f64
    } else {
        0.0
    };
    for i in 0..dst_frames {
        let pos = i as f64 * step;
        let i0 = (pos.floor() as usize).min(src_frames - 1);
        let i1 = (i0 + 1).min(src_frames - 1);
        let frac = (pos - i0 as f64) as f32;
        for c in 0..ch {
            let v0 = src.samples[i0 * ch + c];
            let v1 = src.samples[i1 * ch + c];
            dst.samples[i * ch + c] = v0 + (v1 - v0) * frac;
        }
    }
}

/// Convert a frame delta to the nearest sample offset at `sample_rate`.
pub(crate) fn frame_to_sample(frame_delta: i64, fps: f64, sample_rate: u32) -> i64 {
    if !(fps.is_finite() && fps > 0.0) {
        return 0;
    }
    (frame_delta as f64 * f64::from(sample_rate) / fps).round() as i64
}

/// Convert a sample offset to the frame delta containing it.
pub(crate) fn sample_to_frame(sample: i64, fps: f64, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    (sample as f64 * fps / f64::from(sample_rate)).floor() as i64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
