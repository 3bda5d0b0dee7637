use crate::cache::buffer::FrameBuffer;
use crate::foundation::core::Frame;
use crate::foundation::error::{GraphError, GraphResult};
use crate::media::{MediaInfo, MediaReader};
use std::sync::atomic::{AtomicU64, Ordering};

/// Procedural media addressed by a descriptor string:
///
/// `<pattern>:<width>x<height>@<fps>:<start>-<end>[:<option>]...`
///
/// Patterns are `solid`, `checker` and `ramp`. Options are `tone=<hz>` (adds a sine track) and
/// `stereo` (adds `left`/`right` views).
#[derive(Debug, Default)]
pub struct SyntheticReader {
    frame_reads: AtomicU64,
    audio_reads: AtomicU64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Pattern {
    Solid,
    Checker,
    Ramp,
}

#[derive(Clone, Debug, PartialEq)]
struct Descriptor {
    pattern: Pattern,
    width: u32,
    height: u32,
    fps: f64,
    start: Frame,
    end: Frame,
    tone_hz: Option<f64>,
    stereo: bool,
}

impl SyntheticReader {
    /// `true` if `path` starts with a known pattern name.
    pub fn handles(path: &str) -> bool {
        ["solid:", "checker:", "ramp:"]
            .iter()
            .any(|p| path.starts_with(p))
    }

    /// Frames decoded so far.
    pub fn frame_reads(&self) -> u64 {
        self.frame_reads.load(Ordering::Relaxed)
    }

    /// Audio windows served so far.
    pub fn audio_reads(&self) -> u64 {
        self.audio_reads.load(Ordering::Relaxed)
    }

    fn parse(path: &str) -> GraphResult<Descriptor> {
        let bad = |why: &str| GraphError::validation(format!("synthetic media '{path}': {why}"));
        let mut parts = path.split(':');
        let pattern = match parts.next() {
            Some("solid") => Pattern::Solid,
            Some("checker") => Pattern::Checker,
            Some("ramp") => Pattern::Ramp,
            _ => return Err(bad("unknown pattern")),
        };

        let geom = parts.next().ok_or_else(|| bad("missing size"))?;
        let (size, fps) = geom.split_once('@').ok_or_else(|| bad("missing @fps"))?;
        let (w, h) = size.split_once('x').ok_or_else(|| bad("size must be WxH"))?;
        let width: u32 = w.parse().map_err(|_| bad("bad width"))?;
        let height: u32 = h.parse().map_err(|_| bad("bad height"))?;
        let fps: f64 = fps.parse().map_err(|_| bad("bad fps"))?;
        if width == 0 || height == 0 || !(fps.is_finite() && fps > 0.0) {
            return Err(bad("size and fps must be positive"));
        }

        let range = parts.next().ok_or_else(|| bad("missing frame range"))?;
        let (s, e) = range.split_once('-').ok_or_else(|| bad("range must be START-END"))?;
        let start: Frame = s.parse().map_err(|_| bad("bad start"))?;
        let end: Frame = e.parse().map_err(|_| bad("bad end"))?;
        if start > end {
            return Err(bad("start after end"));
        }

        let mut tone_hz = None;
        let mut stereo = false;
        for opt in parts {
            if let Some(hz) = opt.strip_prefix("tone=") {
                tone_hz = Some(hz.parse().map_err(|_| bad("bad tone"))?);
            } else if opt == "stereo" {
                stereo = true;
            } else {
                return Err(bad("unknown option"));
            }
        }

        Ok(Descriptor {
            pattern,
            width,
            height,
            fps,
            start,
            end,
            tone_hz,
            stereo,
        })
    }
}

impl MediaReader for SyntheticReader {
    fn info(&self, path: &str) -> GraphResult<MediaInfo> {
        let d = Self::parse(path)?;
        Ok(MediaInfo {
            width: d.width,
            height: d.height,
            bit_depth: 8,
            fps: d.fps,
            start: d.start,
            end: d.end,
            views: if d.stereo {
                vec!["left".to_owned(), "right".to_owned()]
            } else {
                Vec::new()
            },
            has_audio: d.tone_hz.is_some(),
        })
    }

    fn read_frame(&self, path: &str, frame: Frame, view: Option<&str>) -> GraphResult<FrameBuffer> {
        let d = Self::parse(path)?;
        if frame < d.start || frame > d.end {
            return Err(GraphError::validation(format!(
                "frame {frame} outside {}..={} of '{path}'",
                d.start, d.end
            )));
        }
        self.frame_reads.fetch_add(1, Ordering::Relaxed);

        let right = matches!(view, Some("right"));
        let t = if d.end > d.start {
            (frame - d.start) as f32 / (d.end - d.start) as f32
        } else {
            0.0
        };
        let eye = if right { 0.25 } else { 0.0 };
        let (w, h) = (d.width, d.height);
        let ident = format!("{path}#{frame}#{}", view.unwrap_or(""));
        Ok(FrameBuffer {
            bit_depth: 8,
            ..FrameBuffer::from_fn(w, h, ident, |x, y| match d.pattern {
                Pattern::Solid => image::Rgba([0.5, 0.5, 0.5 + eye, 1.0]),
                Pattern::Checker => {
                    let cell = ((x / 8) + (y / 8) + frame.unsigned_abs()) % 2;
                    let v = if cell == 0 { 0.2 } else { 0.8 };
                    image::Rgba([v, v, v - eye * 0.5, 1.0])
                }
                Pattern::Ramp => {
                    let fx = x as f32 / w.max(1) as f32;
                    let fy = y as f32 / h.max(1) as f32;
                    image::Rgba([fx, fy, t, 1.0 - eye])
                }
            })
        })
    }

    fn read_audio(
        &self,
        path: &str,
        start_sample: i64,
        out: &mut [f32],
        channels: u16,
        sample_rate: u32,
    ) -> GraphResult<usize> {
        let d = Self::parse(path)?;
        let Some(hz) = d.tone_hz else {
            return Ok(0);
        };
        self.audio_reads.fetch_add(1, Ordering::Relaxed);
        let ch = usize::from(channels.max(1));
        let total =
            (f64::from(d.end - d.start + 1) * f64::from(sample_rate) / d.fps).round() as i64;
        let n = out.len() / ch;
        let mut written = 0;
        for i in 0..n {
            let s = start_sample + i as i64;
            if s < 0 || s >= total {
                continue;
            }
            let v = 0.25 * (std::f64::consts::TAU * hz * s as f64 / f64::from(sample_rate)).sin();
            for c in 0..ch {
                out[i * ch + c] = v as f32;
            }
            written = i + 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/synthetic.rs"]
mod tests;
