use crate::foundation::core::{Eye, Frame, ImageComponent, StereoContext};

/// Per-call evaluation parameters passed down the `evaluate()` chain.
///
/// A `Context` is never mutated in place while a call chain is running. Nodes that need a
/// different frame or eye for their inputs derive a modified copy with the `with_*` helpers.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Context {
    /// Frame requested of the node receiving this context.
    pub frame: Frame,
    /// Frame originally requested of the graph root.
    pub base_frame: Frame,
    /// Playback rate of the requesting timeline.
    pub fps: f64,
    /// Output width hint.
    pub view_width: u32,
    /// Output height hint.
    pub view_height: u32,
    /// Eye selection for stereo sources.
    pub eye: Eye,
    /// Stereo state set by display-level stereo nodes.
    pub stereo: StereoContext,
    /// Requested view, layer or channel.
    pub component: ImageComponent,
    /// Set when the caller accepts a placeholder for missing media.
    pub allow_missing: bool,
}

impl Context {
    /// Context for `frame` with default view hints.
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            base_frame: frame,
            fps: 24.0,
            view_width: 1280,
            view_height: 720,
            eye: Eye::Left,
            stereo: StereoContext::default(),
            component: ImageComponent::None,
            allow_missing: false,
        }
    }

    /// Copy with a remapped frame; `base_frame` is preserved.
    pub fn with_frame(&self, frame: Frame) -> Self {
        Self {
            frame,
            ..self.clone()
        }
    }

    /// Copy with a different eye.
    pub fn with_eye(&self, eye: Eye) -> Self {
        Self {
            eye,
            ..self.clone()
        }
    }

    /// Copy with a different stereo state.
    pub fn with_stereo(&self, stereo: StereoContext) -> Self {
        Self {
            stereo,
            ..self.clone()
        }
    }

    /// Copy with different output-size hints.
    pub fn with_view(&self, width: u32, height: u32) -> Self {
        Self {
            view_width: width,
            view_height: height,
            ..self.clone()
        }
    }

    /// Copy with a different component request.
    pub fn with_component(&self, component: ImageComponent) -> Self {
        Self {
            component,
            ..self.clone()
        }
    }
}

/// Window of audio requested from `audio_fill_buffer`.
///
/// Sample 0 is aligned with the first frame of the node the request is addressed to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioContext {
    /// First requested sample (per channel), relative to the node's range start.
    pub start_sample: i64,
    /// Number of samples per channel to produce.
    pub num_samples: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl AudioContext {
    /// Window of `num_samples` samples starting at `start_sample`.
    pub fn new(start_sample: i64, num_samples: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            start_sample,
            num_samples,
            sample_rate,
            channels,
        }
    }

    /// Start of the window in seconds.
    pub fn start_seconds(self) -> f64 {
        self.start_sample as f64 / f64::from(self.sample_rate.max(1))
    }

    /// Copy of this window shifted by `delta` samples.
    pub fn shifted(self, delta: i64) -> Self {
        Self {
            start_sample: self.start_sample.saturating_add(delta),
            ..self
        }
    }

    /// Copy of this window with a different length.
    pub fn with_len(self, num_samples: usize) -> Self {
        Self {
            num_samples,
            ..self
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/eval/context.rs"]
mod tests;
