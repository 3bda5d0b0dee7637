use crate::eval::context::AudioContext;

/// Interleaved `f32` samples for one audio window.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples, `num_samples * channels` long.
    pub samples: Vec<f32>,
    /// Channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Window start relative to the node the window was requested from.
    pub start_sample: i64,
}

impl AudioBuffer {
    /// Silent buffer covering `actx`.
    pub fn silent(actx: &AudioContext) -> Self {
        Self {
            samples: vec![0.0; actx.num_samples * usize::from(actx.channels)],
            channels: actx.channels,
            sample_rate: actx.sample_rate,
            start_sample: actx.start_sample,
        }
    }

    /// Samples per channel.
    pub fn num_samples(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Reset every sample to zero.
    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// `true` if every sample is zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }
}
