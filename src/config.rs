use crate::foundation::error::{GraphError, GraphResult};

/// Engine-wide options supplied by the host application.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GraphOpts {
    /// Frame-buffer cache budget.
    pub cache: CacheOpts,
    /// Per-frame shader-expression resource limits.
    pub shader_limits: ShaderLimits,
    /// Audio output format.
    pub audio: AudioOpts,
    /// Batch pre-render behavior.
    pub prerender: PrerenderOpts,
    /// Fallback output shape used when no input provides one.
    pub default_view: ViewOpts,
}

impl GraphOpts {
    /// Parse options from JSON, filling unspecified fields with defaults.
    pub fn from_json_str(s: &str) -> GraphResult<Self> {
        let opts: Self = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Reject option combinations the engine cannot honor.
    pub fn validate(&self) -> GraphResult<()> {
        if self.audio.sample_rate == 0 {
            return Err(GraphError::validation("audio.sample_rate must be > 0"));
        }
        if self.audio.channels == 0 || self.audio.channels > 8 {
            return Err(GraphError::validation("audio.channels must be in 1..=8"));
        }
        if self.shader_limits.max_buffers == 0
            || self.shader_limits.max_coords == 0
            || self.shader_limits.max_fetches == 0
        {
            return Err(GraphError::validation("shader_limits must be non-zero"));
        }
        if self.default_view.width == 0 || self.default_view.height == 0 {
            return Err(GraphError::validation("default_view must be non-empty"));
        }
        if !(self.default_view.fps.is_finite() && self.default_view.fps > 0.0) {
            return Err(GraphError::validation("default_view.fps must be > 0"));
        }
        Ok(())
    }
}

/// Frame-buffer cache budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CacheOpts {
    /// Maximum retained pixel bytes; checked-out buffers may exceed it temporarily.
    pub max_bytes: usize,
    /// Maximum number of retained entries.
    pub max_entries: usize,
}

impl Default for CacheOpts {
    fn default() -> Self {
        Self {
            max_bytes: 512 * 1024 * 1024,
            max_entries: 4096,
        }
    }
}

/// Upper bounds used when balancing shader-expression resource usage.
///
/// A merge whose accumulated usage exceeds any bound flattens its heaviest inputs into
/// intermediate buffers instead of failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ShaderLimits {
    /// Texture buffers bound by one expression.
    pub max_buffers: usize,
    /// Texture coordinate sets used by one expression.
    pub max_coords: usize,
    /// Texel fetches performed per output pixel.
    pub max_fetches: usize,
}

impl Default for ShaderLimits {
    fn default() -> Self {
        Self {
            max_buffers: 8,
            max_coords: 8,
            max_fetches: 81,
        }
    }
}

/// Audio output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioOpts {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl Default for AudioOpts {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// Batch pre-render configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PrerenderOpts {
    /// Evaluate chunks on a worker pool.
    pub parallel: bool,
    /// Worker count; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Frames per chunk.
    pub chunk_size: usize,
    /// Skip frames whose identifier matches an earlier frame's.
    pub identifier_elision: bool,
}

impl Default for PrerenderOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            chunk_size: 64,
            identifier_elision: true,
        }
    }
}

/// Fallback output shape.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewOpts {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate used by nodes without timed inputs.
    pub fps: f64,
}

impl Default for ViewOpts {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 24.0,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
