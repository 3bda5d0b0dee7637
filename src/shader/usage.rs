use crate::config::ShaderLimits;

/// Estimated GPU pressure of an expression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ResourceUsage {
    /// Texel fetches per output pixel.
    pub fetches: usize,
    /// Bound texture buffers.
    pub buffers: usize,
    /// Texture coordinate sets.
    pub coords: usize,
}

impl ResourceUsage {
    /// Usage with explicit counts.
    pub const fn new(fetches: usize, buffers: usize, coords: usize) -> Self {
        Self {
            fetches,
            buffers,
            coords,
        }
    }

    /// Usage of sampling a single resolved buffer.
    pub const fn flattened() -> Self {
        Self::new(1, 1, 1)
    }

    /// Add another usage field-wise.
    pub fn accumulate(&mut self, u: ResourceUsage) {
        self.fetches += u.fetches;
        self.buffers += u.buffers;
        self.coords += u.coords;
    }

    /// Compose with a filter stage: fetches multiply, buffers and coordinates add.
    pub fn filter_accumulate(&mut self, u: ResourceUsage) {
        self.fetches = self.fetches.saturating_mul(u.fetches.max(1));
        self.buffers += u.buffers;
        self.coords += u.coords;
    }

    /// `true` if any field is above its limit.
    pub fn exceeds(&self, limits: &ShaderLimits) -> bool {
        self.buffers > limits.max_buffers
            || self.coords > limits.max_coords
            || self.fetches > limits.max_fetches
    }
}

/// How per-input usages combine into a composite's usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accumulator {
    /// Inputs are combined side by side (stack-like composites).
    Merge,
    /// Inputs are sampled through a filter (transition-like composites).
    Filter,
}

impl Accumulator {
    /// Total usage of `usages` combined with this rule.
    pub fn total(self, usages: impl IntoIterator<Item = ResourceUsage>) -> ResourceUsage {
        match self {
            Self::Merge => usages
                .into_iter()
                .fold(ResourceUsage::default(), |mut acc, u| {
                    acc.accumulate(u);
                    acc
                }),
            Self::Filter => usages
                .into_iter()
                .fold(ResourceUsage::new(1, 0, 0), |mut acc, u| {
                    acc.filter_accumulate(u);
                    acc
                }),
        }
    }
}
