use crate::foundation::error::{GraphError, GraphResult};

/// Global frame number. Frames are 1-based by convention but may be any integer.
pub type Frame = i32;

/// Stable handle to a node slot owned by a [`crate::Graph`].
///
/// The generation distinguishes a live node from a later node that reused the same slot, so a
/// handle captured before a deletion never resolves to an unrelated node.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the owning graph's node table.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Inclusive frame span `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame.
    pub start: Frame,
    /// Last frame (inclusive).
    pub end: Frame,
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: Frame, end: Frame) -> GraphResult<Self> {
        if start > end {
            return Err(GraphError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u32 {
        (i64::from(self.end) - i64::from(self.start) + 1).max(0) as u32
    }

    /// Return `true` when `f` is inside `[start, end]`.
    pub fn contains(self, f: Frame) -> bool {
        self.start <= f && f <= self.end
    }

    /// Clamp a frame into this range.
    pub fn clamp(self, f: Frame) -> Frame {
        f.clamp(self.start, self.end.max(self.start))
    }

    /// Smallest range covering both `self` and `other`.
    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both bounds by `delta` frames using saturating arithmetic.
    pub fn shift(self, delta: i32) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }
}

/// Which eye a stereo-aware evaluation is asking for.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Eye {
    /// Left eye (also the mono default).
    #[default]
    Left,
    /// Right eye.
    Right,
    /// Either eye is acceptable.
    Either,
}

impl Eye {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Either => 2,
        }
    }
}

/// Stereo state set by display-level stereo nodes so source-level nodes can react to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StereoContext {
    /// The remaining fields are ignored unless `active` is set.
    pub active: bool,
    /// Eyes will be swapped closer to the root.
    pub swap: bool,
    /// Right-eye vertical flip will happen closer to the root.
    pub flip: bool,
    /// Right-eye horizontal flop will happen closer to the root.
    pub flop: bool,
    /// Additional stereo offset applied to both eyes.
    pub offset: f32,
    /// Additional right-eye only offset.
    pub right_offset: f32,
}

/// A requested view, layer, or channel of multi-part media.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ImageComponent {
    /// Default component of the media.
    #[default]
    None,
    /// A named view (e.g. "left").
    View(String),
    /// A layer inside a view.
    Layer {
        /// View name.
        view: String,
        /// Layer name.
        layer: String,
    },
    /// A single channel inside a layer.
    Channel {
        /// View name.
        view: String,
        /// Layer name.
        layer: String,
        /// Channel name.
        channel: String,
    },
}

impl std::fmt::Display for ImageComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None:"),
            Self::View(v) => write!(f, "View:{v}"),
            Self::Layer { view, layer } => write!(f, "Layer:{view},{layer}"),
            Self::Channel {
                view,
                layer,
                channel,
            } => write!(f, "Channel:{view},{layer},{channel}"),
        }
    }
}

/// RGBA color with straight (non-premultiplied) float channels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Rgba {
    /// Construct a color from its four channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque black.
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Channels as an array in RGBA order.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from a slice of at least three floats; alpha defaults to 1.
    pub fn from_slice(v: &[f32]) -> Option<Self> {
        match v {
            [r, g, b] => Some(Self::new(*r, *g, *b, 1.0)),
            [r, g, b, a, ..] => Some(Self::new(*r, *g, *b, *a)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
