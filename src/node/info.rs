use crate::foundation::core::{Frame, FrameRange};

/// Valid frame span of a node's output.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RangeInfo {
    /// First frame.
    pub start: Frame,
    /// Last frame (inclusive).
    pub end: Frame,
    /// Frame increment.
    pub inc: i32,
    /// Playback rate.
    pub fps: f64,
    /// First frame the editor chose to show.
    pub cut_in: Frame,
    /// Last frame the editor chose to show.
    pub cut_out: Frame,
    /// The span is a placeholder because the media is not known yet.
    pub undiscovered: bool,
}

impl RangeInfo {
    /// Range covering `[start, end]` with cuts at the ends.
    pub fn new(start: Frame, end: Frame, fps: f64) -> Self {
        let end = end.max(start);
        Self {
            start,
            end,
            inc: 1,
            fps,
            cut_in: start,
            cut_out: end,
            undiscovered: false,
        }
    }

    /// One-frame placeholder range.
    pub fn placeholder(fps: f64) -> Self {
        Self {
            undiscovered: true,
            ..Self::new(1, 1, fps)
        }
    }

    /// `[start, end]` as a [`FrameRange`].
    pub fn frames(&self) -> FrameRange {
        FrameRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Number of frames.
    pub fn len_frames(&self) -> u32 {
        self.frames().len_frames()
    }

    /// Smallest range covering both; cuts and rate follow `self`.
    pub fn union(&self, other: &Self) -> Self {
        let frames = self.frames().union(other.frames());
        Self {
            start: frames.start,
            end: frames.end,
            cut_in: self.cut_in.min(other.cut_in),
            cut_out: self.cut_out.max(other.cut_out),
            undiscovered: self.undiscovered || other.undiscovered,
            ..*self
        }
    }
}

/// Output image shape of a node.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructureInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bits per channel.
    pub bit_depth: u8,
    /// Pixel aspect ratio.
    pub pixel_aspect: f32,
}

impl StructureInfo {
    /// Shape with square pixels.
    pub fn new(width: u32, height: u32, bit_depth: u8) -> Self {
        Self {
            width,
            height,
            bit_depth,
            pixel_aspect: 1.0,
        }
    }

    /// Field-wise maximum, keeping `self`'s pixel aspect.
    pub fn max(&self, other: &Self) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
            bit_depth: self.bit_depth.max(other.bit_depth),
            pixel_aspect: self.pixel_aspect,
        }
    }
}
