//! Media access boundary.
//!
//! Codec readers are external to the engine; source nodes only see the [`MediaReader`] trait.

pub(crate) mod still;
pub(crate) mod synthetic;

use crate::cache::buffer::FrameBuffer;
use crate::foundation::core::Frame;
use crate::foundation::error::GraphResult;
use std::sync::Arc;

/// Shape and timing of a media reference.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct MediaInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bits per channel.
    pub bit_depth: u8,
    /// Native frame rate.
    pub fps: f64,
    /// First frame.
    pub start: Frame,
    /// Last frame (inclusive).
    pub end: Frame,
    /// Named views; empty for mono media.
    pub views: Vec<String>,
    /// `true` if the media carries audio.
    pub has_audio: bool,
}

/// Reads frames and audio for source nodes.
///
/// Implementations may block; the engine calls them synchronously from whichever thread is
/// evaluating.
pub trait MediaReader: Send + Sync + std::fmt::Debug {
    /// Describe `path`.
    fn info(&self, path: &str) -> GraphResult<MediaInfo>;

    /// Decode `frame` of `path`, optionally selecting a named view.
    fn read_frame(&self, path: &str, frame: Frame, view: Option<&str>) -> GraphResult<FrameBuffer>;

    /// Fill interleaved `out` with audio starting `start_sample` samples after the media's first
    /// frame. Returns samples written per channel; the remainder is left untouched.
    fn read_audio(
        &self,
        path: &str,
        start_sample: i64,
        out: &mut [f32],
        channels: u16,
        sample_rate: u32,
    ) -> GraphResult<usize>;
}

/// Reader that serves synthetic patterns and falls back to still-image files.
#[derive(Debug, Default)]
pub struct DefaultMediaReader {
    synthetic: synthetic::SyntheticReader,
    still: still::StillImageReader,
}

impl DefaultMediaReader {
    /// New reader with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle suitable for [`crate::Graph::new`].
    pub fn shared() -> Arc<dyn MediaReader> {
        Arc::new(Self::new())
    }

    /// The synthetic half, for read counters in tests and tools.
    pub fn synthetic(&self) -> &synthetic::SyntheticReader {
        &self.synthetic
    }

    fn pick(&self, path: &str) -> &dyn MediaReader {
        if synthetic::SyntheticReader::handles(path) {
            &self.synthetic
        } else {
            &self.still
        }
    }
}

impl MediaReader for DefaultMediaReader {
    fn info(&self, path: &str) -> GraphResult<MediaInfo> {
        self.pick(path).info(path)
    }

    fn read_frame(&self, path: &str, frame: Frame, view: Option<&str>) -> GraphResult<FrameBuffer> {
        self.pick(path).read_frame(path, frame, view)
    }

    fn read_audio(
        &self,
        path: &str,
        start_sample: i64,
        out: &mut [f32],
        channels: u16,
        sample_rate: u32,
    ) -> GraphResult<usize> {
        self.pick(path)
            .read_audio(path, start_sample, out, channels, sample_rate)
    }
}
