use crate::cache::buffer::FrameBuffer;
use crate::foundation::core::Frame;
use crate::foundation::error::GraphResult;
use crate::media::{MediaInfo, MediaReader};
use anyhow::Context;

/// Single-frame image files decoded with the `image` crate. Every frame number maps to the
/// one picture, at frame 1.
#[derive(Debug, Default)]
pub struct StillImageReader;

impl StillImageReader {
    fn decode(path: &str) -> GraphResult<image::DynamicImage> {
        let img = image::open(path).with_context(|| format!("decode still image '{path}'"))?;
        Ok(img)
    }
}

impl MediaReader for StillImageReader {
    fn info(&self, path: &str) -> GraphResult<MediaInfo> {
        let (width, height) =
            image::image_dimensions(path).with_context(|| format!("read dimensions of still image '{path}'"))?;
        Ok(MediaInfo {
            width,
            height,
            bit_depth: 8,
            fps: 24.0,
            start: 1,
            end: 1,
            views: Vec::new(),
            has_audio: false,
        })
    }

    fn read_frame(&self, path: &str, _frame: Frame, _view: Option<&str>) -> GraphResult<FrameBuffer> {
        let pixels = Self::decode(path)?.to_rgba32f();
        Ok(FrameBuffer {
            pixels,
            bit_depth: 8,
            identifier: path.to_owned(),
        })
    }

    fn read_audio(
        &self,
        _path: &str,
        _start_sample: i64,
        _out: &mut [f32],
        _channels: u16,
        _sample_rate: u32,
    ) -> GraphResult<usize> {
        Ok(0)
    }
}
