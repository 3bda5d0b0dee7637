use std::sync::Arc;

/// Key of a cache entry, typically `<source>:<frame>:<component>`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Key from any string.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(Arc::from(s.as_ref()))
    }

    /// Key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded pixels plus shape metadata.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    /// RGBA float pixels.
    pub pixels: image::Rgba32FImage,
    /// Bits per channel of the source media.
    pub bit_depth: u8,
    /// Source identity, e.g. the media path and frame.
    pub identifier: String,
}

impl FrameBuffer {
    /// Buffer filled by `f(x, y)`.
    pub fn from_fn(
        width: u32,
        height: u32,
        identifier: impl Into<String>,
        f: impl FnMut(u32, u32) -> image::Rgba<f32>,
    ) -> Self {
        Self {
            pixels: image::Rgba32FImage::from_fn(width, height, f),
            bit_depth: 32,
            identifier: identifier.into(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Bytes retained by the pixel storage.
    pub fn byte_len(&self) -> usize {
        self.pixels.as_raw().len() * std::mem::size_of::<f32>()
    }
}

/// A checked-out cache entry.
///
/// Cloning the handle does not add a checkout; the ledger that received it from the cache is
/// responsible for returning it exactly once.
#[derive(Clone, Debug)]
pub struct FbRef {
    pub(crate) key: CacheKey,
    pub(crate) serial: u64,
    pub(crate) buffer: Arc<FrameBuffer>,
}

impl FbRef {
    /// Entry key.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Pixels.
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Unique serial of the entry this handle was checked out from.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}
