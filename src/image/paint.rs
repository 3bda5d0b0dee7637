use crate::foundation::core::Frame;
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::StableHasher;

/// Vector annotation drawn on top of an image after its pixels are resolved.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaintCommand {
    /// Polyline in normalized image space.
    Stroke {
        /// Stroke vertices.
        points: Vec<[f32; 2]>,
        /// Straight RGBA color.
        color: [f32; 4],
        /// Width in normalized units.
        width: f32,
        /// Erase strokes read back the existing render.
        #[serde(default)]
        erase: bool,
    },
    /// Axis-aligned filled rectangle.
    Rect {
        /// Lower-left corner.
        min: [f32; 2],
        /// Upper-right corner.
        max: [f32; 2],
        /// Straight RGBA color.
        color: [f32; 4],
    },
    /// Text label.
    Text {
        /// Baseline origin.
        origin: [f32; 2],
        /// Text content.
        text: String,
        /// Point size in normalized units.
        size: f32,
        /// Straight RGBA color.
        color: [f32; 4],
    },
}

impl PaintCommand {
    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        let color = match self {
            Self::Stroke {
                points,
                color,
                width,
                erase,
            } => {
                h.write_u8(0);
                h.write_u64(points.len() as u64);
                for p in points {
                    h.write_f32(p[0]);
                    h.write_f32(p[1]);
                }
                h.write_f32(*width);
                h.write_bool(*erase);
                color
            }
            Self::Rect { min, max, color } => {
                h.write_u8(1);
                for v in min.iter().chain(max.iter()) {
                    h.write_f32(*v);
                }
                color
            }
            Self::Text {
                origin,
                text,
                size,
                color,
            } => {
                h.write_u8(2);
                h.write_f32(origin[0]);
                h.write_f32(origin[1]);
                h.write_str(text);
                h.write_f32(*size);
                color
            }
        };
        color.iter().for_each(|c| h.write_f32(*c));
    }
}

/// A paint command plus the frames it is visible on.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaintEntry {
    /// Inclusive `[first, last]` frame span; `None` means every frame.
    #[serde(default)]
    pub frames: Option<[Frame; 2]>,
    /// The command itself.
    pub command: PaintCommand,
}

impl PaintEntry {
    /// Decode a JSON-encoded entry as stored in a string property.
    pub fn from_json_str(s: &str) -> GraphResult<Self> {
        serde_json::from_str(s).map_err(|e| GraphError::serde(format!("paint entry: {e}")))
    }

    /// Encode for storage in a string property.
    pub fn to_json_string(&self) -> GraphResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// `true` if the entry is drawn on `frame`.
    pub fn visible_on(&self, frame: Frame) -> bool {
        self.frames.is_none_or(|[a, b]| a <= frame && frame <= b)
    }
}
