use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5f3c_91a2_e47d_0b68;

/// Stable 128-bit digest used for identifiers and static-frame elision.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

/// Seeded xxh3 hasher with explicit little-endian encodings, independent of `std::hash`.
pub(crate) struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    pub(crate) fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub(crate) fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    pub(crate) fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    pub(crate) fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

/// Lift a 2D affine transform into the render tree's 4x4 matrix space.
///
/// kurbo stores `[a, b, c, d, e, f]` for the column-major 2x3 matrix
/// `| a c e |`, `| b d f |`; z is passed through unchanged.
pub(crate) fn affine_to_mat4(a: kurbo::Affine) -> glam::Mat4 {
    let [m00, m10, m01, m11, tx, ty] = a.as_coeffs();
    glam::Mat4::from_cols(
        glam::Vec4::new(m00 as f32, m10 as f32, 0.0, 0.0),
        glam::Vec4::new(m01 as f32, m11 as f32, 0.0, 0.0),
        glam::Vec4::new(0.0, 0.0, 1.0, 0.0),
        glam::Vec4::new(tx as f32, ty as f32, 0.0, 1.0),
    )
}

/// Rescale `len` frames by `ratio` and round with the requested policy.
pub(crate) fn scaled_len(len: u32, ratio: f64, policy: EdgePolicy) -> u32 {
    if ratio <= 0.0 || !ratio.is_finite() {
        return len;
    }
    let v = f64::from(len) / ratio;
    let r = match policy {
        EdgePolicy::Floor => v.floor(),
        EdgePolicy::Round => v.round(),
        EdgePolicy::Ceil => v.ceil(),
    };
    (r.max(1.0)).min(f64::from(u32::MAX)) as u32
}

/// Rounding policy for frame counts produced by non-integer rescaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Drop a trailing partial frame.
    #[default]
    Floor,
    /// Round to nearest.
    Round,
    /// Keep a trailing partial frame.
    Ceil,
}

impl EdgePolicy {
    pub(crate) fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "round" | "nearest" => Self::Round,
            "ceil" | "ceiling" => Self::Ceil,
            _ => Self::Floor,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
