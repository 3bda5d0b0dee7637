use crate::shader::usage::ResourceUsage;

/// Role of a shader function when expressions are composed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum FunctionKind {
    /// Reads pixels from a buffer or produces them from constants.
    Source,
    /// Per-pixel transform of one input; can be inlined freely.
    Color,
    /// Transform of one input that samples it more than once.
    Filter,
    /// Combines several inputs.
    Merge,
}

/// A named function that expressions bind arguments to.
///
/// Functions are `'static` descriptions; node kinds outside this crate declare their own as
/// `static` items.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ShaderFunction {
    /// Function name used in generated source and lowered programs.
    pub name: &'static str,
    /// Composition role.
    pub kind: FunctionKind,
    /// Usage contributed by the function itself, excluding its arguments.
    pub usage: ResourceUsage,
    /// Parameter names; merge functions may take more arguments than listed.
    pub params: &'static [&'static str],
}

impl ShaderFunction {
    /// `true` for functions that combine several inputs.
    pub fn is_merge(&self) -> bool {
        self.kind == FunctionKind::Merge
    }
}

/// Sample a resolved buffer.
pub static SOURCE_RGBA: ShaderFunction = ShaderFunction {
    name: "source_rgba",
    kind: FunctionKind::Source,
    usage: ResourceUsage::new(1, 1, 1),
    params: &["image"],
};

/// Constant color.
pub static SOLID_COLOR: ShaderFunction = ShaderFunction {
    name: "solid_color",
    kind: FunctionKind::Source,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["color"],
};

/// Exposure, gamma, saturation and offset adjustment.
pub static COLOR_ADJUST: ShaderFunction = ShaderFunction {
    name: "color_adjust",
    kind: FunctionKind::Color,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["in", "exposure", "gamma", "saturation", "offset"],
};

/// Transfer-function removal.
pub static LINEARIZE: ShaderFunction = ShaderFunction {
    name: "linearize",
    kind: FunctionKind::Color,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["in", "transfer", "gamma"],
};

/// One-dimensional lookup table applied per channel.
pub static LUT_1D: ShaderFunction = ShaderFunction {
    name: "lut_1d",
    kind: FunctionKind::Filter,
    usage: ResourceUsage::new(1, 1, 0),
    params: &["in", "table", "gain"],
};

/// Crop to a normalized window.
pub static CROP: ShaderFunction = ShaderFunction {
    name: "crop",
    kind: FunctionKind::Color,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["in", "window"],
};

/// Final display transform.
pub static DISPLAY_TRANSFORM: ShaderFunction = ShaderFunction {
    name: "display_transform",
    kind: FunctionKind::Color,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["in", "gamma", "brightness", "channel_order"],
};

/// Straight alpha "over", first argument on top.
pub static OVER: ShaderFunction = ShaderFunction {
    name: "over",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &[],
};

/// Additive composite.
pub static ADD: ShaderFunction = ShaderFunction {
    name: "add",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &[],
};

/// Absolute difference of the first two inputs.
pub static DIFFERENCE: ShaderFunction = ShaderFunction {
    name: "difference",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &[],
};

/// First input only, ignoring alpha.
pub static REPLACE: ShaderFunction = ShaderFunction {
    name: "replace",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &[],
};

/// First input with non-zero alpha wins.
pub static TOPMOST: ShaderFunction = ShaderFunction {
    name: "topmost",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &[],
};

/// Linear blend from `a` to `b`.
pub static DISSOLVE: ShaderFunction = ShaderFunction {
    name: "dissolve",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["a", "b", "t"],
};

/// Edge wipe from `a` to `b`.
pub static WIPE: ShaderFunction = ShaderFunction {
    name: "wipe",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["a", "b", "t", "angle"],
};

/// Left and right eye side by side.
pub static SIDE_BY_SIDE: ShaderFunction = ShaderFunction {
    name: "side_by_side",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 1),
    params: &["left", "right"],
};

/// Red/cyan anaglyph of two eyes.
pub static ANAGLYPH: ShaderFunction = ShaderFunction {
    name: "anaglyph",
    kind: FunctionKind::Merge,
    usage: ResourceUsage::new(0, 0, 0),
    params: &["left", "right"],
};

/// Look up a built-in merge function by the name used in `composite.type`.
pub fn composite_function(name: &str) -> Option<&'static ShaderFunction> {
    match name.trim().to_ascii_lowercase().as_str() {
        "over" => Some(&OVER),
        "add" => Some(&ADD),
        "difference" | "diff" => Some(&DIFFERENCE),
        "replace" => Some(&REPLACE),
        "topmost" => Some(&TOPMOST),
        _ => None,
    }
}
