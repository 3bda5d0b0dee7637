use crate::eval::context::Context;
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::affine_to_mat4;
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::NodeBehavior;
use crate::node::info::StructureInfo;
use crate::node::kinds::apply_filter;
use crate::node::scope::EvalCall;
use crate::property::PropertyContainer;
use crate::shader::expr::ShaderValue;
use crate::shader::function::CROP;
use kurbo::{Affine, Vec2};

pub(crate) const ACTIVE: &str = "transform.active";
pub(crate) const TRANSLATE: &str = "transform.translate";
pub(crate) const SCALE: &str = "transform.scale";
pub(crate) const ROTATE: &str = "transform.rotate";
pub(crate) const FLIP: &str = "transform.flip";
pub(crate) const FLOP: &str = "transform.flop";

/// Placement of the input as `translate * rotate * scale`, with flip and flop as negative
/// vertical and horizontal scale.
pub(crate) fn placement(p: &PropertyContainer) -> Affine {
    let pair = |name: &str, d: f64| {
        let v = p.floats(name);
        (
            v.first().map_or(d, |x| f64::from(*x)),
            v.get(1).map_or(d, |y| f64::from(*y)),
        )
    };
    let (tx, ty) = pair(TRANSLATE, 0.0);
    let (sx, sy) = pair(SCALE, 1.0);
    let sx = if p.flag(FLOP, false) { -sx } else { sx };
    let sy = if p.flag(FLIP, false) { -sy } else { sy };
    let degrees = f64::from(p.float_or(ROTATE, 0.0));
    Affine::translate(Vec2::new(tx, ty))
        * Affine::rotate(degrees.to_radians())
        * Affine::scale_non_uniform(sx, sy)
}

/// 2D placement of the input. Only the render-tree transform changes; pixels are untouched.
#[derive(Debug, Default)]
pub(crate) struct Transform2D;

impl NodeBehavior for Transform2D {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let p = node.properties();
        if !p.flag(ACTIVE, true) || call.arena().get(child).is_no_image() {
            return Ok(child);
        }
        let m = affine_to_mat4(placement(p));
        let img = call.arena_mut().get_mut(child);
        img.transform = m * img.transform;
        Ok(child)
    }
}

pub(crate) const XSIZE: &str = "geometry.xsize";
pub(crate) const YSIZE: &str = "geometry.ysize";
pub(crate) const CROP_ACTIVE: &str = "crop.active";
pub(crate) const CROP_XMIN: &str = "crop.xmin";
pub(crate) const CROP_YMIN: &str = "crop.ymin";
pub(crate) const CROP_XMAX: &str = "crop.xmax";
pub(crate) const CROP_YMAX: &str = "crop.ymax";
pub(crate) const MAX_BIT_DEPTH: &str = "color.maxBitDepth";

/// Output geometry of a [`Format`] node for an input of `width` x `height`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FormatPlan {
    /// Normalized `[x0, y0, x1, y1]` crop window, when cropping.
    pub(crate) window: Option<[f32; 4]>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl FormatPlan {
    pub(crate) fn new(node: &Node, width: u32, height: u32) -> GraphResult<Self> {
        let p = node.properties();
        let (mut w, mut h, mut window) = (width, height, None);
        if p.flag(CROP_ACTIVE, false) && width > 0 && height > 0 {
            let xmin = p.int_or(CROP_XMIN, 0).max(0);
            let ymin = p.int_or(CROP_YMIN, 0).max(0);
            let xmax = p.int_or(CROP_XMAX, 0).min(width as i32 - 1);
            let ymax = p.int_or(CROP_YMAX, 0).min(height as i32 - 1);
            if xmax < xmin || ymax < ymin {
                return Err(GraphError::evaluation(
                    node.name(),
                    format!("empty crop window [{xmin}, {ymin}] - [{xmax}, {ymax}]"),
                ));
            }
            w = (xmax - xmin + 1) as u32;
            h = (ymax - ymin + 1) as u32;
            window = Some([
                xmin as f32 / width as f32,
                ymin as f32 / height as f32,
                (xmax + 1) as f32 / width as f32,
                (ymax + 1) as f32 / height as f32,
            ]);
        }

        let xsize = u32::try_from(p.int_or(XSIZE, 0)).unwrap_or(0);
        let ysize = u32::try_from(p.int_or(YSIZE, 0)).unwrap_or(0);
        match (xsize, ysize) {
            (0, 0) => {}
            (x, 0) => {
                h = ((u64::from(h) * u64::from(x)) / u64::from(w.max(1))).max(1) as u32;
                w = x;
            }
            (0, y) => {
                w = ((u64::from(w) * u64::from(y)) / u64::from(h.max(1))).max(1) as u32;
                h = y;
            }
            (x, y) => {
                w = x;
                h = y;
            }
        }
        Ok(Self {
            window,
            width: w,
            height: h,
        })
    }
}

/// Crop, resize and bit-depth limiting.
#[derive(Debug, Default)]
pub(crate) struct Format;

impl NodeBehavior for Format {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let (w, h) = {
            let n = call.arena().get(child);
            if n.is_no_image() {
                return Ok(child);
            }
            (n.width, n.height)
        };
        let plan = FormatPlan::new(node, w, h)?;
        let top = match plan.window {
            Some(window) => apply_filter(call, node, child, &CROP, [ShaderValue::Vec4(window)])?,
            None => child,
        };
        let img = call.arena_mut().get_mut(top);
        img.width = plan.width;
        img.height = plan.height;
        Ok(top)
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        let Some(&input) = node.inputs().first() else {
            return Ok(graph.default_structure());
        };
        let s = graph.image_structure_info(input, ctx)?;
        let plan = FormatPlan::new(node, s.width, s.height)?;
        let max_depth = node.properties().int_or(MAX_BIT_DEPTH, 0);
        let bit_depth = match u8::try_from(max_depth) {
            Ok(d) if d > 0 => s.bit_depth.min(d),
            _ => s.bit_depth,
        };
        Ok(StructureInfo {
            width: plan.width,
            height: plan.height,
            bit_depth,
            ..s
        })
    }
}
