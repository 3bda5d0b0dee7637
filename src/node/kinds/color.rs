use crate::eval::context::Context;
use crate::foundation::error::{GraphError, GraphResult};
use crate::foundation::math::StableHasher;
use crate::image::arena::ImageId;
use crate::node::Node;
use crate::node::behavior::{Invalidation, NodeBehavior};
use crate::node::kinds::apply_filter;
use crate::node::scope::EvalCall;
use crate::property::{PropertyContainer, PropertyValue};
use crate::shader::expr::ShaderValue;
use crate::shader::function::{COLOR_ADJUST, LINEARIZE, LUT_1D};
use std::sync::{Arc, Mutex};

pub(crate) const ACTIVE: &str = "color.active";
pub(crate) const EXPOSURE: &str = "color.exposure";
pub(crate) const GAMMA: &str = "color.gamma";
pub(crate) const SATURATION: &str = "color.saturation";
pub(crate) const OFFSET: &str = "color.offset";
pub(crate) const TRANSFER: &str = "color.transfer";

/// Exposure, gamma, saturation and offset. Identity settings pass the input through.
#[derive(Debug, Default)]
pub(crate) struct ColorAdjust;

impl NodeBehavior for ColorAdjust {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let p = node.properties();
        let (exposure, gamma, saturation, offset) = (
            p.float_or(EXPOSURE, 0.0),
            p.float_or(GAMMA, 1.0),
            p.float_or(SATURATION, 1.0),
            p.float_or(OFFSET, 0.0),
        );
        let identity = exposure == 0.0 && gamma == 1.0 && saturation == 1.0 && offset == 0.0;
        if !p.flag(ACTIVE, true) || identity {
            return Ok(child);
        }
        apply_filter(
            call,
            node,
            child,
            &COLOR_ADJUST,
            [
                ShaderValue::Float(exposure),
                ShaderValue::Float(gamma),
                ShaderValue::Float(saturation),
                ShaderValue::Float(offset),
            ],
        )
    }
}

/// Shader code of a transfer-function name; unknown names are rejected.
pub(crate) fn transfer_code(name: &str) -> Option<i32> {
    match name.trim().to_ascii_lowercase().as_str() {
        "linear" => Some(0),
        "srgb" => Some(1),
        "gamma" => Some(2),
        "rec709" => Some(3),
        _ => None,
    }
}

/// Removes the transfer function named by `color.transfer`.
#[derive(Debug, Default)]
pub(crate) struct Linearize;

impl NodeBehavior for Linearize {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let p = node.properties();
        let name = p.string_or(TRANSFER, "linear");
        let Some(code) = transfer_code(name) else {
            return Err(GraphError::evaluation(
                node.name(),
                format!("unknown transfer '{name}'"),
            ));
        };
        if !p.flag(ACTIVE, true) || code == 0 {
            return Ok(child);
        }
        apply_filter(
            call,
            node,
            child,
            &LINEARIZE,
            [ShaderValue::Int(code), ShaderValue::Float(p.float_or(GAMMA, 2.2))],
        )
    }
}

pub(crate) const LUT_ACTIVE: &str = "lut.active";
pub(crate) const LUT_SIZE: &str = "lut.size";
pub(crate) const LUT_GAIN: &str = "lut.gain";
pub(crate) const LUT_SHAPE: &str = "lut.shape";
pub(crate) const LUT_CHECKSUM: &str = "lut.checksum";
const LUT_SCALE_V1: &str = "lut.scale";
const MAX_LUT_SIZE: i32 = 4096;

/// Evaluate a 1D table of `size` entries for a named curve.
pub(crate) fn build_lut(shape: &str, size: i32) -> GraphResult<Arc<[f32]>> {
    if !(2..=MAX_LUT_SIZE).contains(&size) {
        return Err(GraphError::validation(format!(
            "lut size {size} outside 2..={MAX_LUT_SIZE}"
        )));
    }
    let curve: fn(f32) -> f32 = match shape.trim().to_ascii_lowercase().as_str() {
        "identity" => |x| x,
        "invert" => |x| 1.0 - x,
        "contrast" => |x| x * x * (3.0 - 2.0 * x),
        "gamma" => |x| x.powf(1.0 / 2.2),
        other => return Err(GraphError::validation(format!("unknown lut shape '{other}'"))),
    };
    let last = (size - 1) as f32;
    Ok((0..size).map(|i| curve(i as f32 / last)).collect())
}

fn lut_checksum(table: &[f32]) -> String {
    let mut h = StableHasher::new();
    h.write_u64(table.len() as u64);
    table.iter().for_each(|v| h.write_f32(*v));
    h.finish().to_string()
}

/// One-dimensional lookup table.
///
/// The table is derived from `lut.shape` and `lut.size`; it is built on first use and dropped
/// whenever one of them changes.
#[derive(Debug, Default)]
pub(crate) struct Lut {
    table: Mutex<Option<Arc<[f32]>>>,
}

impl Lut {
    fn table(&self, props: &PropertyContainer) -> GraphResult<Arc<[f32]>> {
        let mut slot = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(t) = slot.as_ref() {
            return Ok(Arc::clone(t));
        }
        let t = build_lut(
            props.string_or(LUT_SHAPE, "identity"),
            props.int_or(LUT_SIZE, 16),
        )?;
        *slot = Some(Arc::clone(&t));
        Ok(t)
    }
}

impl NodeBehavior for Lut {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let p = node.properties();
        if !p.flag(LUT_ACTIVE, false) {
            return Ok(child);
        }
        let table = self.table(p)?;
        apply_filter(
            call,
            node,
            child,
            &LUT_1D,
            [
                ShaderValue::Table(table),
                ShaderValue::Float(p.float_or(LUT_GAIN, 1.0)),
            ],
        )
    }

    fn property_changed(&self, _node: &Node, name: &str) -> Invalidation {
        if name == LUT_SHAPE || name == LUT_SIZE {
            *self.table.lock().unwrap_or_else(|e| e.into_inner()) = None;
        }
        Invalidation::Descriptors
    }

    fn read_completed(
        &self,
        props: &mut PropertyContainer,
        _type_name: &str,
        version: u32,
    ) -> GraphResult<()> {
        if version < 2
            && let Some(PropertyValue::Float(scale)) = props.remove(LUT_SCALE_V1)
        {
            props.set(LUT_GAIN, PropertyValue::Float(scale))?;
        }
        Ok(())
    }

    fn prepare_for_write(&self, props: &mut PropertyContainer) -> GraphResult<()> {
        let table = build_lut(
            props.string_or(LUT_SHAPE, "identity"),
            props.int_or(LUT_SIZE, 16),
        )?;
        props.declare(LUT_CHECKSUM, PropertyValue::string(lut_checksum(&table)));
        Ok(())
    }

    fn write_completed(&self, props: &mut PropertyContainer) {
        props.remove(LUT_CHECKSUM);
    }
}
