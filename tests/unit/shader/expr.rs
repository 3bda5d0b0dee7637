use super::*;
use crate::shader::function::{COLOR_ADJUST, LUT_1D, OVER};

#[test]
fn wrap_places_input_first() {
    let e = Expr::wrap(
        &COLOR_ADJUST,
        Expr::source(ImageId(3)),
        [
            ShaderValue::Float(0.5),
            ShaderValue::Float(1.0),
            ShaderValue::Float(1.0),
            ShaderValue::Float(0.0),
        ],
    );
    assert_eq!(
        e.to_source_string(),
        "color_adjust(source_rgba(sampler#3), 0.5, 1.0, 1.0, 0.0)"
    );
    assert_eq!(e.samplers(), vec![ImageId(3)]);
}

#[test]
fn merge_keeps_input_order() {
    let e = Expr::merge(
        &OVER,
        vec![
            Expr::source(ImageId(1)),
            Expr::source(ImageId(2)),
            Expr::source(ImageId(0)),
        ],
        [],
    );
    assert_eq!(e.samplers(), vec![ImageId(1), ImageId(2), ImageId(0)]);
    assert_eq!(e.count_kind(FunctionKind::Source), 3);
}

#[test]
fn resource_usage_accumulates_sources() {
    let e = Expr::merge(
        &OVER,
        vec![Expr::source(ImageId(1)), Expr::source(ImageId(2))],
        [],
    );
    assert_eq!(e.resource_usage(), ResourceUsage::new(2, 2, 2));
}

#[test]
fn filter_functions_multiply_fetches() {
    let lut = Expr::wrap(
        &LUT_1D,
        Expr::source(ImageId(1)),
        [ShaderValue::Table(Arc::from(vec![0.0, 1.0])), ShaderValue::Float(1.0)],
    );
    assert_eq!(lut.resource_usage(), ResourceUsage::new(1, 2, 1));
}

#[test]
fn fingerprint_distinguishes_constants() {
    let a = Expr::solid(Rgba::new(0.0, 0.0, 0.0, 1.0));
    let b = Expr::solid(Rgba::new(0.0, 0.0, 0.0, 0.5));
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint(), a.clone().fingerprint());
}
