use crate::foundation::core::Rgba;
use crate::foundation::math::{Fingerprint, StableHasher};
use crate::image::arena::ImageId;
use crate::shader::function::{FunctionKind, SOLID_COLOR, SOURCE_RGBA, ShaderFunction};
use crate::shader::usage::ResourceUsage;
use smallvec::SmallVec;
use std::fmt::Write as _;
use std::sync::Arc;

/// Constant argument bound to a shader function.
#[derive(Clone, Debug, PartialEq)]
pub enum ShaderValue {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i32),
    /// Scalar float.
    Float(f32),
    /// Two-component vector.
    Vec2([f32; 2]),
    /// Four-component vector.
    Vec4([f32; 4]),
    /// Lookup table contents.
    Table(Arc<[f32]>),
    /// Buffer of a render-tree node in the same evaluation.
    Sampler(ImageId),
}

impl ShaderValue {
    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        match self {
            Self::Bool(v) => {
                h.write_u8(0);
                h.write_bool(*v);
            }
            Self::Int(v) => {
                h.write_u8(1);
                h.write_i32(*v);
            }
            Self::Float(v) => {
                h.write_u8(2);
                h.write_f32(*v);
            }
            Self::Vec2(v) => {
                h.write_u8(3);
                v.iter().for_each(|x| h.write_f32(*x));
            }
            Self::Vec4(v) => {
                h.write_u8(4);
                v.iter().for_each(|x| h.write_f32(*x));
            }
            Self::Table(v) => {
                h.write_u8(5);
                h.write_u64(v.len() as u64);
                v.iter().for_each(|x| h.write_f32(*x));
            }
            Self::Sampler(id) => {
                h.write_u8(6);
                h.write_u32(id.0);
            }
        }
    }

    fn write_source(&self, out: &mut String) {
        let _ = match self {
            Self::Bool(v) => write!(out, "{v}"),
            Self::Int(v) => write!(out, "{v}"),
            Self::Float(v) => write!(out, "{v:?}"),
            Self::Vec2([x, y]) => write!(out, "vec2({x:?}, {y:?})"),
            Self::Vec4([x, y, z, w]) => write!(out, "vec4({x:?}, {y:?}, {z:?}, {w:?})"),
            Self::Table(v) => write!(out, "table[{}]", v.len()),
            Self::Sampler(id) => write!(out, "sampler#{}", id.0),
        };
    }
}

/// Argument of a function node: a constant or a nested expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// Constant value.
    Const(ShaderValue),
    /// Nested expression.
    Expr(Box<Expr>),
}

/// A function applied to bound arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    function: &'static ShaderFunction,
    args: SmallVec<[Arg; 4]>,
}

impl Expr {
    /// Bind `args` to `function`.
    pub fn new(function: &'static ShaderFunction, args: impl IntoIterator<Item = Arg>) -> Self {
        Self {
            function,
            args: args.into_iter().collect(),
        }
    }

    /// Sample the buffer of `image`.
    pub fn source(image: ImageId) -> Self {
        Self::new(&SOURCE_RGBA, [Arg::Const(ShaderValue::Sampler(image))])
    }

    /// Constant color.
    pub fn solid(color: Rgba) -> Self {
        Self::new(
            &SOLID_COLOR,
            [Arg::Const(ShaderValue::Vec4(color.to_array()))],
        )
    }

    /// Wrap `input` in a single-input function followed by constant parameters.
    pub fn wrap(
        function: &'static ShaderFunction,
        input: Expr,
        params: impl IntoIterator<Item = ShaderValue>,
    ) -> Self {
        let mut args: SmallVec<[Arg; 4]> = SmallVec::new();
        args.push(Arg::Expr(Box::new(input)));
        args.extend(params.into_iter().map(Arg::Const));
        Self { function, args }
    }

    /// Merge function applied to `inputs` in order, followed by constant parameters.
    pub fn merge(
        function: &'static ShaderFunction,
        inputs: Vec<Expr>,
        params: impl IntoIterator<Item = ShaderValue>,
    ) -> Self {
        let mut args: SmallVec<[Arg; 4]> = inputs
            .into_iter()
            .map(|e| Arg::Expr(Box::new(e)))
            .collect();
        args.extend(params.into_iter().map(Arg::Const));
        Self { function, args }
    }

    /// Function at the root of this expression.
    pub fn function(&self) -> &'static ShaderFunction {
        self.function
    }

    /// Bound arguments in order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Nested expression arguments in order.
    pub fn expr_args(&self) -> impl Iterator<Item = &Expr> {
        self.args.iter().filter_map(|a| match a {
            Arg::Expr(e) => Some(e.as_ref()),
            Arg::Const(_) => None,
        })
    }

    /// Usage of the whole tree: each function's own usage plus its arguments'.
    pub fn resource_usage(&self) -> ResourceUsage {
        let mut u = self.function.usage;
        for e in self.expr_args() {
            if self.function.kind == FunctionKind::Filter {
                u.filter_accumulate(e.resource_usage());
            } else {
                u.accumulate(e.resource_usage());
            }
        }
        u
    }

    /// Number of functions of `kind` in the tree.
    pub fn count_kind(&self, kind: FunctionKind) -> usize {
        usize::from(self.function.kind == kind)
            + self.expr_args().map(|e| e.count_kind(kind)).sum::<usize>()
    }

    /// Every sampled render-tree node, in depth-first argument order.
    pub fn samplers(&self) -> Vec<ImageId> {
        let mut out = Vec::new();
        self.collect_samplers(&mut out);
        out
    }

    fn collect_samplers(&self, out: &mut Vec<ImageId>) {
        for a in &self.args {
            match a {
                Arg::Const(ShaderValue::Sampler(id)) => out.push(*id),
                Arg::Const(_) => {}
                Arg::Expr(e) => e.collect_samplers(out),
            }
        }
    }

    /// Stable digest of function names and argument values.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = StableHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }

    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        h.write_str(self.function.name);
        h.write_u64(self.args.len() as u64);
        for a in &self.args {
            match a {
                Arg::Const(v) => v.hash_into(h),
                Arg::Expr(e) => {
                    h.write_u8(0xff);
                    e.hash_into(h);
                }
            }
        }
    }

    /// Human-readable nested call syntax, e.g. `over(source_rgba(sampler#1), ...)`.
    pub fn to_source_string(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    fn write_source(&self, out: &mut String) {
        out.push_str(self.function.name);
        out.push('(');
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match a {
                Arg::Const(v) => v.write_source(out),
                Arg::Expr(e) => e.write_source(out),
            }
        }
        out.push(')');
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_source_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shader/expr.rs"]
mod tests;
