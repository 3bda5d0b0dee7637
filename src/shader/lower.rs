use crate::foundation::math::{Fingerprint, StableHasher};
use crate::image::arena::{Destination, ImageArena, ImageId, RenderType};
use crate::shader::expr::{Arg, Expr, ShaderValue};
use std::collections::HashMap;

/// Operand of a lowered instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Constant value.
    Const(ShaderValue),
    /// Result of an earlier instruction.
    Reg(u32),
}

/// One function application in a lowered program.
#[derive(Clone, Debug, PartialEq)]
pub struct Instr {
    /// Function name.
    pub function: &'static str,
    /// Operands in argument order.
    pub operands: Vec<Operand>,
}

/// Flat, hash-consed form of an expression: identical sub-expressions share one register.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderProgram {
    /// Instructions in dependency order.
    pub instrs: Vec<Instr>,
    /// Register holding the final value.
    pub output: u32,
}

impl ShaderProgram {
    /// Lower `expr`.
    pub fn lower(expr: &Expr) -> Self {
        let mut b = Lowering::default();
        let output = b.visit(expr);
        Self {
            instrs: b.instrs,
            output,
        }
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    /// `true` for a program with no instructions.
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

#[derive(Default)]
struct Lowering {
    instrs: Vec<Instr>,
    interned: HashMap<Fingerprint, u32>,
}

impl Lowering {
    fn visit(&mut self, expr: &Expr) -> u32 {
        let operands: Vec<Operand> = expr
            .args()
            .iter()
            .map(|a| match a {
                Arg::Const(v) => Operand::Const(v.clone()),
                Arg::Expr(e) => Operand::Reg(self.visit(e)),
            })
            .collect();

        let mut h = StableHasher::new();
        h.write_str(expr.function().name);
        for op in &operands {
            match op {
                Operand::Const(v) => v.hash_into(&mut h),
                Operand::Reg(r) => {
                    h.write_u8(0xfe);
                    h.write_u32(*r);
                }
            }
        }
        let key = h.finish();
        if let Some(&reg) = self.interned.get(&key) {
            return reg;
        }
        let reg = self.instrs.len() as u32;
        self.instrs.push(Instr {
            function: expr.function().name,
            operands,
        });
        self.interned.insert(key, reg);
        reg
    }
}

/// Where a render pass writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTarget {
    /// The off-screen buffer of the given render-tree node.
    Intermediate(ImageId),
    /// The consumer's current target.
    Main,
}

/// One draw of a render-tree node.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    /// Node being drawn.
    pub image: ImageId,
    /// Output target.
    pub target: PassTarget,
    /// Lowered per-pixel program.
    pub program: ShaderProgram,
}

/// Lower every drawable node under `root` into passes, dependencies first.
///
/// A node with neither shader nor merge expression contributes no pass of its own.
pub fn lower_tree(arena: &ImageArena, root: ImageId) -> Vec<RenderPass> {
    let mut passes = Vec::new();
    lower_node(arena, root, &mut passes);
    passes
}

fn lower_node(arena: &ImageArena, id: ImageId, passes: &mut Vec<RenderPass>) {
    for child in arena.children(id) {
        lower_node(arena, child, passes);
    }
    let n = arena.get(id);
    if matches!(n.render_type(), RenderType::NoImage | RenderType::Group) {
        return;
    }
    let Some(expr) = n.merge.as_ref().or(n.shader()) else {
        return;
    };
    let target = if n.destination == Destination::IntermediateBuffer {
        PassTarget::Intermediate(id)
    } else {
        PassTarget::Main
    };
    passes.push(RenderPass {
        image: id,
        target,
        program: ShaderProgram::lower(expr),
    });
}

/// Stable digest of a pass list; equal digests mean identical draw programs.
pub fn passes_fingerprint(passes: &[RenderPass]) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_u64(passes.len() as u64);
    for p in passes {
        match p.target {
            PassTarget::Intermediate(_) => h.write_u8(1),
            PassTarget::Main => h.write_u8(0),
        }
        h.write_u64(p.program.instrs.len() as u64);
        for i in &p.program.instrs {
            h.write_str(i.function);
            for op in &i.operands {
                match op {
                    Operand::Const(v) => v.hash_into(&mut h),
                    Operand::Reg(r) => h.write_u32(*r),
                }
            }
        }
        h.write_u32(p.program.output);
    }
    h.finish()
}

#[cfg(test)]
#[path = "../../tests/unit/shader/lower.rs"]
mod tests;
