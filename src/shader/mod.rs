//! Symbolic per-pixel expressions built during evaluation.
//!
//! Expressions are value trees of named functions. They are rebuilt on every evaluation and
//! lowered to a flat [`lower::ShaderProgram`] for the display backend.

pub(crate) mod compose;
pub(crate) mod expr;
pub(crate) mod function;
pub(crate) mod lower;
pub(crate) mod usage;
