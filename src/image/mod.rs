//! Ephemeral render trees produced by `evaluate()`.
//!
//! Trees are arena-allocated per evaluation call; identifiers are the cheap, pixel-free
//! counterpart used to detect repeated frames.

pub(crate) mod arena;
pub(crate) mod identifier;
pub(crate) mod paint;
