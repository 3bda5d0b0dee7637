//! Image-composition graph evaluation engine.
//!
//! A [`Graph`] holds typed nodes connected input to output. Evaluating the root node for a
//! [`Context`] produces a render tree in an [`ImageArena`], which lowers to shader passes; the
//! same graph answers identifier, range, structure and audio queries.
#![forbid(unsafe_code)]

pub(crate) mod audio;
pub(crate) mod cache;
pub mod config;
pub(crate) mod definition;
pub(crate) mod eval;
pub(crate) mod foundation;
pub(crate) mod graph;
pub(crate) mod group;
pub(crate) mod image;
pub(crate) mod media;
pub(crate) mod node;
pub(crate) mod property;
pub(crate) mod session;
pub(crate) mod shader;

pub use audio::buffer::AudioBuffer;
pub use cache::buffer::{CacheKey, FbRef, FrameBuffer};
pub use cache::fb_cache::{CacheStats, FrameBufferCache};
pub use cache::ledger::CheckoutLedger;
pub use config::{AudioOpts, CacheOpts, GraphOpts, PrerenderOpts, ShaderLimits, ViewOpts};
pub use definition::{NodeDefinition, NodeFactory, NodeRegistry};
pub use eval::context::{AudioContext, Context};
pub use foundation::core::{Eye, Frame, FrameRange, ImageComponent, NodeId, Rgba, StereoContext};
pub use foundation::error::{GraphError, GraphResult};
pub use foundation::math::{EdgePolicy, Fingerprint};
pub use graph::{Graph, GraphEdit, GraphStats, SharedGraph};
pub use group::{GroupBuilder, SubGraphChain, SubGraphPolicy};
pub use image::arena::{
    BlendMode, Children, Destination, ImageArena, ImageDump, ImageError, ImageId, ImageNode,
    RenderType,
};
pub use image::identifier::IdentifierNode;
pub use image::paint::{PaintCommand, PaintEntry};
pub use media::still::StillImageReader;
pub use media::synthetic::SyntheticReader;
pub use media::{DefaultMediaReader, MediaInfo, MediaReader};
pub use node::behavior::{InputContexts, Invalidation, NodeBehavior};
pub use node::info::{RangeInfo, StructureInfo};
pub use node::scope::{EvalCall, EvaluatedFrame};
pub use node::{DescriptorState, Node, NodeStats};
pub use property::{PropertyContainer, PropertyValue};
pub use session::description::{
    DESCRIPTION_VERSION, GraphDescription, MemberDescription, NodeDescription,
};
pub use session::prerender::{PrerenderOutput, PrerenderStats, PrerenderedFrame, prerender};
pub use shader::expr::{Arg, Expr, ShaderValue};
pub use shader::function::{FunctionKind, ShaderFunction, composite_function};
pub use shader::lower::{
    Instr, Operand, PassTarget, RenderPass, ShaderProgram, lower_tree, passes_fingerprint,
};
pub use shader::usage::{Accumulator, ResourceUsage};
