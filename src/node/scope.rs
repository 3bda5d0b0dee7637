use crate::cache::buffer::{CacheKey, FbRef, FrameBuffer};
use crate::cache::ledger::CheckoutLedger;
use crate::config::ShaderLimits;
use crate::eval::context::Context;
use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::{ImageArena, ImageDump, ImageError, ImageId};
use crate::media::MediaReader;
use crate::node::Node;
use crate::shader::lower::{RenderPass, lower_tree};

/// State of one `evaluate()` call: the graph being read, the render-tree arena being built and
/// the cache checkouts taken so far.
#[derive(Debug)]
pub struct EvalCall<'g> {
    graph: &'g Graph,
    arena: ImageArena,
    ledger: CheckoutLedger,
}

impl<'g> EvalCall<'g> {
    pub(crate) fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            arena: ImageArena::new(),
            ledger: CheckoutLedger::new(graph.cache_handle()),
        }
    }

    /// Graph being evaluated.
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Render tree built so far.
    pub fn arena(&self) -> &ImageArena {
        &self.arena
    }

    /// Mutable render tree.
    pub fn arena_mut(&mut self) -> &mut ImageArena {
        &mut self.arena
    }

    /// Shader resource limits of the graph.
    pub fn limits(&self) -> &'g ShaderLimits {
        &self.graph.opts().shader_limits
    }

    /// Media boundary of the graph.
    pub fn media(&self) -> &'g dyn MediaReader {
        self.graph.media()
    }

    /// Evaluate node `id` for `ctx`.
    ///
    /// Failures that do not already name a node are attributed to `id`.
    pub fn evaluate_node(&mut self, id: NodeId, ctx: &Context) -> GraphResult<ImageId> {
        let graph = self.graph;
        let node = graph.node(id)?;
        node.count_evaluation();
        node.behavior.evaluate(node, self, ctx).map_err(|e| match e {
            GraphError::Evaluation { .. } => e,
            other => GraphError::evaluation(node.name(), other.to_string()),
        })
    }

    /// Evaluate input `index` of `node`, or produce a no-image leaf when it is absent.
    pub fn evaluate_input(
        &mut self,
        node: &Node,
        index: usize,
        ctx: &Context,
    ) -> GraphResult<ImageId> {
        match node.inputs().get(index) {
            Some(&input) => self.evaluate_node(input, ctx),
            None => Ok(self.arena.no_image(Some(node.id()))),
        }
    }

    /// Check out a cached buffer; the checkout is returned when the call's ledger is released.
    pub fn checkout(&mut self, key: &CacheKey, owner: NodeId) -> Option<FbRef> {
        self.ledger.checkout(key, owner)
    }

    /// Insert a buffer into the cache, checked out for this call.
    pub fn insert(&mut self, key: CacheKey, owner: NodeId, buffer: FrameBuffer) -> FbRef {
        self.ledger.insert(key, owner, buffer)
    }

    /// Checkouts held by this call.
    pub fn checkouts(&self) -> usize {
        self.ledger.len()
    }

    pub(crate) fn finish(self, root: ImageId, context: Context) -> EvaluatedFrame {
        EvaluatedFrame {
            arena: self.arena,
            root,
            ledger: self.ledger,
            context,
        }
    }

    /// Check every checkout back in and drop the partial tree. Returns the number released.
    pub(crate) fn release(mut self) -> usize {
        self.ledger.release()
    }
}

/// Result of a successful evaluation: the render tree plus the cache checkouts it refers to.
///
/// Dropping the frame checks its buffers back in.
#[derive(Debug)]
pub struct EvaluatedFrame {
    arena: ImageArena,
    root: ImageId,
    ledger: CheckoutLedger,
    context: Context,
}

impl EvaluatedFrame {
    /// Root of the render tree.
    pub fn root(&self) -> ImageId {
        self.root
    }

    /// Arena holding the tree.
    pub fn arena(&self) -> &ImageArena {
        &self.arena
    }

    /// Mutable access for post-processing such as error tagging.
    pub fn arena_mut(&mut self) -> &mut ImageArena {
        &mut self.arena
    }

    /// Context the frame was evaluated for.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Serializable snapshot of the tree.
    pub fn dump(&self) -> ImageDump {
        self.arena.dump(self.root)
    }

    /// Flat per-buffer programs, children first.
    pub fn passes(&self) -> Vec<RenderPass> {
        lower_tree(&self.arena, self.root)
    }

    /// Number of cache checkouts held.
    pub fn checkouts(&self) -> usize {
        self.ledger.len()
    }

    /// `true` when the root is the canonical empty leaf.
    pub fn is_no_image(&self) -> bool {
        self.arena.get(self.root).is_no_image()
    }

    /// Error attached to the root when the frame is an error placeholder.
    pub fn error(&self) -> Option<&ImageError> {
        self.arena.get(self.root).error.as_ref()
    }

    pub(crate) fn from_parts(
        arena: ImageArena,
        root: ImageId,
        ledger: CheckoutLedger,
        context: Context,
    ) -> Self {
        Self {
            arena,
            root,
            ledger,
            context,
        }
    }
}
