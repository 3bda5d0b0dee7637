use crate::cache::buffer::FbRef;
use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::image::paint::PaintCommand;
use crate::shader::expr::Expr;
use crate::shader::usage::ResourceUsage;
use std::collections::BTreeMap;

/// Index of a node inside one [`ImageArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct ImageId(pub(crate) u32);

impl ImageId {
    /// Raw arena index.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// How a render-tree node is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum RenderType {
    /// Drawn with hardware blending into the current target.
    Blend,
    /// Children are combined by the node's merge expression.
    Merge,
    /// No drawing of its own; every child is an independent root.
    Group,
    /// Nothing to draw.
    NoImage,
}

/// Where a render-tree node's pixels end up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Destination {
    /// Directly into whatever target the consumer is drawing.
    RasterBuffer,
    /// Into a private off-screen buffer sampled by the consumer.
    IntermediateBuffer,
    /// Not rendered.
    NoBuffer,
}

/// Hardware blend applied when a raster node is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BlendMode {
    /// Straight-alpha over.
    #[default]
    Over,
    /// Additive.
    Add,
    /// Absolute difference.
    Difference,
    /// Overwrite.
    Replace,
}

/// Failure recorded on an error leaf.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ImageError {
    /// Name of the node that failed.
    pub node: String,
    /// Failure message.
    pub message: String,
}

/// One node of the ephemeral render tree.
#[derive(Clone, Debug)]
pub struct ImageNode {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Pixel aspect ratio.
    pub pixel_aspect: f32,
    /// Placement of this node inside its parent.
    pub transform: glam::Mat4,
    render_type: RenderType,
    /// Buffer the node renders into.
    pub destination: Destination,
    shader: Option<Expr>,
    /// Merge expression combining this node's children.
    pub merge: Option<Expr>,
    first_child: Option<ImageId>,
    next_sibling: Option<ImageId>,
    /// Graph node that created this image.
    pub creator: Option<NodeId>,
    /// Source buffer held for the duration of the evaluation.
    pub buffer: Option<FbRef>,
    /// Vector annotations drawn after the pixels.
    pub paint: Vec<PaintCommand>,
    /// Usage of `shader`/`merge` as last computed.
    pub resource_usage: ResourceUsage,
    /// Hardware blend for raster drawing.
    pub blend: BlendMode,
    /// Free-form key/value annotations.
    pub tags: BTreeMap<String, String>,
    /// Set on error leaves.
    pub error: Option<ImageError>,
    /// Forbid conversion of this node into an intermediate buffer.
    pub no_intermediate: bool,
}

impl ImageNode {
    fn with_type(
        render_type: RenderType,
        destination: Destination,
        width: u32,
        height: u32,
        creator: Option<NodeId>,
    ) -> Self {
        Self {
            width,
            height,
            pixel_aspect: 1.0,
            transform: glam::Mat4::IDENTITY,
            render_type,
            destination,
            shader: None,
            merge: None,
            first_child: None,
            next_sibling: None,
            creator,
            buffer: None,
            paint: Vec::new(),
            resource_usage: ResourceUsage::default(),
            blend: BlendMode::Over,
            tags: BTreeMap::new(),
            error: None,
            no_intermediate: false,
        }
    }

    /// Blend node drawn into the current target.
    pub fn blend(width: u32, height: u32, creator: Option<NodeId>) -> Self {
        Self::with_type(
            RenderType::Blend,
            Destination::RasterBuffer,
            width,
            height,
            creator,
        )
    }

    /// Blend node rendered into its own off-screen buffer.
    pub fn intermediate(width: u32, height: u32, creator: Option<NodeId>) -> Self {
        Self::with_type(
            RenderType::Blend,
            Destination::IntermediateBuffer,
            width,
            height,
            creator,
        )
    }

    /// Merge node.
    pub fn merge(width: u32, height: u32, creator: Option<NodeId>) -> Self {
        Self::with_type(
            RenderType::Merge,
            Destination::RasterBuffer,
            width,
            height,
            creator,
        )
    }

    /// Group node whose children are independent roots.
    pub fn group(width: u32, height: u32, creator: Option<NodeId>) -> Self {
        Self::with_type(
            RenderType::Group,
            Destination::RasterBuffer,
            width,
            height,
            creator,
        )
    }

    /// Canonical empty leaf.
    pub fn no_image(creator: Option<NodeId>) -> Self {
        Self::with_type(RenderType::NoImage, Destination::NoBuffer, 0, 0, creator)
    }

    /// Render type tag.
    pub fn render_type(&self) -> RenderType {
        self.render_type
    }

    /// Per-pixel expression, if any.
    pub fn shader(&self) -> Option<&Expr> {
        self.shader.as_ref()
    }

    /// Attach a shader; group nodes cannot carry one.
    pub fn set_shader(&mut self, expr: Expr) -> GraphResult<()> {
        if self.render_type == RenderType::Group {
            return Err(GraphError::validation("group images carry no shader"));
        }
        self.resource_usage = expr.resource_usage();
        self.shader = Some(expr);
        Ok(())
    }

    /// Detach and return the shader.
    pub fn take_shader(&mut self) -> Option<Expr> {
        self.shader.take()
    }

    /// First child, if any.
    pub fn first_child(&self) -> Option<ImageId> {
        self.first_child
    }

    /// Next sibling in the parent's child list.
    pub fn next_sibling(&self) -> Option<ImageId> {
        self.next_sibling
    }

    /// `true` for the canonical empty leaf (including error leaves).
    pub fn is_no_image(&self) -> bool {
        self.render_type == RenderType::NoImage
    }

    /// `true` if the node has at least one child.
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Per-evaluation storage for render-tree nodes.
///
/// Every node created during one `evaluate()` call lives here and is freed together with the
/// arena.
#[derive(Clone, Debug, Default)]
pub struct ImageArena {
    nodes: Vec<ImageNode>,
}

impl ImageArena {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` and return its id.
    pub fn alloc(&mut self, node: ImageNode) -> ImageId {
        let id = ImageId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if nothing was allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    pub fn get(&self, id: ImageId) -> &ImageNode {
        &self.nodes[id.0 as usize]
    }

    /// Mutable node by id.
    pub fn get_mut(&mut self, id: ImageId) -> &mut ImageNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Append `child` at the end of `parent`'s child list.
    pub fn append_child(&mut self, parent: ImageId, child: ImageId) {
        self.get_mut(child).next_sibling = None;
        match self.get(parent).first_child {
            None => self.get_mut(parent).first_child = Some(child),
            Some(mut cur) => {
                while let Some(next) = self.get(cur).next_sibling {
                    cur = next;
                }
                self.get_mut(cur).next_sibling = Some(child);
            }
        }
    }

    /// Children of `parent` in order.
    pub fn children(&self, parent: ImageId) -> Children<'_> {
        Children {
            arena: self,
            next: self.get(parent).first_child,
        }
    }

    /// Allocate the canonical empty leaf.
    pub fn no_image(&mut self, creator: Option<NodeId>) -> ImageId {
        self.alloc(ImageNode::no_image(creator))
    }

    /// Allocate an error leaf naming the failing node.
    pub fn error_leaf(&mut self, node: impl Into<String>, message: impl Into<String>) -> ImageId {
        let mut leaf = ImageNode::no_image(None);
        leaf.error = Some(ImageError {
            node: node.into(),
            message: message.into(),
        });
        self.alloc(leaf)
    }

    /// Check the structural invariants of the tree under `root`.
    pub fn validate(&self, root: ImageId) -> GraphResult<()> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let n = self.get(id);
            if n.render_type == RenderType::Group && n.shader.is_some() {
                return Err(GraphError::validation(format!(
                    "image {} is a group with a shader",
                    id.0
                )));
            }
            let no_buffer = n.destination == Destination::NoBuffer;
            if no_buffer != (n.render_type == RenderType::NoImage) {
                return Err(GraphError::validation(format!(
                    "image {} has destination {:?} with render type {:?}",
                    id.0, n.destination, n.render_type
                )));
            }
            stack.extend(self.children(id));
        }
        Ok(())
    }

    /// Ids reachable from `root`, parents before children.
    pub fn preorder(&self, root: ImageId) -> Vec<ImageId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let kids: Vec<ImageId> = self.children(id).collect();
            stack.extend(kids.into_iter().rev());
        }
        out
    }

    /// Serializable snapshot of the tree under `root`.
    pub fn dump(&self, root: ImageId) -> ImageDump {
        let n = self.get(root);
        ImageDump {
            id: root.0,
            width: n.width,
            height: n.height,
            render_type: n.render_type,
            destination: n.destination,
            transform: n.transform.to_cols_array(),
            shader: n.shader.as_ref().map(Expr::to_source_string),
            merge: n.merge.as_ref().map(Expr::to_source_string),
            buffer: n.buffer.as_ref().map(|b| b.key().to_string()),
            paint: n.paint.len(),
            usage: n.resource_usage,
            error: n.error.clone(),
            children: self.children(root).map(|c| self.dump(c)).collect(),
        }
    }
}

/// Iterator over a node's children.
pub struct Children<'a> {
    arena: &'a ImageArena,
    next: Option<ImageId>,
}

impl Iterator for Children<'_> {
    type Item = ImageId;

    fn next(&mut self) -> Option<ImageId> {
        let cur = self.next?;
        self.next = self.arena.get(cur).next_sibling;
        Some(cur)
    }
}

/// JSON-friendly view of a render tree, for inspection tools.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ImageDump {
    /// Arena index.
    pub id: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Render type.
    pub render_type: RenderType,
    /// Destination.
    pub destination: Destination,
    /// Column-major transform.
    pub transform: [f32; 16],
    /// Shader source, if any.
    pub shader: Option<String>,
    /// Merge source, if any.
    pub merge: Option<String>,
    /// Cache key of the held buffer.
    pub buffer: Option<String>,
    /// Number of paint commands.
    pub paint: usize,
    /// Resource usage.
    pub usage: ResourceUsage,
    /// Error attached to an error leaf.
    pub error: Option<ImageError>,
    /// Child snapshots.
    pub children: Vec<ImageDump>,
}

#[cfg(test)]
#[path = "../../tests/unit/image/arena.rs"]
mod tests;
