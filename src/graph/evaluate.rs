use super::Graph;
use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::clamp_samples;
use crate::cache::ledger::CheckoutLedger;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Frame, NodeId};
use crate::foundation::error::GraphResult;
use crate::image::arena::ImageArena;
use crate::image::identifier::IdentifierNode;
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::{EvalCall, EvaluatedFrame};

impl Graph {
    /// Evaluate the root for `ctx`. Without a root the result is a no-image frame.
    ///
    /// On failure every cache checkout taken during the call has been returned before the error
    /// is handed back.
    #[tracing::instrument(skip(self, ctx), fields(frame = ctx.frame))]
    pub fn evaluate(&self, ctx: &Context) -> GraphResult<EvaluatedFrame> {
        match self.root {
            Some(root) => self.evaluate_node(root, ctx),
            None => {
                let mut call = EvalCall::new(self);
                let leaf = call.arena_mut().no_image(None);
                Ok(call.finish(leaf, ctx.clone()))
            }
        }
    }

    /// Evaluate the sub-tree rooted at `id`.
    pub fn evaluate_node(&self, id: NodeId, ctx: &Context) -> GraphResult<EvaluatedFrame> {
        let mut call = EvalCall::new(self);
        match call.evaluate_node(id, ctx) {
            Ok(root) => Ok(call.finish(root, ctx.clone())),
            Err(e) => {
                let released = call.release();
                tracing::debug!(node = %id, released, error = %e, "evaluation failed");
                Err(e)
            }
        }
    }

    /// Evaluate the root, replacing a failure with an error leaf naming the failing node.
    pub fn evaluate_for_display(&self, ctx: &Context) -> EvaluatedFrame {
        match self.evaluate(ctx) {
            Ok(frame) => frame,
            Err(e) => {
                let node = e.node_name().unwrap_or("graph").to_owned();
                tracing::warn!(frame = ctx.frame, node = %node, error = %e, "showing error frame");
                let mut arena = ImageArena::new();
                let root = arena.error_leaf(node, e.to_string());
                EvaluatedFrame::from_parts(
                    arena,
                    root,
                    CheckoutLedger::new(self.cache_handle()),
                    ctx.clone(),
                )
            }
        }
    }

    /// Identifier of the root for `ctx`.
    #[tracing::instrument(skip(self, ctx), fields(frame = ctx.frame))]
    pub fn evaluate_identifier(&self, ctx: &Context) -> GraphResult<IdentifierNode> {
        match self.root {
            Some(root) => self.node_identifier(root, ctx),
            None => Ok(IdentifierNode::leaf("no-image")),
        }
    }

    /// Identifier of node `id` for `ctx`.
    pub fn node_identifier(&self, id: NodeId, ctx: &Context) -> GraphResult<IdentifierNode> {
        let node = self.node(id)?;
        node.count_identifier();
        node.behavior.evaluate_identifier(node, self, ctx)
    }

    /// Range descriptor of `id`, recomputed only if the node is dirty or was never queried.
    pub fn image_range_info(&self, id: NodeId) -> GraphResult<RangeInfo> {
        let node = self.node(id)?;
        if let Some(range) = node.cached_range() {
            return Ok(range);
        }
        let range = node.behavior.image_range_info(node, self)?;
        node.store_range(range);
        Ok(range)
    }

    /// Structure descriptor of `id` for the frame, eye, component and view size of `ctx`.
    pub fn image_structure_info(&self, id: NodeId, ctx: &Context) -> GraphResult<StructureInfo> {
        let node = self.node(id)?;
        if let Some(info) = node.cached_structure(ctx) {
            return Ok(info);
        }
        let info = node.behavior.image_structure_info(node, self, ctx)?;
        node.store_structure(ctx, info);
        Ok(info)
    }

    /// `(node, frame)` pairs `evaluate_node(id, ctx)` would visit, in visiting order.
    pub fn evaluation_path(&self, id: NodeId, ctx: &Context) -> GraphResult<Vec<(NodeId, Frame)>> {
        let mut out = Vec::new();
        self.collect_path(id, ctx, &mut out)?;
        Ok(out)
    }

    fn collect_path(
        &self,
        id: NodeId,
        ctx: &Context,
        out: &mut Vec<(NodeId, Frame)>,
    ) -> GraphResult<()> {
        let node = self.node(id)?;
        out.push((id, ctx.frame));
        for (input, c) in node.behavior.input_contexts(node, self, ctx)? {
            self.collect_path(input, &c, out)?;
        }
        Ok(())
    }

    /// Frames of `id` at which `frames` of its input `input_index` appear.
    pub fn map_input_to_eval_frames(
        &self,
        id: NodeId,
        input_index: usize,
        frames: &[Frame],
    ) -> GraphResult<Vec<Frame>> {
        let node = self.node(id)?;
        node.behavior
            .map_input_to_eval_frames(node, self, input_index, frames)
    }

    /// Render the audio window `actx` of the root, clamped to `[-1, 1]`.
    #[tracing::instrument(skip(self), fields(start = actx.start_sample, len = actx.num_samples))]
    pub fn audio_fill_buffer(&self, actx: &AudioContext) -> GraphResult<AudioBuffer> {
        let mut out = AudioBuffer::silent(actx);
        if let Some(root) = self.root {
            self.node_audio_fill(root, actx, &mut out)?;
        }
        clamp_samples(&mut out);
        Ok(out)
    }

    /// Add node `id`'s audio for `actx` into `out`. Returns samples written per channel.
    pub fn node_audio_fill(
        &self,
        id: NodeId,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let node = self.node(id)?;
        node.count_audio_fill();
        node.behavior.audio_fill_buffer(node, self, actx, out)
    }
}
