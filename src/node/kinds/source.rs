use crate::audio::buffer::AudioBuffer;
use crate::audio::mix::frame_to_sample;
use crate::cache::buffer::CacheKey;
use crate::eval::context::{AudioContext, Context};
use crate::foundation::core::{Eye, Frame, ImageComponent};
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::{ImageId, ImageNode};
use crate::image::identifier::IdentifierNode;
use crate::media::MediaInfo;
use crate::node::Node;
use crate::node::behavior::{InputContexts, Invalidation, NodeBehavior};
use crate::node::info::{RangeInfo, StructureInfo};
use crate::node::scope::EvalCall;
use crate::shader::expr::Expr;

pub(crate) const PATH: &str = "media.path";
pub(crate) const VIEW: &str = "media.view";
pub(crate) const CUT_IN: &str = "cut.in";
pub(crate) const CUT_OUT: &str = "cut.out";
pub(crate) const VOLUME: &str = "audio.volume";
pub(crate) const PIXEL_ASPECT: &str = "image.pixelAspect";

/// Leaf reading frames and audio from the media boundary.
///
/// Decoded frames are shared through the frame-buffer cache and owned by this node, so changing
/// the media path flushes them.
#[derive(Debug, Default)]
pub(crate) struct ImageSource;

impl ImageSource {
    fn path(node: &Node) -> GraphResult<&str> {
        let p = node.properties().string_or(PATH, "");
        if p.is_empty() {
            return Err(GraphError::evaluation(node.name(), "no media path set"));
        }
        Ok(p)
    }

    fn range_of(node: &Node, info: &MediaInfo) -> RangeInfo {
        let props = node.properties();
        let cut_in = props
            .ints(CUT_IN)
            .first()
            .copied()
            .unwrap_or(info.start)
            .clamp(info.start, info.end);
        let cut_out = props
            .ints(CUT_OUT)
            .first()
            .copied()
            .unwrap_or(info.end)
            .clamp(cut_in, info.end);
        RangeInfo {
            cut_in,
            cut_out,
            ..RangeInfo::new(cut_in, cut_out, info.fps)
        }
    }

    fn view(node: &Node, info: &MediaInfo, ctx: &Context) -> Option<String> {
        let explicit = node.properties().string_or(VIEW, "");
        if !explicit.is_empty() {
            return Some(explicit.to_owned());
        }
        match &ctx.component {
            ImageComponent::View(v)
            | ImageComponent::Layer { view: v, .. }
            | ImageComponent::Channel { view: v, .. } => return Some(v.clone()),
            ImageComponent::None => {}
        }
        match ctx.eye {
            Eye::Right => info.views.get(1).or(info.views.first()).cloned(),
            Eye::Left | Eye::Either => info.views.first().cloned(),
        }
    }

    /// Frame and view actually read for `ctx`.
    fn resolve(node: &Node, graph: &Graph, ctx: &Context) -> GraphResult<(Frame, Option<String>)> {
        let info = graph.media().info(Self::path(node)?)?;
        let frame = Self::range_of(node, &info).frames().clamp(ctx.frame);
        Ok((frame, Self::view(node, &info, ctx)))
    }
}

impl NodeBehavior for ImageSource {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        if ctx.allow_missing && Self::path(node).is_err() {
            return Ok(call.arena_mut().no_image(Some(node.id())));
        }
        let path = Self::path(node)?;
        let (frame, view) = Self::resolve(node, call.graph(), ctx)?;
        let key = CacheKey::new(format!(
            "{}/{path}@{frame}:{}",
            node.name(),
            view.as_deref().unwrap_or("")
        ));
        let fb = match call.checkout(&key, node.id()) {
            Some(fb) => fb,
            None => {
                let buffer = call.media().read_frame(path, frame, view.as_deref())?;
                call.insert(key, node.id(), buffer)
            }
        };

        let mut img = ImageNode::blend(fb.buffer().width(), fb.buffer().height(), Some(node.id()));
        img.pixel_aspect = node.properties().float_or(PIXEL_ASPECT, 1.0);
        img.tags.insert("source.frame".to_owned(), frame.to_string());
        img.buffer = Some(fb);
        let arena = call.arena_mut();
        let id = arena.alloc(img);
        arena.get_mut(id).set_shader(Expr::source(id))?;
        Ok(id)
    }

    fn input_contexts(
        &self,
        _node: &Node,
        _graph: &Graph,
        _ctx: &Context,
    ) -> GraphResult<InputContexts> {
        Ok(InputContexts::new())
    }

    fn evaluate_identifier(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<IdentifierNode> {
        if ctx.allow_missing && Self::path(node).is_err() {
            return Ok(IdentifierNode::leaf("no-image"));
        }
        let (frame, view) = Self::resolve(node, graph, ctx)?;
        Ok(IdentifierNode::leaf(format!(
            "{}@{frame}:{}",
            node.settings_id(),
            view.unwrap_or_default()
        )))
    }

    fn image_range_info(&self, node: &Node, graph: &Graph) -> GraphResult<RangeInfo> {
        let Ok(path) = Self::path(node) else {
            return Ok(RangeInfo::placeholder(graph.opts().default_view.fps));
        };
        let info = graph.media().info(path)?;
        Ok(Self::range_of(node, &info))
    }

    fn image_structure_info(
        &self,
        node: &Node,
        graph: &Graph,
        _ctx: &Context,
    ) -> GraphResult<StructureInfo> {
        let Ok(path) = Self::path(node) else {
            return Ok(graph.default_structure());
        };
        let info = graph.media().info(path)?;
        Ok(StructureInfo {
            pixel_aspect: node.properties().float_or(PIXEL_ASPECT, 1.0),
            ..StructureInfo::new(info.width, info.height, info.bit_depth)
        })
    }

    fn property_changed(&self, _node: &Node, name: &str) -> Invalidation {
        match name {
            PATH | VIEW => Invalidation::Flush,
            _ => Invalidation::Descriptors,
        }
    }

    fn audio_fill_buffer(
        &self,
        node: &Node,
        graph: &Graph,
        actx: &AudioContext,
        out: &mut AudioBuffer,
    ) -> GraphResult<usize> {
        let Ok(path) = Self::path(node) else {
            return Ok(0);
        };
        let info = graph.media().info(path)?;
        if !info.has_audio {
            return Ok(0);
        }
        let range = Self::range_of(node, &info);
        let rate = actx.sample_rate;
        let offset = frame_to_sample(i64::from(range.start - info.start), info.fps, rate);
        let end = frame_to_sample(i64::from(range.len_frames()), info.fps, rate);
        let audible = (end - actx.start_sample).clamp(0, actx.num_samples as i64) as usize;
        if audible == 0 {
            return Ok(0);
        }

        let mut tmp = AudioBuffer::silent(actx);
        let read = graph.media().read_audio(
            path,
            actx.start_sample + offset,
            &mut tmp.samples,
            actx.channels,
            rate,
        )?;
        let volume = node.properties().float_or(VOLUME, 1.0);
        let ch = usize::from(actx.channels.max(1));
        for (d, s) in out
            .samples
            .iter_mut()
            .zip(&tmp.samples)
            .take(audible * ch)
        {
            *d += *s * volume;
        }
        Ok(read.min(audible))
    }
}
