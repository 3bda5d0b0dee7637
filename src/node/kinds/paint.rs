use crate::eval::context::Context;
use crate::foundation::core::Frame;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::image::arena::ImageId;
use crate::image::identifier::IdentifierNode;
use crate::image::paint::{PaintCommand, PaintEntry};
use crate::node::Node;
use crate::node::behavior::NodeBehavior;
use crate::node::scope::EvalCall;

pub(crate) const PAINT_ACTIVE: &str = "paint.active";
pub(crate) const ENTRIES: &str = "paint.entries";

/// Attach `commands` to `child`. Empty images take no paint.
fn attach(call: &mut EvalCall<'_>, child: ImageId, commands: Vec<PaintCommand>) -> ImageId {
    let img = call.arena_mut().get_mut(child);
    if !img.is_no_image() {
        img.paint.extend(commands);
    }
    child
}

/// Frame-ranged annotations stored as JSON entries in `paint.entries`.
#[derive(Debug, Default)]
pub(crate) struct Paint;

impl Paint {
    /// Indices and commands of the entries visible on `frame`.
    fn visible(node: &Node, frame: Frame) -> GraphResult<Vec<(usize, PaintCommand)>> {
        if !node.properties().flag(PAINT_ACTIVE, true) {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for (i, s) in node.properties().strings(ENTRIES).iter().enumerate() {
            let entry = PaintEntry::from_json_str(s)
                .map_err(|e| GraphError::evaluation(node.name(), format!("entry {i}: {e}")))?;
            if entry.visible_on(frame) {
                out.push((i, entry.command));
            }
        }
        Ok(out)
    }
}

impl NodeBehavior for Paint {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let commands = Self::visible(node, ctx.frame)?
            .into_iter()
            .map(|(_, c)| c)
            .collect();
        Ok(attach(call, child, commands))
    }

    fn evaluate_identifier(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &Context,
    ) -> GraphResult<IdentifierNode> {
        let shown: Vec<String> = Self::visible(node, ctx.frame)?
            .iter()
            .map(|(i, _)| i.to_string())
            .collect();
        let children = match node.inputs().first() {
            Some(&input) => vec![graph.node_identifier(input, ctx)?],
            None => Vec::new(),
        };
        Ok(IdentifierNode::with_children(
            format!("{}|{}", node.settings_id(), shown.join(",")),
            children,
        ))
    }
}

pub(crate) const OVERLAY_ACTIVE: &str = "overlay.active";
pub(crate) const RECTS: &str = "overlay.rects";
pub(crate) const TEXT: &str = "overlay.text";
pub(crate) const TEXT_ORIGIN: &str = "overlay.textOrigin";
pub(crate) const TEXT_SIZE: &str = "overlay.textSize";
pub(crate) const TEXT_COLOR: &str = "overlay.textColor";

/// Floats per rectangle in `overlay.rects`: corners then straight RGBA.
const RECT_STRIDE: usize = 8;

/// Static rectangles and text lines drawn over the input.
#[derive(Debug, Default)]
pub(crate) struct Overlay;

impl Overlay {
    pub(crate) fn commands(node: &Node) -> GraphResult<Vec<PaintCommand>> {
        let p = node.properties();
        if !p.flag(OVERLAY_ACTIVE, true) {
            return Ok(Vec::new());
        }
        let rects = p.floats(RECTS);
        if rects.len() % RECT_STRIDE != 0 {
            return Err(GraphError::evaluation(
                node.name(),
                format!("{RECTS} holds {} floats, not a multiple of {RECT_STRIDE}", rects.len()),
            ));
        }
        let mut out: Vec<PaintCommand> = rects
            .chunks_exact(RECT_STRIDE)
            .map(|r| PaintCommand::Rect {
                min: [r[0], r[1]],
                max: [r[2], r[3]],
                color: [r[4], r[5], r[6], r[7]],
            })
            .collect();

        let origin = match p.floats(TEXT_ORIGIN) {
            [x, y, ..] => [*x, *y],
            _ => [0.05, 0.05],
        };
        let size = p.float_or(TEXT_SIZE, 0.04);
        let color = match p.floats(TEXT_COLOR) {
            [r, g, b, a, ..] => [*r, *g, *b, *a],
            _ => [1.0; 4],
        };
        for (line, text) in p.strings(TEXT).iter().enumerate() {
            out.push(PaintCommand::Text {
                origin: [origin[0], origin[1] + line as f32 * size * 1.2],
                text: text.clone(),
                size,
                color,
            });
        }
        Ok(out)
    }
}

impl NodeBehavior for Overlay {
    fn evaluate(&self, node: &Node, call: &mut EvalCall<'_>, ctx: &Context) -> GraphResult<ImageId> {
        let child = call.evaluate_input(node, 0, ctx)?;
        let commands = Self::commands(node)?;
        Ok(attach(call, child, commands))
    }
}
