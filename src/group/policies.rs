//! Sub-graph layouts of the built-in group kinds.

use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::group::{GroupBuilder, SubGraphChain, SubGraphPolicy};
use crate::property::PropertyValue;
use std::collections::BTreeMap;

/// Adaptor for external input `index` followed by `rest`, each node reading the previous one.
fn adaptor_chain(
    b: &mut GroupBuilder<'_>,
    index: usize,
    input: NodeId,
    rest: &[&str],
) -> GraphResult<SubGraphChain> {
    let adaptor = b.add_adaptor(index)?;
    let mut members = vec![adaptor];
    let mut head = adaptor;
    for ty in rest {
        let id = b.add_chain_node(ty)?;
        b.connect(id, vec![head])?;
        members.push(id);
        head = id;
    }
    Ok(SubGraphChain {
        input,
        adaptor,
        head,
        members,
    })
}

/// Node types of a pipeline group, upstream first.
pub(crate) const PIPELINE_NODES: &str = "pipeline.nodes";

/// Role of the `n`th member of type `ty` in a pipeline: `color`, `color2`, ...
fn pipeline_role(ty: &str, n: usize) -> String {
    let mut chars = ty.chars();
    let base: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
    if n == 1 { base } else { format!("{base}{n}") }
}

/// Single-input chain of the node types listed in `pipeline.nodes`. Editing the list rebuilds
/// the chain in place; the external input and every consumer of the group stay connected.
#[derive(Debug, Default)]
pub(crate) struct PipelineGroupPolicy;

impl SubGraphPolicy for PipelineGroupPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let types = b.group_strings(PIPELINE_NODES)?;
        if types.is_empty() {
            let passthrough = b.add_member("passthrough", "Adaptor")?;
            b.set_adaptor_index(passthrough, 0)?;
            return b.set_root(passthrough);
        }
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        let mut prev: Option<NodeId> = None;
        for ty in &types {
            let n = seen.entry(ty.as_str()).or_default();
            *n += 1;
            let id = b.add_member(&pipeline_role(ty, *n), ty)?;
            if let Some(p) = prev {
                b.connect(id, vec![p])?;
            }
            prev = Some(id);
        }
        match prev {
            Some(root) => b.set_root(root),
            None => Err(GraphError::validation("pipeline has no members")),
        }
    }

    fn connect_chains(&self, b: &mut GroupBuilder<'_>, heads: &[NodeId]) -> GraphResult<()> {
        let types = b.group_strings(PIPELINE_NODES)?;
        let Some(first) = types.first() else {
            return Ok(());
        };
        let first = b.member(&pipeline_role(first, 1))?;
        b.connect(first, heads.to_vec())
    }

    fn rebuilds_on(&self, property: &str) -> bool {
        property == PIPELINE_NODES
    }
}

/// Media source pipeline: source, linearize, color, LUT, transform, format, paint.
///
/// The linearize and color stages are pipeline groups so their node lists can be edited.
#[derive(Debug, Default)]
pub(crate) struct SourceGroupPolicy;

/// Roles of the source pipeline, upstream first.
pub(crate) const SOURCE_ROLES: [(&str, &str); 7] = [
    ("source", "ImageSource"),
    ("linearize_pipeline", "PipelineGroup"),
    ("color_pipeline", "PipelineGroup"),
    ("lut", "Lut"),
    ("transform", "Transform2D"),
    ("format", "Format"),
    ("paint", "Paint"),
];

/// Default node lists of the source pipeline's pipeline groups.
const SOURCE_PIPELINES: [(&str, &str); 2] = [
    ("linearize_pipeline", "Linearize"),
    ("color_pipeline", "Color"),
];

impl SubGraphPolicy for SourceGroupPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let mut prev: Option<NodeId> = None;
        for (role, ty) in SOURCE_ROLES {
            let id = b.add_member(role, ty)?;
            if let Some((_, stage)) = SOURCE_PIPELINES.iter().find(|(r, _)| *r == role) {
                b.set_property(id, PIPELINE_NODES, PropertyValue::string(*stage))?;
            }
            if let Some(p) = prev {
                b.connect(id, vec![p])?;
            }
            prev = Some(id);
        }
        match prev {
            Some(root) => b.set_root(root),
            None => Err(GraphError::validation("source group has no members")),
        }
    }

    fn new_sub_graph_for_input(
        &self,
        _b: &mut GroupBuilder<'_>,
        _index: usize,
        _input: NodeId,
    ) -> GraphResult<SubGraphChain> {
        Err(GraphError::validation("source groups take no inputs"))
    }

    fn connect_chains(&self, _b: &mut GroupBuilder<'_>, _heads: &[NodeId]) -> GraphResult<()> {
        Ok(())
    }
}

/// Sequence of inputs, each retimed to the sequence rate.
#[derive(Debug, Default)]
pub(crate) struct SequenceGroupPolicy;

impl SubGraphPolicy for SequenceGroupPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let root = b.add_member("sequence", "Sequence")?;
        b.set_root(root)
    }

    fn new_sub_graph_for_input(
        &self,
        b: &mut GroupBuilder<'_>,
        index: usize,
        input: NodeId,
    ) -> GraphResult<SubGraphChain> {
        adaptor_chain(b, index, input, &["Retime"])
    }
}

/// Stack of inputs, each with its own placement and retime.
#[derive(Debug, Default)]
pub(crate) struct StackGroupPolicy;

impl SubGraphPolicy for StackGroupPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let root = b.add_member("stack", "Stack")?;
        b.set_root(root)
    }

    fn new_sub_graph_for_input(
        &self,
        b: &mut GroupBuilder<'_>,
        index: usize,
        input: NodeId,
    ) -> GraphResult<SubGraphChain> {
        adaptor_chain(b, index, input, &["Transform2D", "Retime"])
    }
}

/// Switch between inputs.
#[derive(Debug, Default)]
pub(crate) struct SwitchGroupPolicy;

impl SubGraphPolicy for SwitchGroupPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let root = b.add_member("switch", "Switch")?;
        b.set_root(root)
    }
}

/// Display pipeline: soundtrack, stereo, display transform.
#[derive(Debug, Default)]
pub(crate) struct DisplayGroupPolicy;

impl SubGraphPolicy for DisplayGroupPolicy {
    fn build_fixed(&self, b: &mut GroupBuilder<'_>) -> GraphResult<()> {
        let soundtrack = b.add_member("soundtrack", "SoundTrack")?;
        let stereo = b.add_member("stereo", "DisplayStereo")?;
        let display = b.add_member("display", "Display")?;
        b.connect(stereo, vec![soundtrack])?;
        b.connect(display, vec![stereo])?;
        b.set_root(display)
    }

    fn connect_chains(&self, b: &mut GroupBuilder<'_>, heads: &[NodeId]) -> GraphResult<()> {
        let soundtrack = b.member("soundtrack")?;
        b.connect(soundtrack, heads.to_vec())
    }
}
