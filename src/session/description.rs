use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::graph::Graph;
use crate::group::GroupState;
use crate::property::PropertyValue;
use std::collections::BTreeMap;

/// Format version written by [`Graph::save_description`].
pub const DESCRIPTION_VERSION: u32 = 1;

fn one() -> u32 {
    1
}

/// Serializable snapshot of a graph's top-level nodes, their wiring and their properties.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphDescription {
    /// Format version.
    #[serde(default = "one")]
    pub version: u32,
    /// Name of the root node.
    #[serde(default)]
    pub root: Option<String>,
    /// Top-level nodes in name order.
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
}

/// One top-level node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDescription {
    /// Unique node name.
    pub name: String,
    /// Registered type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Version of the type the properties were written with.
    #[serde(default = "one")]
    pub version: u32,
    /// Input node names in order.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Property values.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Fixed internal members of a group, by role. Members of nested groups use dotted roles.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub members: BTreeMap<String, MemberDescription>,
    /// Per-input chains of a group, in input order, adaptor first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<Vec<MemberDescription>>,
}

/// Properties of one internal node of a group.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MemberDescription {
    /// Registered type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Version of the type the properties were written with.
    #[serde(default = "one")]
    pub version: u32,
    /// Property values.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl GraphDescription {
    /// Parse from JSON.
    pub fn from_json_str(s: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Graph {
    /// Snapshot every top-level node. Each node's write hooks run around the copy of its
    /// properties, so transient properties appear in the description only.
    pub fn save_description(&mut self) -> GraphResult<GraphDescription> {
        let ids: Vec<NodeId> = self
            .nodes()
            .filter(|n| n.group().is_none())
            .map(|n| n.id())
            .collect();
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let (name, type_name, version, inputs, state) = {
                let node = self.node(id)?;
                let inputs = node
                    .inputs()
                    .iter()
                    .map(|&i| self.node(i).map(|n| n.name().to_owned()))
                    .collect::<GraphResult<Vec<_>>>()?;
                (
                    node.name().to_owned(),
                    node.type_name().to_owned(),
                    node.definition().version,
                    inputs,
                    node.group_state().cloned(),
                )
            };

            let mut members = BTreeMap::new();
            let mut chains = Vec::new();
            if let Some(state) = state {
                self.describe_members(&state, "", &mut members)?;
                for chain in &state.chains {
                    chains.push(
                        chain
                            .members
                            .iter()
                            .map(|&m| self.describe_member(m))
                            .collect::<GraphResult<Vec<_>>>()?,
                    );
                }
            }

            nodes.push(NodeDescription {
                name,
                type_name,
                version,
                inputs,
                properties: self.write_properties(id)?,
                members,
                chains,
            });
        }

        let root = match self.root() {
            Some(r) => Some(self.node(r)?.name().to_owned()),
            None => None,
        };
        Ok(GraphDescription {
            version: DESCRIPTION_VERSION,
            root,
            nodes,
        })
    }

    /// Recreate the nodes of `desc` inside one edit transaction.
    ///
    /// Properties pass through each kind's `read_completed` upgrade before they are applied.
    /// On failure every node created by this call is deleted again.
    #[tracing::instrument(skip(self, desc), fields(nodes = desc.nodes.len()))]
    pub fn load_description(&mut self, desc: &GraphDescription) -> GraphResult<()> {
        if desc.version > DESCRIPTION_VERSION {
            return Err(GraphError::validation(format!(
                "description version {} is newer than {DESCRIPTION_VERSION}",
                desc.version
            )));
        }
        let mut created = Vec::with_capacity(desc.nodes.len());
        let mut edit = self.edit();
        let r = edit.load_nodes(desc, &mut created);
        if r.is_err() {
            for &id in created.iter().rev() {
                if let Err(e) = edit.delete_node(id) {
                    tracing::debug!(node = %id, error = %e, "cleanup after failed load");
                }
            }
        }
        r
    }

    fn load_nodes(&mut self, desc: &GraphDescription, created: &mut Vec<NodeId>) -> GraphResult<()> {
        let mut ids = Vec::with_capacity(desc.nodes.len());
        for nd in &desc.nodes {
            let id = self.new_node(&nd.type_name, Some(&nd.name))?;
            created.push(id);
            ids.push(id);
        }
        for (nd, &id) in desc.nodes.iter().zip(&ids) {
            self.read_properties(id, &nd.type_name, nd.version, &nd.properties)?;
        }
        for (nd, &id) in desc.nodes.iter().zip(&ids) {
            if nd.inputs.is_empty() {
                continue;
            }
            let inputs = nd
                .inputs
                .iter()
                .map(|n| self.find_node(n))
                .collect::<GraphResult<Vec<_>>>()?;
            self.set_inputs(id, inputs)?;
        }
        for (nd, &id) in desc.nodes.iter().zip(&ids) {
            for (role, m) in &nd.members {
                let member = self.group_member(id, role)?;
                self.read_properties(member, &m.type_name, m.version, &m.properties)?;
            }
            if nd.chains.is_empty() {
                continue;
            }
            let chains = self.group_chains(id)?;
            if chains.len() != nd.chains.len() {
                return Err(GraphError::validation(format!(
                    "group '{}' has {} chains, description has {}",
                    nd.name,
                    chains.len(),
                    nd.chains.len()
                )));
            }
            for (chain, described) in chains.iter().zip(&nd.chains) {
                for (&member, m) in chain.members.iter().zip(described) {
                    self.read_properties(member, &m.type_name, m.version, &m.properties)?;
                }
            }
        }
        if let Some(root) = &desc.root {
            let id = self.find_node(root)?;
            self.set_root(id)?;
        }
        Ok(())
    }

    /// Fixed members of a group, nested groups' members under dotted roles
    /// (`color_pipeline.color`). Parents sort before their nested members, so loading applies a
    /// pipeline's node list before the properties of the nodes it creates.
    fn describe_members(
        &mut self,
        state: &GroupState,
        prefix: &str,
        out: &mut BTreeMap<String, MemberDescription>,
    ) -> GraphResult<()> {
        for (role, &m) in &state.members {
            let path = format!("{prefix}{role}");
            out.insert(path.clone(), self.describe_member(m)?);
            let nested = self.node(m)?.group_state().cloned();
            if let Some(nested) = nested {
                self.describe_members(&nested, &format!("{path}."), out)?;
            }
        }
        Ok(())
    }

    fn describe_member(&mut self, id: NodeId) -> GraphResult<MemberDescription> {
        let (type_name, version) = {
            let n = self.node(id)?;
            (n.type_name().to_owned(), n.definition().version)
        };
        Ok(MemberDescription {
            type_name,
            version,
            properties: self.write_properties(id)?,
        })
    }

    fn write_properties(&mut self, id: NodeId) -> GraphResult<BTreeMap<String, PropertyValue>> {
        let node = self.node_mut(id)?;
        let r = node
            .behavior
            .prepare_for_write(&mut node.properties)
            .map(|()| node.properties.as_map().clone());
        node.behavior.write_completed(&mut node.properties);
        r
    }

    fn read_properties(
        &mut self,
        id: NodeId,
        type_name: &str,
        version: u32,
        values: &BTreeMap<String, PropertyValue>,
    ) -> GraphResult<()> {
        let updates = {
            let node = self.node(id)?;
            if node.type_name() != type_name {
                return Err(GraphError::validation(format!(
                    "node '{}' is a {}, description says {type_name}",
                    node.name(),
                    node.type_name()
                )));
            }
            let mut props = node.definition().default_properties();
            for (k, v) in values {
                props.declare(k.clone(), v.clone());
            }
            node.behavior.read_completed(&mut props, type_name, version)?;

            let mut updates = Vec::with_capacity(props.len());
            for (k, v) in props.iter() {
                if node.properties().contains(k) {
                    updates.push((k.to_owned(), v.clone()));
                } else {
                    tracing::warn!(node = node.name(), property = k, "ignoring undeclared property");
                }
            }
            updates
        };
        for (k, v) in updates {
            self.set_property(id, &k, v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/description.rs"]
mod tests;
