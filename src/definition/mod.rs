//! Declarative node definitions and the type registry.
//!
//! The set of node types is open: built-in kinds are described by an embedded JSON document and
//! hosts can register more at runtime, each paired with a factory producing its behavior.

use crate::foundation::error::{GraphError, GraphResult};
use crate::node::behavior::NodeBehavior;
use crate::property::{PropertyContainer, PropertyValue};
use std::collections::BTreeMap;
use std::sync::Arc;

const BUILTIN_NODES_JSON: &str = include_str!("builtin_nodes.json");

/// Property schema and capability flags of one node type.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDefinition {
    /// Type name used by [`crate::Graph::new_node`].
    pub type_name: String,
    /// Schema version, passed to `read_completed` when loading older descriptions.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Fewest inputs accepted by a rewire.
    #[serde(default)]
    pub min_inputs: usize,
    /// Most inputs accepted by a rewire; `None` is unbounded.
    #[serde(default)]
    pub max_inputs: Option<usize>,
    /// Instances own a private sub-graph.
    #[serde(default)]
    pub is_group: bool,
    /// The node only changes the placement of its input.
    #[serde(default)]
    pub has_linear_transform: bool,
    /// Restricts input node types when set.
    #[serde(default)]
    pub allowed_input_kinds: Option<Vec<String>>,
    /// Declared properties with their defaults.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

fn default_version() -> u32 {
    1
}

impl NodeDefinition {
    /// Definition with no properties accepting any number of inputs.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            version: 1,
            min_inputs: 0,
            max_inputs: None,
            is_group: false,
            has_linear_transform: false,
            allowed_input_kinds: None,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style input arity.
    pub fn with_inputs(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_inputs = min;
        self.max_inputs = max;
        self
    }

    /// Builder-style property declaration.
    pub fn with_property(mut self, name: impl Into<String>, default: PropertyValue) -> Self {
        self.properties.insert(name.into(), default);
        self
    }

    /// Fresh property container holding the declared defaults.
    pub fn default_properties(&self) -> PropertyContainer {
        PropertyContainer::from_declared(&self.properties)
    }

    /// Check that the definition is self-consistent.
    pub fn validate(&self) -> GraphResult<()> {
        if self.type_name.trim().is_empty() {
            return Err(GraphError::validation("node type name must be non-empty"));
        }
        if let Some(max) = self.max_inputs
            && max < self.min_inputs
        {
            return Err(GraphError::validation(format!(
                "node type '{}' has max_inputs {max} < min_inputs {}",
                self.type_name, self.min_inputs
            )));
        }
        Ok(())
    }

    /// `true` if `count` inputs satisfy the declared arity.
    pub fn accepts_input_count(&self, count: usize) -> bool {
        count >= self.min_inputs && self.max_inputs.is_none_or(|m| count <= m)
    }

    /// `true` if a node of `kind` may be connected as an input.
    pub fn accepts_input_kind(&self, kind: &str) -> bool {
        self.allowed_input_kinds
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|k| k == kind))
    }
}

/// Produces a fresh behavior for a new node instance.
pub type NodeFactory = Arc<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

#[derive(Clone)]
struct RegistryEntry {
    definition: Arc<NodeDefinition>,
    factory: NodeFactory,
}

/// Type name to definition and factory.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeRegistry {
    /// Registry without any types.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in node kind.
    pub fn with_builtins() -> GraphResult<Self> {
        let defs: Vec<NodeDefinition> = serde_json::from_str(BUILTIN_NODES_JSON)?;
        let mut reg = Self::empty();
        for def in defs {
            let factory = crate::node::kinds::builtin_factory(&def.type_name).ok_or_else(|| {
                GraphError::validation(format!(
                    "built-in definition '{}' has no behavior",
                    def.type_name
                ))
            })?;
            reg.register(def, factory)?;
        }
        Ok(reg)
    }

    /// Add or replace a type.
    pub fn register(&mut self, definition: NodeDefinition, factory: NodeFactory) -> GraphResult<()> {
        definition.validate()?;
        tracing::debug!(type_name = %definition.type_name, "registering node type");
        self.entries.insert(
            definition.type_name.clone(),
            RegistryEntry {
                definition: Arc::new(definition),
                factory,
            },
        );
        Ok(())
    }

    /// Parse a JSON definition and register it with `factory`.
    pub fn register_json(&mut self, json: &str, factory: NodeFactory) -> GraphResult<()> {
        let def: NodeDefinition = serde_json::from_str(json)?;
        self.register(def, factory)
    }

    /// Definition of `type_name`.
    pub fn definition(&self, type_name: &str) -> Option<&Arc<NodeDefinition>> {
        self.entries.get(type_name).map(|e| &e.definition)
    }

    /// `true` if `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Definition plus a freshly constructed behavior.
    pub fn instantiate(
        &self,
        type_name: &str,
    ) -> GraphResult<(Arc<NodeDefinition>, Box<dyn NodeBehavior>)> {
        let entry = self
            .entries
            .get(type_name)
            .ok_or_else(|| GraphError::not_found(format!("node type '{type_name}'")))?;
        Ok((Arc::clone(&entry.definition), (entry.factory)()))
    }

    /// Registered type names in sorted order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no type is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/definition/registry.rs"]
mod tests;
