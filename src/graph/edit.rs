use super::{Graph, Slot};
use crate::foundation::core::NodeId;
use crate::foundation::error::{GraphError, GraphResult};
use crate::group::{GroupBuilder, GroupState, SubGraphChain, SubGraphPolicy};
use crate::node::Node;
use crate::node::behavior::Invalidation;
use crate::property::PropertyValue;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

/// RAII bracket around a batch of structural edits.
///
/// Dereferences to the [`Graph`]; dropping the guard ends the edit and, if it was the outermost
/// one, runs a single invalidation pass.
pub struct GraphEdit<'a> {
    graph: &'a mut Graph,
}

impl std::ops::Deref for GraphEdit<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl std::ops::DerefMut for GraphEdit<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for GraphEdit<'_> {
    fn drop(&mut self) {
        self.graph.end_graph_edit();
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Graph {
    /// Open a (possibly nested) edit transaction.
    pub fn begin_graph_edit(&mut self) {
        self.edit.depth += 1;
    }

    /// Close a transaction. The outermost close forwards invalidation to dependents of every
    /// node touched inside the bracket, in one pass.
    pub fn end_graph_edit(&mut self) {
        if self.edit.depth == 0 {
            tracing::warn!("end_graph_edit without a matching begin_graph_edit");
            return;
        }
        self.edit.depth -= 1;
        if self.edit.depth == 0 && !self.edit.pending.is_empty() {
            let seeds = std::mem::take(&mut self.edit.pending);
            self.propagate(&seeds);
        }
    }

    /// Open a transaction closed when the returned guard drops.
    pub fn edit(&mut self) -> GraphEdit<'_> {
        self.begin_graph_edit();
        GraphEdit { graph: self }
    }

    /// `true` while a transaction is open.
    pub fn in_graph_edit(&self) -> bool {
        self.edit.depth > 0
    }

    fn with_edit<T>(&mut self, f: impl FnOnce(&mut Self) -> GraphResult<T>) -> GraphResult<T> {
        self.begin_graph_edit();
        let r = f(self);
        self.end_graph_edit();
        r
    }

    /// Mark `id` dirty now; its dependents are notified when the outermost edit closes.
    pub(crate) fn touch(&mut self, id: NodeId) {
        if let Ok(n) = self.node_mut(id) {
            n.mark_dirty();
            self.edit.pending.insert(id);
        }
    }

    fn propagate(&mut self, seeds: &BTreeSet<NodeId>) {
        let mut queue: VecDeque<NodeId> = seeds.iter().copied().collect();
        let mut notified = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if !notified.insert(id) {
                continue;
            }
            let Ok(node) = self.node_mut(id) else {
                continue;
            };
            node.mark_dirty();
            queue.extend(node.outputs.iter().copied());
            if let Some(state) = &node.group_state {
                queue.extend(state.all_members());
            }
        }
        self.stats.propagation_passes += 1;
        self.stats.edit_notifications += notified.len() as u64;
        tracing::debug!(
            seeds = seeds.len(),
            notified = notified.len(),
            "propagated descriptor invalidation"
        );
    }

    /// Create a top-level node of `type_name`. Without a name, one is generated from the type.
    pub fn new_node(&mut self, type_name: &str, name: Option<&str>) -> GraphResult<NodeId> {
        self.with_edit(|g| {
            let name = match name {
                Some(n) if n.trim().is_empty() => {
                    return Err(GraphError::validation("node name must be non-empty"));
                }
                Some(n) if g.names.contains_key(n) => {
                    return Err(GraphError::validation(format!(
                        "node name '{n}' is already in use"
                    )));
                }
                Some(n) => n.to_owned(),
                None => g.unique_name(type_name),
            };
            let id = g.create_node(type_name, name.clone(), None)?;
            g.names.insert(name, id);
            Ok(id)
        })
    }

    pub(crate) fn create_internal(
        &mut self,
        group: NodeId,
        role: &str,
        type_name: &str,
    ) -> GraphResult<NodeId> {
        let name = format!("{}_{role}", self.node(group)?.name());
        self.create_node(type_name, name, Some(group))
    }

    pub(crate) fn next_internal_role(&mut self, type_name: &str) -> String {
        self.name_serial += 1;
        format!("{}{:06}", lower_first(type_name), self.name_serial)
    }

    fn unique_name(&mut self, type_name: &str) -> String {
        loop {
            let n = self.next_internal_role(type_name);
            if !self.names.contains_key(&n) {
                return n;
            }
        }
    }

    fn alloc_slot(&mut self) -> NodeId {
        if let Some(index) = self.free.pop() {
            NodeId::new(index, self.slots[index as usize].generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::default());
            NodeId::new(index, 0)
        }
    }

    fn create_node(
        &mut self,
        type_name: &str,
        name: String,
        group: Option<NodeId>,
    ) -> GraphResult<NodeId> {
        let (definition, behavior) = self.registry.instantiate(type_name)?;
        let is_group = definition.is_group;
        let policy = behavior.sub_graph_policy();
        let id = self.alloc_slot();
        self.slots[id.index as usize].node = Some(Node::new(id, name, definition, behavior, group));
        self.stats.nodes_created += 1;
        self.touch(id);
        if is_group && let Err(e) = self.build_group(id, policy) {
            self.destroy(id);
            return Err(e);
        }
        Ok(id)
    }

    fn build_group(
        &mut self,
        id: NodeId,
        policy: Option<Arc<dyn SubGraphPolicy>>,
    ) -> GraphResult<()> {
        let Some(policy) = policy else {
            let ty = self.node(id)?.type_name().to_owned();
            return Err(GraphError::validation(format!(
                "group type '{ty}' has no sub-graph policy"
            )));
        };
        self.node_mut(id)?.group_state = Some(GroupState::new(Arc::clone(&policy)));
        policy.build_fixed(&mut GroupBuilder::new(self, id))?;
        self.group_root(id)?;
        Ok(())
    }

    pub(crate) fn set_group_root(&mut self, group: NodeId, root: NodeId) -> GraphResult<()> {
        if self.node(root)?.group() != Some(group) {
            return Err(GraphError::validation(format!(
                "node {root} is not a member of group {group}"
            )));
        }
        let old = self.group_state_mut(group)?.root.replace(root);
        if let Some(old) = old
            && let Ok(n) = self.node_mut(old)
        {
            n.outputs.retain(|&o| o != group);
        }
        let n = self.node_mut(root)?;
        if !n.outputs.contains(&group) {
            n.outputs.push(group);
        }
        self.touch(group);
        Ok(())
    }

    /// Remove the slot of `id` and everything a group owns, detaching every edge. Returns the
    /// removed ids.
    fn destroy(&mut self, id: NodeId) -> BTreeSet<NodeId> {
        let mut removed = BTreeSet::new();
        let Ok(node) = self.node(id) else {
            return removed;
        };
        let members = node
            .group_state()
            .map(GroupState::all_members)
            .unwrap_or_default();
        for m in members {
            removed.extend(self.destroy(m));
        }

        let slot = &mut self.slots[id.index as usize];
        let Some(node) = slot.node.take() else {
            return removed;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        for i in &node.inputs {
            if let Ok(n) = self.node_mut(*i) {
                n.outputs.retain(|&o| o != id);
            }
        }
        for &o in &node.outputs {
            if let Ok(n) = self.node_mut(o) {
                n.inputs.retain(|&x| x != id);
            }
            self.touch(o);
        }
        self.stats.nodes_deleted += 1;
        removed.insert(id);
        removed
    }

    /// Delete a top-level node. Consumers lose it as an input with their remaining inputs kept
    /// in order; cache entries owned by the node (or its group members) are evicted.
    pub fn delete_node(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self.node(id)?;
        if let Some(group) = node.group() {
            return Err(GraphError::validation(format!(
                "node '{}' is owned by group {group}",
                node.name()
            )));
        }
        let name = node.name().to_owned();
        let consumers = node.outputs().to_vec();
        self.with_edit(|g| {
            let removed = g.destroy(id);
            g.names.remove(&name);
            if g.root == Some(id) {
                g.root = None;
            }
            for c in consumers {
                if g.node(c).is_ok_and(Node::is_group) {
                    g.rebuild_group_chains(c)?;
                }
            }
            let evicted = g.cache.flush_owned_by(&removed);
            tracing::debug!(node = %name, removed = removed.len(), evicted, "deleted node");
            Ok(())
        })
    }

    /// Make `id` the node evaluated by [`Graph::evaluate`].
    pub fn set_root(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self.node(id)?;
        if node.group().is_some() {
            return Err(GraphError::validation(format!(
                "internal node '{}' cannot be the graph root",
                node.name()
            )));
        }
        self.root = Some(id);
        Ok(())
    }

    fn validate_rewire(&self, id: NodeId, inputs: &[NodeId], check_min: bool) -> GraphResult<()> {
        let node = self.node(id)?;
        let def = node.definition();
        let fail = |msg: String| GraphError::rewire(node.name(), msg);

        let count_ok = if check_min {
            def.accepts_input_count(inputs.len())
        } else {
            def.max_inputs.is_none_or(|m| inputs.len() <= m)
        };
        if !count_ok {
            let max = def
                .max_inputs
                .map_or_else(|| "unbounded".to_owned(), |m| m.to_string());
            return Err(fail(format!(
                "{} inputs given, '{}' accepts {}..{max}",
                inputs.len(),
                def.type_name,
                def.min_inputs
            )));
        }

        for &input in inputs {
            let Ok(inp) = self.node(input) else {
                return Err(fail(format!("input {input} does not exist")));
            };
            if !def.accepts_input_kind(inp.type_name()) {
                return Err(fail(format!(
                    "input '{}' of type '{}' is not accepted",
                    inp.name(),
                    inp.type_name()
                )));
            }
            if inp.group() != node.group() {
                return Err(fail(format!(
                    "input '{}' belongs to a different group",
                    inp.name()
                )));
            }
            if input == id || self.upstream_subtree(input).contains(&id) {
                return Err(fail(format!(
                    "connecting '{}' would create a cycle",
                    inp.name()
                )));
            }
        }

        node.behavior
            .test_inputs(node, self, inputs)
            .map_err(|e| match e {
                GraphError::Rewire { .. } => e,
                other => fail(other.to_string()),
            })
    }

    /// Move the output back-references of `id` from `old` inputs to `new` ones.
    fn relink_outputs(&mut self, id: NodeId, old: &[NodeId], new: &[NodeId]) {
        for o in old.iter().filter(|o| !new.contains(o)) {
            if let Ok(n) = self.node_mut(*o) {
                n.outputs.retain(|&x| x != id);
            }
        }
        for &i in new {
            if let Ok(n) = self.node_mut(i)
                && !n.outputs.contains(&id)
            {
                n.outputs.push(id);
            }
        }
    }

    /// Install `inputs` on `id`. A group whose chains cannot follow the new inputs gets its old
    /// inputs, back-references and chains back before the error is returned.
    fn apply_rewire(&mut self, id: NodeId, inputs: Vec<NodeId>) -> GraphResult<()> {
        let node = self.node_mut(id)?;
        let is_group = node.group_state.is_some();
        let old = std::mem::replace(&mut node.inputs, inputs.clone());
        self.relink_outputs(id, &old, &inputs);
        self.touch(id);
        if !is_group {
            return Ok(());
        }
        if let Err(e) = self.rebuild_group_chains(id) {
            self.node_mut(id)?.inputs = old.clone();
            self.relink_outputs(id, &inputs, &old);
            if let Err(again) = self.rebuild_group_chains(id) {
                tracing::warn!(node = %id, error = %again, "group chains not restored after failed rewire");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Replace the inputs of `id`. Rejected before anything changes when the list violates
    /// the node's arity, accepted input types, group boundary, acyclicity or kind-specific
    /// checks.
    pub fn set_inputs(&mut self, id: NodeId, inputs: Vec<NodeId>) -> GraphResult<()> {
        self.with_edit(|g| {
            g.validate_rewire(id, &inputs, true)?;
            g.apply_rewire(id, inputs)
        })
    }

    /// Add `input` after the existing inputs.
    pub fn append_input(&mut self, id: NodeId, input: NodeId) -> GraphResult<()> {
        let mut inputs = self.node(id)?.inputs.clone();
        inputs.push(input);
        self.set_inputs(id, inputs)
    }

    /// Insert `input` at `index`, shifting later inputs.
    pub fn insert_input(&mut self, id: NodeId, index: usize, input: NodeId) -> GraphResult<()> {
        let node = self.node(id)?;
        if index > node.inputs.len() {
            return Err(GraphError::rewire(
                node.name(),
                format!("insert index {index} is past {} inputs", node.inputs.len()),
            ));
        }
        let mut inputs = node.inputs.clone();
        inputs.insert(index, input);
        self.set_inputs(id, inputs)
    }

    /// Remove input `index`; the remaining inputs keep their order. Returns the removed input.
    pub fn remove_input(&mut self, id: NodeId, index: usize) -> GraphResult<NodeId> {
        let node = self.node(id)?;
        if index >= node.inputs.len() {
            return Err(GraphError::rewire(
                node.name(),
                format!("no input at index {index}"),
            ));
        }
        let mut inputs = node.inputs.clone();
        let removed = inputs.remove(index);
        self.set_inputs(id, inputs)?;
        Ok(removed)
    }

    /// Remove every input. Allowed regardless of the declared minimum.
    pub fn disconnect_inputs(&mut self, id: NodeId) -> GraphResult<()> {
        self.with_edit(|g| {
            g.validate_rewire(id, &[], false)?;
            g.apply_rewire(id, Vec::new())
        })
    }

    /// Keep a group's per-input chains in step with its external inputs: chains of inputs that
    /// are still connected are adapted in place, new inputs get new chains, and chains of
    /// removed inputs are destroyed.
    fn rebuild_group_chains(&mut self, group: NodeId) -> GraphResult<()> {
        let inputs = self.node(group)?.inputs.clone();
        let state = self.group_state_mut(group)?;
        let policy = Arc::clone(&state.policy);
        let mut stale = std::mem::take(&mut state.chains);
        let mut chains = Vec::with_capacity(inputs.len());

        let result = self.sync_chains(group, policy.as_ref(), &inputs, &mut stale, &mut chains);
        let state = self.group_state_mut(group)?;
        state.chains = chains;
        if let Err(e) = result {
            state.chains.append(&mut stale);
            return Err(e);
        }
        for chain in stale {
            for m in chain.members {
                self.destroy(m);
            }
        }
        Ok(())
    }

    /// Replace the fixed part of `group` with a fresh build from its policy. Chains and the
    /// group's external wiring are kept; the policy reconnects the chain heads.
    fn rebuild_group_fixed(&mut self, group: NodeId) -> GraphResult<()> {
        let state = self.group_state_mut(group)?;
        let policy = Arc::clone(&state.policy);
        let fixed: Vec<NodeId> = std::mem::take(&mut state.members).into_values().collect();
        if let Some(old_root) = state.root.take()
            && let Ok(n) = self.node_mut(old_root)
        {
            n.outputs.retain(|&o| o != group);
        }
        let mut removed = BTreeSet::new();
        for m in fixed {
            removed.extend(self.destroy(m));
        }
        let evicted = self.cache.flush_owned_by(&removed);
        self.touch(group);

        policy.build_fixed(&mut GroupBuilder::new(self, group))?;
        let heads: Vec<NodeId> = self
            .group_chains(group)?
            .iter()
            .map(|c| c.head)
            .collect();
        policy.connect_chains(&mut GroupBuilder::new(self, group), &heads)?;
        self.group_root(group)?;
        tracing::debug!(group = %group, removed = removed.len(), evicted, "rebuilt group sub-graph");
        Ok(())
    }

    fn sync_chains(
        &mut self,
        group: NodeId,
        policy: &dyn SubGraphPolicy,
        inputs: &[NodeId],
        stale: &mut Vec<SubGraphChain>,
        chains: &mut Vec<SubGraphChain>,
    ) -> GraphResult<()> {
        let mut b = GroupBuilder::new(self, group);
        for (index, &input) in inputs.iter().enumerate() {
            match stale.iter().position(|c| c.input == input) {
                Some(pos) => {
                    let chain = stale.remove(pos);
                    policy.modify_sub_graph_for_input(&mut b, index, &chain)?;
                    chains.push(chain);
                }
                None => chains.push(policy.new_sub_graph_for_input(&mut b, index, input)?),
            }
        }
        let heads: Vec<NodeId> = chains.iter().map(|c| c.head).collect();
        policy.connect_chains(&mut b, &heads)
    }

    /// Write a property through the owning node's invalidation hook. Returns `true` if the
    /// value changed.
    pub fn set_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: PropertyValue,
    ) -> GraphResult<bool> {
        self.with_edit(|g| {
            let previous = g.node(id)?.properties.get(name).cloned();
            if !g.node_mut(id)?.properties.set(name, value)? {
                return Ok(false);
            }
            let node = g.node(id)?;
            let rebuild = node
                .group_state()
                .is_some_and(|s| s.policy.rebuilds_on(name));
            match node.behavior.property_changed(node, name) {
                Invalidation::None => {}
                Invalidation::Descriptors => g.touch(id),
                Invalidation::Flush => {
                    g.touch(id);
                    let evicted = g.cache.flush_owned_by(&BTreeSet::from([id]));
                    tracing::debug!(node = %id, property = name, evicted, "property change flushed cache");
                }
            }
            if rebuild && let Err(e) = g.rebuild_group_fixed(id) {
                if let Some(previous) = previous {
                    g.node_mut(id)?.properties.set(name, previous)?;
                    if let Err(again) = g.rebuild_group_fixed(id) {
                        tracing::warn!(node = %id, error = %again, "group sub-graph not restored");
                    }
                }
                return Err(e);
            }
            Ok(true)
        })
    }

    /// Write a single integer.
    pub fn set_int(&mut self, id: NodeId, name: &str, v: i32) -> GraphResult<bool> {
        self.set_property(id, name, PropertyValue::int(v))
    }

    /// Write a single float.
    pub fn set_float(&mut self, id: NodeId, name: &str, v: f32) -> GraphResult<bool> {
        self.set_property(id, name, PropertyValue::float(v))
    }

    /// Write a single string.
    pub fn set_string(&mut self, id: NodeId, name: &str, v: &str) -> GraphResult<bool> {
        self.set_property(id, name, PropertyValue::string(v))
    }
}
