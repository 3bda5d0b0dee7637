use crate::foundation::math::{Fingerprint, StableHasher};

/// Pixel-free description of what `evaluate()` would produce for a context.
///
/// Two equal identifier trees must describe identical pixels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct IdentifierNode {
    /// Node-local identity string (kind, settings digest, context-dependent values).
    pub id: String,
    /// Identifiers of the inputs that contribute, in evaluation order.
    pub children: Vec<IdentifierNode>,
}

impl IdentifierNode {
    /// Leaf identifier.
    pub fn leaf(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    /// Identifier with contributing inputs.
    pub fn with_children(id: impl Into<String>, children: Vec<IdentifierNode>) -> Self {
        Self {
            id: id.into(),
            children,
        }
    }

    /// Stable digest of the whole tree.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = StableHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }

    fn hash_into(&self, h: &mut StableHasher) {
        h.write_str(&self.id);
        h.write_u64(self.children.len() as u64);
        for c in &self.children {
            c.hash_into(h);
        }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(IdentifierNode::len).sum::<usize>()
    }

    /// Always `false`; an identifier has at least its own node.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for IdentifierNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)?;
        if !self.children.is_empty() {
            f.write_str("(")?;
            for (i, c) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{c}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
