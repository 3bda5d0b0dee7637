/// Convenience result type used across the engine.
pub type GraphResult<T> = Result<T, GraphError>;

/// Top-level error taxonomy used by graph APIs.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Invalid configuration, definition, or description data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A node could not produce a valid render-tree fragment for a context.
    #[error("evaluation error in node '{node}': {message}")]
    Evaluation {
        /// Name of the node that failed.
        node: String,
        /// Human readable failure reason.
        message: String,
    },

    /// A structural edit was rejected before any evaluation could observe it.
    #[error("rewire error on node '{node}': {message}")]
    Rewire {
        /// Name of the node whose inputs were being edited.
        node: String,
        /// Why the new inputs were rejected.
        message: String,
    },

    /// A name or handle does not resolve to a live node.
    #[error("not found: {0}")]
    NotFound(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GraphError {
    /// Build a [`GraphError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GraphError::Evaluation`] value for `node`.
    pub fn evaluation(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Evaluation {
            node: node.into(),
            message: msg.into(),
        }
    }

    /// Build a [`GraphError::Rewire`] value for `node`.
    pub fn rewire(node: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Rewire {
            node: node.into(),
            message: msg.into(),
        }
    }

    /// Build a [`GraphError::NotFound`] value.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Build a [`GraphError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Name of the node an evaluation or rewire failure is attributed to.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Evaluation { node, .. } | Self::Rewire { node, .. } => Some(node),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
