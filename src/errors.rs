use thiserror::Error;

use crate::backend::{Backend, OperationKind};

/// Error produced when a node cannot be constructed.
///
/// A node is never observable in an invalid state: every constructor that can receive invalid
/// input checks it and returns this error instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedNodeError {
    #[error("Operator {operator} expects {expected} operand(s), got {actual}")]
    Arity {
        operator: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid interval [{lower},{upper}]: lower bound exceeds upper bound")]
    InvertedInterval { lower: usize, upper: usize },

    #[error("Negative interval bound {0}")]
    NegativeBound(i64),

    #[error("Operator {0} does not accept an interval")]
    UnexpectedInterval(&'static str),

    #[error("Unknown comparison operator \"{0}\"")]
    UnknownComparison(String),

    #[error("Unknown variable role \"{0}\"")]
    UnknownRole(String),
}

/// Error produced when pastification is requested for a node without a horizon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Horizon is undefined for node {name}")]
pub struct HorizonUndefinedError {
    name: String,
}

impl HorizonUndefinedError {
    pub(crate) fn new(name: String) -> Self {
        Self { name }
    }

    /// Serialization of the node that was missing a horizon.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Error produced when an evaluation backend cannot be attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Backend {backend:?} is unavailable for operation {kind}")]
pub struct UnsupportedBackendError {
    backend: Backend,
    kind: OperationKind,
}

impl UnsupportedBackendError {
    pub(crate) fn new(backend: Backend, kind: OperationKind) -> Self {
        Self { backend, kind }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

/// Error produced while pastifying a tree.
///
/// No partial tree is ever returned alongside this error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PastifyError {
    #[error(transparent)]
    HorizonUndefined(#[from] HorizonUndefinedError),

    #[error("Error rebuilding node: {0}")]
    Malformed(#[from] MalformedNodeError),
}
