use crate::NodeId;
use oxrdf::{Term, VariableNameParseError};
use spargebra::SparqlSyntaxError;

/// A result of an operation on the query model.
pub type QueryModelResult<T> = Result<T, QueryModelError>;

/// An error raised while building, inspecting, or rewriting a [QueryTree](crate::QueryTree).
///
/// Most variants indicate a malformed tree or a wrong node handle. These are programming errors
/// and the query that produced them must be rejected.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryModelError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// A variable name that is not a valid SPARQL variable.
    #[error(transparent)]
    InvalidVariableName(#[from] VariableNameParseError),
    /// The node handle does not belong to this tree.
    #[error("The node {0} does not exist in this query tree")]
    UnknownNode(NodeId),
    /// The node is not reachable from the root of the tree.
    #[error("The node {0} is not attached to the query tree")]
    DetachedNode(NodeId),
    /// The node already has a parent.
    #[error("The node {0} already has a parent and cannot be attached again")]
    AlreadyAttached(NodeId),
    /// The parent does not reference the given child.
    #[error("The node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    /// The query root is part of every tree.
    #[error("The query root cannot be removed or replaced")]
    CannotRemoveRoot,
    /// The node lives in a different scope than the one the caller operates on.
    #[error("The node {node} is not within scope {expected}")]
    OutOfScope {
        node: NodeId,
        expected: NodeId,
        actual: Option<NodeId>,
    },
    /// A parent/child link is broken.
    #[error("Inconsistent query tree: {0}")]
    Inconsistent(String),
    /// The term cannot be used in this position of a pattern or expression.
    #[error("The term {0} cannot be used in this position")]
    InvalidTerm(Term),
    /// A parameter value that cannot be bound.
    #[error("The parameter ?{name} cannot be bound: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("A feature has not yet been implemented: {0}")]
    NotImplemented(String),
}

impl QueryModelError {
    pub fn inconsistent<T>(cause: impl Into<String>) -> QueryModelResult<T> {
        Err(QueryModelError::Inconsistent(cause.into()))
    }
}
