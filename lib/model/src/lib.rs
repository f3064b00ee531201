//! The query model of the federation engine.
//!
//! A parsed SPARQL query is lowered into a [QueryTree], an arena of operator nodes that rewriting
//! passes mutate in place. The tree can be raised back into [spargebra] algebra for serialization.

mod display;
mod error;
mod lower;
mod node;
mod query;
mod raise;
mod search;
mod tree;
mod var;
mod visitor;

pub use error::*;
pub use node::*;
pub use query::*;
pub use search::*;
pub use tree::*;
pub use var::*;
pub use visitor::*;

// Re-export some oxrdf types.
pub use oxiri::Iri;
pub use oxrdf::vocab;
pub use oxrdf::{
    BlankNode, IriParseError, Literal, NamedNode, NamedNodeRef, Term, Triple, Variable,
    VariableNameParseError,
};
pub use spargebra::algebra::{
    AggregateExpression, Expression, GraphPattern, OrderExpression, PropertyPathExpression,
};
pub use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
pub use spargebra::{Query, SparqlSyntaxError};
