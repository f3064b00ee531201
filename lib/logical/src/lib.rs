//! Rewriting passes over the [QueryTree](rdf_federation_model::QueryTree).
//!
//! All passes are synchronous and mutate the tree in place. If a pass fails, the tree is left in an
//! undefined state and must be discarded.

pub mod expression;
mod keyword_search;
mod parametrize;
mod removal;
mod rename;
mod service;

pub use keyword_search::KeywordSearchExtractor;
pub use parametrize::{parametrize, ParameterBindings, Parametrizer};
pub use removal::NodeRemover;
pub use rename::{rename_variable, VariableRenamer};
pub use service::{resolve_services, ServiceReplacements, ServiceResolver};
