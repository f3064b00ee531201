//! The front end of the federation: member connections, planning, and single-owner routing.

mod config;
mod engine;
pub mod error;
mod member;
mod registry;
mod single_owner;

pub use config::{FederationConfig, KeywordSearchConfig, MemberConfig, ServiceConfig};
pub use engine::{Evaluation, FederationEngine, PlannedQuery};
pub use error::{ConfigError, MemberError, QueryEvaluationError};
pub use member::{
    MemberCapabilities, MemberConnection, MemberConnectionRef, MemberQueryResults,
    MemberSolutionStream, MemberTripleStream,
};
pub use registry::{MemberServiceDescriptor, ServiceRegistry};
pub use single_owner::find_single_owner;
