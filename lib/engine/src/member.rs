use crate::error::MemberError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use oxrdf::{Triple, Variable};
use rdf_federation_model::Query;
use sparesults::QuerySolution;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A stream of solutions that a member returns for a `SELECT` query.
pub type MemberSolutionStream = BoxStream<'static, Result<QuerySolution, MemberError>>;

/// A stream of triples that a member returns for a `CONSTRUCT` or `DESCRIBE` query.
pub type MemberTripleStream = BoxStream<'static, Result<Triple, MemberError>>;

pub type MemberConnectionRef = Arc<dyn MemberConnection>;

/// The protocol features of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberCapabilities {
    /// The member evaluates `SERVICE` bodies that are sent to it.
    pub supports_service: bool,
    /// The member answers `ASK` queries.
    pub supports_ask: bool,
}

impl Default for MemberCapabilities {
    fn default() -> Self {
        Self {
            supports_service: false,
            supports_ask: true,
        }
    }
}

/// A connection to a backing data source of the federation.
///
/// The engine either submits complete queries to a single member or hands the planned query to
/// the federation evaluator, which uses the connections of all involved members.
#[async_trait]
pub trait MemberConnection: Debug + Send + Sync {
    /// The identifier of this member within the registry.
    fn member_id(&self) -> &str;

    fn capabilities(&self) -> MemberCapabilities;

    /// Evaluates `query` on the member.
    ///
    /// The returned streams are closed when they are dropped, whether or not they have been
    /// consumed completely.
    async fn execute(&self, query: &Query) -> Result<MemberQueryResults, MemberError>;
}

/// The results of a query that has been evaluated by a member.
pub enum MemberQueryResults {
    Solutions {
        variables: Arc<[Variable]>,
        stream: MemberSolutionStream,
    },
    Boolean(bool),
    Graph(MemberTripleStream),
}

impl MemberQueryResults {
    /// A short name of the result kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MemberQueryResults::Solutions { .. } => "solutions",
            MemberQueryResults::Boolean(_) => "a boolean",
            MemberQueryResults::Graph(_) => "a graph",
        }
    }
}

impl Debug for MemberQueryResults {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberQueryResults::Solutions { variables, .. } => f
                .debug_struct("Solutions")
                .field("variables", variables)
                .finish_non_exhaustive(),
            MemberQueryResults::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            MemberQueryResults::Graph(_) => f.debug_struct("Graph").finish_non_exhaustive(),
        }
    }
}
