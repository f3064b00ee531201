use oxrdf::IriParseError;
use rdf_federation_model::QueryModelError;
use std::error::Error;
use std::io;

/// An error raised while planning or evaluating a federated query.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in the query model or one of the rewriting passes. The query must be rejected.
    #[error(transparent)]
    Model(#[from] QueryModelError),
    /// The single owner of a query failed to evaluate the proxied query.
    #[error("The member {member} failed to evaluate the proxied query: {query}")]
    ProxyExecution {
        member: String,
        query: String,
        #[source]
        source: MemberError,
    },
    /// The member is not registered.
    #[error("The member {0} is not registered")]
    UnknownMember(String),
    /// The member returned results of a different kind than the query asks for.
    #[error("The member {member} returned {actual} for a query that expects {expected}")]
    UnexpectedResults {
        member: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// An error raised by a [MemberConnection](crate::MemberConnection).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MemberError(#[source] Box<dyn Error + Send + Sync>);

impl MemberError {
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(error.into())
    }

    /// Returns the error of the connection.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

/// An error in a [FederationConfig](crate::FederationConfig).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Cannot read the configuration: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid IRI <{iri}> in the configuration: {source}")]
    InvalidIri {
        iri: String,
        #[source]
        source: IriParseError,
    },
    /// A service refers to a member that is not declared.
    #[error("The service <{service}> refers to the undeclared member {member}")]
    UndeclaredMember { service: String, member: String },
    /// A member id is declared more than once.
    #[error("The member {0} is declared more than once")]
    DuplicateMember(String),
}
