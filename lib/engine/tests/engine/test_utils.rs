use async_trait::async_trait;
use futures::StreamExt;
use oxrdf::{NamedNode, Variable};
use rdf_federation_engine::{
    FederationConfig, FederationEngine, MemberCapabilities, MemberConnection,
    MemberConnectionRef, MemberError, MemberQueryResults, ServiceRegistry,
};
use rdf_federation_model::{ParsedQuery, Query};
use sparesults::QuerySolution;
use std::sync::{Arc, Mutex};

pub const PREFIXES: &str = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX search: <http://rdf-federation.org/search#>
PREFIX ex: <http://example.com/>
";

pub fn parse(query: &str) -> ParsedQuery {
    ParsedQuery::parse(&format!("{PREFIXES}{query}"), None).unwrap()
}

pub fn iri(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{local}"))
}

#[derive(Debug, Clone, Copy)]
pub enum Response {
    /// Returns the given number of solutions for `?s`.
    Solutions(usize),
    Boolean(bool),
    Fail,
}

/// A member that records the queries it receives and answers with a fixed response.
#[derive(Debug)]
pub struct MockMember {
    id: &'static str,
    capabilities: MemberCapabilities,
    response: Response,
    received: Mutex<Vec<Query>>,
}

impl MockMember {
    pub fn new(id: &'static str, response: Response) -> Arc<Self> {
        Self::with_capabilities(id, MemberCapabilities::default(), response)
    }

    pub fn with_capabilities(
        id: &'static str,
        capabilities: MemberCapabilities,
        response: Response,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            capabilities,
            response,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn received(&self) -> Vec<Query> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemberConnection for MockMember {
    fn member_id(&self) -> &str {
        self.id
    }

    fn capabilities(&self) -> MemberCapabilities {
        self.capabilities
    }

    async fn execute(&self, query: &Query) -> Result<MemberQueryResults, MemberError> {
        self.received.lock().unwrap().push(query.clone());
        match self.response {
            Response::Solutions(count) => {
                let variables: Arc<[Variable]> = Arc::new([Variable::new_unchecked("s")]);
                let solutions = (0..count)
                    .map(|i| {
                        Ok(QuerySolution::from((
                            Arc::clone(&variables),
                            vec![Some(iri(&format!("r{i}")).into())],
                        )))
                    })
                    .collect::<Vec<_>>();
                Ok(MemberQueryResults::Solutions {
                    variables,
                    stream: futures::stream::iter(solutions).boxed(),
                })
            }
            Response::Boolean(value) => Ok(MemberQueryResults::Boolean(value)),
            Response::Fail => Err(MemberError::new("connection refused")),
        }
    }
}

/// A federation of a default `store` member and a service-capable `remote` member that answers
/// `SERVICE ex:remote`.
pub struct Federation {
    pub store: Arc<MockMember>,
    pub remote: Arc<MockMember>,
    pub engine: FederationEngine,
}

impl Federation {
    pub fn new(store: Arc<MockMember>, config: &FederationConfig) -> Self {
        let remote = MockMember::with_capabilities(
            "remote",
            MemberCapabilities {
                supports_service: true,
                supports_ask: true,
            },
            Response::Solutions(1),
        );

        let mut registry = ServiceRegistry::new();
        registry.register_member(Arc::clone(&store) as MemberConnectionRef);
        registry.register_member(Arc::clone(&remote) as MemberConnectionRef);
        registry
            .register_service(iri("remote"), "remote")
            .unwrap();
        registry.register_service(iri("local"), "store").unwrap();

        let engine = FederationEngine::try_new(registry, config).unwrap();
        Self {
            store,
            remote,
            engine,
        }
    }

    pub fn with_store(response: Response) -> Self {
        Self::new(MockMember::new("store", response), &store_config())
    }
}

pub fn store_config() -> FederationConfig {
    FederationConfig {
        default_member: "store".to_owned(),
        ..FederationConfig::default()
    }
}

/// Consumes the solutions of `results` and returns how many there are.
pub async fn count_solutions(results: MemberQueryResults) -> usize {
    match results {
        MemberQueryResults::Solutions { stream, .. } => stream.count().await,
        results => panic!("Expected solutions, got {results:?}"),
    }
}
