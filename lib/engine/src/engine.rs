use crate::config::FederationConfig;
use crate::error::{MemberError, QueryEvaluationError};
use crate::member::{MemberConnectionRef, MemberQueryResults};
use crate::registry::ServiceRegistry;
use crate::single_owner::find_single_owner;
use futures::StreamExt;
use rdf_federation_logical::{
    parametrize, rename_variable, resolve_services, KeywordSearchExtractor, ParameterBindings,
    ServiceReplacements,
};
use rdf_federation_model::{
    NamedNodePattern, NodeId, NodeKind, ParsedQuery, QueryForm, QueryModelError,
    QueryModelResult, QueryTree, ServiceMap, Slice, Term, TermPattern, TriplePattern, Variable,
};
use std::sync::Arc;

/// A query that has passed all planning passes.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub query: ParsedQuery,
    /// The `SERVICE` nodes that have been replaced by resolved service calls.
    pub replacements: ServiceReplacements,
    /// The extracted keyword search nodes.
    pub keyword_searches: Vec<NodeId>,
}

/// The outcome of [FederationEngine::evaluate].
#[derive(Debug)]
pub enum Evaluation {
    /// The query has been answered by its single owner.
    Proxied {
        member: String,
        results: MemberQueryResults,
    },
    /// The query spans multiple members and must be evaluated by the federation evaluator.
    Federated(PlannedQuery),
}

/// The front end of the federation.
///
/// The engine plans incoming queries by resolving `SERVICE` clauses and extracting keyword
/// searches. Afterward, it either routes the query to the single member that can answer it or
/// returns the plan for federated evaluation. The two paths are exclusive for a query. A failure
/// of the single owner is never retried with federated evaluation.
#[derive(Debug)]
pub struct FederationEngine {
    registry: ServiceRegistry,
    default_member: String,
    single_owner_routing: bool,
    keyword_search: Option<KeywordSearchExtractor>,
}

impl FederationEngine {
    /// Creates a new engine. The default member of `config` must be registered in `registry`.
    pub fn try_new(
        registry: ServiceRegistry,
        config: &FederationConfig,
    ) -> Result<Self, QueryEvaluationError> {
        if registry.member(&config.default_member).is_none() {
            return Err(QueryEvaluationError::UnknownMember(
                config.default_member.clone(),
            ));
        }
        let keyword_search = config
            .keyword_search_vocabulary()?
            .map(|vocabulary| KeywordSearchExtractor::new(Arc::new(vocabulary)));

        Ok(Self {
            registry,
            default_member: config.default_member.clone(),
            single_owner_routing: config.single_owner_routing,
            keyword_search,
        })
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn default_member(&self) -> &str {
        &self.default_member
    }

    /// Resolves the `SERVICE` clauses of `query` and then extracts its keyword searches.
    pub fn plan(&self, mut query: ParsedQuery) -> Result<PlannedQuery, QueryEvaluationError> {
        let mut replacements = ServiceReplacements::default();
        resolve_services(query.tree_mut(), self.registry.services(), &mut replacements)?;

        let keyword_searches = match &self.keyword_search {
            Some(extractor) => extractor.extract(query.tree_mut())?,
            None => Vec::new(),
        };
        query.tree().validate()?;

        tracing::debug!(
            resolved_services = replacements.len(),
            keyword_searches = keyword_searches.len(),
            "Planned query"
        );
        Ok(PlannedQuery {
            query,
            replacements,
            keyword_searches,
        })
    }

    /// Returns the member that can answer the whole planned query, if there is exactly one.
    pub fn single_owner(
        &self,
        planned: &PlannedQuery,
    ) -> Result<Option<MemberConnectionRef>, QueryEvaluationError> {
        find_single_owner(
            planned.query.tree(),
            self.registry.services(),
            &self.default_member,
        )?
        .map(|member_id| {
            self.registry
                .member(&member_id)
                .cloned()
                .ok_or(QueryEvaluationError::UnknownMember(member_id))
        })
        .transpose()
    }

    /// Plans `query` and submits it to its single owner if there is one.
    pub async fn evaluate(&self, query: ParsedQuery) -> Result<Evaluation, QueryEvaluationError> {
        let planned = self.plan(query)?;
        if !self.single_owner_routing {
            return Ok(Evaluation::Federated(planned));
        }
        let Some(member) = self.single_owner(&planned)? else {
            tracing::debug!("Query spans multiple members, using federated evaluation");
            return Ok(Evaluation::Federated(planned));
        };

        tracing::info!(member = member.member_id(), "Routing query to its single owner");
        let results = self.execute_proxied(&member, planned.query).await?;
        Ok(Evaluation::Proxied {
            member: member.member_id().to_owned(),
            results,
        })
    }

    async fn execute_proxied(
        &self,
        member: &MemberConnectionRef,
        query: ParsedQuery,
    ) -> Result<MemberQueryResults, QueryEvaluationError> {
        let (mut tree, form) = query.into_parts();
        inline_services(&mut tree, self.registry.services(), member.member_id())?;
        let query = ParsedQuery::new(tree, form);

        if query.is_ask() && !member.capabilities().supports_ask {
            tracing::debug!(
                member = member.member_id(),
                "Member does not support ASK, submitting a SELECT query"
            );
            let select = ask_as_select(query)?;
            let results = submit(member, &select).await?;
            return ask_from_solutions(member, &select, results).await;
        }
        submit(member, &query).await
    }

    /// Binds `parameters` in a copy of `template`.
    ///
    /// The output columns of the query do not change. Variables of a `CONSTRUCT` template are
    /// replaced with their values.
    pub fn instantiate(
        template: &ParsedQuery,
        parameters: &ParameterBindings,
    ) -> Result<ParsedQuery, QueryEvaluationError> {
        let mut tree = template.tree().clone();
        parametrize(&mut tree, parameters)?;

        let form = match template.form() {
            QueryForm::Construct {
                template,
                dataset,
                base_iri,
            } => QueryForm::Construct {
                template: template
                    .iter()
                    .map(|triple| {
                        map_template_variables(triple, |variable| {
                            parameters
                                .get(variable.as_str())
                                .map(|value| term_to_template(variable, value))
                                .transpose()
                        })
                    })
                    .collect::<QueryModelResult<_>>()?,
                dataset: dataset.clone(),
                base_iri: base_iri.clone(),
            },
            form => form.clone(),
        };
        Ok(ParsedQuery::new(tree, form))
    }

    /// Renames the free variable `from` to `to`, including the variables of a `CONSTRUCT`
    /// template.
    pub fn rename(
        query: ParsedQuery,
        from: &str,
        to: &str,
    ) -> Result<ParsedQuery, QueryEvaluationError> {
        let (mut tree, form) = query.into_parts();
        rename_variable(&mut tree, from, to)?;

        let form = match form {
            QueryForm::Construct {
                template,
                dataset,
                base_iri,
            } => {
                let renamed = Variable::new(to).map_err(QueryModelError::from)?;
                let template = template
                    .iter()
                    .map(|triple| {
                        map_template_variables(triple, |variable| {
                            Ok((variable.as_str() == from)
                                .then(|| TermPattern::Variable(renamed.clone())))
                        })
                    })
                    .collect::<QueryModelResult<_>>()?;
                QueryForm::Construct {
                    template,
                    dataset,
                    base_iri,
                }
            }
            form => form,
        };
        Ok(ParsedQuery::new(tree, form))
    }
}

async fn submit(
    member: &MemberConnectionRef,
    query: &ParsedQuery,
) -> Result<MemberQueryResults, QueryEvaluationError> {
    let query = query.to_query()?;
    member
        .execute(&query)
        .await
        .map_err(|error| proxy_error(member, &query, error))
}

fn proxy_error(
    member: &MemberConnectionRef,
    query: &rdf_federation_model::Query,
    source: MemberError,
) -> QueryEvaluationError {
    tracing::warn!(member = member.member_id(), %query, error = %source, "Proxied query failed");
    QueryEvaluationError::ProxyExecution {
        member: member.member_id().to_owned(),
        query: query.to_string(),
        source,
    }
}

/// Replaces the `SERVICE` clauses that are answered by `owner` with their bodies.
fn inline_services(tree: &mut QueryTree, services: &ServiceMap, owner: &str) -> QueryModelResult<()> {
    for node in tree.pre_order() {
        if !tree.is_attached(node) {
            continue;
        }
        match tree.kind(node) {
            NodeKind::ServiceCall(call) if call.descriptor.member_id() == owner => {
                let body = call.body.clone();
                let inlined = tree.lower(&body)?;
                tree.replace(node, inlined)?;
            }
            NodeKind::Service(service) => {
                let owned = match service.name.value() {
                    Some(Term::NamedNode(iri)) => services
                        .get(iri)
                        .is_some_and(|descriptor| descriptor.member_id() == owner),
                    _ => false,
                };
                if owned {
                    let arg = service.arg;
                    tree.replace(node, arg)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Turns an `ASK` query into `SELECT * ... LIMIT 1`.
fn ask_as_select(query: ParsedQuery) -> QueryModelResult<ParsedQuery> {
    let mut query = query.into_select();
    let tree = query.tree_mut();
    let arg = tree.root_argument();
    tree.insert_above(arg, |arg| {
        NodeKind::Slice(Slice {
            arg,
            offset: 0,
            limit: Some(1),
        })
    })?;
    Ok(query)
}

async fn ask_from_solutions(
    member: &MemberConnectionRef,
    query: &ParsedQuery,
    results: MemberQueryResults,
) -> Result<MemberQueryResults, QueryEvaluationError> {
    match results {
        MemberQueryResults::Solutions { mut stream, .. } => match stream.next().await {
            None => Ok(MemberQueryResults::Boolean(false)),
            Some(Ok(_)) => Ok(MemberQueryResults::Boolean(true)),
            Some(Err(error)) => Err(proxy_error(member, &query.to_query()?, error)),
        },
        MemberQueryResults::Boolean(value) => Ok(MemberQueryResults::Boolean(value)),
        results @ MemberQueryResults::Graph(_) => Err(QueryEvaluationError::UnexpectedResults {
            member: member.member_id().to_owned(),
            expected: "solutions",
            actual: results.kind(),
        }),
    }
}

fn map_template_variables(
    triple: &TriplePattern,
    mut map: impl FnMut(&Variable) -> QueryModelResult<Option<TermPattern>>,
) -> QueryModelResult<TriplePattern> {
    let mut map_term = |term: &TermPattern| -> QueryModelResult<TermPattern> {
        match term {
            TermPattern::Variable(variable) => Ok(map(variable)?.unwrap_or_else(|| term.clone())),
            _ => Ok(term.clone()),
        }
    };
    let subject = map_term(&triple.subject)?;
    let object = map_term(&triple.object)?;
    let predicate = match &triple.predicate {
        NamedNodePattern::Variable(variable) => match map(variable)? {
            None => triple.predicate.clone(),
            Some(TermPattern::NamedNode(node)) => NamedNodePattern::NamedNode(node),
            Some(TermPattern::Variable(renamed)) => NamedNodePattern::Variable(renamed),
            Some(_) => {
                return Err(QueryModelError::InvalidParameter {
                    name: variable.as_str().to_owned(),
                    reason: "Only IRIs can be used as predicates".to_owned(),
                })
            }
        },
        NamedNodePattern::NamedNode(_) => triple.predicate.clone(),
    };
    Ok(TriplePattern {
        subject,
        predicate,
        object,
    })
}

fn term_to_template(variable: &Variable, value: &Term) -> QueryModelResult<TermPattern> {
    match value {
        Term::NamedNode(node) => Ok(node.clone().into()),
        Term::Literal(literal) => Ok(literal.clone().into()),
        _ => Err(QueryModelError::InvalidParameter {
            name: variable.as_str().to_owned(),
            reason: format!("{value} cannot be used in a CONSTRUCT template"),
        }),
    }
}
