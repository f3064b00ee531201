use crate::{
    BinaryOperator, GraphScope, KeywordSearchNode, LeftJoin, NodeId, NodeKind, QueryModelError,
    QueryModelResult, QueryTree, Var, BLANK_NODE_VAR_PREFIX,
};
use oxrdf::{BlankNode, Term, Variable};
use spargebra::algebra::{Expression, GraphPattern};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};

impl QueryTree {
    /// Converts the whole tree back into SPARQL algebra.
    pub fn to_graph_pattern(&self) -> QueryModelResult<GraphPattern> {
        self.graph_pattern_of(self.root_argument())
    }

    /// Converts the sub-tree rooted at `node` back into SPARQL algebra.
    ///
    /// Adjacent joins of statement patterns are merged into a single basic graph pattern.
    pub fn graph_pattern_of(&self, node: NodeId) -> QueryModelResult<GraphPattern> {
        Ok(match self.kind(node) {
            NodeKind::Root(arg) => self.graph_pattern_of(*arg)?,
            NodeKind::Pattern(pattern) => GraphPattern::Bgp {
                patterns: vec![TriplePattern {
                    subject: var_to_term_pattern(&pattern.subject)?,
                    predicate: var_to_named_node_pattern(&pattern.predicate)?,
                    object: var_to_term_pattern(&pattern.object)?,
                }],
            },
            NodeKind::Path(path) => GraphPattern::Path {
                subject: var_to_term_pattern(&path.subject)?,
                path: path.path.clone(),
                object: var_to_term_pattern(&path.object)?,
            },
            NodeKind::SingletonSet => GraphPattern::Bgp {
                patterns: Vec::new(),
            },
            NodeKind::EmptySet => GraphPattern::Values {
                variables: Vec::new(),
                bindings: Vec::new(),
            },
            NodeKind::Values(values) => {
                let variables = values
                    .variables
                    .iter()
                    .map(Variable::new)
                    .collect::<Result<Vec<_>, _>>()?;
                let bindings = values
                    .rows
                    .iter()
                    .map(|row| {
                        values
                            .variables
                            .iter()
                            .map(|name| row.get(name).map(term_to_ground_term).transpose())
                            .collect::<QueryModelResult<Vec<_>>>()
                    })
                    .collect::<QueryModelResult<Vec<_>>>()?;
                GraphPattern::Values {
                    variables,
                    bindings,
                }
            }
            NodeKind::ServiceCall(call) => GraphPattern::Service {
                name: NamedNodePattern::NamedNode(call.service.clone()),
                inner: Box::new(call.body.clone()),
                silent: call.silent,
            },
            NodeKind::KeywordSearch(search) => keyword_search_to_bgp(search)?,
            NodeKind::Projection(projection) => {
                let mut inner = self.graph_pattern_of(projection.arg)?;
                for element in projection.elements.iter().filter(|e| e.source != e.target) {
                    inner = GraphPattern::Extend {
                        inner: Box::new(inner),
                        variable: Variable::new(&element.target)?,
                        expression: Expression::Variable(Variable::new(&element.source)?),
                    };
                }
                GraphPattern::Project {
                    inner: Box::new(inner),
                    variables: projection
                        .elements
                        .iter()
                        .map(|e| Variable::new(&e.target))
                        .collect::<Result<Vec<_>, _>>()?,
                }
            }
            NodeKind::Extension(extension) => {
                let mut inner = self.graph_pattern_of(extension.arg)?;
                for element in &extension.elements {
                    inner = GraphPattern::Extend {
                        inner: Box::new(inner),
                        variable: Variable::new(&element.name)?,
                        expression: element.expression.clone(),
                    };
                }
                inner
            }
            NodeKind::Filter(filter) => GraphPattern::Filter {
                expr: filter.condition.clone(),
                inner: Box::new(self.graph_pattern_of(filter.arg)?),
            },
            NodeKind::Order(order) => GraphPattern::OrderBy {
                inner: Box::new(self.graph_pattern_of(order.arg)?),
                expression: order.elements.clone(),
            },
            NodeKind::Slice(slice) => GraphPattern::Slice {
                inner: Box::new(self.graph_pattern_of(slice.arg)?),
                start: slice.offset,
                length: slice.limit,
            },
            NodeKind::Distinct(arg) => GraphPattern::Distinct {
                inner: Box::new(self.graph_pattern_of(*arg)?),
            },
            NodeKind::Reduced(arg) => GraphPattern::Reduced {
                inner: Box::new(self.graph_pattern_of(*arg)?),
            },
            NodeKind::Group(group) => GraphPattern::Group {
                inner: Box::new(self.graph_pattern_of(group.arg)?),
                variables: group
                    .group_by
                    .iter()
                    .map(Variable::new)
                    .collect::<Result<Vec<_>, _>>()?,
                aggregates: group
                    .aggregates
                    .iter()
                    .map(|(name, aggregate)| Ok((Variable::new(name)?, aggregate.clone())))
                    .collect::<QueryModelResult<Vec<_>>>()?,
            },
            NodeKind::Graph(GraphScope { arg, name }) => GraphPattern::Graph {
                name: var_to_named_node_pattern(name)?,
                inner: Box::new(self.graph_pattern_of(*arg)?),
            },
            NodeKind::Service(service) => GraphPattern::Service {
                name: var_to_named_node_pattern(&service.name)?,
                inner: Box::new(self.graph_pattern_of(service.arg)?),
                silent: service.silent,
            },
            NodeKind::Join(BinaryOperator { left, right }) => {
                join(self.graph_pattern_of(*left)?, self.graph_pattern_of(*right)?)
            }
            NodeKind::NaryJoin(children) => {
                let mut result = GraphPattern::Bgp {
                    patterns: Vec::new(),
                };
                for child in children {
                    result = join(result, self.graph_pattern_of(*child)?);
                }
                result
            }
            NodeKind::LeftJoin(LeftJoin {
                left,
                right,
                condition,
            }) => GraphPattern::LeftJoin {
                left: Box::new(self.graph_pattern_of(*left)?),
                right: Box::new(self.graph_pattern_of(*right)?),
                expression: condition.clone(),
            },
            NodeKind::Union(BinaryOperator { left, right }) => GraphPattern::Union {
                left: Box::new(self.graph_pattern_of(*left)?),
                right: Box::new(self.graph_pattern_of(*right)?),
            },
            NodeKind::Minus(BinaryOperator { left, right }) => GraphPattern::Minus {
                left: Box::new(self.graph_pattern_of(*left)?),
                right: Box::new(self.graph_pattern_of(*right)?),
            },
            NodeKind::Other(other) => {
                let children = other
                    .children
                    .iter()
                    .map(|c| self.graph_pattern_of(*c))
                    .collect::<QueryModelResult<Vec<_>>>()?;
                other.payload.to_graph_pattern(children)?
            }
        })
    }
}

/// Joins two patterns, merging basic graph patterns and dropping empty ones.
fn join(left: GraphPattern, right: GraphPattern) -> GraphPattern {
    match (left, right) {
        (GraphPattern::Bgp { patterns: mut left }, GraphPattern::Bgp { patterns: right }) => {
            left.extend(right);
            GraphPattern::Bgp { patterns: left }
        }
        (GraphPattern::Bgp { patterns }, other) | (other, GraphPattern::Bgp { patterns })
            if patterns.is_empty() =>
        {
            other
        }
        (left, right) => GraphPattern::Join {
            left: Box::new(left),
            right: Box::new(right),
        },
    }
}

fn keyword_search_to_bgp(search: &KeywordSearchNode) -> QueryModelResult<GraphPattern> {
    let pattern = &search.pattern;
    let vocabulary = &search.vocabulary;
    let match_var = var_to_term_pattern(&pattern.match_var)?;

    let mut patterns = Vec::new();
    if let Some(subject) = &pattern.subject {
        let subject = var_to_term_pattern(subject)?;
        for predicate in &pattern.predicates {
            patterns.push(TriplePattern {
                subject: subject.clone(),
                predicate: var_to_named_node_pattern(predicate)?,
                object: match_var.clone(),
            });
        }
    }
    patterns.push(TriplePattern {
        subject: match_var.clone(),
        predicate: vocabulary.contains.clone().into(),
        object: var_to_term_pattern(&pattern.value)?,
    });
    if let Some(score) = &pattern.score {
        patterns.push(TriplePattern {
            subject: match_var.clone(),
            predicate: vocabulary.score.clone().into(),
            object: var_to_term_pattern(score)?,
        });
    }
    if let Some(snippet) = &pattern.snippet {
        patterns.push(TriplePattern {
            subject: match_var.clone(),
            predicate: vocabulary.snippet.clone().into(),
            object: var_to_term_pattern(snippet)?,
        });
    }
    if let Some(subject) = &pattern.subject {
        let subject = var_to_term_pattern(subject)?;
        for type_var in &pattern.types {
            patterns.push(TriplePattern {
                subject: subject.clone(),
                predicate: vocabulary.type_predicate.clone().into(),
                object: var_to_term_pattern(type_var)?,
            });
        }
    }
    Ok(GraphPattern::Bgp { patterns })
}

pub(crate) fn var_to_term_pattern(var: &Var) -> QueryModelResult<TermPattern> {
    match var.value() {
        Some(Term::NamedNode(node)) => Ok(node.clone().into()),
        Some(Term::BlankNode(node)) => Ok(node.clone().into()),
        Some(Term::Literal(literal)) => Ok(literal.clone().into()),
        #[allow(
            unreachable_patterns,
            reason = "Only reachable if RDF-star is enabled"
        )]
        Some(term) => Err(QueryModelError::InvalidTerm(term.clone())),
        None => match var.name().strip_prefix(BLANK_NODE_VAR_PREFIX) {
            Some(id) => Ok(BlankNode::new_unchecked(id).into()),
            None => Ok(Variable::new(var.name())?.into()),
        },
    }
}

fn var_to_named_node_pattern(var: &Var) -> QueryModelResult<NamedNodePattern> {
    match var.value() {
        Some(Term::NamedNode(node)) => Ok(node.clone().into()),
        Some(term) => Err(QueryModelError::InvalidTerm(term.clone())),
        None => Ok(Variable::new(var.name())?.into()),
    }
}

fn term_to_ground_term(term: &Term) -> QueryModelResult<GroundTerm> {
    match term {
        Term::NamedNode(node) => Ok(node.clone().into()),
        Term::Literal(literal) => Ok(literal.clone().into()),
        term => Err(QueryModelError::InvalidTerm(term.clone())),
    }
}
