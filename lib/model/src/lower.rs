use crate::{
    BinaryOperator, Binding, BindingSet, BindingSetAssignment, Extension, ExtensionElem, Filter,
    GraphScope, Group, LeftJoin, NodeId, NodeKind, Order, PathPattern, Projection, ProjectionElem,
    QueryModelError, QueryModelResult, QueryTree, Service, Slice, StatementPattern, Var,
    BLANK_NODE_VAR_PREFIX,
};
use oxrdf::Term;
use spargebra::algebra::{GraphPattern, PropertyPathExpression};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};

impl QueryTree {
    /// Builds a tree from a SPARQL algebra expression.
    ///
    /// Basic graph patterns become left-deep [NodeKind::Join] chains of [NodeKind::Pattern] leaves.
    /// An empty basic graph pattern becomes a [NodeKind::SingletonSet] and joins with such a side
    /// collapse into the other side.
    pub fn from_graph_pattern(pattern: &GraphPattern) -> QueryModelResult<Self> {
        let mut tree = QueryTree::new();
        let arg = tree.lower(pattern)?;
        tree.set_root_argument(arg)?;
        Ok(tree)
    }

    /// Lowers `pattern` into detached nodes of this tree and returns the top node.
    pub fn lower(&mut self, pattern: &GraphPattern) -> QueryModelResult<NodeId> {
        match pattern {
            GraphPattern::Bgp { patterns } => {
                let mut result: Option<NodeId> = None;
                for triple in patterns {
                    let leaf = self.lower_triple(triple)?;
                    result = Some(match result {
                        None => leaf,
                        Some(left) => self.add(NodeKind::Join(BinaryOperator {
                            left,
                            right: leaf,
                        }))?,
                    });
                }
                match result {
                    Some(node) => Ok(node),
                    None => self.add(NodeKind::SingletonSet),
                }
            }
            GraphPattern::Path {
                subject,
                path,
                object,
            } => {
                let subject = self.lower_term_pattern(subject)?;
                let object = self.lower_term_pattern(object)?;
                let kind = match path {
                    PropertyPathExpression::NamedNode(predicate) => {
                        NodeKind::Pattern(StatementPattern {
                            subject,
                            predicate: self.constant(predicate.clone()),
                            object,
                        })
                    }
                    path => NodeKind::Path(PathPattern {
                        subject,
                        path: path.clone(),
                        object,
                    }),
                };
                self.add(kind)
            }
            GraphPattern::Join { left, right } => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                if matches!(self.kind(left), NodeKind::SingletonSet) {
                    return Ok(right);
                }
                if matches!(self.kind(right), NodeKind::SingletonSet) {
                    return Ok(left);
                }
                self.add(NodeKind::Join(BinaryOperator { left, right }))
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                self.add(NodeKind::LeftJoin(LeftJoin {
                    left,
                    right,
                    condition: expression.clone(),
                }))
            }
            GraphPattern::Filter { expr, inner } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Filter(Filter {
                    arg,
                    condition: expr.clone(),
                }))
            }
            GraphPattern::Union { left, right } => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                self.add(NodeKind::Union(BinaryOperator { left, right }))
            }
            GraphPattern::Minus { left, right } => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                self.add(NodeKind::Minus(BinaryOperator { left, right }))
            }
            GraphPattern::Graph { name, inner } => {
                let arg = self.lower(inner)?;
                let name = self.lower_named_node_pattern(name);
                self.add(NodeKind::Graph(GraphScope { arg, name }))
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Extension(Extension {
                    arg,
                    elements: vec![ExtensionElem {
                        name: variable.as_str().to_owned(),
                        expression: expression.clone(),
                    }],
                }))
            }
            GraphPattern::Values {
                variables,
                bindings,
            } => {
                let rows = bindings
                    .iter()
                    .map(|row| {
                        variables
                            .iter()
                            .zip(row)
                            .filter_map(|(variable, value)| {
                                value.as_ref().map(|value| {
                                    ground_term_to_term(value).map(|value| Binding {
                                        name: variable.as_str().to_owned(),
                                        value,
                                    })
                                })
                            })
                            .collect::<QueryModelResult<BindingSet>>()
                    })
                    .collect::<QueryModelResult<Vec<_>>>()?;
                self.add(NodeKind::Values(BindingSetAssignment {
                    variables: variables.iter().map(|v| v.as_str().to_owned()).collect(),
                    rows,
                }))
            }
            GraphPattern::OrderBy { inner, expression } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Order(Order {
                    arg,
                    elements: expression.clone(),
                }))
            }
            GraphPattern::Project { inner, variables } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Projection(Projection {
                    arg,
                    elements: variables
                        .iter()
                        .map(|v| ProjectionElem::new(v.as_str()))
                        .collect(),
                }))
            }
            GraphPattern::Distinct { inner } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Distinct(arg))
            }
            GraphPattern::Reduced { inner } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Reduced(arg))
            }
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Slice(Slice {
                    arg,
                    offset: *start,
                    limit: *length,
                }))
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                let arg = self.lower(inner)?;
                self.add(NodeKind::Group(Group {
                    arg,
                    group_by: variables.iter().map(|v| v.as_str().to_owned()).collect(),
                    aggregates: aggregates
                        .iter()
                        .map(|(v, a)| (v.as_str().to_owned(), a.clone()))
                        .collect(),
                }))
            }
            GraphPattern::Service {
                name,
                inner,
                silent,
            } => {
                let arg = self.lower(inner)?;
                let name = self.lower_named_node_pattern(name);
                self.add(NodeKind::Service(Service {
                    arg,
                    name,
                    silent: *silent,
                }))
            }
            #[allow(
                unreachable_patterns,
                reason = "Only reachable if optional SPARQL extensions are enabled"
            )]
            pattern => Err(QueryModelError::NotImplemented(format!(
                "Lowering graph pattern: {pattern}"
            ))),
        }
    }

    fn lower_triple(&mut self, triple: &TriplePattern) -> QueryModelResult<NodeId> {
        let subject = self.lower_term_pattern(&triple.subject)?;
        let predicate = self.lower_named_node_pattern(&triple.predicate);
        let object = self.lower_term_pattern(&triple.object)?;
        self.add(NodeKind::Pattern(StatementPattern {
            subject,
            predicate,
            object,
        }))
    }

    fn lower_term_pattern(&mut self, term: &TermPattern) -> QueryModelResult<Var> {
        Ok(match term {
            TermPattern::Variable(variable) => Var::new(variable.as_str()),
            TermPattern::BlankNode(node) => {
                Var::new(format!("{BLANK_NODE_VAR_PREFIX}{}", node.as_str()))
            }
            TermPattern::NamedNode(node) => self.constant(node.clone()),
            TermPattern::Literal(literal) => self.constant(literal.clone()),
            #[allow(
                unreachable_patterns,
                reason = "Only reachable if RDF-star is enabled"
            )]
            term => {
                return Err(QueryModelError::NotImplemented(format!(
                    "Lowering term pattern: {term}"
                )))
            }
        })
    }

    fn lower_named_node_pattern(&mut self, pattern: &NamedNodePattern) -> Var {
        match pattern {
            NamedNodePattern::NamedNode(node) => self.constant(node.clone()),
            NamedNodePattern::Variable(variable) => Var::new(variable.as_str()),
        }
    }

    /// Creates an anonymous variable that holds `value`.
    pub fn constant(&mut self, value: impl Into<Term>) -> Var {
        Var::constant(self.next_constant_name(), value)
    }
}

fn ground_term_to_term(term: &GroundTerm) -> QueryModelResult<Term> {
    match term {
        GroundTerm::NamedNode(node) => Ok(node.clone().into()),
        GroundTerm::Literal(literal) => Ok(literal.clone().into()),
        #[allow(
            unreachable_patterns,
            reason = "Only reachable if RDF-star is enabled"
        )]
        term => Err(QueryModelError::NotImplemented(format!(
            "Lowering ground term: {term}"
        ))),
    }
}
