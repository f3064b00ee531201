use crate::expression::{rewrite_node_expressions, VariableRewriter};
use rdf_federation_model::{
    visit_tree, walk_node, BindingSet, Expression, Extension, ExtensionElem, Filter, GraphPattern,
    Literal, NodeId, NodeKind, QueryModelError, QueryModelResult, QueryModelVisitor, QueryTree,
    Term, Var, Variable,
};
use std::collections::BTreeMap;

/// Maps variable names to the values that are bound to them.
pub type ParameterBindings = BTreeMap<String, Term>;

/// Binds parameter values to the free variables of a tree.
///
/// The output columns of a query never change. If a projected or grouped variable becomes a
/// constant, its value is re-introduced with a `BIND(value AS ?name)` below the projection.
///
/// Operators that assign a parameter themselves are narrowed to the parameter's value: `VALUES`
/// rows with another value are dropped together with the column, and `BIND(expr AS ?name)`
/// becomes `FILTER(sameTerm(expr, value))`.
pub struct Parametrizer<'bindings> {
    bindings: &'bindings ParameterBindings,
}

impl<'bindings> Parametrizer<'bindings> {
    pub fn new(bindings: &'bindings ParameterBindings) -> Self {
        Self { bindings }
    }

    /// Introduces a `BIND` above `arg` for every name in `names` that is a parameter and is no
    /// longer produced by `arg`.
    fn rebind<'name>(
        &self,
        tree: &mut QueryTree,
        arg: NodeId,
        names: impl IntoIterator<Item = &'name String>,
    ) -> QueryModelResult<()> {
        let produced = tree.binding_names(arg);
        let mut elements = Vec::new();
        for name in names {
            let Some(value) = self.bindings.get(name) else {
                continue;
            };
            if produced.contains(name) || elements.iter().any(|e: &ExtensionElem| e.name == *name)
            {
                continue;
            }
            elements.push(ExtensionElem {
                name: name.clone(),
                expression: term_to_expression(name, value)?,
            });
        }

        if !elements.is_empty() {
            tree.insert_above(arg, |arg| NodeKind::Extension(Extension { arg, elements }))?;
        }
        Ok(())
    }
}

impl QueryModelVisitor for Parametrizer<'_> {
    fn meet_node(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        rewrite_node_expressions(tree.kind_mut(node), self)?;
        walk_node(self, tree, node)
    }

    fn meet_var(&mut self, var: &mut Var) -> QueryModelResult<()> {
        if var.is_anonymous() || !var.is_free() {
            return Ok(());
        }
        if let Some(value) = self.bindings.get(var.name()) {
            var.bind_value(value.clone());
        }
        Ok(())
    }

    fn meet_values(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        let NodeKind::Values(values) = tree.kind_mut(node) else {
            return QueryModelError::inconsistent(format!("{node} is not a values block"));
        };
        let bindings = self.bindings;
        let is_parameter = |name: &str| bindings.contains_key(name);
        if !values.variables.iter().any(|name| is_parameter(name)) {
            return Ok(());
        }

        values.rows.retain(|row| {
            row.iter()
                .all(|binding| bindings.get(&binding.name).map_or(true, |v| *v == binding.value))
        });
        for row in &mut values.rows {
            *row = row
                .iter()
                .filter(|binding| !is_parameter(&binding.name))
                .cloned()
                .collect::<BindingSet>();
        }
        values.variables.retain(|name| !is_parameter(name));
        tracing::trace!(%node, rows = values.rows.len(), "Narrowed values block to parameters");
        Ok(())
    }

    fn meet_extension(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        rewrite_node_expressions(tree.kind_mut(node), self)?;
        let NodeKind::Extension(extension) = tree.kind_mut(node) else {
            return QueryModelError::inconsistent(format!("{node} is not an extension"));
        };

        let mut conditions = Vec::new();
        let mut kept = Vec::new();
        for element in std::mem::take(&mut extension.elements) {
            match self.bindings.get(&element.name) {
                Some(value) => conditions.push(Expression::SameTerm(
                    Box::new(element.expression),
                    Box::new(term_to_expression(&element.name, value)?),
                )),
                None => kept.push(element),
            }
        }
        extension.elements = kept;

        if let Some(condition) = conditions
            .into_iter()
            .reduce(|left, right| Expression::And(Box::new(left), Box::new(right)))
        {
            tree.insert_above(node, |arg| NodeKind::Filter(Filter { arg, condition }))?;
        }
        walk_node(self, tree, node)
    }

    fn meet_projection(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)?;
        let NodeKind::Projection(projection) = tree.kind(node) else {
            return QueryModelError::inconsistent(format!("{node} is not a projection"));
        };
        let arg = projection.arg;
        let sources = projection
            .elements
            .iter()
            .map(|e| e.source.clone())
            .collect::<Vec<_>>();
        self.rebind(tree, arg, &sources)
    }

    fn meet_group(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)?;
        let NodeKind::Group(group) = tree.kind(node) else {
            return QueryModelError::inconsistent(format!("{node} is not a group"));
        };
        let arg = group.arg;
        let group_by = group.group_by.clone();
        self.rebind(tree, arg, &group_by)
    }

    fn meet_service_call(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        let NodeKind::ServiceCall(call) = tree.kind_mut(node) else {
            return QueryModelError::inconsistent(format!("{node} is not a service call"));
        };
        call.body = self.pattern(&call.body)?;

        let body = QueryTree::from_graph_pattern(&call.body)?;
        call.assured_bindings = body.assured_binding_names(body.root());
        call.bindings = body.binding_names(body.root());
        Ok(())
    }
}

impl VariableRewriter for Parametrizer<'_> {
    fn variable(&mut self, variable: &Variable) -> QueryModelResult<Expression> {
        match self.bindings.get(variable.as_str()) {
            Some(value) => term_to_expression(variable.as_str(), value),
            None => Ok(Expression::Variable(variable.clone())),
        }
    }

    fn bound(&mut self, variable: &Variable) -> QueryModelResult<Expression> {
        Ok(if self.bindings.contains_key(variable.as_str()) {
            Expression::Literal(Literal::from(true))
        } else {
            Expression::Bound(variable.clone())
        })
    }

    fn pattern(&mut self, pattern: &GraphPattern) -> QueryModelResult<GraphPattern> {
        let mut tree = QueryTree::from_graph_pattern(pattern)?;
        visit_tree(self, &mut tree)?;
        tree.to_graph_pattern()
    }
}

fn term_to_expression(name: &str, value: &Term) -> QueryModelResult<Expression> {
    match value {
        Term::NamedNode(node) => Ok(Expression::NamedNode(node.clone())),
        Term::Literal(literal) => Ok(Expression::Literal(literal.clone())),
        _ => Err(QueryModelError::InvalidParameter {
            name: name.to_owned(),
            reason: format!("{value} cannot be used within an expression"),
        }),
    }
}

/// Binds `bindings` to the free variables of `tree` without changing its output columns.
pub fn parametrize(tree: &mut QueryTree, bindings: &ParameterBindings) -> QueryModelResult<()> {
    if bindings.is_empty() {
        return Ok(());
    }
    // A blank node in a pattern would act as a variable.
    if let Some((name, value)) = bindings.iter().find(|(_, v)| v.is_blank_node()) {
        return Err(QueryModelError::InvalidParameter {
            name: name.clone(),
            reason: format!("{value} is a blank node"),
        });
    }
    tracing::debug!(parameters = ?bindings.keys().collect::<Vec<_>>(), "Parametrizing query");
    visit_tree(&mut Parametrizer::new(bindings), tree)
}
