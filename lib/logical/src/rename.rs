use crate::expression::{rewrite_node_expressions, VariableRewriter};
use rdf_federation_model::{
    visit_tree, walk_node, Binding, BindingSet, Expression, GraphPattern, NodeId, NodeKind,
    QueryModelResult, QueryModelVisitor, QueryTree, Var, Variable,
};
use std::collections::BTreeSet;

/// Renames a free variable in all places that can refer to it by name.
///
/// Besides the variables of patterns, this includes projection elements, computed bindings,
/// `VALUES` blocks, grouping, expressions, and the bodies of resolved service calls. Variables
/// that hold a value are never renamed.
pub struct VariableRenamer {
    from: String,
    to: Variable,
}

impl VariableRenamer {
    /// Creates a new renamer. Fails if `to` is not a valid variable name.
    pub fn try_new(from: impl Into<String>, to: &str) -> QueryModelResult<Self> {
        Ok(Self {
            from: from.into(),
            to: Variable::new(to)?,
        })
    }

    fn rename(&self, name: &mut String) {
        if *name == self.from {
            self.to.as_str().clone_into(name);
        }
    }

    fn rename_set(&self, names: &mut BTreeSet<String>) {
        if names.remove(&self.from) {
            names.insert(self.to.as_str().to_owned());
        }
    }

    fn rename_node(&mut self, kind: &mut NodeKind) -> QueryModelResult<()> {
        rewrite_node_expressions(kind, self)?;
        match kind {
            NodeKind::Projection(projection) => {
                for element in &mut projection.elements {
                    self.rename(&mut element.source);
                    self.rename(&mut element.target);
                }
            }
            NodeKind::Extension(extension) => {
                for element in &mut extension.elements {
                    self.rename(&mut element.name);
                }
            }
            NodeKind::Values(values) => {
                for variable in &mut values.variables {
                    self.rename(variable);
                }
                for row in &mut values.rows {
                    *row = row
                        .iter()
                        .map(|binding| {
                            let mut name = binding.name.clone();
                            self.rename(&mut name);
                            Binding {
                                name,
                                value: binding.value.clone(),
                            }
                        })
                        .collect::<BindingSet>();
                }
            }
            NodeKind::Group(group) => {
                for name in &mut group.group_by {
                    self.rename(name);
                }
                for (name, _) in &mut group.aggregates {
                    self.rename(name);
                }
            }
            NodeKind::ServiceCall(call) => {
                call.body = self.pattern(&call.body)?;
                self.rename_set(&mut call.assured_bindings);
                self.rename_set(&mut call.bindings);
            }
            _ => {}
        }
        Ok(())
    }
}

impl QueryModelVisitor for VariableRenamer {
    fn meet_node(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.rename_node(tree.kind_mut(node))?;
        walk_node(self, tree, node)
    }

    fn meet_var(&mut self, var: &mut Var) -> QueryModelResult<()> {
        if !var.is_anonymous() && var.free_name() == Some(self.from.as_str()) {
            var.set_name(self.to.as_str());
        }
        Ok(())
    }
}

impl VariableRewriter for VariableRenamer {
    fn variable(&mut self, variable: &Variable) -> QueryModelResult<Expression> {
        Ok(Expression::Variable(if variable.as_str() == self.from {
            self.to.clone()
        } else {
            variable.clone()
        }))
    }

    fn bound(&mut self, variable: &Variable) -> QueryModelResult<Expression> {
        Ok(Expression::Bound(if variable.as_str() == self.from {
            self.to.clone()
        } else {
            variable.clone()
        }))
    }

    fn pattern(&mut self, pattern: &GraphPattern) -> QueryModelResult<GraphPattern> {
        let mut tree = QueryTree::from_graph_pattern(pattern)?;
        visit_tree(self, &mut tree)?;
        tree.to_graph_pattern()
    }
}

/// Renames the free variable `from` to `to` in the whole tree.
pub fn rename_variable(tree: &mut QueryTree, from: &str, to: &str) -> QueryModelResult<()> {
    let mut renamer = VariableRenamer::try_new(from, to)?;
    tracing::debug!(from, to, "Renaming variable");
    visit_tree(&mut renamer, tree)
}
