use rdf_federation_model::{
    AggregateExpression, Expression, GraphPattern, NodeKind, OrderExpression, QueryModelResult,
    Variable,
};

/// Decides what happens with the variables of an [Expression].
///
/// The rewriter is used by passes that must reach variables that are not held as
/// [Var](rdf_federation_model::Var)s, i.e., variables in filter conditions, computed bindings,
/// ordering, aggregates, and `EXISTS` patterns.
pub trait VariableRewriter {
    /// Rewrites a reference to `variable`.
    fn variable(&mut self, variable: &Variable) -> QueryModelResult<Expression>;

    /// Rewrites `BOUND(variable)`.
    fn bound(&mut self, variable: &Variable) -> QueryModelResult<Expression>;

    /// Rewrites the pattern of an `EXISTS` expression.
    fn pattern(&mut self, pattern: &GraphPattern) -> QueryModelResult<GraphPattern>;
}

/// Rewrites an [Expression] bottom-up.
pub fn rewrite_expression<R: VariableRewriter + ?Sized>(
    expression: &Expression,
    rewriter: &mut R,
) -> QueryModelResult<Expression> {
    let mut rewrite = |e: &Expression| rewrite_expression(e, rewriter).map(Box::new);
    Ok(match expression {
        Expression::NamedNode(_) | Expression::Literal(_) => expression.clone(),
        Expression::Variable(variable) => return rewriter.variable(variable),
        Expression::Bound(variable) => return rewriter.bound(variable),
        Expression::Exists(pattern) => Expression::Exists(Box::new(rewriter.pattern(pattern)?)),
        Expression::Or(lhs, rhs) => Expression::Or(rewrite(lhs)?, rewrite(rhs)?),
        Expression::And(lhs, rhs) => Expression::And(rewrite(lhs)?, rewrite(rhs)?),
        Expression::Equal(lhs, rhs) => Expression::Equal(rewrite(lhs)?, rewrite(rhs)?),
        Expression::SameTerm(lhs, rhs) => Expression::SameTerm(rewrite(lhs)?, rewrite(rhs)?),
        Expression::Greater(lhs, rhs) => Expression::Greater(rewrite(lhs)?, rewrite(rhs)?),
        Expression::GreaterOrEqual(lhs, rhs) => {
            Expression::GreaterOrEqual(rewrite(lhs)?, rewrite(rhs)?)
        }
        Expression::Less(lhs, rhs) => Expression::Less(rewrite(lhs)?, rewrite(rhs)?),
        Expression::LessOrEqual(lhs, rhs) => Expression::LessOrEqual(rewrite(lhs)?, rewrite(rhs)?),
        Expression::Add(lhs, rhs) => Expression::Add(rewrite(lhs)?, rewrite(rhs)?),
        Expression::Subtract(lhs, rhs) => Expression::Subtract(rewrite(lhs)?, rewrite(rhs)?),
        Expression::Multiply(lhs, rhs) => Expression::Multiply(rewrite(lhs)?, rewrite(rhs)?),
        Expression::Divide(lhs, rhs) => Expression::Divide(rewrite(lhs)?, rewrite(rhs)?),
        Expression::UnaryPlus(inner) => Expression::UnaryPlus(rewrite(inner)?),
        Expression::UnaryMinus(inner) => Expression::UnaryMinus(rewrite(inner)?),
        Expression::Not(inner) => Expression::Not(rewrite(inner)?),
        Expression::In(lhs, rhs) => Expression::In(
            rewrite(lhs)?,
            rhs.iter()
                .map(|e| rewrite_expression(e, rewriter))
                .collect::<QueryModelResult<_>>()?,
        ),
        Expression::If(condition, then, otherwise) => {
            Expression::If(rewrite(condition)?, rewrite(then)?, rewrite(otherwise)?)
        }
        Expression::Coalesce(args) => Expression::Coalesce(
            args.iter()
                .map(|e| rewrite_expression(e, rewriter))
                .collect::<QueryModelResult<_>>()?,
        ),
        Expression::FunctionCall(function, args) => Expression::FunctionCall(
            function.clone(),
            args.iter()
                .map(|e| rewrite_expression(e, rewriter))
                .collect::<QueryModelResult<_>>()?,
        ),
    })
}

pub fn rewrite_order_expression<R: VariableRewriter + ?Sized>(
    expression: &OrderExpression,
    rewriter: &mut R,
) -> QueryModelResult<OrderExpression> {
    Ok(match expression {
        OrderExpression::Asc(inner) => OrderExpression::Asc(rewrite_expression(inner, rewriter)?),
        OrderExpression::Desc(inner) => {
            OrderExpression::Desc(rewrite_expression(inner, rewriter)?)
        }
    })
}

pub fn rewrite_aggregate<R: VariableRewriter + ?Sized>(
    aggregate: &AggregateExpression,
    rewriter: &mut R,
) -> QueryModelResult<AggregateExpression> {
    Ok(match aggregate {
        AggregateExpression::CountSolutions { .. } => aggregate.clone(),
        AggregateExpression::FunctionCall {
            name,
            expr,
            distinct,
        } => AggregateExpression::FunctionCall {
            name: name.clone(),
            expr: rewrite_expression(expr, rewriter)?,
            distinct: *distinct,
        },
    })
}

/// Rewrites all expressions that are held directly by a node.
pub fn rewrite_node_expressions<R: VariableRewriter + ?Sized>(
    kind: &mut NodeKind,
    rewriter: &mut R,
) -> QueryModelResult<()> {
    match kind {
        NodeKind::Filter(filter) => {
            filter.condition = rewrite_expression(&filter.condition, rewriter)?;
        }
        NodeKind::Extension(extension) => {
            for element in &mut extension.elements {
                element.expression = rewrite_expression(&element.expression, rewriter)?;
            }
        }
        NodeKind::Order(order) => {
            for element in &mut order.elements {
                *element = rewrite_order_expression(element, rewriter)?;
            }
        }
        NodeKind::KeywordSearch(search) => {
            for element in &mut search.order {
                *element = rewrite_order_expression(element, rewriter)?;
            }
        }
        NodeKind::LeftJoin(left_join) => {
            if let Some(condition) = &mut left_join.condition {
                *condition = rewrite_expression(condition, rewriter)?;
            }
        }
        NodeKind::Group(group) => {
            for (_, aggregate) in &mut group.aggregates {
                *aggregate = rewrite_aggregate(aggregate, rewriter)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Returns the expressions that are held directly by a node.
pub fn node_expressions(kind: &NodeKind) -> Vec<&Expression> {
    fn order_expression(e: &OrderExpression) -> &Expression {
        match e {
            OrderExpression::Asc(inner) | OrderExpression::Desc(inner) => inner,
        }
    }

    match kind {
        NodeKind::Filter(filter) => vec![&filter.condition],
        NodeKind::Extension(extension) => {
            extension.elements.iter().map(|e| &e.expression).collect()
        }
        NodeKind::Order(order) => order.elements.iter().map(order_expression).collect(),
        NodeKind::KeywordSearch(search) => search.order.iter().map(order_expression).collect(),
        NodeKind::LeftJoin(left_join) => left_join.condition.iter().collect(),
        NodeKind::Group(group) => group
            .aggregates
            .iter()
            .filter_map(|(_, aggregate)| match aggregate {
                AggregateExpression::FunctionCall { expr, .. } => Some(expr),
                AggregateExpression::CountSolutions { .. } => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Collects the patterns of all `EXISTS` expressions within `expression`.
pub fn exists_patterns(expression: &Expression) -> Vec<&GraphPattern> {
    let mut result = Vec::new();
    collect_exists_patterns(expression, &mut result);
    result
}

fn collect_exists_patterns<'expr>(
    expression: &'expr Expression,
    result: &mut Vec<&'expr GraphPattern>,
) {
    match expression {
        Expression::Exists(pattern) => result.push(pattern),
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_) => {}
        Expression::Or(lhs, rhs)
        | Expression::And(lhs, rhs)
        | Expression::Equal(lhs, rhs)
        | Expression::SameTerm(lhs, rhs)
        | Expression::Greater(lhs, rhs)
        | Expression::GreaterOrEqual(lhs, rhs)
        | Expression::Less(lhs, rhs)
        | Expression::LessOrEqual(lhs, rhs)
        | Expression::Add(lhs, rhs)
        | Expression::Subtract(lhs, rhs)
        | Expression::Multiply(lhs, rhs)
        | Expression::Divide(lhs, rhs) => {
            collect_exists_patterns(lhs, result);
            collect_exists_patterns(rhs, result);
        }
        Expression::UnaryPlus(inner) | Expression::UnaryMinus(inner) | Expression::Not(inner) => {
            collect_exists_patterns(inner, result);
        }
        Expression::In(lhs, rhs) => {
            collect_exists_patterns(lhs, result);
            for e in rhs {
                collect_exists_patterns(e, result);
            }
        }
        Expression::If(condition, then, otherwise) => {
            collect_exists_patterns(condition, result);
            collect_exists_patterns(then, result);
            collect_exists_patterns(otherwise, result);
        }
        Expression::Coalesce(args) | Expression::FunctionCall(_, args) => {
            for e in args {
                collect_exists_patterns(e, result);
            }
        }
    }
}
