use crate::{KeywordSearchNode, NodeId, NodeKind, QueryTree};
use std::fmt::{Display, Formatter};

impl Display for QueryTree {
    /// Formats the attached nodes as an indented operator listing.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_node(f, self.root(), 0)
    }
}

impl QueryTree {
    /// Formats the sub-tree rooted at `node` like the [Display] implementation of the tree.
    pub fn display_node(&self, node: NodeId) -> String {
        DisplayNode { tree: self, node }.to_string()
    }

    fn fmt_node(&self, f: &mut Formatter<'_>, node: NodeId, depth: usize) -> std::fmt::Result {
        writeln!(f, "{:indent$}{}", "", NodeLabel(self.kind(node)), indent = depth * 2)?;
        for child in self.children(node) {
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

struct DisplayNode<'tree> {
    tree: &'tree QueryTree,
    node: NodeId,
}

impl Display for DisplayNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.tree.fmt_node(f, self.node, 0)
    }
}

struct NodeLabel<'kind>(&'kind NodeKind);

impl Display for NodeLabel<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = self.0;
        write!(f, "{}", kind.name())?;
        match kind {
            NodeKind::Pattern(pattern) => write!(
                f,
                ": {} {} {}",
                pattern.subject, pattern.predicate, pattern.object
            ),
            NodeKind::Path(path) => write!(f, ": {} {} {}", path.subject, path.path, path.object),
            NodeKind::Values(values) => {
                write!(f, ":")?;
                for variable in &values.variables {
                    write!(f, " ?{variable}")?;
                }
                write!(f, " ({} rows)", values.rows.len())
            }
            NodeKind::ServiceCall(call) => {
                write!(f, ": {} via {}", call.service, call.descriptor.member_id())?;
                if call.silent {
                    write!(f, " SILENT")?;
                }
                Ok(())
            }
            NodeKind::KeywordSearch(search) => fmt_keyword_search(f, search),
            NodeKind::Projection(projection) => {
                write!(f, ":")?;
                for element in &projection.elements {
                    if element.source == element.target {
                        write!(f, " ?{}", element.target)?;
                    } else {
                        write!(f, " (?{} AS ?{})", element.source, element.target)?;
                    }
                }
                Ok(())
            }
            NodeKind::Extension(extension) => {
                write!(f, ":")?;
                for element in &extension.elements {
                    write!(f, " ({} AS ?{})", element.expression, element.name)?;
                }
                Ok(())
            }
            NodeKind::Filter(filter) => write!(f, ": {}", filter.condition),
            NodeKind::Order(order) => {
                write!(f, ":")?;
                for element in &order.elements {
                    write!(f, " {element}")?;
                }
                Ok(())
            }
            NodeKind::Slice(slice) => {
                write!(f, ": offset={}", slice.offset)?;
                if let Some(limit) = slice.limit {
                    write!(f, " limit={limit}")?;
                }
                Ok(())
            }
            NodeKind::Group(group) => {
                write!(f, ":")?;
                for name in &group.group_by {
                    write!(f, " ?{name}")?;
                }
                for (name, aggregate) in &group.aggregates {
                    write!(f, " ({aggregate} AS ?{name})")?;
                }
                Ok(())
            }
            NodeKind::Graph(graph) => write!(f, ": {}", graph.name),
            NodeKind::Service(service) => {
                write!(f, ": {}", service.name)?;
                if service.silent {
                    write!(f, " SILENT")?;
                }
                Ok(())
            }
            NodeKind::LeftJoin(left_join) => match &left_join.condition {
                Some(condition) => write!(f, ": {condition}"),
                None => Ok(()),
            },
            NodeKind::Root(_)
            | NodeKind::SingletonSet
            | NodeKind::EmptySet
            | NodeKind::Distinct(_)
            | NodeKind::Reduced(_)
            | NodeKind::Join(_)
            | NodeKind::Union(_)
            | NodeKind::Minus(_)
            | NodeKind::NaryJoin(_)
            | NodeKind::Other(_) => Ok(()),
        }
    }
}

fn fmt_keyword_search(f: &mut Formatter<'_>, search: &KeywordSearchNode) -> std::fmt::Result {
    let pattern = &search.pattern;
    write!(f, ": {} matches {}", pattern.match_var, pattern.value)?;
    if let Some(subject) = &pattern.subject {
        write!(f, " subject={subject}")?;
        for predicate in &pattern.predicates {
            write!(f, " predicate={predicate}")?;
        }
    }
    if let Some(score) = &pattern.score {
        write!(f, " score={score}")?;
    }
    if let Some(snippet) = &pattern.snippet {
        write!(f, " snippet={snippet}")?;
    }
    for type_var in &pattern.types {
        write!(f, " type={type_var}")?;
    }
    for order in &search.order {
        write!(f, " order={order}")?;
    }
    if let Some(limit) = search.limit {
        write!(f, " limit={limit}")?;
    }
    Ok(())
}
