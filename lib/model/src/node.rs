use crate::{KeywordSearchNode, QueryModelResult, Var};
use oxrdf::{NamedNode, Term};
use rustc_hash::FxHashMap;
use spargebra::algebra::{
    AggregateExpression, Expression, GraphPattern, OrderExpression, PropertyPathExpression,
};
use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A stable handle to a node in a [QueryTree](crate::QueryTree).
///
/// Handles identify nodes, not structures. Two structurally equal sub-expressions always have
/// different handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The number of arguments an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
    Nary,
}

/// Describes how a `SERVICE <iri>` reference maps to a registered backend connection.
pub trait ServiceDescriptor: Debug + Send + Sync {
    /// The identifier of the member connection that answers this service.
    fn member_id(&self) -> &str;

    /// Whether the connection can evaluate `SERVICE` bodies natively.
    fn is_service_capable(&self) -> bool;
}

pub type ServiceDescriptorRef = Arc<dyn ServiceDescriptor>;

/// Maps service IRIs to their descriptors.
pub type ServiceMap = FxHashMap<NamedNode, ServiceDescriptorRef>;

/// A node kind that the core optimizer does not specifically handle.
pub trait OtherPayload: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Computes the assured bindings from the assured bindings of the children.
    fn assured_binding_names(&self, children: &[BTreeSet<String>]) -> BTreeSet<String>;

    /// Computes all possible bindings from the bindings of the children.
    fn binding_names(&self, children: &[BTreeSet<String>]) -> BTreeSet<String> {
        self.assured_binding_names(children)
    }

    /// Converts this node back into SPARQL algebra, given its already converted children.
    fn to_graph_pattern(&self, children: Vec<GraphPattern>) -> QueryModelResult<GraphPattern>;
}

/// A triple pattern. Constants are represented as anonymous [Var]s with a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementPattern {
    pub subject: Var,
    pub predicate: Var,
    pub object: Var,
}

/// A property path that is not a single predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    pub subject: Var,
    pub path: PropertyPathExpression,
    pub object: Var,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub name: String,
    pub value: Term,
}

/// One row of a `VALUES` block. Unbound variables have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindingSet(Vec<Binding>);

impl BindingSet {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self(bindings)
    }

    pub fn get(&self, name: &str) -> Option<&Term> {
        self.0.iter().find(|b| b.name == name).map(|b| &b.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Binding> for BindingSet {
    fn from_iter<T: IntoIterator<Item = Binding>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An inline `VALUES` block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingSetAssignment {
    pub variables: Vec<String>,
    pub rows: Vec<BindingSet>,
}

/// A `SERVICE` clause that has been resolved to a registered member connection.
#[derive(Debug, Clone)]
pub struct ServiceCall {
    pub service: NamedNode,
    pub descriptor: ServiceDescriptorRef,
    /// The body of the clause, as sent to the member.
    pub body: GraphPattern,
    pub silent: bool,
    pub assured_bindings: BTreeSet<String>,
    pub bindings: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionElem {
    /// The binding that is read from the argument.
    pub source: String,
    /// The output column name.
    pub target: String,
}

impl ProjectionElem {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            target: name,
        }
    }

    pub fn aliased(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Projection {
    pub arg: NodeId,
    pub elements: Vec<ProjectionElem>,
}

/// A computed binding (`BIND(expression AS ?name)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionElem {
    pub name: String,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extension {
    pub arg: NodeId,
    pub elements: Vec<ExtensionElem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    pub arg: NodeId,
    pub condition: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    pub arg: NodeId,
    pub elements: Vec<OrderExpression>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slice {
    pub arg: NodeId,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Group {
    pub arg: NodeId,
    pub group_by: Vec<String>,
    pub aggregates: Vec<(String, AggregateExpression)>,
}

/// `GRAPH name { arg }`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphScope {
    pub arg: NodeId,
    pub name: Var,
}

/// An unresolved `SERVICE` clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Service {
    pub arg: NodeId,
    pub name: Var,
    pub silent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryOperator {
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeftJoin {
    pub left: NodeId,
    pub right: NodeId,
    pub condition: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct OtherNode {
    pub children: Vec<NodeId>,
    pub payload: Arc<dyn OtherPayload>,
}

/// The operators of a [QueryTree](crate::QueryTree).
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The top of every tree.
    Root(NodeId),
    Pattern(StatementPattern),
    Path(PathPattern),
    /// A single solution without bindings.
    SingletonSet,
    /// No solutions.
    EmptySet,
    Values(BindingSetAssignment),
    ServiceCall(ServiceCall),
    KeywordSearch(KeywordSearchNode),
    Projection(Projection),
    Extension(Extension),
    Filter(Filter),
    Order(Order),
    Slice(Slice),
    Distinct(NodeId),
    Reduced(NodeId),
    Group(Group),
    Graph(GraphScope),
    Service(Service),
    Join(BinaryOperator),
    LeftJoin(LeftJoin),
    Union(BinaryOperator),
    Minus(BinaryOperator),
    NaryJoin(Vec<NodeId>),
    Other(OtherNode),
}

impl NodeKind {
    pub fn arity(&self) -> Arity {
        match self {
            NodeKind::Pattern(_)
            | NodeKind::Path(_)
            | NodeKind::SingletonSet
            | NodeKind::EmptySet
            | NodeKind::Values(_)
            | NodeKind::ServiceCall(_)
            | NodeKind::KeywordSearch(_) => Arity::Nullary,
            NodeKind::Root(_)
            | NodeKind::Projection(_)
            | NodeKind::Extension(_)
            | NodeKind::Filter(_)
            | NodeKind::Order(_)
            | NodeKind::Slice(_)
            | NodeKind::Distinct(_)
            | NodeKind::Reduced(_)
            | NodeKind::Group(_)
            | NodeKind::Graph(_)
            | NodeKind::Service(_) => Arity::Unary,
            NodeKind::Join(_) | NodeKind::LeftJoin(_) | NodeKind::Union(_) | NodeKind::Minus(_) => {
                Arity::Binary
            }
            NodeKind::NaryJoin(_) | NodeKind::Other(_) => Arity::Nary,
        }
    }

    /// Returns true if this node begins a new projection/subquery boundary.
    pub fn is_scope_root(&self) -> bool {
        matches!(self, NodeKind::Root(_) | NodeKind::Projection(_))
    }

    /// Returns true for the join operators whose arguments can be freely regrouped.
    pub fn is_join(&self) -> bool {
        matches!(self, NodeKind::Join(_) | NodeKind::NaryJoin(_))
    }

    pub fn name(&self) -> &str {
        match self {
            NodeKind::Root(_) => "Root",
            NodeKind::Pattern(_) => "Pattern",
            NodeKind::Path(_) => "Path",
            NodeKind::SingletonSet => "SingletonSet",
            NodeKind::EmptySet => "EmptySet",
            NodeKind::Values(_) => "Values",
            NodeKind::ServiceCall(_) => "ServiceCall",
            NodeKind::KeywordSearch(_) => "KeywordSearch",
            NodeKind::Projection(_) => "Projection",
            NodeKind::Extension(_) => "Extension",
            NodeKind::Filter(_) => "Filter",
            NodeKind::Order(_) => "Order",
            NodeKind::Slice(_) => "Slice",
            NodeKind::Distinct(_) => "Distinct",
            NodeKind::Reduced(_) => "Reduced",
            NodeKind::Group(_) => "Group",
            NodeKind::Graph(_) => "Graph",
            NodeKind::Service(_) => "Service",
            NodeKind::Join(_) => "Join",
            NodeKind::LeftJoin(_) => "LeftJoin",
            NodeKind::Union(_) => "Union",
            NodeKind::Minus(_) => "Minus",
            NodeKind::NaryJoin(_) => "NaryJoin",
            NodeKind::Other(other) => other.payload.name(),
        }
    }

    /// Returns the children of this node in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Pattern(_)
            | NodeKind::Path(_)
            | NodeKind::SingletonSet
            | NodeKind::EmptySet
            | NodeKind::Values(_)
            | NodeKind::ServiceCall(_)
            | NodeKind::KeywordSearch(_) => Vec::new(),
            NodeKind::Root(arg) | NodeKind::Distinct(arg) | NodeKind::Reduced(arg) => vec![*arg],
            NodeKind::Projection(Projection { arg, .. })
            | NodeKind::Extension(Extension { arg, .. })
            | NodeKind::Filter(Filter { arg, .. })
            | NodeKind::Order(Order { arg, .. })
            | NodeKind::Slice(Slice { arg, .. })
            | NodeKind::Group(Group { arg, .. })
            | NodeKind::Graph(GraphScope { arg, .. })
            | NodeKind::Service(Service { arg, .. }) => vec![*arg],
            NodeKind::Join(BinaryOperator { left, right })
            | NodeKind::Union(BinaryOperator { left, right })
            | NodeKind::Minus(BinaryOperator { left, right })
            | NodeKind::LeftJoin(LeftJoin { left, right, .. }) => vec![*left, *right],
            NodeKind::NaryJoin(children) | NodeKind::Other(OtherNode { children, .. }) => {
                children.clone()
            }
        }
    }

    /// Returns the edges to the children of this node.
    pub fn children_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            NodeKind::Pattern(_)
            | NodeKind::Path(_)
            | NodeKind::SingletonSet
            | NodeKind::EmptySet
            | NodeKind::Values(_)
            | NodeKind::ServiceCall(_)
            | NodeKind::KeywordSearch(_) => Vec::new(),
            NodeKind::Root(arg) | NodeKind::Distinct(arg) | NodeKind::Reduced(arg) => vec![arg],
            NodeKind::Projection(Projection { arg, .. })
            | NodeKind::Extension(Extension { arg, .. })
            | NodeKind::Filter(Filter { arg, .. })
            | NodeKind::Order(Order { arg, .. })
            | NodeKind::Slice(Slice { arg, .. })
            | NodeKind::Group(Group { arg, .. })
            | NodeKind::Graph(GraphScope { arg, .. })
            | NodeKind::Service(Service { arg, .. }) => vec![arg],
            NodeKind::Join(BinaryOperator { left, right })
            | NodeKind::Union(BinaryOperator { left, right })
            | NodeKind::Minus(BinaryOperator { left, right })
            | NodeKind::LeftJoin(LeftJoin { left, right, .. }) => vec![left, right],
            NodeKind::NaryJoin(children) | NodeKind::Other(OtherNode { children, .. }) => {
                children.iter_mut().collect()
            }
        }
    }

    /// Returns the variables that are held directly by this node.
    pub fn vars(&self) -> Vec<&Var> {
        match self {
            NodeKind::Pattern(pattern) => vec![&pattern.subject, &pattern.predicate, &pattern.object],
            NodeKind::Path(path) => vec![&path.subject, &path.object],
            NodeKind::Graph(GraphScope { name, .. }) | NodeKind::Service(Service { name, .. }) => {
                vec![name]
            }
            NodeKind::KeywordSearch(search) => search.pattern.vars(),
            _ => Vec::new(),
        }
    }

    /// Returns mutable references to the variables that are held directly by this node.
    pub fn vars_mut(&mut self) -> Vec<&mut Var> {
        match self {
            NodeKind::Pattern(pattern) => vec![
                &mut pattern.subject,
                &mut pattern.predicate,
                &mut pattern.object,
            ],
            NodeKind::Path(path) => vec![&mut path.subject, &mut path.object],
            NodeKind::Graph(GraphScope { name, .. }) | NodeKind::Service(Service { name, .. }) => {
                vec![name]
            }
            NodeKind::KeywordSearch(search) => search.pattern.vars_mut(),
            _ => Vec::new(),
        }
    }
}
