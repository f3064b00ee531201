use crate::node::Projection;
use crate::{
    BinaryOperator, ExtensionElem, GraphScope, LeftJoin, NodeId, NodeKind, OtherNode,
    QueryModelError, QueryModelResult, Var,
};
use rustc_hash::FxHashSet;
use spargebra::algebra::Expression;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
struct NodeSlot {
    kind: NodeKind,
    parent: Option<NodeId>,
}

/// A query expression tree.
///
/// The tree is an arena of nodes addressed by [NodeId]s. Parent and child relations are stored as
/// handles, so structural replacement only rewrites the edge at a given handle. Every tree has a
/// [NodeKind::Root] node whose single argument is the query pattern.
///
/// Nodes that are removed from the tree stay in the arena but are *detached*: they are no longer
/// reachable from the root and have no parent. Accessors panic if given a handle that was not
/// created by this tree.
#[derive(Debug, Clone)]
pub struct QueryTree {
    nodes: Vec<NodeSlot>,
    root: NodeId,
    constants: usize,
}

impl Default for QueryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryTree {
    /// Creates a new tree whose root argument is a [NodeKind::SingletonSet].
    pub fn new() -> Self {
        let singleton = NodeSlot {
            kind: NodeKind::SingletonSet,
            parent: Some(NodeId::new(1)),
        };
        let root = NodeSlot {
            kind: NodeKind::Root(NodeId::new(0)),
            parent: None,
        };
        Self {
            nodes: vec![singleton, root],
            root: NodeId::new(1),
            constants: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the argument of the root node.
    pub fn root_argument(&self) -> NodeId {
        match self.kind(self.root) {
            NodeKind::Root(arg) => *arg,
            _ => unreachable!("The root is always a Root node"),
        }
    }

    /// Makes the detached node `arg` the argument of the root.
    pub fn set_root_argument(&mut self, arg: NodeId) -> QueryModelResult<()> {
        let current = self.root_argument();
        self.replace_child(self.root, current, arg)
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.index()].kind
    }

    pub fn kind_mut(&mut self, node: NodeId) -> &mut NodeKind {
        &mut self.nodes[node.index()].kind
    }

    /// Returns true if `node` is a handle of this tree's arena.
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.kind(node).children()
    }

    /// Creates a new variable name for a constant of this tree.
    pub fn next_constant_name(&mut self) -> String {
        let name = format!("{}{}", crate::CONSTANT_VAR_PREFIX, self.constants);
        self.constants += 1;
        name
    }

    /// Adds a new node to the arena.
    ///
    /// The children of `kind` must be detached. They become attached to the new node, which is
    /// itself detached until it is linked into the tree.
    pub fn add(&mut self, kind: NodeKind) -> QueryModelResult<NodeId> {
        let children = kind.children();
        let mut seen = FxHashSet::default();
        for child in &children {
            if !self.contains(*child) {
                return Err(QueryModelError::UnknownNode(*child));
            }
            if *child == self.root || self.parent(*child).is_some() || !seen.insert(*child) {
                return Err(QueryModelError::AlreadyAttached(*child));
            }
        }

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeSlot { kind, parent: None });
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
        Ok(id)
    }

    /// Inserts a new unary node between `child` and its parent. `create` receives `child` as the
    /// argument of the new node.
    pub fn insert_above(
        &mut self,
        child: NodeId,
        create: impl FnOnce(NodeId) -> NodeKind,
    ) -> QueryModelResult<NodeId> {
        let parent = self
            .parent(child)
            .ok_or(QueryModelError::DetachedNode(child))?;
        let kind = create(child);
        if kind.children() != vec![child] {
            return QueryModelError::inconsistent(format!(
                "The node inserted above {child} must have it as its only argument"
            ));
        }

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeSlot {
            kind,
            parent: Some(parent),
        });
        self.relink(parent, child, id)?;
        self.nodes[child.index()].parent = Some(id);
        Ok(id)
    }

    /// Replaces `old` with `new` in the parent of `old`. Afterward, `old` is detached.
    ///
    /// `new` must either be detached or be a child of `old` (i.e., `old` is collapsed into one of
    /// its arguments).
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> QueryModelResult<()> {
        if old == self.root {
            return Err(QueryModelError::CannotRemoveRoot);
        }
        let parent = self.parent(old).ok_or(QueryModelError::DetachedNode(old))?;
        self.replace_child(parent, old, new)
    }

    /// Replaces the edge `parent -> old` with `parent -> new`. Afterward, `old` is detached.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> QueryModelResult<()> {
        if new == self.root {
            return Err(QueryModelError::CannotRemoveRoot);
        }
        if !self.contains(new) {
            return Err(QueryModelError::UnknownNode(new));
        }
        if let Some(new_parent) = self.parent(new) {
            if new_parent != old {
                return Err(QueryModelError::AlreadyAttached(new));
            }
        }

        self.relink(parent, old, new)?;
        self.nodes[old.index()].parent = None;
        self.nodes[new.index()].parent = Some(parent);
        Ok(())
    }

    /// Removes `child` from the argument list of an n-ary `parent`. An argument list that becomes
    /// empty receives a [NodeKind::SingletonSet] so that the operator stays well-formed.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> QueryModelResult<()> {
        let children = match self.kind_mut(parent) {
            NodeKind::NaryJoin(children) | NodeKind::Other(OtherNode { children, .. }) => children,
            kind => {
                return Err(QueryModelError::NotImplemented(format!(
                    "Removing an argument from a {} node",
                    kind.name()
                )))
            }
        };
        let position = children
            .iter()
            .position(|c| *c == child)
            .ok_or(QueryModelError::NotAChild { parent, child })?;
        children.remove(position);
        let now_empty = children.is_empty();
        self.nodes[child.index()].parent = None;

        if now_empty {
            let singleton = self.add(NodeKind::SingletonSet)?;
            if let NodeKind::NaryJoin(children) | NodeKind::Other(OtherNode { children, .. }) =
                self.kind_mut(parent)
            {
                children.push(singleton);
            }
            self.nodes[singleton.index()].parent = Some(parent);
        }
        Ok(())
    }

    /// Returns true if `node` is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Returns the nearest scope root above `node`, excluding `node` itself.
    ///
    /// The scope is computed by walking the parent links and is never cached, as passes change the
    /// shape of the tree.
    pub fn scope_of(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            if self.kind(ancestor).is_scope_root() {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    /// Lists all attached nodes, parents before children.
    pub fn pre_order(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// Lists `node` and all nodes below it, parents before children.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        result
    }

    /// Returns the names of the bindings that every solution of `node` carries.
    pub fn assured_binding_names(&self, node: NodeId) -> BTreeSet<String> {
        match self.kind(node) {
            NodeKind::Root(arg)
            | NodeKind::Distinct(arg)
            | NodeKind::Reduced(arg)
            | NodeKind::Filter(crate::Filter { arg, .. })
            | NodeKind::Order(crate::Order { arg, .. })
            | NodeKind::Slice(crate::Slice { arg, .. })
            | NodeKind::Service(crate::Service { arg, .. }) => self.assured_binding_names(*arg),
            NodeKind::Pattern(_) | NodeKind::Path(_) => free_names(self.kind(node).vars()),
            NodeKind::SingletonSet | NodeKind::EmptySet => BTreeSet::new(),
            NodeKind::Values(values) => values
                .variables
                .iter()
                .filter(|name| values.rows.iter().all(|row| row.get(name).is_some()))
                .cloned()
                .collect(),
            NodeKind::ServiceCall(call) => call.assured_bindings.clone(),
            NodeKind::KeywordSearch(search) => search.pattern.assured_binding_names(),
            NodeKind::Projection(Projection { arg, elements }) => {
                let inner = self.assured_binding_names(*arg);
                elements
                    .iter()
                    .filter(|e| inner.contains(&e.source))
                    .map(|e| e.target.clone())
                    .collect()
            }
            NodeKind::Extension(extension) => {
                let mut result = self.assured_binding_names(extension.arg);
                result.extend(
                    extension
                        .elements
                        .iter()
                        .filter(|e| is_constant_expression(e))
                        .map(|e| e.name.clone()),
                );
                result
            }
            NodeKind::Group(group) => {
                let inner = self.assured_binding_names(group.arg);
                group
                    .group_by
                    .iter()
                    .filter(|name| inner.contains(*name))
                    .cloned()
                    .collect()
            }
            NodeKind::Graph(GraphScope { arg, name }) => {
                let mut result = self.assured_binding_names(*arg);
                result.extend(name.free_name().map(ToOwned::to_owned));
                result
            }
            NodeKind::Join(BinaryOperator { left, right }) => {
                let mut result = self.assured_binding_names(*left);
                result.extend(self.assured_binding_names(*right));
                result
            }
            NodeKind::NaryJoin(children) => children
                .iter()
                .flat_map(|c| self.assured_binding_names(*c))
                .collect(),
            NodeKind::LeftJoin(LeftJoin { left, .. })
            | NodeKind::Minus(BinaryOperator { left, .. }) => self.assured_binding_names(*left),
            NodeKind::Union(BinaryOperator { left, right }) => {
                let right = self.assured_binding_names(*right);
                self.assured_binding_names(*left)
                    .into_iter()
                    .filter(|name| right.contains(name))
                    .collect()
            }
            NodeKind::Other(other) => {
                let children = other
                    .children
                    .iter()
                    .map(|c| self.assured_binding_names(*c))
                    .collect::<Vec<_>>();
                other.payload.assured_binding_names(&children)
            }
        }
    }

    /// Returns the names of all bindings that a solution of `node` may carry.
    pub fn binding_names(&self, node: NodeId) -> BTreeSet<String> {
        match self.kind(node) {
            NodeKind::Root(arg)
            | NodeKind::Distinct(arg)
            | NodeKind::Reduced(arg)
            | NodeKind::Filter(crate::Filter { arg, .. })
            | NodeKind::Order(crate::Order { arg, .. })
            | NodeKind::Slice(crate::Slice { arg, .. })
            | NodeKind::Service(crate::Service { arg, .. }) => self.binding_names(*arg),
            NodeKind::Pattern(_) | NodeKind::Path(_) => free_names(self.kind(node).vars()),
            NodeKind::SingletonSet | NodeKind::EmptySet => BTreeSet::new(),
            NodeKind::Values(values) => values.variables.iter().cloned().collect(),
            NodeKind::ServiceCall(call) => call.bindings.clone(),
            NodeKind::KeywordSearch(search) => search.pattern.binding_names(),
            NodeKind::Projection(projection) => projection
                .elements
                .iter()
                .map(|e| e.target.clone())
                .collect(),
            NodeKind::Extension(extension) => {
                let mut result = self.binding_names(extension.arg);
                result.extend(extension.elements.iter().map(|e| e.name.clone()));
                result
            }
            NodeKind::Group(group) => group
                .group_by
                .iter()
                .cloned()
                .chain(group.aggregates.iter().map(|(name, _)| name.clone()))
                .collect(),
            NodeKind::Graph(GraphScope { arg, name }) => {
                let mut result = self.binding_names(*arg);
                result.extend(name.free_name().map(ToOwned::to_owned));
                result
            }
            NodeKind::Join(BinaryOperator { left, right })
            | NodeKind::Union(BinaryOperator { left, right })
            | NodeKind::LeftJoin(LeftJoin { left, right, .. }) => {
                let mut result = self.binding_names(*left);
                result.extend(self.binding_names(*right));
                result
            }
            NodeKind::NaryJoin(children) => {
                children.iter().flat_map(|c| self.binding_names(*c)).collect()
            }
            NodeKind::Minus(BinaryOperator { left, .. }) => self.binding_names(*left),
            NodeKind::Other(other) => {
                let children = other
                    .children
                    .iter()
                    .map(|c| self.binding_names(*c))
                    .collect::<Vec<_>>();
                other.payload.binding_names(&children)
            }
        }
    }

    /// Returns the output column names of the query, in order.
    ///
    /// If the query has a top-level projection, its targets are returned. Otherwise, all bindings
    /// of the query are returned in lexicographic order.
    pub fn output_names(&self) -> Vec<String> {
        let mut current = self.root_argument();
        loop {
            match self.kind(current) {
                NodeKind::Projection(projection) => {
                    return projection
                        .elements
                        .iter()
                        .map(|e| e.target.clone())
                        .collect()
                }
                NodeKind::Slice(crate::Slice { arg, .. })
                | NodeKind::Order(crate::Order { arg, .. })
                | NodeKind::Distinct(arg)
                | NodeKind::Reduced(arg) => current = *arg,
                _ => return self.binding_names(self.root).into_iter().collect(),
            }
        }
    }

    /// Checks that the parent and child links of all attached nodes agree.
    pub fn validate(&self) -> QueryModelResult<()> {
        if self.parent(self.root).is_some() {
            return QueryModelError::inconsistent("The root has a parent");
        }
        let mut seen = FxHashSet::default();
        for node in self.pre_order() {
            if !seen.insert(node) {
                return QueryModelError::inconsistent(format!(
                    "The node {node} is reachable over multiple paths"
                ));
            }
            for child in self.children(node) {
                if self.parent(child) != Some(node) {
                    return QueryModelError::inconsistent(format!(
                        "The node {child} is a child of {node} but its parent link differs"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Points the edge `parent -> old` to `new` without touching the parent links.
    fn relink(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> QueryModelResult<()> {
        let edge = self
            .kind_mut(parent)
            .children_mut()
            .into_iter()
            .find(|edge| **edge == old)
            .ok_or(QueryModelError::NotAChild { parent, child: old })?;
        *edge = new;
        Ok(())
    }
}

fn free_names(vars: Vec<&Var>) -> BTreeSet<String> {
    vars.into_iter()
        .filter_map(Var::free_name)
        .map(ToOwned::to_owned)
        .collect()
}

fn is_constant_expression(element: &ExtensionElem) -> bool {
    matches!(
        element.expression,
        Expression::NamedNode(_) | Expression::Literal(_)
    )
}
