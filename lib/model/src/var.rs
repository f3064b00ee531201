use oxrdf::Term;
use std::fmt::{Display, Formatter};

/// Prefix of the variables that stand for blank nodes in a parsed pattern.
pub const BLANK_NODE_VAR_PREFIX: &str = "_anon_";
/// Prefix of the anonymous variables that hold a constant of a parsed pattern.
pub const CONSTANT_VAR_PREFIX: &str = "_const_";

/// A variable reference in a [QueryTree](crate::QueryTree).
///
/// A [Var] is in exactly one of three states:
/// - *named and free*: a regular SPARQL variable that is bound during evaluation,
/// - *named with a value*: a variable that has been bound up front (e.g., by parametrization)
///   and therefore acts as a constant,
/// - *anonymous with a value*: a constant of the original query. The name of such a variable is
///   generated and never visible to the user.
///
/// The constructors only allow building these states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    name: String,
    value: Option<Term>,
    anonymous: bool,
}

impl Var {
    /// Creates a named, free variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            anonymous: false,
        }
    }

    /// Creates an anonymous variable that holds `value`.
    pub fn constant(name: impl Into<String>, value: impl Into<Term>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            anonymous: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&Term> {
        self.value.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Returns true if this variable is bound during evaluation.
    pub fn is_free(&self) -> bool {
        self.value.is_none()
    }

    /// Returns the name of this variable if it is free.
    pub fn free_name(&self) -> Option<&str> {
        self.is_free().then_some(self.name.as_str())
    }

    /// Binds `value` to this variable. The name is retained.
    pub fn bind_value(&mut self, value: Term) {
        self.value = Some(value);
    }

    /// Changes the name of this variable.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "?{}", self.name),
        }
    }
}
