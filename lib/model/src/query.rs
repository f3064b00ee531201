use crate::{QueryModelResult, QueryTree};
use oxiri::Iri;
use spargebra::algebra::QueryDataset;
use spargebra::term::TriplePattern;
use spargebra::Query;

/// The parts of a SPARQL query that surround its pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryForm {
    Select {
        dataset: Option<QueryDataset>,
        base_iri: Option<Iri<String>>,
    },
    Construct {
        template: Vec<TriplePattern>,
        dataset: Option<QueryDataset>,
        base_iri: Option<Iri<String>>,
    },
    Describe {
        dataset: Option<QueryDataset>,
        base_iri: Option<Iri<String>>,
    },
    Ask {
        dataset: Option<QueryDataset>,
        base_iri: Option<Iri<String>>,
    },
}

/// A query whose pattern has been lowered into a [QueryTree].
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    tree: QueryTree,
    form: QueryForm,
}

impl ParsedQuery {
    pub fn new(tree: QueryTree, form: QueryForm) -> Self {
        Self { tree, form }
    }

    /// Parses a SPARQL query.
    pub fn parse(query: &str, base_iri: Option<&str>) -> QueryModelResult<Self> {
        let query = Query::parse(query, base_iri)?;
        Self::from_query(&query)
    }

    pub fn from_query(query: &Query) -> QueryModelResult<Self> {
        let (pattern, form) = match query {
            Query::Select {
                dataset,
                pattern,
                base_iri,
            } => (
                pattern,
                QueryForm::Select {
                    dataset: dataset.clone(),
                    base_iri: base_iri.clone(),
                },
            ),
            Query::Construct {
                template,
                dataset,
                pattern,
                base_iri,
            } => (
                pattern,
                QueryForm::Construct {
                    template: template.clone(),
                    dataset: dataset.clone(),
                    base_iri: base_iri.clone(),
                },
            ),
            Query::Describe {
                dataset,
                pattern,
                base_iri,
            } => (
                pattern,
                QueryForm::Describe {
                    dataset: dataset.clone(),
                    base_iri: base_iri.clone(),
                },
            ),
            Query::Ask {
                dataset,
                pattern,
                base_iri,
            } => (
                pattern,
                QueryForm::Ask {
                    dataset: dataset.clone(),
                    base_iri: base_iri.clone(),
                },
            ),
        };
        Ok(Self {
            tree: QueryTree::from_graph_pattern(pattern)?,
            form,
        })
    }

    pub fn tree(&self) -> &QueryTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut QueryTree {
        &mut self.tree
    }

    pub fn into_tree(self) -> QueryTree {
        self.tree
    }

    pub fn form(&self) -> &QueryForm {
        &self.form
    }

    pub fn into_parts(self) -> (QueryTree, QueryForm) {
        (self.tree, self.form)
    }

    pub fn is_ask(&self) -> bool {
        matches!(self.form, QueryForm::Ask { .. })
    }

    /// Turns this query into a `SELECT` query with the same pattern.
    pub fn into_select(self) -> Self {
        let (QueryForm::Select { dataset, base_iri }
        | QueryForm::Construct {
            dataset, base_iri, ..
        }
        | QueryForm::Describe { dataset, base_iri }
        | QueryForm::Ask { dataset, base_iri }) = self.form;
        Self {
            tree: self.tree,
            form: QueryForm::Select { dataset, base_iri },
        }
    }

    /// Raises the tree back into a SPARQL query.
    pub fn to_query(&self) -> QueryModelResult<Query> {
        let pattern = self.tree.to_graph_pattern()?;
        Ok(match &self.form {
            QueryForm::Select { dataset, base_iri } => Query::Select {
                dataset: dataset.clone(),
                pattern,
                base_iri: base_iri.clone(),
            },
            QueryForm::Construct {
                template,
                dataset,
                base_iri,
            } => Query::Construct {
                template: template.clone(),
                dataset: dataset.clone(),
                pattern,
                base_iri: base_iri.clone(),
            },
            QueryForm::Describe { dataset, base_iri } => Query::Describe {
                dataset: dataset.clone(),
                pattern,
                base_iri: base_iri.clone(),
            },
            QueryForm::Ask { dataset, base_iri } => Query::Ask {
                dataset: dataset.clone(),
                pattern,
                base_iri: base_iri.clone(),
            },
        })
    }

    /// Serializes this query into SPARQL text.
    pub fn to_sparql(&self) -> QueryModelResult<String> {
        Ok(self.to_query()?.to_string())
    }
}
