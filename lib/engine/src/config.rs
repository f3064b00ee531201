use crate::error::ConfigError;
use oxrdf::NamedNode;
use rdf_federation_model::KeywordSearchVocabulary;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// The configuration of a [FederationEngine](crate::FederationEngine).
///
/// ```json
/// {
///   "default_member": "store",
///   "single_owner_routing": true,
///   "keyword_search": { "contains": "http://rdf-federation.org/search#contains" },
///   "members": [{ "id": "store" }, { "id": "remote", "supports_service": true }],
///   "services": [{ "iri": "http://example.com/remote", "member": "remote" }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FederationConfig {
    /// The member that answers patterns that are not part of a `SERVICE` clause.
    pub default_member: String,
    /// Submits queries that are answered by a single member directly to that member.
    pub single_owner_routing: bool,
    /// The free-text search vocabulary. Keyword search extraction is disabled if not set.
    pub keyword_search: Option<KeywordSearchConfig>,
    /// Members that are declared without a live connection (used by offline tooling).
    pub members: Vec<MemberConfig>,
    pub services: Vec<ServiceConfig>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            default_member: "default".to_owned(),
            single_owner_routing: true,
            keyword_search: None,
            members: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl FederationConfig {
    /// Parses a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration from `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks that all IRIs are valid and that services only refer to declared members.
    ///
    /// Services may only refer to the default member if no members are declared.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut declared = BTreeSet::new();
        for member in &self.members {
            if !declared.insert(member.id.as_str()) {
                return Err(ConfigError::DuplicateMember(member.id.clone()));
            }
        }
        for service in &self.services {
            parse_iri(&service.iri)?;
            let known = declared.contains(service.member.as_str())
                || (declared.is_empty() && service.member == self.default_member);
            if !known {
                return Err(ConfigError::UndeclaredMember {
                    service: service.iri.clone(),
                    member: service.member.clone(),
                });
            }
        }
        self.keyword_search_vocabulary()?;
        Ok(())
    }

    /// Returns the configured free-text search vocabulary.
    pub fn keyword_search_vocabulary(&self) -> Result<Option<KeywordSearchVocabulary>, ConfigError> {
        self.keyword_search
            .as_ref()
            .map(KeywordSearchConfig::vocabulary)
            .transpose()
    }
}

/// The IRIs of a free-text search idiom.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeywordSearchConfig {
    pub contains: String,
    pub score: String,
    pub snippet: String,
    pub type_predicate: String,
}

impl Default for KeywordSearchConfig {
    fn default() -> Self {
        let vocabulary = KeywordSearchVocabulary::default();
        Self {
            contains: vocabulary.contains.into_string(),
            score: vocabulary.score.into_string(),
            snippet: vocabulary.snippet.into_string(),
            type_predicate: vocabulary.type_predicate.into_string(),
        }
    }
}

impl KeywordSearchConfig {
    /// Creates a configuration for a vocabulary whose relations live in `namespace`.
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            contains: format!("{namespace}contains"),
            score: format!("{namespace}score"),
            snippet: format!("{namespace}snippet"),
            ..Self::default()
        }
    }

    pub fn vocabulary(&self) -> Result<KeywordSearchVocabulary, ConfigError> {
        Ok(KeywordSearchVocabulary {
            contains: parse_iri(&self.contains)?,
            score: parse_iri(&self.score)?,
            snippet: parse_iri(&self.snippet)?,
            type_predicate: parse_iri(&self.type_predicate)?,
        })
    }
}

/// A member that is declared in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberConfig {
    pub id: String,
    #[serde(default)]
    pub supports_service: bool,
    #[serde(default = "default_supports_ask")]
    pub supports_ask: bool,
}

fn default_supports_ask() -> bool {
    true
}

/// Maps a `SERVICE` IRI to the member that answers it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub iri: String,
    pub member: String,
}

impl ServiceConfig {
    pub fn named_node(&self) -> Result<NamedNode, ConfigError> {
        parse_iri(&self.iri)
    }
}

fn parse_iri(iri: &str) -> Result<NamedNode, ConfigError> {
    NamedNode::new(iri).map_err(|source| ConfigError::InvalidIri {
        iri: iri.to_owned(),
        source,
    })
}
