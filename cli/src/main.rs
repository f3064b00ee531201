use crate::cli::{Args, Command};
use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use rdf_federation_engine::{
    FederationConfig, FederationEngine, MemberCapabilities, MemberConnection, MemberError,
    MemberQueryResults, ServiceRegistry,
};
use rdf_federation_logical::ParameterBindings;
use rdf_federation_model::{ParsedQuery, Query, Term};
use std::fs;
use std::io::{self, stdin, stdout, Read, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let matches = Args::parse();
    match matches.command {
        Command::Explain {
            query,
            config,
            base,
            bind,
            rename,
        } => {
            let config = if let Some(path) = config {
                FederationConfig::from_path(&path)
                    .with_context(|| format!("Invalid configuration {}", path.display()))?
            } else {
                FederationConfig::default()
            };
            tracing::debug!(
                default_member = %config.default_member,
                members = config.members.len(),
                services = config.services.len(),
                "Loaded configuration"
            );
            let query = read_query(&query)?;
            let mut query = ParsedQuery::parse(&query, base.as_deref())
                .context("The query is not valid SPARQL")?;

            for rename in &rename {
                let (from, to) = split_assignment(rename, "FROM=TO")?;
                query = FederationEngine::rename(query, from, to)
                    .with_context(|| format!("Unable to rename ?{from} to ?{to}"))?;
            }
            if !bind.is_empty() {
                query = FederationEngine::instantiate(&query, &parse_bindings(&bind)?)?;
            }

            let engine = FederationEngine::try_new(offline_registry(&config)?, &config)?;
            explain(&engine, query, &mut stdout().lock())
        }
    }
}

fn explain(
    engine: &FederationEngine,
    query: ParsedQuery,
    writer: &mut impl Write,
) -> anyhow::Result<()> {
    let planned = engine.plan(query)?;
    let owner = engine.single_owner(&planned)?;

    writeln!(writer, "{}", planned.query.tree())?;
    writeln!(writer, "{}", planned.query.to_sparql()?)?;
    writeln!(writer)?;
    writeln!(writer, "Resolved services: {}", planned.replacements.len())?;
    writeln!(writer, "Keyword searches: {}", planned.keyword_searches.len())?;
    match owner {
        Some(member) => writeln!(writer, "Single owner: {}", member.member_id())?,
        None => writeln!(writer, "Single owner: none (federated evaluation)")?,
    }
    writer.flush()?;
    Ok(())
}

fn read_query(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut query = String::new();
        stdin().lock().read_to_string(&mut query)?;
        Ok(query)
    } else {
        fs::read_to_string(path).with_context(|| format!("Unable to read {}", path.display()))
    }
}

fn split_assignment<'a>(value: &'a str, expected: &str) -> anyhow::Result<(&'a str, &'a str)> {
    let Some((name, value)) = value.split_once('=') else {
        bail!("The argument '{value}' is not of the form {expected}")
    };
    Ok((name.trim_start_matches(['?', '$']), value))
}

fn parse_bindings(bindings: &[String]) -> anyhow::Result<ParameterBindings> {
    bindings
        .iter()
        .map(|binding| {
            let (name, value) = split_assignment(binding, "NAME=TERM")?;
            let term = Term::from_str(value)
                .with_context(|| format!("The value of {name} is not a valid RDF term"))?;
            Ok((name.to_owned(), term))
        })
        .collect()
}

/// Builds a registry of the members declared in `config`.
///
/// If no members are declared, the default member is the only one.
fn offline_registry(config: &FederationConfig) -> anyhow::Result<ServiceRegistry> {
    let mut registry = ServiceRegistry::new();
    if config.members.is_empty() {
        registry.register_member(Arc::new(DeclaredMember {
            id: config.default_member.clone(),
            capabilities: MemberCapabilities::default(),
        }));
    }
    for member in &config.members {
        registry.register_member(Arc::new(DeclaredMember {
            id: member.id.clone(),
            capabilities: MemberCapabilities {
                supports_service: member.supports_service,
                supports_ask: member.supports_ask,
            },
        }));
    }
    for service in &config.services {
        registry.register_service(service.named_node()?, &service.member)?;
    }
    Ok(registry)
}

/// A member that is only known from the configuration. Queries cannot be submitted to it.
#[derive(Debug)]
struct DeclaredMember {
    id: String,
    capabilities: MemberCapabilities,
}

#[async_trait]
impl MemberConnection for DeclaredMember {
    fn member_id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> MemberCapabilities {
        self.capabilities
    }

    async fn execute(&self, _query: &Query) -> Result<MemberQueryResults, MemberError> {
        Err(MemberError::new(format!(
            "The member {} is declared without a connection",
            self.id
        )))
    }
}
