use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "rdf-federation")]
/// RDF Federation command line toolkit
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Plan a SPARQL query and print the rewritten operator tree
    Explain {
        /// File to read the query from
        ///
        /// If "-" is given, stdin is read.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        query: PathBuf,
        /// JSON configuration that declares the members and services of the federation
        ///
        /// By default a single member named "default" answers all patterns.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Base IRI of the query
        #[arg(long, value_hint = ValueHint::Url)]
        base: Option<String>,
        /// Binds a variable of the query to a term before planning
        ///
        /// The value is an IRI like "<http://example.com/x>" or a literal like "\"Alice\"@en".
        #[arg(short, long, value_name = "NAME=TERM")]
        bind: Vec<String>,
        /// Renames a variable of the query before planning
        #[arg(short, long, value_name = "FROM=TO")]
        rename: Vec<String>,
    },
}
