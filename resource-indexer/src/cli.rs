//! Command line arguments of the resource indexer.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "resource-indexer",
    version,
    about = "Index the rows of tabular resources into OpenSearch"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index a resource file.
    Index(IndexArgs),

    /// Validate a resource file and print the report.
    Validate(ValidateArgs),

    /// Print the schema of a resource file.
    Schema(SchemaArgs),
}

#[derive(Args)]
pub struct IndexArgs {
    /// Path to the resource file.
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    /// Id of the resource; the index is named after it.
    #[arg(long = "resource-id")]
    pub resource_id: String,

    /// Title of the resource.
    #[arg(long)]
    pub title: String,

    /// JSON file with an explicit schema.
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Token meaning "no value" in this resource (repeatable).
    #[arg(long = "special-sign", value_name = "TOKEN")]
    pub special_signs: Vec<String>,

    /// Delete and rebuild the index.
    #[arg(long)]
    pub force: bool,

    /// Documents per bulk request.
    #[arg(long = "chunk-size")]
    pub chunk_size: Option<usize>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the resource file.
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    /// JSON file with an explicit schema.
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Token meaning "no value" in this resource (repeatable).
    #[arg(long = "special-sign", value_name = "TOKEN")]
    pub special_signs: Vec<String>,
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Path to the resource file.
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    /// Report fields under the file headers instead of `col<N>`.
    #[arg(long)]
    pub aliases: bool,
}
