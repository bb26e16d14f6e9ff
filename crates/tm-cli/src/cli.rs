//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// tenant-migrate - Synthesize and apply per-tenant schema migrations
#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding tenantmig.yml; relative log paths resolve against it
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the migration log location
    #[arg(long, global = true)]
    pub log_path: Option<String>,

    /// Override the Postgres connection URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the migrations a model would produce, without recording them
    Plan(PlanArgs),

    /// Record the next batch of migrations in the log
    Generate(GenerateArgs),

    /// Execute pending migrations against the database
    Apply(ApplyArgs),

    /// List a tenant's recorded migrations
    History(HistoryArgs),

    /// Print a connection URL scoped to a tenant schema
    ConnectionUrl(ConnectionUrlArgs),
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON output
    Json,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Desired model document (.yml, .yaml or .json)
    pub model: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Print the SQL of each migration
    #[arg(long)]
    pub sql: bool,
}

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Desired model document (.yml, .yaml or .json)
    pub model: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Tenant whose pending migrations to execute
    #[arg(short, long, required_unless_present = "model")]
    pub tenant: Option<String>,

    /// Record migrations for this model document before executing
    #[arg(short, long)]
    pub model: Option<String>,

    /// Print pending migrations instead of executing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the history command
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Tenant id (omit to list tenants)
    pub tenant: Option<String>,

    /// Only show migrations that have not been applied
    #[arg(long)]
    pub pending: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the connection-url command
#[derive(Args, Debug)]
pub struct ConnectionUrlArgs {
    /// Tenant id
    pub tenant: String,

    /// Keep `public` on the search path after the tenant schema
    #[arg(long)]
    pub include_public: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
