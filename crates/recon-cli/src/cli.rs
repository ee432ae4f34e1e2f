//! CLI argument definitions for the schema reconciler.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "recon",
    version,
    about = "Schema reconciliation - score, validate and track field mappings",
    long_about = "Reconcile field metadata between a source and a target schema.\n\n\
                  Scores candidate field pairs, validates proposed mappings and keeps\n\
                  an auditable ledger of the conflicts they raise."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Scoring and validation rules (TOML). Built-in defaults when omitted.
    #[arg(long = "rules", value_name = "PATH", global = true)]
    pub rules: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score a single source field against a single target field.
    Score(ScoreArgs),

    /// Generate ranked mapping candidates between two schemas.
    Candidates(CandidatesArgs),

    /// Validate mappings and record the conflicts they raise.
    Validate(ValidateArgs),

    /// Resolve an open conflict.
    Resolve(ResolveArgs),

    /// Ignore an open conflict.
    Ignore(IgnoreArgs),

    /// Print the effective rules as TOML.
    Rules,
}

#[derive(Parser)]
pub struct SchemaPair {
    /// Source schema export (.json or .csv).
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target schema export (.json or .csv).
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,
}

#[derive(Parser)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub schemas: SchemaPair,

    /// Source field as OBJECT.FIELD.
    #[arg(long = "from", value_name = "OBJECT.FIELD")]
    pub from: String,

    /// Target field as OBJECT.FIELD.
    #[arg(long = "to", value_name = "OBJECT.FIELD")]
    pub to: String,

    /// Treat the pair as suggested by an external model.
    #[arg(long = "ai-suggested")]
    pub ai_suggested: bool,

    /// Treat the pair as confirmed by a user.
    #[arg(long = "user-validated")]
    pub user_validated: bool,

    /// Emit JSON instead of text.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct CandidatesArgs {
    #[command(flatten)]
    pub schemas: SchemaPair,

    /// Object pair to compare as SOURCE=TARGET (repeatable).
    ///
    /// Without this flag, objects with the same name are paired.
    #[arg(long = "object", value_name = "SOURCE=TARGET")]
    pub objects: Vec<String>,

    /// Minimum confidence as a fraction of 100.
    #[arg(
        long = "threshold",
        value_name = "FRACTION",
        default_value_t = recon_map::DEFAULT_THRESHOLD
    )]
    pub threshold: f64,

    /// Skip pairs whose types are plainly incompatible.
    #[arg(long = "prefilter")]
    pub prefilter: bool,

    /// Externally suggested pairs to merge in (JSON array).
    #[arg(long = "ai", value_name = "FILE")]
    pub ai: Option<PathBuf>,

    /// Emit JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub schemas: SchemaPair,

    /// Proposed mappings (.json or .csv).
    #[arg(long = "mappings", value_name = "FILE")]
    pub mappings: PathBuf,

    /// Conflict ledger to create or update.
    #[arg(long = "ledger", value_name = "FILE")]
    pub ledger: Option<PathBuf>,

    /// Let the single-high-confidence policy settle duplicate targets.
    #[arg(long = "auto-resolve")]
    pub auto_resolve: bool,

    /// Emit JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct ResolveArgs {
    #[arg(long = "ledger", value_name = "FILE")]
    pub ledger: PathBuf,

    #[arg(long = "id", value_name = "N")]
    pub id: u64,

    /// One of: create_custom_field, map_to_existing, skip_field, transform_data.
    #[arg(long = "action", value_name = "ACTION")]
    pub action: String,

    /// Why the conflict was settled this way.
    #[arg(long = "notes", value_name = "TEXT")]
    pub notes: String,

    /// Action parameters as a JSON object.
    #[arg(long = "details", value_name = "JSON")]
    pub details: Option<String>,

    /// Who resolved the conflict.
    #[arg(long = "by", value_name = "USER")]
    pub by: Option<String>,
}

#[derive(Parser)]
pub struct IgnoreArgs {
    #[arg(long = "ledger", value_name = "FILE")]
    pub ledger: PathBuf,

    #[arg(long = "id", value_name = "N")]
    pub id: u64,

    #[arg(long = "reason", value_name = "TEXT")]
    pub reason: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
