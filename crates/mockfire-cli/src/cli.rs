use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mockfire",
    about = "Simulate reads and writes against a realtime database ruleset",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Rules document (`{"rules": {...}}`)
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// JSON file holding the current database contents
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Evaluate as this signed-in user (signed out when omitted)
    #[arg(long, global = true)]
    pub uid: Option<String>,

    /// Fixed value for `now`, in milliseconds since the epoch
    #[arg(long, global = true)]
    pub now: Option<u64>,

    /// Deny paths that no `.read` / `.write` rule covers
    #[arg(long, global = true)]
    pub deny_by_default: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether a read is allowed
    Read(ReadArgs),
    /// Check whether a set is allowed
    Write(WriteArgs),
    /// Check whether a multi-path update is allowed
    Update(UpdateArgs),
    /// Parse the rules file and report errors
    Check,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    pub path: String,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    pub path: String,
    /// JSON value; `null` simulates a remove
    pub value: String,
    /// JSON priority (number or string)
    #[arg(long)]
    pub priority: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub path: String,
    /// JSON object keyed by relative paths
    pub patch: String,
}
