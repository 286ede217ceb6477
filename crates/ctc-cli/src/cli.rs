use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ctc",
    about = "Canonical Transaction Chain: a hash-linked ledger of transaction batches",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store file holding the chain
    #[arg(short, long, global = true, default_value = "ctc-store.json")]
    pub store: PathBuf,

    /// TOML file with ledger settings (head key, record prefix, limits)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Append a batch (JSON) to the chain
    Commit(CommitArgs),
    /// Show every batch, newest first
    History(HistoryArgs),
    /// Forget the chain head; the next commit starts a new chain
    Reset(ResetArgs),
    /// Show the hash of the newest batch
    Head(HeadArgs),
    /// Show one stored batch
    Show(ShowArgs),
    /// Verify chain integrity
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct CommitArgs {
    /// Batch file, or `-` for stdin
    pub input: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Print stored records joined by `;`
    #[arg(long)]
    pub delimited: bool,
}

#[derive(Args)]
pub struct ResetArgs {}

#[derive(Args)]
pub struct HeadArgs {}

#[derive(Args)]
pub struct ShowArgs {
    pub hash: String,
}

#[derive(Args)]
pub struct VerifyArgs {}
