use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "autotasks",
    about = concat!(
        "autotasks v",
        env!("CARGO_PKG_VERSION"),
        " - keep vault tasks and the kanban board in step"
    ),
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different vault directory
    #[arg(short = 'C', long = "vault-dir", global = true)]
    pub vault_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write autotasks.toml and create the board if the vault has none
    Init(InitArgs),
    /// Copy tasks from vault files onto the board
    Sync(SyncArgs),
    /// Copy completion changes made on the board back to source files
    Reverse,
    /// Record source files for board tasks that predate origin tracking
    Migrate,
    /// Keep syncing as files change, until interrupted
    Watch,
    /// Carry unfinished tasks into the current periodic notes
    CarryOver(CarryOverArgs),
    /// Show the board's lists and task counts
    Status,
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing autotasks.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Vault-relative files to sync (default: the whole vault)
    pub files: Vec<String>,
}

#[derive(Args)]
pub struct CarryOverArgs {
    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long)]
    pub date: Option<NaiveDate>,
}
