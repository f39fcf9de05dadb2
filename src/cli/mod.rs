use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbosity of the command output.
    #[arg(long)]
    pub verbose: Option<LevelFilter>,

    /// Configuration file. A default configuration is written if it doesn't exist.
    #[arg(long, short = 'c', env = "APP_BACKUP_CONFIG", default_value = "app_backup.toml")]
    pub config: PathBuf,

    /// Run without asking for confirmation.
    #[arg(long, short = 'f')]
    pub force: bool,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Subcommand, Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// Backup the database and the application files. (Default)
    #[default]
    Run,
}
