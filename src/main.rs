use std::process::ExitCode;

use app_backup_lib::backup::Backup;
use app_backup_lib::cli::{Action, Cli};
use app_backup_lib::config::Config;

use clap::Parser;
use dialoguer::Confirm;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // init logger
    let mut env_logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = cli.verbose {
        env_logger.filter_level(level);
    }
    env_logger.try_init().expect("env_logger should not fail");

    let config = match Config::load_or_init(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.action.unwrap_or_default() {
        Action::Run => run(&config, cli.force),
    }
}

fn run(config: &Config, force: bool) -> ExitCode {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Do you really wish to run this command?")
            .default(false)
            .interact();
        match confirmed {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Command cancelled.");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                log::error!("Asking for confirmation failed, use --force to skip it: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let backup = match Backup::from_config(config) {
        Ok(backup) => backup,
        Err(e) => {
            log::error!(target: "backup", "Backup failed: {e}.");
            return ExitCode::FAILURE;
        }
    };

    match backup.run() {
        Ok(report) => {
            log::info!(
                target: "backup",
                "Backup {} with {} entries published to disk '{}'",
                report.location,
                report.entries,
                report.disk
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!(target: "backup", "Backup failed: {e}.");
            ExitCode::FAILURE
        }
    }
}
