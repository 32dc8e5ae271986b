//! `db-backup` — local MySQL / PostgreSQL dumps with age-based retention.
//!
//! # Overview
//!
//! A thin orchestration layer around `mysqldump` and `pg_dump`.  One run can
//! dump a database into `backup-{ENGINE}-{YYYY-MM-DD}-{db}.dump`, prune dumps
//! older than a retention period, or both.
//!
//! # Usage
//!
//! ```text
//! DB_PASSWORD=... db-backup -n shop -u root -t MYSQL -b                # dump into .
//! db-backup -n shop -u root -t PSQL -d /srv/dumps -r 14                # prune only
//! DB_PASSWORD=... db-backup -n shop -u root -t PSQL -d /srv/dumps -b -r 14
//! db-backup -n shop -u root -t MYSQL --print-config                    # show resolved settings
//! ```
//!
//! # Module layout
//!
//! | Module              | Responsibility                                   |
//! |---------------------|--------------------------------------------------|
//! | [`cli`]             | Argument types parsed by clap                    |
//! | [`config`]          | Environment, TOML file layers, connection config |
//! | [`error`]           | Error kinds and their exit codes                 |
//! | [`job`]             | Engine, BackupJob, file naming convention        |
//! | [`runner`]          | Dump argument construction, launcher trait       |
//! | [`dump`]            | Dump executor                                    |
//! | [`sweep`]           | Retention sweep                                  |
//! | [`ui`]              | Spinner, process launcher, stage output          |
//! | [`commands::run`]   | The dump → sweep pipeline                        |
//!
//! # Exit status
//!
//! `0` success, `1` credential / tool / I/O failure, `2` invalid usage,
//! `3` expired dumps left behind under `--strict-sweep`.

mod cli;
mod commands;
mod config;
mod dump;
mod error;
mod job;
mod runner;
mod sweep;
mod ui;

use std::{process::ExitCode, time::SystemTime};

use anyhow::{Context as _, Result};
use clap::Parser;
use cli::Cli;
use commands::run::{Context, resolve_settings};
use config::{ProcessEnv, global_config_path, load_layered};
use error::BackupError;
use sweep::FsRemover;
use tracing::{Level, error};
use ui::SystemRunner;

/// The only place that turns an error into a process status.
///
/// Stage failures were already printed by the pipeline, so only the top-level
/// message of the chain is logged here.
fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_ansi(console::Term::stderr().is_term())
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let code = e
                .downcast_ref::<BackupError>()
                .map_or(1, BackupError::exit_code);
            ExitCode::from(code)
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file_cfg = load_layered(global_config_path().as_deref(), &cli.config)?;
    let env = ProcessEnv;

    if cli.print_config {
        let settings = resolve_settings(cli, &file_cfg, &env)?;
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let ctx = Context {
        file_cfg: &file_cfg,
        env: &env,
        runner: &SystemRunner,
        remover: &FsRemover,
        now: SystemTime::now(),
    };
    commands::run::run(cli, &ctx).context("pipeline aborted")
}
