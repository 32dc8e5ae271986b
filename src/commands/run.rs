//! The pipeline: optional dump, then optional retention sweep.
//!
//! | # | Stage | Enabled by       | Description                               |
//! |---|-------|------------------|-------------------------------------------|
//! | 1 | Dump  | `--backup`       | Run mysqldump / pg_dump into a dated file |
//! | 2 | Sweep | `--retention N`  | Delete `backup-*.dump` at least N days old |
//!
//! A failed dump is fatal and the sweep does not run.  Per-file sweep
//! failures are warnings unless `--strict-sweep` is set.

use std::{path::PathBuf, time::SystemTime};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    cli::Cli,
    config::{ConnectionConfig, Environment, FileConfig, PASSWORD_VAR},
    dump::run_dump,
    error::Result,
    job::{BackupJob, Engine},
    runner::CommandRunner,
    sweep::{Remover, sweep},
    ui::{StageOutcome, print_summary},
};

/// Capabilities and inputs the pipeline needs besides the parsed flags.
pub struct Context<'a> {
    pub file_cfg: &'a FileConfig,
    pub env: &'a dyn Environment,
    pub runner: &'a dyn CommandRunner,
    pub remover: &'a dyn Remover,
    pub now: SystemTime,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

pub fn run(cli: &Cli, ctx: &Context<'_>) -> Result<()> {
    if !cli.has_work() {
        info!("nothing to do: pass --backup and/or --retention <DAYS>");
        return Ok(());
    }

    println!();
    let mut outcomes: Vec<StageOutcome> = Vec::new();

    // 1. Dump
    if cli.backup {
        let today = DateTime::<Local>::from(ctx.now).date_naive();
        let result = BackupJob::new(
            &cli.database_name,
            &cli.database_user,
            cli.engine,
            &cli.backup_dir,
            today,
        )
        .and_then(|job| run_dump(&job, ctx.file_cfg, ctx.env, ctx.runner));

        match result {
            Ok(dump) => {
                let outcome =
                    StageOutcome::ok("Dump", format!("{} ({})", dump.path.display(), dump.tool));
                outcome.print();
                outcomes.push(outcome);
            },
            Err(e) => {
                let outcome = StageOutcome::from_error("Dump", &e);
                outcome.print();
                outcomes.push(outcome);
                print_summary(&outcomes);
                return Err(e);
            },
        }
    }

    // 2. Sweep
    if let Some(days) = cli.retention {
        let result = sweep(&cli.backup_dir, days, ctx.now, ctx.remover).and_then(|report| {
            info!(
                "cleanup of {} finished: {} deleted, {} kept, {} failed",
                cli.backup_dir.display(),
                report.deleted.len(),
                report.kept.len(),
                report.failed.len()
            );
            if cli.strict_sweep {
                report.into_strict()
            } else {
                if !report.is_clean() {
                    warn!(
                        "{} expired backups could not be removed",
                        report.failed.len()
                    );
                }
                Ok(report)
            }
        });

        match result {
            Ok(report) => {
                let mut detail = format!(
                    "{} deleted, {} kept",
                    report.deleted.len(),
                    report.kept.len()
                );
                if !report.is_clean() {
                    detail.push_str(&format!(", {} failed", report.failed.len()));
                }
                let outcome = StageOutcome::ok("Sweep", detail);
                outcome.print();
                outcomes.push(outcome);
            },
            Err(e) => {
                let outcome = StageOutcome::from_error("Sweep", &e);
                outcome.print();
                outcomes.push(outcome);
                print_summary(&outcomes);
                return Err(e);
            },
        }
    }

    print_summary(&outcomes);
    Ok(())
}

// ─── --print-config ───────────────────────────────────────────────────────────

/// What a run would use, with the password reduced to presence.
#[derive(Debug, Serialize)]
pub struct ResolvedSettings {
    pub engine: Engine,
    pub database_name: String,
    pub database_user: String,
    pub backup_dir: PathBuf,
    pub password_set: bool,
    pub retention_days: Option<u32>,
    pub connection: ConnectionConfig,
}

pub fn resolve_settings(
    cli: &Cli,
    file_cfg: &FileConfig,
    env: &dyn Environment,
) -> Result<ResolvedSettings> {
    Ok(ResolvedSettings {
        engine: cli.engine,
        database_name: cli.database_name.clone(),
        database_user: cli.database_user.clone(),
        backup_dir: cli.backup_dir.clone(),
        password_set: env.var(PASSWORD_VAR).is_some_and(|p| !p.is_empty()),
        retention_days: cli.retention,
        connection: ConnectionConfig::resolve(cli.engine, file_cfg, env)?,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
