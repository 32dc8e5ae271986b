//! Dump executor: one database, one external tool, one file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::{
    config::{ConnectionConfig, Environment, FileConfig, password_from_env},
    error::{BackupError, Result},
    job::BackupJob,
    runner::{CommandRunner, build_dump_command},
};

/// A finished dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOutcome {
    pub path: PathBuf,
    pub tool: String,
}

/// Produce the dump file for `job`.
///
/// The password is read first, so a missing `DB_PASSWORD` fails before any
/// directory is touched or process launched.  The tool writes to
/// [`BackupJob::partial_path`]; only a zero exit renames that onto the final
/// name.  On failure the partial file is removed and an earlier dump with the
/// same name is left untouched.
pub fn run_dump(
    job: &BackupJob,
    file_cfg: &FileConfig,
    env: &dyn Environment,
    runner: &dyn CommandRunner,
) -> Result<DumpOutcome> {
    let password = password_from_env(env)?;
    let conn = ConnectionConfig::resolve(job.engine, file_cfg, env)?;

    fs::create_dir_all(&job.backup_dir).map_err(|e| {
        BackupError::io(
            format!("creating backup directory {}", job.backup_dir.display()),
            e,
        )
    })?;

    let cmd = build_dump_command(job, &conn, &password);
    let tool = cmd.program().to_string();
    let partial = job.partial_path();
    let path = job.path();

    info!(
        database = %job.database_name,
        engine = %job.engine,
        host = %conn.host,
        port = conn.port,
        "starting dump: {}",
        cmd.display()
    );

    let status = match runner.run(&cmd) {
        Ok(status) => status,
        Err(source) => {
            discard_partial(&partial);
            return Err(BackupError::ToolLaunchFailed { tool, source });
        },
    };

    if !status.success {
        discard_partial(&partial);
        return Err(BackupError::ToolExitedNonzero {
            tool,
            code: status.code,
            stderr: status.stderr,
        });
    }

    fs::rename(&partial, &path).map_err(|e| {
        discard_partial(&partial);
        BackupError::io(
            format!("moving {} into place", partial.display()),
            e,
        )
    })?;

    info!("backup successful: {}", path.display());
    Ok(DumpOutcome { path, tool })
}

/// Remove the output of a failed run.  The final dump path is never touched.
fn discard_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => warn!("removed partial dump {}", partial.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => warn!("could not remove partial dump {}: {e}", partial.display()),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
