//! In-memory description of one dump.
//!
//! The file name produced here is also the key the retention sweep uses to
//! decide what it may delete, so [`BACKUP_PREFIX`] / [`BACKUP_SUFFIX`] are
//! shared with [`crate::sweep`].

use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

use crate::error::{BackupError, Result};

pub const BACKUP_PREFIX: &str = "backup-";
pub const BACKUP_SUFFIX: &str = ".dump";
/// Appended to the file name while the tool is still writing.
pub const PARTIAL_SUFFIX: &str = ".partial";

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Database engine a job targets.  Spelled `MYSQL` / `PSQL` on the command
/// line and in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Engine {
    #[value(name = "MYSQL")]
    #[serde(rename = "MYSQL")]
    Mysql,
    #[value(name = "PSQL")]
    #[serde(rename = "PSQL")]
    Psql,
}

impl Engine {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mysql => "MYSQL",
            Self::Psql => "PSQL",
        }
    }

    /// Executable looked up on `PATH` for this engine.
    pub const fn tool(self) -> &'static str {
        match self {
            Self::Mysql => "mysqldump",
            Self::Psql => "pg_dump",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Password ─────────────────────────────────────────────────────────────────

/// Database password.  Lives only for the duration of a run and never shows
/// up in `Debug` output.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

// ─── BackupJob ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BackupJob {
    pub database_name: String,
    pub database_user: String,
    pub engine: Engine,
    pub backup_dir: PathBuf,
    pub filename: String,
}

impl BackupJob {
    /// Build a job, fixing its file name from `date`.
    ///
    /// Two jobs for the same database and engine on the same day share a
    /// name; a later successful dump replaces the earlier one.
    pub fn new(
        database_name: &str,
        database_user: &str,
        engine: Engine,
        backup_dir: &Path,
        date: NaiveDate,
    ) -> Result<Self> {
        validate_ident("database name", database_name)?;
        validate_ident("database user", database_user)?;

        Ok(Self {
            database_name: database_name.to_string(),
            database_user: database_user.to_string(),
            engine,
            backup_dir: backup_dir.to_path_buf(),
            filename: backup_filename(engine, date, database_name),
        })
    }

    /// Full path of the dump file inside the backup directory.
    pub fn path(&self) -> PathBuf {
        self.backup_dir.join(&self.filename)
    }

    /// Where the tool writes before the dump is known to be complete.
    ///
    /// Ends in [`PARTIAL_SUFFIX`], so the sweep never matches it.
    pub fn partial_path(&self) -> PathBuf {
        self.backup_dir
            .join(format!("{}{PARTIAL_SUFFIX}", self.filename))
    }
}

/// `backup-{ENGINE}-{YYYY-MM-DD}-{database}.dump`
pub fn backup_filename(engine: Engine, date: NaiveDate, database_name: &str) -> String {
    format!(
        "{BACKUP_PREFIX}{engine}-{}-{database_name}{BACKUP_SUFFIX}",
        date.format("%Y-%m-%d")
    )
}

/// True for names the sweep is allowed to touch.
pub fn is_backup_filename(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)
}

fn validate_ident(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BackupError::ConfigInvalid(format!("{what} must not be empty")));
    }
    if value.contains('/') || value.contains('\\') || value.contains('\0') {
        return Err(BackupError::ConfigInvalid(format!(
            "{what} '{value}' must not contain path separators"
        )));
    }
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
