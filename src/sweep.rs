//! Retention sweep over a backup directory.
//!
//! # Rules
//!
//! - Only regular files named `backup-*.dump` are candidates; everything else
//!   is left alone.  Subdirectories are not descended into.
//! - Age is whole days since the last modification, rounded down.  A file
//!   dated in the future is age 0.
//! - A file is deleted when `age >= retention_days`, so `0` removes every
//!   candidate.
//! - A failure on one file is logged and recorded; the sweep moves on.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tracing::{debug, info, warn};

use crate::{
    error::{BackupError, Result},
    job::is_backup_filename,
};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Deletes one file.  Swapped out in tests to simulate failures.
pub trait Remover {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

pub struct FsRemover;

impl Remover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// What a sweep did.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub dir: PathBuf,
    pub deleted: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
    /// Candidates that could not be inspected or removed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn per-file failures into an error.  Only used when the caller asked
    /// for partial failures to count.
    pub fn into_strict(self) -> Result<Self> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(BackupError::SweepPartialFailure {
                failed: self.failed.len(),
                total: self.failed.len() + self.deleted.len(),
                dir: self.dir,
            })
        }
    }
}

/// Whole days between `modified` and `now`; future timestamps are age 0.
pub fn age_in_days(now: SystemTime, modified: SystemTime) -> u64 {
    now.duration_since(modified)
        .unwrap_or(Duration::ZERO)
        .as_secs()
        / SECS_PER_DAY
}

/// Delete expired backups from `dir`.
///
/// Fails only when the directory itself cannot be listed.
pub fn sweep(
    dir: &Path,
    retention_days: u32,
    now: SystemTime,
    remover: &dyn Remover,
) -> Result<SweepReport> {
    info!(
        "starting cleanup of backups in {} with retention period: {retention_days} days",
        dir.display()
    );

    let entries = fs::read_dir(dir)
        .map_err(|e| BackupError::io(format!("listing {}", dir.display()), e))?;

    let mut report = SweepReport {
        dir: dir.to_path_buf(),
        ..SweepReport::default()
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                continue;
            },
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_backup_filename(name) {
            continue;
        }

        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_file() => {},
            Ok(_) => {
                debug!("{} is not a regular file, skipping", path.display());
                continue;
            },
            Err(e) => {
                warn!("failed to inspect {}: {e}", path.display());
                report.failed.push((path, e.to_string()));
                continue;
            },
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                warn!("failed to read mtime of {}: {e}", path.display());
                report.failed.push((path, e.to_string()));
                continue;
            },
        };

        let age = age_in_days(now, modified);
        debug!("checking file {}: age = {age} days", path.display());

        if age < u64::from(retention_days) {
            debug!(
                "{} is not old enough to delete (age = {age} days)",
                path.display()
            );
            report.kept.push(path);
            continue;
        }

        match remover.remove(&path) {
            Ok(()) => {
                info!("deleted old backup: {}", path.display());
                report.deleted.push(path);
            },
            Err(e) => {
                warn!("failed to delete {}: {e}", path.display());
                report.failed.push((path, e.to_string()));
            },
        }
    }

    // read_dir order is unspecified
    report.deleted.sort();
    report.kept.sort();
    report.failed.sort();

    Ok(report)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
