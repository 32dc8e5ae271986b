//! Error kinds surfaced by the dump and sweep stages.
//!
//! Nothing below `main` exits the process.  Every fatal condition travels up
//! as a [`BackupError`] and `main` maps it to a status with
//! [`BackupError::exit_code`].

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Flags or config values that cannot describe a valid job.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The password variable is unset or empty.
    #[error("database password not set; provide the {var} environment variable")]
    CredentialMissing { var: &'static str },

    /// The dump tool could not be started (not on PATH, not executable, ...).
    #[error("failed to launch {tool}: {source}")]
    ToolLaunchFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The dump tool ran but reported failure.
    #[error("{tool} failed ({})", describe_code(.code))]
    ToolExitedNonzero {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A filesystem operation failed; `context` names what was being done.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Some eligible files in the sweep could not be removed.
    #[error("{failed} of {total} expired backups in {} could not be removed", .dir.display())]
    SweepPartialFailure {
        dir: PathBuf,
        failed: usize,
        total: usize,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".into(),
    }
}

impl BackupError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process status for this error.  `2` mirrors clap's usage-error status.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigInvalid(_) => 2,
            Self::SweepPartialFailure { .. } => 3,
            Self::CredentialMissing { .. }
            | Self::ToolLaunchFailed { .. }
            | Self::ToolExitedNonzero { .. }
            | Self::Io { .. } => 1,
        }
    }
}

pub type Result<T, E = BackupError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_separate_usage_and_partial_sweeps() {
        assert_eq!(BackupError::ConfigInvalid("x".into()).exit_code(), 2);
        assert_eq!(
            BackupError::CredentialMissing { var: "DB_PASSWORD" }.exit_code(),
            1
        );
        assert_eq!(
            BackupError::SweepPartialFailure {
                dir: ".".into(),
                failed: 1,
                total: 2
            }
            .exit_code(),
            3
        );
    }

    #[test]
    fn nonzero_message_names_tool_and_code() {
        let err = BackupError::ToolExitedNonzero {
            tool: "pg_dump".into(),
            code: Some(1),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "pg_dump failed (exit code 1)");
    }

    #[test]
    fn signal_termination_is_described() {
        let err = BackupError::ToolExitedNonzero {
            tool: "mysqldump".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn credential_message_names_variable() {
        let err = BackupError::CredentialMissing { var: "DB_PASSWORD" };
        assert!(err.to_string().contains("DB_PASSWORD"));
    }
}
