//! Dump command construction and the process-launch seam.
//!
//! The builders here are pure: they turn a [`BackupJob`] plus connection
//! settings into a [`CommandSpec`] without spawning anything.  Launching is
//! behind the [`CommandRunner`] trait; the real implementation lives in
//! [`crate::ui`] so the spinner can own the terminal while the tool runs.
//!
//! # Argument syntax
//!
//! ```text
//! mysqldump --single-transaction -u <user> -p<password> -h <host> -P <port> --no-tablespaces -B <db>   > <file>.partial
//! pg_dump   -U <user> -h <host> -p <port> -F c -f <file>.partial <db>             (PGPASSWORD in env)
//! ```
//!
//! `mysqldump` has no output-file flag in `-B` mode, so its stdout is
//! redirected.  Both tools write to [`BackupJob::partial_path`]; the executor
//! renames it onto the final name only after a zero exit.

use std::{io, path::PathBuf};

use crate::{
    config::ConnectionConfig,
    job::{BackupJob, Engine, Password},
};

/// Index of the `-p<password>` argument in a mysqldump argument list.
pub const MYSQL_PASSWORD_SLOT: usize = 4;

// ─── Command description ──────────────────────────────────────────────────────

/// Where the child's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutTarget {
    /// Discarded; the tool writes its own output file.
    Null,
    /// Created (or truncated) before spawn and closed once the child exits.
    File(PathBuf),
}

/// Everything needed to launch one dump tool.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// `args[0]` is the program.
    pub args: Vec<String>,
    /// Extra variables for the child only.
    pub env: Vec<(String, String)>,
    pub stdout: StdoutTarget,
    /// Argument indices that must never be logged verbatim.
    pub secret_args: Vec<usize>,
}

impl CommandSpec {
    pub fn program(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    /// The argument list with secrets masked, suitable for logs.
    pub fn redacted(&self) -> Vec<String> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if self.secret_args.contains(&i) {
                    redact_arg(a)
                } else {
                    a.clone()
                }
            })
            .collect()
    }

    /// Single-line redacted rendering.
    pub fn display(&self) -> String {
        self.redacted().join(" ")
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("CommandSpec")
            .field("args", &self.redacted())
            .field("env", &env_keys)
            .field("stdout", &self.stdout)
            .finish()
    }
}

/// `-phunter2` → `-p****`; any other secret becomes `****`.
fn redact_arg(arg: &str) -> String {
    if arg.starts_with("-p") {
        "-p****".into()
    } else {
        "****".into()
    }
}

// ─── Runner capability ────────────────────────────────────────────────────────

/// How a finished child exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub success: bool,
    /// `None` when killed by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

/// Launches a [`CommandSpec`] and waits for it.
///
/// `Err` means the process could not be started at all; a started process
/// that fails is reported through [`ToolStatus`].
pub trait CommandRunner {
    fn run(&self, cmd: &CommandSpec) -> io::Result<ToolStatus>;
}

// ─── Builders ─────────────────────────────────────────────────────────────────

pub fn build_dump_command(
    job: &BackupJob,
    conn: &ConnectionConfig,
    password: &Password,
) -> CommandSpec {
    match job.engine {
        Engine::Mysql => build_mysqldump(job, conn, password),
        Engine::Psql => build_pg_dump(job, conn, password),
    }
}

/// `mysqldump` in `--databases` mode, stdout redirected into the partial file.
pub fn build_mysqldump(job: &BackupJob, conn: &ConnectionConfig, password: &Password) -> CommandSpec {
    let args = vec![
        Engine::Mysql.tool().into(),
        "--single-transaction".into(),
        "-u".into(),
        job.database_user.clone(),
        format!("-p{}", password.expose()),
        "-h".into(),
        conn.host.clone(),
        "-P".into(),
        conn.port.to_string(),
        "--no-tablespaces".into(),
        "-B".into(),
        job.database_name.clone(),
    ];

    CommandSpec {
        args,
        env: vec![],
        stdout: StdoutTarget::File(job.partial_path()),
        secret_args: vec![MYSQL_PASSWORD_SLOT],
    }
}

/// `pg_dump` in custom format, writing the partial file itself.
pub fn build_pg_dump(job: &BackupJob, conn: &ConnectionConfig, password: &Password) -> CommandSpec {
    let args = vec![
        Engine::Psql.tool().into(),
        "-U".into(),
        job.database_user.clone(),
        "-h".into(),
        conn.host.clone(),
        "-p".into(),
        conn.port.to_string(),
        "-F".into(),
        "c".into(),
        "-f".into(),
        job.partial_path().to_string_lossy().into_owned(),
        job.database_name.clone(),
    ];

    CommandSpec {
        args,
        env: vec![("PGPASSWORD".into(), password.expose().into())],
        stdout: StdoutTarget::Null,
        secret_args: vec![],
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::NaiveDate;

    use super::*;

    fn make_job(engine: Engine) -> BackupJob {
        BackupJob::new(
            "shop",
            "admin",
            engine,
            Path::new("/srv/backups"),
            NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        )
        .unwrap()
    }

    fn make_conn(host: &str, port: u16) -> ConnectionConfig {
        ConnectionConfig {
            host: host.into(),
            port,
        }
    }

    fn pw() -> Password {
        Password::new("hunter2")
    }

    // ── mysqldump ─────────────────────────────────────────────────────────────

    #[test]
    fn mysqldump_positions() {
        let cmd = build_mysqldump(&make_job(Engine::Mysql), &make_conn("db.lan", 3306), &pw());
        let a = &cmd.args;
        assert_eq!(a[0], "mysqldump");
        assert_eq!(a[1], "--single-transaction");
        assert_eq!((a[2].as_str(), a[3].as_str()), ("-u", "admin"));
        assert_eq!(a[MYSQL_PASSWORD_SLOT], "-phunter2");
        assert_eq!((a[5].as_str(), a[6].as_str()), ("-h", "db.lan"));
        assert_eq!((a[7].as_str(), a[8].as_str()), ("-P", "3306"));
        assert_eq!(a[9], "--no-tablespaces");
        assert_eq!((a[10].as_str(), a[11].as_str()), ("-B", "shop"));
    }

    #[test]
    fn mysqldump_password_only_in_its_slot() {
        let cmd = build_mysqldump(&make_job(Engine::Mysql), &make_conn("db.lan", 3306), &pw());
        let hits: Vec<usize> = cmd
            .args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.contains("hunter2"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, vec![MYSQL_PASSWORD_SLOT]);
        assert!(cmd.env.is_empty());
    }

    #[test]
    fn mysqldump_redirects_stdout_to_partial_file() {
        let cmd = build_mysqldump(&make_job(Engine::Mysql), &make_conn("h", 1), &pw());
        assert_eq!(
            cmd.stdout,
            StdoutTarget::File("/srv/backups/backup-MYSQL-2024-05-17-shop.dump.partial".into())
        );
    }

    #[test]
    fn redacted_mysqldump_hides_password() {
        let cmd = build_mysqldump(&make_job(Engine::Mysql), &make_conn("db.lan", 3306), &pw());
        assert!(!cmd.display().contains("hunter2"));
        assert!(!format!("{cmd:?}").contains("hunter2"));
        assert_eq!(cmd.redacted()[MYSQL_PASSWORD_SLOT], "-p****");
    }

    // ── pg_dump ───────────────────────────────────────────────────────────────

    #[test]
    fn pg_dump_uses_custom_format_and_output_flag() {
        let job = make_job(Engine::Psql);
        let cmd = build_pg_dump(&job, &make_conn("pg.lan", 5432), &pw());
        let f = cmd.args.iter().position(|a| a == "-F").unwrap();
        assert_eq!(cmd.args[f + 1], "c");
        let o = cmd.args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(Path::new(&cmd.args[o + 1]), job.partial_path());
        assert_eq!(cmd.args.last().unwrap(), "shop");
        assert_eq!(cmd.stdout, StdoutTarget::Null);
    }

    #[test]
    fn pg_dump_passes_password_through_env_only() {
        let cmd = build_pg_dump(&make_job(Engine::Psql), &make_conn("pg.lan", 5432), &pw());
        assert!(cmd.args.iter().all(|a| !a.contains("hunter2")));
        assert_eq!(cmd.env, vec![("PGPASSWORD".to_string(), "hunter2".to_string())]);
        assert!(!format!("{cmd:?}").contains("hunter2"));
    }

    #[test]
    fn dispatch_picks_tool_by_engine() {
        let conn = make_conn("h", 1);
        assert_eq!(
            build_dump_command(&make_job(Engine::Mysql), &conn, &pw()).program(),
            "mysqldump"
        );
        assert_eq!(
            build_dump_command(&make_job(Engine::Psql), &conn, &pw()).program(),
            "pg_dump"
        );
    }

    // ── insta snapshots ───────────────────────────────────────────────────────
    // Lock the exact vectors handed to the installed tools.

    #[test]
    fn snapshot_mysqldump_args() {
        let cmd = build_mysqldump(&make_job(Engine::Mysql), &make_conn("192.168.1.62", 3306), &pw());
        insta::assert_debug_snapshot!(cmd.redacted(), @r#"
        [
            "mysqldump",
            "--single-transaction",
            "-u",
            "admin",
            "-p****",
            "-h",
            "192.168.1.62",
            "-P",
            "3306",
            "--no-tablespaces",
            "-B",
            "shop",
        ]
        "#);
    }

    #[test]
    fn snapshot_pg_dump_args() {
        let cmd = build_pg_dump(&make_job(Engine::Psql), &make_conn("192.168.1.62", 5432), &pw());
        insta::assert_debug_snapshot!(cmd.args, @r#"
        [
            "pg_dump",
            "-U",
            "admin",
            "-h",
            "192.168.1.62",
            "-p",
            "5432",
            "-F",
            "c",
            "-f",
            "/srv/backups/backup-PSQL-2024-05-17-shop.dump.partial",
            "shop",
        ]
        "#);
    }
}
