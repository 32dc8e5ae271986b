//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the pipeline.

use std::path::PathBuf;

use clap::Parser;

use crate::job::Engine;

#[derive(Parser, Debug)]
#[command(
    name    = "db-backup",
    about   = "Dump a MySQL or PostgreSQL database to a local file and prune old dumps",
    version,
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}",
    after_help = "\
Environment:
  DB_PASSWORD                     database password (required with --backup)
  HOSTNAME_MYSQL / PORT_MYSQL     MySQL endpoint (default localhost:3306)
  HOSTNAME_PSQL  / PORT_PSQL      PostgreSQL endpoint (default localhost:5432)"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Name of the database to back up.
    #[arg(short = 'n', long, visible_alias = "database_name")]
    pub database_name: String,

    /// User to authenticate as.
    #[arg(short = 'u', long, visible_alias = "database_user")]
    pub database_user: String,

    /// Database engine.
    #[arg(short = 't', long = "type", value_enum)]
    pub engine: Engine,

    /// Dump the database during this run.
    #[arg(short, long)]
    pub backup: bool,

    /// Directory where dumps are written and swept.
    #[arg(short = 'd', long, visible_alias = "backup_dir", default_value = ".")]
    pub backup_dir: PathBuf,

    /// Delete `backup-*.dump` files at least this many days old.
    ///
    /// The sweep only runs when this flag is given.
    #[arg(short, long, value_name = "DAYS")]
    pub retention: Option<u32>,

    /// Optional TOML file with `[mysql]` / `[psql]` host and port.
    ///
    /// A missing file is ignored.  Environment variables still win over it.
    #[arg(short, long, default_value = "db-backup.toml")]
    pub config: PathBuf,

    /// Print the resolved settings and exit without running anything.
    #[arg(long)]
    pub print_config: bool,

    /// Exit non-zero when any expired dump could not be deleted.
    #[arg(long)]
    pub strict_sweep: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// True when the run has at least one stage to execute.
    pub const fn has_work(&self) -> bool {
        self.backup || self.retention.is_some()
    }
}
