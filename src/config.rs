//! Connection settings and their sources.
//!
//! Host and port for each engine are resolved per field, lowest precedence
//! first:
//!
//! 1. built-in defaults (`localhost:3306` / `localhost:5432`)
//! 2. `~/.config/db-backup/config.toml`
//! 3. the local file named by `--config` (default `./db-backup.toml`)
//! 4. `HOSTNAME_MYSQL` / `PORT_MYSQL` / `HOSTNAME_PSQL` / `PORT_PSQL`
//!
//! The password is only ever read from `DB_PASSWORD`.
//!
//! # File format
//!
//! ```toml
//! [mysql]
//! host = "db.lan"
//! port = 3306
//!
//! [psql]
//! host = "db.lan"
//! port = 5432
//! ```

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{BackupError, Result},
    job::{Engine, Password},
};

pub const PASSWORD_VAR: &str = "DB_PASSWORD";

// ─── Environment ──────────────────────────────────────────────────────────────

/// Read access to environment variables.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Read the password, treating an empty value as unset.
pub fn password_from_env(env: &dyn Environment) -> Result<Password> {
    match env.var(PASSWORD_VAR) {
        Some(pw) if !pw.is_empty() => Ok(Password::new(pw)),
        _ => Err(BackupError::CredentialMissing { var: PASSWORD_VAR }),
    }
}

// ─── File config ──────────────────────────────────────────────────────────────

/// One `[mysql]` / `[psql]` table.  Absent fields fall through to the next
/// layer.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct EndpointConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl EndpointConfig {
    /// Fields set in `other` win.
    fn merge(self, other: Self) -> Self {
        Self {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub mysql: EndpointConfig,
    #[serde(default)]
    pub psql: EndpointConfig,
}

impl FileConfig {
    /// Per-field merge; values in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            mysql: self.mysql.merge(other.mysql),
            psql: self.psql.merge(other.psql),
        }
    }

    fn endpoint(&self, engine: Engine) -> &EndpointConfig {
        match engine {
            Engine::Mysql => &self.mysql,
            Engine::Psql => &self.psql,
        }
    }
}

/// Parse a config file.  A missing file yields `Ok(None)`; an unreadable or
/// malformed one is an error.
pub fn load_file(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        BackupError::ConfigInvalid(format!("reading {}: {e}", path.display()))
    })?;

    toml::from_str(&text)
        .map(Some)
        .map_err(|e| BackupError::ConfigInvalid(format!("parsing {}: {e}", path.display())))
}

/// Load the global file (if any) and the local file, local values winning.
pub fn load_layered(global: Option<&Path>, local: &Path) -> Result<FileConfig> {
    let global = match global {
        Some(p) => load_file(p)?.unwrap_or_default(),
        None => FileConfig::default(),
    };
    let local = load_file(local)?.unwrap_or_default();
    Ok(global.merge(local))
}

/// `~/.config/db-backup/config.toml`, when a config directory exists.
pub fn global_config_path() -> Option<std::path::PathBuf> {
    dirs_next::config_dir().map(|d| d.join("db-backup").join("config.toml"))
}

// ─── Connection ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
}

impl ConnectionConfig {
    pub fn default_for(engine: Engine) -> Self {
        Self {
            host: "localhost".into(),
            port: match engine {
                Engine::Mysql => 3306,
                Engine::Psql => 5432,
            },
        }
    }

    /// Apply the file layer and then the environment layer on top of the
    /// engine defaults.
    pub fn resolve(engine: Engine, file: &FileConfig, env: &dyn Environment) -> Result<Self> {
        let (host_var, port_var) = env_vars(engine);
        let defaults = Self::default_for(engine);
        let endpoint = file.endpoint(engine);

        let host = env
            .var(host_var)
            .filter(|h| !h.is_empty())
            .or_else(|| endpoint.host.clone())
            .unwrap_or(defaults.host);

        let port = match env.var(port_var).filter(|p| !p.is_empty()) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                BackupError::ConfigInvalid(format!("{port_var}='{raw}' is not a valid port"))
            })?,
            None => endpoint.port.unwrap_or(defaults.port),
        };

        Ok(Self { host, port })
    }
}

/// Host and port override variables for `engine`.
pub const fn env_vars(engine: Engine) -> (&'static str, &'static str) {
    match engine {
        Engine::Mysql => ("HOSTNAME_MYSQL", "PORT_MYSQL"),
        Engine::Psql => ("HOSTNAME_PSQL", "PORT_PSQL"),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    // ── password ──────────────────────────────────────────────────────────────

    #[test]
    fn password_is_read_from_env() {
        let pw = password_from_env(&env(&[("DB_PASSWORD", "s3cr3t")])).unwrap();
        assert_eq!(pw.expose(), "s3cr3t");
    }

    #[test]
    fn missing_password_is_credential_error() {
        let err = password_from_env(&env(&[])).unwrap_err();
        assert!(matches!(err, BackupError::CredentialMissing {
            var: "DB_PASSWORD"
        }));
    }

    #[test]
    fn empty_password_counts_as_missing() {
        let err = password_from_env(&env(&[("DB_PASSWORD", "")])).unwrap_err();
        assert!(matches!(err, BackupError::CredentialMissing { .. }));
    }

    // ── connection ────────────────────────────────────────────────────────────

    #[test]
    fn defaults_apply_without_overrides() {
        let file = FileConfig::default();
        let my = ConnectionConfig::resolve(Engine::Mysql, &file, &env(&[])).unwrap();
        let pg = ConnectionConfig::resolve(Engine::Psql, &file, &env(&[])).unwrap();
        assert_eq!(my, ConnectionConfig {
            host: "localhost".into(),
            port: 3306
        });
        assert_eq!(pg.port, 5432);
    }

    #[test]
    fn env_overrides_are_engine_specific() {
        let vars = env(&[
            ("HOSTNAME_MYSQL", "mysql.lan"),
            ("PORT_MYSQL", "3307"),
            ("HOSTNAME_PSQL", "pg.lan"),
        ]);
        let file = FileConfig::default();
        let my = ConnectionConfig::resolve(Engine::Mysql, &file, &vars).unwrap();
        let pg = ConnectionConfig::resolve(Engine::Psql, &file, &vars).unwrap();
        assert_eq!(my.host, "mysql.lan");
        assert_eq!(my.port, 3307);
        assert_eq!(pg.host, "pg.lan");
        assert_eq!(pg.port, 5432);
    }

    #[test]
    fn env_wins_over_file() {
        let file: FileConfig = toml::from_str(
            r#"
            [psql]
            host = "file.lan"
            port = 6543
            "#,
        )
        .unwrap();
        let pg = ConnectionConfig::resolve(
            Engine::Psql,
            &file,
            &env(&[("HOSTNAME_PSQL", "env.lan")]),
        )
        .unwrap();
        assert_eq!(pg.host, "env.lan");
        assert_eq!(pg.port, 6543);
    }

    #[test]
    fn bad_port_is_config_invalid() {
        let err = ConnectionConfig::resolve(
            Engine::Mysql,
            &FileConfig::default(),
            &env(&[("PORT_MYSQL", "not-a-port")]),
        )
        .unwrap_err();
        assert!(matches!(err, BackupError::ConfigInvalid(_)));
        assert!(err.to_string().contains("PORT_MYSQL"));
    }

    // ── file layer ────────────────────────────────────────────────────────────

    #[test]
    fn empty_toml_deserialises_to_defaults() {
        let cfg: FileConfig = toml::from_str("").expect("empty toml should parse");
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn local_file_wins_per_field() {
        let global: FileConfig = toml::from_str(
            r#"
            [mysql]
            host = "global.lan"
            port = 3310
            "#,
        )
        .unwrap();
        let local: FileConfig = toml::from_str(
            r#"
            [mysql]
            port = 3320
            "#,
        )
        .unwrap();
        let merged = global.merge(local);
        assert_eq!(merged.mysql.host.as_deref(), Some("global.lan"));
        assert_eq!(merged.mysql.port, Some(3320));
    }

    #[test]
    fn load_file_returns_none_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_file(&path).unwrap().is_none());
    }

    #[test]
    fn load_file_parses_valid_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"
            [mysql]
            host = "db.lan"
            "#
        )
        .unwrap();

        let cfg = load_file(f.path()).unwrap().unwrap();
        assert_eq!(cfg.mysql.host.as_deref(), Some("db.lan"));
        assert!(cfg.psql.host.is_none());
    }

    #[test]
    fn load_file_errors_on_invalid_toml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not valid toml ][[[").unwrap();

        let err = load_file(f.path()).unwrap_err();
        assert!(matches!(err, BackupError::ConfigInvalid(_)));
    }

    #[test]
    fn load_layered_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_layered(
            Some(&dir.path().join("global.toml")),
            &dir.path().join("local.toml"),
        )
        .unwrap();
        assert_eq!(cfg, FileConfig::default());
    }
}
