//! Runtime configuration for the `rentbook` binary.
//!
//! # Responsibility
//! - Read the optional `rentbook.toml` file.
//! - Layer `RENTBOOK_*` environment variables and command-line flags on top.
//!
//! # Invariants
//! - Precedence is flags > environment > file > defaults.
//! - Resolved `db_path` and `log_dir` are absolute.
//! - A missing default config file is not an error; a missing explicit one is.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "rentbook.toml";
pub const DEFAULT_DB_FILE: &str = "data.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
const LOG_DIR_NAME: &str = "logs";

const ENV_DB_PATH: &str = "RENTBOOK_DB_PATH";
const ENV_BIND: &str = "RENTBOOK_BIND";
const ENV_LOG_LEVEL: &str = "RENTBOOK_LOG_LEVEL";
const ENV_LOG_DIR: &str = "RENTBOOK_LOG_DIR";

/// Shape of `rentbook.toml`; every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

/// Values passed on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub log_level: String,
    pub log_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidBind(String),
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::InvalidBind(raw) => write!(f, "invalid bind address `{raw}`"),
            Self::CurrentDir(err) => write!(f, "cannot resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidBind(_) => None,
            Self::CurrentDir(err) => Some(err),
        }
    }
}

impl AppConfig {
    /// Loads configuration from file, process environment and `overrides`.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        let file = match config_path {
            Some(path) => read_file_config(path)?,
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    read_file_config(&default_path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        resolve(file, |key| std::env::var(key).ok(), overrides, &cwd)
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
    overrides: &Overrides,
    cwd: &Path,
) -> Result<AppConfig, ConfigError> {
    let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let db_path = overrides
        .db_path
        .clone()
        .or_else(|| env(ENV_DB_PATH).map(PathBuf::from))
        .or(file.db_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
    let db_path = absolutize(db_path, cwd);

    let bind_raw = overrides
        .bind
        .clone()
        .or_else(|| env(ENV_BIND))
        .or(file.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = bind_raw
        .trim()
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::InvalidBind(bind_raw.clone()))?;

    let log_level = overrides
        .log_level
        .clone()
        .or_else(|| env(ENV_LOG_LEVEL))
        .or(file.log_level)
        .unwrap_or_else(|| rentbook_core::default_log_level().to_string());

    let log_dir = overrides
        .log_dir
        .clone()
        .or_else(|| env(ENV_LOG_DIR).map(PathBuf::from))
        .or(file.log_dir)
        .map(|dir| absolutize(dir, cwd))
        .unwrap_or_else(|| {
            db_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf())
                .join(LOG_DIR_NAME)
        });

    Ok(AppConfig {
        db_path,
        bind,
        log_level,
        log_dir,
    })
}

fn absolutize(path: PathBuf, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{read_file_config, resolve, ConfigError, FileConfig, Overrides};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn cwd() -> PathBuf {
        std::env::temp_dir().join("rentbook-config-test")
    }

    #[test]
    fn defaults_resolve_next_to_working_directory() {
        let config = resolve(FileConfig::default(), no_env, &Overrides::default(), &cwd()).unwrap();

        assert_eq!(config.db_path, cwd().join("data.db"));
        assert_eq!(config.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(config.log_dir, cwd().join("logs"));
        assert_eq!(config.log_level, rentbook_core::default_log_level());
    }

    #[test]
    fn flags_beat_environment_beat_file() {
        let file = FileConfig {
            db_path: Some(PathBuf::from("file.db")),
            bind: Some("127.0.0.1:9000".to_string()),
            log_level: Some("warn".to_string()),
            log_dir: None,
        };
        let env: HashMap<&str, &str> = HashMap::from([
            ("RENTBOOK_DB_PATH", "/srv/env.db"),
            ("RENTBOOK_BIND", "0.0.0.0:8100"),
        ]);
        let overrides = Overrides {
            bind: Some("127.0.0.1:8200".to_string()),
            ..Overrides::default()
        };

        let config = resolve(
            file,
            |key| env.get(key).map(|value| value.to_string()),
            &overrides,
            &cwd(),
        )
        .unwrap();

        assert_eq!(config.db_path, Path::new("/srv/env.db"));
        assert_eq!(config.bind.to_string(), "127.0.0.1:8200");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Path::new("/srv/logs"));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let config = resolve(
            FileConfig::default(),
            |_| Some("  ".to_string()),
            &Overrides::default(),
            &cwd(),
        )
        .unwrap();

        assert_eq!(config.db_path, cwd().join("data.db"));
    }

    #[test]
    fn invalid_bind_is_rejected() {
        let overrides = Overrides {
            bind: Some("localhost".to_string()),
            ..Overrides::default()
        };

        let err = resolve(FileConfig::default(), no_env, &overrides, &cwd()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBind(raw) if raw == "localhost"));
    }

    #[test]
    fn read_file_config_parses_toml_and_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("rentbook.toml");
        std::fs::write(&good, "db_path = \"books/data.db\"\nlog_level = \"debug\"\n").unwrap();

        let file = read_file_config(&good).unwrap();
        assert_eq!(file.db_path, Some(PathBuf::from("books/data.db")));
        assert_eq!(file.log_level.as_deref(), Some("debug"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "port = 80\n").unwrap();
        assert!(matches!(
            read_file_config(&bad),
            Err(ConfigError::Parse { .. })
        ));

        assert!(matches!(
            read_file_config(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
