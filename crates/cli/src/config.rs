use std::path::PathBuf;

use booklove_db::DEFAULT_MAX_CONNECTIONS;

/// Tracing directives used when `RUST_LOG` is unset. Names every crate that
/// emits events.
pub const DEFAULT_LOG_FILTER: &str =
    "booklove=info,booklove_cli=info,booklove_core=info,booklove_session=debug,booklove_db=info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// CLI configuration loaded from environment variables.
///
/// A `.env` file in the working directory is loaded first by `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Directory holding the guest state slot (default: `.booklove`).
    pub state_dir: PathBuf,
    /// PostgreSQL URL; only the database commands need it.
    pub database_url: Option<String>,
    /// Pool size for database commands (default: `20`).
    pub db_max_connections: u32,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default      |
    /// |-----------------------|--------------|
    /// | `BOOKLOVE_STATE_DIR`  | `.booklove`  |
    /// | `DATABASE_URL`        | (none)       |
    /// | `DB_MAX_CONNECTIONS`  | `20`         |
    /// | `LOG_FORMAT`          | `text`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let state_dir = lookup("BOOKLOVE_STATE_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".booklove"));

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DB_MAX_CONNECTIONS",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            },
        };

        let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    expected: "`text` or `json`",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            state_dir,
            database_url,
            db_max_connections,
            log_json,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
