//! Store configuration
//!
//! Loaded from a TOML document:
//!
//! ```toml
//! dialect = "postgres"
//! host = "db.internal"
//! port = 5432
//! database = "mining"
//! user = "miner"
//! password = "..."
//! delete_policy = "reject"
//! ```

use crate::dialect::Dialect;
use crate::errors::{configuration, io_error, Result};
use crate::sqlite::IN_MEMORY;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use vcsmine_core_types::Sensitive;

/// What `delete` does with an entity that was never saved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Log a warning and skip the entity without touching the backend
    #[default]
    LogAndSkip,
    /// Fail with an argument error
    Reject,
}

/// Behavioral switches carried by a store handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleOptions {
    pub delete_policy: DeletePolicy,

    /// Verify that grouped result sets arrive in ascending key order
    pub check_group_ordering: bool,
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::default(),
            check_group_ordering: default_check_group_ordering(),
        }
    }
}

fn default_check_group_ordering() -> bool {
    cfg!(debug_assertions)
}

/// Dialect selector and connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub dialect: Dialect,

    /// SQLite database file, or `:memory:`
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<Sensitive<String>>,

    #[serde(default)]
    pub delete_policy: DeletePolicy,

    #[serde(default = "default_check_group_ordering")]
    pub check_group_ordering: bool,
}

impl StoreConfig {
    fn blank(dialect: Dialect) -> Self {
        Self {
            dialect,
            path: None,
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            delete_policy: DeletePolicy::default(),
            check_group_ordering: default_check_group_ordering(),
        }
    }

    /// SQLite database at `path`
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::blank(Dialect::Sqlite)
        }
    }

    /// In-memory SQLite database
    pub fn in_memory() -> Self {
        Self::sqlite(IN_MEMORY)
    }

    /// Network backend at `host`, database `database`
    pub fn network(dialect: Dialect, host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            database: Some(database.into()),
            ..Self::blank(dialect)
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_check_group_ordering(mut self, enabled: bool) -> Self {
        self.check_group_ordering = enabled;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for malformed TOML, an unknown dialect
    /// selector or missing connection parameters.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| configuration(e.to_string().trim_end().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns an `Io` error when the file cannot be read, otherwise as
    /// [`StoreConfig::from_toml_str`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| io_error("read_config", e))?;
        Self::from_toml_str(&content)
    }

    /// Check the connection parameters required by the dialect
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error naming the first missing parameter.
    pub fn validate(&self) -> Result<()> {
        match self.dialect {
            Dialect::Sqlite => {
                if self.path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
                    return Err(configuration("sqlite store requires a non-empty 'path'"));
                }
            }
            Dialect::Derby | Dialect::Hsqldb | Dialect::Postgres => {
                if is_blank(&self.host) {
                    return Err(configuration(format!(
                        "{} store requires a non-empty 'host'",
                        self.dialect
                    )));
                }
                if is_blank(&self.database) {
                    return Err(configuration(format!(
                        "{} store requires a non-empty 'database'",
                        self.dialect
                    )));
                }
                if self.port == Some(0) {
                    return Err(configuration("'port' must be between 1 and 65535"));
                }
            }
        }
        Ok(())
    }

    /// Loggable description of the target; never includes the password
    pub fn connection_descriptor(&self) -> String {
        match self.dialect {
            Dialect::Sqlite => format!(
                "sqlite:{}",
                self.path
                    .as_ref()
                    .map_or_else(String::new, |p| p.display().to_string())
            ),
            dialect => {
                let mut descriptor = format!("{}://", dialect);
                if let Some(user) = &self.user {
                    descriptor.push_str(user);
                    descriptor.push('@');
                }
                descriptor.push_str(self.host.as_deref().unwrap_or_default());
                if let Some(port) = self.port {
                    descriptor.push_str(&format!(":{}", port));
                }
                descriptor.push('/');
                descriptor.push_str(self.database.as_deref().unwrap_or_default());
                descriptor
            }
        }
    }

    pub fn options(&self) -> HandleOptions {
        HandleOptions {
            delete_policy: self.delete_policy,
            check_group_ordering: self.check_group_ordering,
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
