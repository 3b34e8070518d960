//! # Settlement Configuration
//!
//! Configuration for the settlement core, loaded by [`ConfigManager`] from
//! built-in defaults, an optional YAML file and `RSS__`-prefixed environment
//! variables (later sources win).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rss_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let per_pool = manager.config().dispatcher.max_concurrent_tasks_per_pool;
//! # let _ = per_pool;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, RssError};

pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/rss.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RssConfig {
    /// Database connection and pooling configuration
    pub database: DatabaseConfig,

    /// Settlement task dispatcher settings
    pub dispatcher: DispatcherConfig,

    /// Report query settings
    pub reports: ReportsConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/rss_development".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Settlement tasks running at once within one callback pool
    pub max_concurrent_tasks_per_pool: usize,
    /// Per-task time limit; 0 disables the limit
    pub task_timeout_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks_per_pool: 8,
            task_timeout_seconds: 0,
        }
    }
}

impl DispatcherConfig {
    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout_seconds > 0).then(|| Duration::from_secs(self.task_timeout_seconds))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Window size used when a caller does not supply one
    pub default_page_size: u32,
    /// Upper bound applied to caller-supplied window sizes
    pub max_page_size: u32,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive; environment default when unset
    pub level: Option<String>,
    pub format: LogFormat,
}

impl RssConfig {
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(RssError::Configuration(
                "database.url must not be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(RssError::Configuration(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.dispatcher.max_concurrent_tasks_per_pool == 0 {
            return Err(RssError::Configuration(
                "dispatcher.max_concurrent_tasks_per_pool must be greater than 0".to_string(),
            ));
        }

        if self.reports.max_page_size == 0 {
            return Err(RssError::Configuration(
                "reports.max_page_size must be greater than 0".to_string(),
            ));
        }

        if self.reports.default_page_size > self.reports.max_page_size {
            return Err(RssError::Configuration(format!(
                "reports.default_page_size ({}) exceeds reports.max_page_size ({})",
                self.reports.default_page_size, self.reports.max_page_size
            )));
        }

        Ok(())
    }
}
