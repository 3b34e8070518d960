//! Configuration Loader
//!
//! Layers built-in defaults, an optional YAML file and `RSS__` environment
//! variables using the `config` crate.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::RssConfig;
use crate::error::Result;

const ENV_PREFIX: &str = "RSS";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_CONFIG_FILE: &str = "config/rss";

pub struct ConfigManager {
    config: RssConfig,
    environment: String,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from(None, None)
    }

    /// Load configuration from an explicit file
    pub fn load_from_file(path: &Path) -> Result<Arc<ConfigManager>> {
        Self::load_from(Some(path), None)
    }

    /// Load configuration with an explicit environment variable map instead of
    /// the process environment. Useful for testing without touching globals.
    pub fn load_from(
        path: Option<&Path>,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env_vars),
        );

        let config: RssConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %environment,
            source_file = ?path,
            max_concurrent_tasks_per_pool = config.dispatcher.max_concurrent_tasks_per_pool,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment,
            source_file: path.map(Path::to_path_buf),
        }))
    }

    /// Wrap an already built configuration
    pub fn from_config(config: RssConfig) -> Result<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: Self::detect_environment(),
            source_file: None,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RssConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("RSS_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}
