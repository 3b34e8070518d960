//! # Error Types
//!
//! Structured error handling for the settlement core using thiserror.
//! Validation failures carry a [`ValidationCode`] so callers can map them onto
//! their own response codes without string matching.

use std::fmt;
use thiserror::Error;

/// Codes attached to validation failures surfaced to the caller of a settlement job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    /// The provider does not belong to the given aggregator
    InvalidProvider,
    /// A referenced aggregator, provider or model does not exist
    NonExistentResourceId,
    /// A mandatory job parameter was missing or empty
    MissingMandatoryParameter,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidProvider => "INVALID_PROVIDER",
            Self::NonExistentResourceId => "NON_EXISTENT_RESOURCE_ID",
            Self::MissingMandatoryParameter => "MISSING_MANDATORY_PARAMETER",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RssError {
    #[error("Validation error [{code}]: {detail}")]
    Validation { code: ValidationCode, detail: String },

    #[error("Database error: {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("State transition error: {0}")]
    StateTransition(String),

    #[error("Allocation error: {0}")]
    Allocation(String),

    #[error("Report generation error: {0}")]
    ReportGeneration(String),

    #[error("Task execution error: {task}: {message}")]
    TaskExecution { task: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },
}

impl RssError {
    pub fn invalid_provider(aggregator_id: &str, provider_id: &str) -> Self {
        Self::Validation {
            code: ValidationCode::InvalidProvider,
            detail: format!(
                "provider {provider_id} does not belong to aggregator {aggregator_id}"
            ),
        }
    }

    /// Missing resource; `detail` is the identifier that could not be resolved
    pub fn non_existent_resource(detail: impl Into<String>) -> Self {
        Self::Validation {
            code: ValidationCode::NonExistentResourceId,
            detail: detail.into(),
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::Validation {
            code: ValidationCode::MissingMandatoryParameter,
            detail: name.to_string(),
        }
    }

    pub fn database(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn validation_code(&self) -> Option<ValidationCode> {
        match self {
            Self::Validation { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for RssError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            operation: "query".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for RssError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RssError>;
