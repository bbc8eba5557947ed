//! Analysis Errors
//!
//! Recoverable problems (malformed templates, missing schemas) never reach
//! these types; they are logged and the walk continues. Only structural
//! problems in the pipeline tree and decoding failures surface as errors.

use thiserror::Error;

/// Error raised by a brick or mod registry lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No registry entry for '{id}'")]
    NotFound { id: String },

    #[error("Lookup of '{id}' failed: {message}")]
    Lookup { id: String, message: String },
}

impl RegistryError {
    pub fn not_found(id: impl Into<String>) -> Self {
        RegistryError::NotFound { id: id.into() }
    }

    pub fn lookup(id: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::Lookup {
            id: id.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The pipeline tree has a shape the brick documents as impossible,
    /// e.g. a list element whose body is not deferred.
    #[error("Business rule violation at {position}: {message}")]
    BusinessRule { position: String, message: String },

    #[error("Invalid pipeline definition: {message}")]
    InvalidPipeline { message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    pub fn business_rule(position: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::BusinessRule {
            position: position.into(),
            message: message.into(),
        }
    }

    pub fn invalid_pipeline(message: impl Into<String>) -> Self {
        AnalysisError::InvalidPipeline {
            message: message.into(),
        }
    }

    pub fn is_business_rule(&self) -> bool {
        matches!(self, AnalysisError::BusinessRule { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
