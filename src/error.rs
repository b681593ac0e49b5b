//! Error taxonomy shared by the repositories and services.

use thiserror::Error;

use crate::render::RenderError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Sequence integrity violated: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures raised by element implementations and their hooks.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("Invalid element record {id}: {reason}")]
    InvalidRecord { id: i64, reason: String },

    #[error("Element hook '{hook}' failed: {reason}")]
    Hook { hook: &'static str, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
