//! Data layer error types.
//!
//! These errors describe failures of a storage backend or of its atomic
//! session bookkeeping. They carry no knowledge of batches or operations.

use std::fmt;

/// Errors that can occur during data layer operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested resource was not found.
    ResourceNotFound {
        tenant_id: String,
        resource_type: String,
        id: String,
    },

    /// A resource with the same identity already exists.
    Conflict {
        tenant_id: String,
        resource_type: String,
        id: String,
    },

    /// Invalid data format or structure that cannot be stored.
    InvalidData {
        message: String,
        cause: Option<String>,
    },

    /// Atomic session used out of order (begin twice, end without begin).
    TransactionState { message: String },

    /// Storage backend is temporarily unavailable.
    Unavailable { message: String },

    /// Generic internal storage error.
    Internal {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ResourceNotFound {
                tenant_id,
                resource_type,
                id,
            } => {
                write!(
                    f,
                    "Resource not found: {}/{}/{}",
                    tenant_id, resource_type, id
                )
            }
            StorageError::Conflict {
                tenant_id,
                resource_type,
                id,
            } => {
                write!(
                    f,
                    "Resource already exists: {}/{}/{}",
                    tenant_id, resource_type, id
                )
            }
            StorageError::InvalidData { message, cause } => {
                if let Some(cause) = cause {
                    write!(f, "Invalid data: {} (cause: {})", message, cause)
                } else {
                    write!(f, "Invalid data: {}", message)
                }
            }
            StorageError::TransactionState { message } => {
                write!(f, "Invalid transaction state: {}", message)
            }
            StorageError::Unavailable { message } => {
                write!(f, "Storage unavailable: {}", message)
            }
            StorageError::Internal { message, .. } => {
                write!(f, "Internal storage error: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Internal {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl StorageError {
    /// Create a resource not found error.
    pub fn resource_not_found(
        tenant_id: impl Into<String>,
        resource_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self::ResourceNotFound {
            tenant_id: tenant_id.into(),
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(
        tenant_id: impl Into<String>,
        resource_type: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            tenant_id: tenant_id.into(),
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a transaction state error.
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::TransactionState {
            message: message.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create an internal error without an underlying cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for data layer operations.
pub type StorageResult<T> = Result<T, StorageError>;
