//! Error types for atomic batch execution.
//!
//! This module provides the error taxonomy surfaced by the atomic operations
//! engine. Every failure aborts the whole batch; the variants describe where in
//! the pipeline the batch stopped.

use crate::data_layer::StorageError;
use crate::operation::Action;
use serde_json::{Value, json};

/// Main error type for atomic batch execution.
///
/// Errors raised before any data layer handle is opened (malformed documents,
/// unknown resource types) leave no trace. Errors raised afterwards are only
/// surfaced once the transaction chain has been closed with a rollback.
#[derive(Debug, thiserror::Error)]
pub enum AtomicError {
    /// The batch document or one of its entries has an invalid shape
    #[error("Malformed batch: {message}")]
    MalformedBatch {
        /// Position of the offending operation, if the error is entry-specific
        index: Option<usize>,
        message: String,
    },

    /// An operation names a resource type that is not registered
    #[error("Unknown resource type: {resource_type}")]
    UnknownResourceType { resource_type: String },

    /// Dependency resolution for an operation failed
    #[error("Dependency resolution failed for '{resource_type}': {source}")]
    Dependency {
        resource_type: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The resource descriptor has no handler for the requested action
    #[error("Unsupported operation '{action}' for resource type '{resource_type}'")]
    UnsupportedOperation {
        resource_type: String,
        action: Action,
    },

    /// The operation's action is not one of add, update or remove
    #[error("Unknown action '{action}' at operation {index}")]
    InvalidAction { index: usize, action: String },

    /// The payload does not conform to the resource schema
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The target resource does not exist
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// Errors from a storage backend
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The caller went away before the batch completed
    #[error("Batch cancelled by caller")]
    Cancelled,

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Validation errors for payload schema checking.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required attribute is missing
    #[error("Required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    /// Required relationship is missing
    #[error("Required relationship '{relationship}' is missing")]
    MissingRequiredRelationship { relationship: String },

    /// Attribute value doesn't match expected type
    #[error("Attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidDataType {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// Multi-valued attribute provided as single value
    #[error("Attribute '{attribute}' must be multi-valued (array)")]
    ExpectedMultiValue { attribute: String },

    /// Single-valued attribute provided as array
    #[error("Attribute '{attribute}' must be single-valued (not array)")]
    ExpectedSingleValue { attribute: String },

    /// Invalid value for attribute with canonical values
    #[error("Attribute '{attribute}' has invalid value '{value}', allowed values: {allowed:?}")]
    InvalidCanonicalValue {
        attribute: String,
        value: String,
        allowed: Vec<String>,
    },

    /// Invalid datetime format
    #[error("Attribute '{attribute}' has invalid datetime format: {value}")]
    InvalidDateTimeFormat { attribute: String, value: String },

    /// Invalid binary data
    #[error("Attribute '{attribute}' has invalid binary data: {details}")]
    InvalidBinaryData { attribute: String, details: String },

    /// Unknown attribute in payload
    #[error("Unknown attribute '{attribute}' for resource type '{resource_type}'")]
    UnknownAttribute {
        attribute: String,
        resource_type: String,
    },

    /// Unknown relationship in payload
    #[error("Unknown relationship '{relationship}' for resource type '{resource_type}'")]
    UnknownRelationship {
        relationship: String,
        resource_type: String,
    },

    /// To-one relationship given a list, or the other way round
    #[error("Relationship '{relationship}' expects {expected} linkage")]
    RelationshipCardinality {
        relationship: String,
        expected: String,
    },

    /// Relationship linkage points at the wrong resource type
    #[error("Relationship '{relationship}' expects type '{expected}', got '{actual}'")]
    RelationshipTypeMismatch {
        relationship: String,
        expected: String,
        actual: String,
    },

    /// Payload type differs from the resource type it is submitted for
    #[error("Payload type '{actual}' does not match resource type '{expected}'")]
    ResourceTypeMismatch { expected: String, actual: String },

    /// Read-only attribute present in a write payload
    #[error("Attribute '{attribute}' is read-only and cannot be modified")]
    ReadOnlyMutabilityViolation { attribute: String },

    /// Immutable attribute present in a patch payload
    #[error("Attribute '{attribute}' is immutable and cannot be modified after creation")]
    ImmutableMutabilityViolation { attribute: String },

    /// Missing id attribute
    #[error("Missing required 'id' for {resource_type} {action}")]
    MissingId {
        resource_type: String,
        action: String,
    },

    /// Client provided id in creation
    #[error("Client cannot provide 'id' when creating '{resource_type}'")]
    ClientProvidedId { resource_type: String },

    /// General validation error with custom message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

/// Errors that can occur while building the engine.
///
/// These errors are programming errors and should surface during startup.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The same resource type was registered twice
    #[error("Resource type '{resource_type}' is already registered")]
    DuplicateResourceType { resource_type: String },
}

// Convenience methods for creating common errors
impl AtomicError {
    /// Create a malformed batch error not tied to a particular entry
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedBatch {
            index: None,
            message: message.into(),
        }
    }

    /// Create a malformed batch error for the operation at `index`
    pub fn malformed_at(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedBatch {
            index: Some(index),
            message: message.into(),
        }
    }

    /// Create an unknown resource type error
    pub fn unknown_resource_type(resource_type: impl Into<String>) -> Self {
        Self::UnknownResourceType {
            resource_type: resource_type.into(),
        }
    }

    /// Create a resource not found error
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Wrap an error raised by the dependency resolution mechanism
    pub fn dependency<E>(resource_type: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Dependency {
            resource_type: resource_type.into(),
            source: Box::new(error),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AtomicError::MalformedBatch { .. } => "MALFORMED_BATCH",
            AtomicError::UnknownResourceType { .. } => "UNKNOWN_RESOURCE_TYPE",
            AtomicError::Dependency { .. } => "DEPENDENCY_ERROR",
            AtomicError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            AtomicError::InvalidAction { .. } => "INVALID_ACTION",
            AtomicError::Validation(_) => "VALIDATION_ERROR",
            AtomicError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            AtomicError::Storage(_) => "STORAGE_ERROR",
            AtomicError::Cancelled => "CANCELLED",
            AtomicError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            AtomicError::MalformedBatch { .. }
            | AtomicError::InvalidAction { .. } => 400,
            AtomicError::UnknownResourceType { .. } | AtomicError::ResourceNotFound { .. } => 404,
            AtomicError::Dependency { .. } => 403,
            AtomicError::UnsupportedOperation { .. } => 405,
            AtomicError::Validation(_) => 422,
            AtomicError::Storage(StorageError::Conflict { .. }) => 409,
            AtomicError::Cancelled => 499,
            AtomicError::Storage(_) | AtomicError::Internal { .. } => 500,
        }
    }

    /// Render the error as a JSON:API error document.
    pub fn to_error_document(&self) -> Value {
        let mut error = json!({
            "status": self.status_code().to_string(),
            "code": self.error_code(),
            "detail": self.to_string(),
        });

        let index = match self {
            AtomicError::MalformedBatch { index, .. } => *index,
            AtomicError::InvalidAction { index, .. } => Some(*index),
            _ => None,
        };
        if let Some(index) = index {
            error["source"] = json!({ "pointer": format!("/atomic:operations/{}", index) });
        }

        json!({ "errors": [error] })
    }
}

impl ValidationError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidDataType {
            attribute: attribute.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a custom validation error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type AtomicResult<T> = Result<T, AtomicError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
