//! Request context for atomic batches.
//!
//! The context is what dependency handlers see of the incoming request: an id
//! for log correlation, the request headers and an optional tenant.

use std::collections::HashMap;
use uuid::Uuid;

/// Request context for one batch.
///
/// Provides request tracking for logging and the inputs dependency handlers
/// use to build data layer arguments.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request
    pub request_id: String,
    /// Request headers, keys lower-cased
    pub headers: HashMap<String, String>,
    /// Optional tenant for multi-tenant deployments
    pub tenant_id: Option<String>,
}

impl RequestContext {
    /// Create a new request context with a specific request ID.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            headers: HashMap::new(),
            tenant_id: None,
        }
    }

    /// Create a new request context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Attach a tenant.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Attach a header. Names are matched case-insensitively.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Get the tenant ID if this is a multi-tenant request.
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}
