//! Dependency binding.
//!
//! Each resource type may declare how the construction arguments of its data
//! layer are computed from the incoming request: credentials, tenant, session
//! options and so on. The configuration is per HTTP method with an optional
//! catch-all entry; batch operations always bind through the `POST` entry.

use crate::data_layer::DataLayerArgs;
use crate::error::{AtomicError, AtomicResult};
use crate::operation::Operation;
use crate::registry::ResourceDescriptor;
use crate::resource::RequestContext;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// HTTP methods a dependency configuration can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Errors raised by dependency handlers.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// A required input is absent from the request
    #[error("Missing required dependency '{name}'")]
    Missing { name: String },

    /// The request is not allowed to use this resource
    #[error("Access denied: {message}")]
    Forbidden { message: String },

    /// Any other failure of the resolution logic
    #[error("Dependency resolution failed: {message}")]
    Failed { message: String },
}

impl DependencyError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Computes data layer arguments from a request.
#[async_trait]
pub trait DependencyHandler: Send + Sync {
    async fn resolve(&self, context: &RequestContext) -> Result<DataLayerArgs, DependencyError>;
}

struct FnDependency<F>(F);

#[async_trait]
impl<F> DependencyHandler for FnDependency<F>
where
    F: Fn(&RequestContext) -> Result<DataLayerArgs, DependencyError> + Send + Sync,
{
    async fn resolve(&self, context: &RequestContext) -> Result<DataLayerArgs, DependencyError> {
        (self.0)(context)
    }
}

/// Dependency configuration for one method.
#[derive(Clone, Default)]
pub struct MethodConfig {
    handler: Option<Arc<dyn DependencyHandler>>,
}

impl MethodConfig {
    pub fn new(handler: impl DependencyHandler + 'static) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
        }
    }

    /// Configuration backed by a plain function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<DataLayerArgs, DependencyError> + Send + Sync + 'static,
    {
        Self::new(FnDependency(f))
    }

    /// Configuration that always yields `args`.
    pub fn fixed(args: DataLayerArgs) -> Self {
        Self::from_fn(move |_| Ok(args.clone()))
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    async fn resolve(&self, context: &RequestContext) -> Result<DataLayerArgs, DependencyError> {
        match &self.handler {
            Some(handler) => handler.resolve(context).await,
            None => Ok(DataLayerArgs::new()),
        }
    }
}

impl fmt::Debug for MethodConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodConfig")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

/// Per-method dependency configuration of one resource type.
#[derive(Debug, Clone, Default)]
pub struct MethodDependencies {
    all: Option<MethodConfig>,
    methods: HashMap<HttpMethod, MethodConfig>,
}

impl MethodDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration applied to every method, before the method-specific one.
    pub fn with_all(mut self, config: MethodConfig) -> Self {
        self.all = Some(config);
        self
    }

    pub fn with_method(mut self, method: HttpMethod, config: MethodConfig) -> Self {
        self.methods.insert(method, config);
        self
    }

    pub fn get(&self, method: HttpMethod) -> Option<&MethodConfig> {
        self.methods.get(&method)
    }

    /// Resolve the arguments for `method`. The catch-all entry is resolved
    /// first; keys from the method entry win.
    pub async fn resolve(
        &self,
        method: HttpMethod,
        context: &RequestContext,
    ) -> Result<DataLayerArgs, DependencyError> {
        let mut args = DataLayerArgs::new();
        for config in self.all.iter().chain(self.methods.get(&method)) {
            args.merge(config.resolve(context).await?);
        }
        Ok(args)
    }
}

/// Binds operations to data layer construction arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyBinder;

impl DependencyBinder {
    /// Method whose configuration batch operations resolve through.
    pub const BATCH_METHOD: HttpMethod = HttpMethod::Post;

    pub async fn bind(
        operation: &Operation,
        descriptor: &ResourceDescriptor,
        context: &RequestContext,
    ) -> AtomicResult<DataLayerArgs> {
        let args = descriptor
            .dependencies()
            .resolve(Self::BATCH_METHOD, context)
            .await
            .map_err(|e| AtomicError::dependency(descriptor.resource_type(), e))?;

        debug!(
            "Bound {} {} with {} argument(s) [{}]",
            operation.action,
            descriptor.resource_type(),
            args.len(),
            context.request_id
        );
        Ok(args)
    }
}
