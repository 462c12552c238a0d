//! Resource descriptors.

use crate::data_layer::DataLayerFactory;
use crate::dependencies::MethodDependencies;
use crate::error::{AtomicError, AtomicResult};
use crate::handlers::{ResourceHandler, StandardResourceHandler};
use crate::operation::Action;
use crate::schema::Schema;
use std::fmt;
use std::sync::Arc;

/// Everything the engine needs to execute operations on one resource type.
///
/// By default a descriptor supports all three actions through
/// [`StandardResourceHandler`] and derives its patch schema from the create
/// schema.
#[derive(Clone)]
pub struct ResourceDescriptor {
    resource_type: String,
    create_schema: Schema,
    patch_schema: Schema,
    handler: Arc<dyn ResourceHandler>,
    operations: Vec<Action>,
    data_layer: Arc<dyn DataLayerFactory>,
    dependencies: MethodDependencies,
}

impl ResourceDescriptor {
    /// Describe the resource type named by `schema`.
    pub fn new(schema: Schema, data_layer: Arc<dyn DataLayerFactory>) -> Self {
        Self {
            resource_type: schema.resource_type.clone(),
            patch_schema: schema.as_patch(),
            create_schema: schema,
            handler: Arc::new(StandardResourceHandler::new()),
            operations: vec![Action::Add, Action::Update, Action::Remove],
            data_layer,
            dependencies: MethodDependencies::default(),
        }
    }

    pub fn with_patch_schema(mut self, schema: Schema) -> Self {
        self.patch_schema = schema;
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn ResourceHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Restrict the actions this resource type accepts.
    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Action>) -> Self {
        self.operations = operations.into_iter().collect();
        self
    }

    pub fn with_dependencies(mut self, dependencies: MethodDependencies) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn create_schema(&self) -> &Schema {
        &self.create_schema
    }

    pub fn patch_schema(&self) -> &Schema {
        &self.patch_schema
    }

    pub fn handler(&self) -> &Arc<dyn ResourceHandler> {
        &self.handler
    }

    pub fn data_layer(&self) -> &Arc<dyn DataLayerFactory> {
        &self.data_layer
    }

    pub fn dependencies(&self) -> &MethodDependencies {
        &self.dependencies
    }

    pub fn operations(&self) -> &[Action] {
        &self.operations
    }

    pub fn supports(&self, action: Action) -> bool {
        self.operations.contains(&action)
    }

    /// Fail with `UnsupportedOperation` unless `action` is supported.
    pub fn ensure_supported(&self, action: Action) -> AtomicResult<()> {
        if !self.supports(action) {
            return Err(AtomicError::UnsupportedOperation {
                resource_type: self.resource_type.clone(),
                action,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("resource_type", &self.resource_type)
            .field("operations", &self.operations)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
