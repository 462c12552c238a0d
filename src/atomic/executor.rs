//! Operation dispatch.
//!
//! Each [`PreparedOperation`] is executed against the handle it owns: the
//! payload is validated against the descriptor's schema and exactly one
//! handler call is made.

use super::results::ResultEntry;
use crate::data_layer::DataLayer;
use crate::error::{AtomicError, AtomicResult, ValidationError};
use crate::operation::{Action, Operation, OperationData};
use crate::registry::ResourceDescriptor;
use crate::resource::{RelationshipData, RequestContext, ResourceObject, ResourcePatch};
use log::{debug, trace};
use std::sync::Arc;

/// An operation paired with its resolved descriptor.
#[derive(Debug, Clone)]
pub struct PreparedOperation {
    /// Position in the submitted batch
    pub index: usize,
    pub operation: Operation,
    pub descriptor: Arc<ResourceDescriptor>,
}

/// Dispatches prepared operations by action.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationExecutor;

impl OperationExecutor {
    pub async fn execute(
        prepared: PreparedOperation,
        layer: &mut dyn DataLayer,
        context: &RequestContext,
    ) -> AtomicResult<ResultEntry> {
        let PreparedOperation {
            index,
            operation,
            descriptor,
        } = prepared;

        descriptor.ensure_supported(operation.action)?;

        debug!(
            "Executing operation {}: {} {} via {} [{}]",
            index,
            operation.action,
            operation.resource_type,
            layer.name(),
            context.request_id
        );

        let resource_type = operation.resource_type.clone();
        let relationship = operation.relationship().map(str::to_string);
        let id = operation.resource_id().map(str::to_string);
        let handler = descriptor.handler().clone();

        match (operation.action, relationship, operation.data) {
            (Action::Add, None, OperationData::Resource(resource)) => {
                trace!("Create payload: {:?}", resource);
                descriptor.create_schema().validate_create(&resource)?;
                let created = handler.create(layer, resource, context).await?;
                Ok(ResultEntry::data(created))
            }

            (Action::Update, None, OperationData::Resource(resource)) => {
                trace!("Update payload: {:?}", resource);
                let id = id.ok_or_else(|| missing_id(&resource_type, Action::Update))?;
                descriptor.patch_schema().validate_patch(&resource)?;
                let updated = handler
                    .update(
                        layer,
                        &resource_type,
                        &id,
                        ResourcePatch::from_resource(resource),
                        context,
                    )
                    .await?;
                Ok(ResultEntry::data(updated))
            }

            (Action::Update, Some(relationship), OperationData::ToOne(linkage)) => {
                let data = RelationshipData::ToOne(linkage);
                Self::replace_relationship(&descriptor, layer, id, relationship, data, context)
                    .await
                    .map(ResultEntry::data)
            }

            (Action::Update, Some(relationship), OperationData::ToMany(linkage)) => {
                let data = RelationshipData::ToMany(linkage);
                Self::replace_relationship(&descriptor, layer, id, relationship, data, context)
                    .await
                    .map(ResultEntry::data)
            }

            (Action::Remove, None, OperationData::Empty | OperationData::ToOne(Some(_))) => {
                let id = id.ok_or_else(|| missing_id(&resource_type, Action::Remove))?;
                handler.delete(layer, &resource_type, &id, context).await?;
                Ok(ResultEntry::empty())
            }

            (Action::Remove, Some(relationship), OperationData::ToMany(members)) => {
                let id = id.ok_or_else(|| missing_id(&resource_type, Action::Remove))?;
                descriptor
                    .patch_schema()
                    .validate_member_removal(&relationship, &members)?;
                handler
                    .update(
                        layer,
                        &resource_type,
                        &id,
                        ResourcePatch::remove_members(relationship, members),
                        context,
                    )
                    .await?;
                Ok(ResultEntry::empty())
            }

            (action, _, _) => Err(AtomicError::malformed_at(
                index,
                format!("payload shape does not match '{}'", action),
            )),
        }
    }

    async fn replace_relationship(
        descriptor: &ResourceDescriptor,
        layer: &mut dyn DataLayer,
        id: Option<String>,
        relationship: String,
        data: RelationshipData,
        context: &RequestContext,
    ) -> AtomicResult<ResourceObject> {
        let resource_type = descriptor.resource_type();
        let id = id.ok_or_else(|| missing_id(resource_type, Action::Update))?;
        descriptor
            .patch_schema()
            .validate_linkage(&relationship, &data)?;
        descriptor
            .handler()
            .update(
                layer,
                resource_type,
                &id,
                ResourcePatch::replace_relationship(relationship, data),
                context,
            )
            .await
    }
}

fn missing_id(resource_type: &str, action: Action) -> AtomicError {
    AtomicError::Validation(ValidationError::MissingId {
        resource_type: resource_type.to_string(),
        action: action.to_string(),
    })
}
