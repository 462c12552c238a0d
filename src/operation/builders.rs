//! Builder utilities for [`Operation`] values.

use super::{Action, Operation, OperationData, ResourceRef};
use crate::resource::{RelationshipData, ResourceIdentifier, ResourceObject};

impl Operation {
    /// Create a new add operation.
    pub fn add(resource: ResourceObject) -> Self {
        Self {
            action: Action::Add,
            resource_type: resource.resource_type.clone(),
            target: None,
            data: OperationData::Resource(resource),
        }
    }

    /// Create a new update operation. The resource must carry its id.
    pub fn update(resource: ResourceObject) -> Self {
        Self {
            action: Action::Update,
            resource_type: resource.resource_type.clone(),
            target: None,
            data: OperationData::Resource(resource),
        }
    }

    /// Create a new remove operation addressed through `ref`.
    pub fn remove(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        let target = ResourceRef::new(resource_type, id);
        Self {
            action: Action::Remove,
            resource_type: target.resource_type.clone(),
            target: Some(target),
            data: OperationData::Empty,
        }
    }

    /// Create an update that replaces one relationship of a resource.
    pub fn update_relationship(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        relationship: impl Into<String>,
        data: RelationshipData,
    ) -> Self {
        let target = ResourceRef::new(resource_type, id).with_relationship(relationship);
        let data = match data {
            RelationshipData::ToOne(identifier) => OperationData::ToOne(identifier),
            RelationshipData::ToMany(identifiers) => OperationData::ToMany(identifiers),
        };
        Self {
            action: Action::Update,
            resource_type: target.resource_type.clone(),
            target: Some(target),
            data,
        }
    }

    /// Create a remove that drops members from a to-many relationship.
    pub fn remove_members(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        relationship: impl Into<String>,
        members: Vec<ResourceIdentifier>,
    ) -> Self {
        let target = ResourceRef::new(resource_type, id).with_relationship(relationship);
        Self {
            action: Action::Remove,
            resource_type: target.resource_type.clone(),
            target: Some(target),
            data: OperationData::ToMany(members),
        }
    }
}
