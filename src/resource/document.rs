//! Resource document types.
//!
//! These mirror the JSON:API resource object and resource identifier object.
//! Attributes stay as raw JSON; their shape is owned by the per-resource
//! [`Schema`](crate::schema::Schema).

use crate::error::{ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A resource object: `{type, id, attributes, relationships}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client-local identifier. Carried but never resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl ResourceObject {
    /// Create an empty resource object of the given type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            lid: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Set the resource id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set one attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Set one relationship's linkage.
    pub fn with_relationship(mut self, name: impl Into<String>, data: RelationshipData) -> Self {
        self.relationships.insert(name.into(), Relationship { data });
        self
    }

    /// Get the id if one is assigned.
    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Get an attribute value.
    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Identifier object pointing at this resource, if it has an id.
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.resource_type.clone(), id.clone()))
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Deserialize from a JSON value.
    pub fn from_json(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

/// A resource identifier object: `{type, id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// A relationship object; only the resource linkage is modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: RelationshipData,
}

/// Resource linkage of a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceIdentifier>),
    ToOne(Option<ResourceIdentifier>),
}

impl RelationshipData {
    pub fn is_to_many(&self) -> bool {
        matches!(self, RelationshipData::ToMany(_))
    }

    /// All identifiers in the linkage.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            RelationshipData::ToMany(items) => items.iter().collect(),
            RelationshipData::ToOne(item) => item.iter().collect(),
        }
    }
}

/// How one relationship changes under a patch.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipChange {
    /// Replace the whole linkage
    Replace(RelationshipData),
    /// Drop these members from a to-many linkage
    Remove(Vec<ResourceIdentifier>),
}

/// Partial update applied to a stored resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourcePatch {
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, RelationshipChange>,
}

impl ResourcePatch {
    /// Build a patch from a full resource object: every attribute and
    /// relationship present in the object is replaced.
    pub fn from_resource(resource: ResourceObject) -> Self {
        Self {
            attributes: resource.attributes,
            relationships: resource
                .relationships
                .into_iter()
                .map(|(name, rel)| (name, RelationshipChange::Replace(rel.data)))
                .collect(),
        }
    }

    /// Patch that replaces a single relationship.
    pub fn replace_relationship(name: impl Into<String>, data: RelationshipData) -> Self {
        let mut patch = Self::default();
        patch
            .relationships
            .insert(name.into(), RelationshipChange::Replace(data));
        patch
    }

    /// Patch that removes members from a single to-many relationship.
    pub fn remove_members(name: impl Into<String>, members: Vec<ResourceIdentifier>) -> Self {
        let mut patch = Self::default();
        patch
            .relationships
            .insert(name.into(), RelationshipChange::Remove(members));
        patch
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relationships.is_empty()
    }

    /// Apply this patch to `resource` in place.
    pub fn apply_to(self, resource: &mut ResourceObject) -> ValidationResult<()> {
        for (name, value) in self.attributes {
            resource.attributes.insert(name, value);
        }

        for (name, change) in self.relationships {
            match change {
                RelationshipChange::Replace(data) => {
                    resource.relationships.insert(name, Relationship { data });
                }
                RelationshipChange::Remove(members) => match resource.relationships.get_mut(&name) {
                    Some(Relationship {
                        data: RelationshipData::ToMany(current),
                    }) => current.retain(|item| !members.contains(item)),
                    Some(_) => {
                        return Err(ValidationError::RelationshipCardinality {
                            relationship: name,
                            expected: "to-many".to_string(),
                        });
                    }
                    // Nothing linked, nothing to remove
                    None => {}
                },
            }
        }

        Ok(())
    }
}
