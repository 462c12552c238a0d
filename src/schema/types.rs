//! Core schema type definitions.
//!
//! A [`Schema`] describes the payload a resource type accepts for one write
//! path: its attributes, its relationships and whether a client may choose the
//! resource id.

use serde::{Deserialize, Serialize};

/// Payload schema for one resource type.
///
/// Descriptors carry two of these: one for creation and one for partial
/// updates. They usually share attributes and differ in required-ness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Resource type the schema applies to
    pub resource_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDefinition>,
    /// Whether a create payload may carry its own `id`
    #[serde(default)]
    pub client_can_set_id: bool,
}

impl Schema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            description: String::new(),
            attributes: Vec::new(),
            relationships: Vec::new(),
            client_can_set_id: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipDefinition) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Let clients provide the id on creation.
    pub fn allow_client_id(mut self) -> Self {
        self.client_can_set_id = true;
        self
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn get_relationship(&self, name: &str) -> Option<&RelationshipDefinition> {
        self.relationships.iter().find(|rel| rel.name == name)
    }

    /// Copy of this schema with nothing required, for partial updates.
    pub fn as_patch(&self) -> Self {
        let mut patch = self.clone();
        for attribute in &mut patch.attributes {
            attribute.required = false;
        }
        for relationship in &mut patch.relationships {
            relationship.required = false;
        }
        patch.client_can_set_id = false;
        patch
    }
}

/// Definition of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Data type of the attribute
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    /// Whether this attribute can have multiple values
    #[serde(default)]
    pub multi_valued: bool,
    /// Whether this attribute is required on creation
    #[serde(default)]
    pub required: bool,
    /// Mutability characteristics
    #[serde(default)]
    pub mutability: Mutability,
    /// Allowed values for string attributes
    #[serde(default)]
    pub canonical_values: Vec<String>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn with_canonical_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical_values = values.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            required: false,
            mutability: Mutability::ReadWrite,
            canonical_values: Vec::new(),
        }
    }
}

/// Attribute data types.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    /// String value
    #[default]
    String,
    /// Boolean value
    Boolean,
    /// Integer number
    Integer,
    /// Any JSON number
    Decimal,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    /// Free-form JSON object
    Object,
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Managed by the server, never accepted from clients
    ReadOnly,
    /// Can be set on creation and modified later
    #[default]
    ReadWrite,
    /// Set once on creation, never modified
    Immutable,
}

/// Definition of one relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDefinition {
    pub name: String,
    /// Type every linked identifier must have
    pub resource_type: String,
    /// To-many when true, to-one otherwise
    #[serde(default)]
    pub many: bool,
    #[serde(default)]
    pub required: bool,
}

impl RelationshipDefinition {
    pub fn to_one(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            many: false,
            required: false,
        }
    }

    pub fn to_many(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            many: true,
            ..Self::to_one(name, resource_type)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
