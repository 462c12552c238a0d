//! Schema validation logic for resource payloads.
//!
//! Two modes exist. [`ValidationMode::Create`] checks a complete payload:
//! required attributes and relationships must be present. [`ValidationMode::Patch`]
//! checks a partial payload: only what is present is validated, and attributes
//! that cannot change after creation are rejected.

use super::types::{AttributeDefinition, AttributeType, Mutability, RelationshipDefinition, Schema};
use crate::error::{ValidationError, ValidationResult};
use crate::resource::{RelationshipData, ResourceIdentifier, ResourceObject};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Which write path a payload is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Patch,
}

impl Schema {
    /// Validate a payload for creation.
    pub fn validate_create(&self, resource: &ResourceObject) -> ValidationResult<()> {
        self.validate(resource, ValidationMode::Create)
    }

    /// Validate a payload for a partial update.
    pub fn validate_patch(&self, resource: &ResourceObject) -> ValidationResult<()> {
        self.validate(resource, ValidationMode::Patch)
    }

    /// Validate a resource payload against this schema.
    pub fn validate(&self, resource: &ResourceObject, mode: ValidationMode) -> ValidationResult<()> {
        if resource.resource_type != self.resource_type {
            return Err(ValidationError::ResourceTypeMismatch {
                expected: self.resource_type.clone(),
                actual: resource.resource_type.clone(),
            });
        }

        if mode == ValidationMode::Create && resource.id.is_some() && !self.client_can_set_id {
            return Err(ValidationError::ClientProvidedId {
                resource_type: self.resource_type.clone(),
            });
        }

        for (name, value) in &resource.attributes {
            let definition =
                self.get_attribute(name)
                    .ok_or_else(|| ValidationError::UnknownAttribute {
                        attribute: name.clone(),
                        resource_type: self.resource_type.clone(),
                    })?;
            self.validate_attribute(definition, value, mode)?;
        }

        for (name, relationship) in &resource.relationships {
            self.validate_linkage(name, &relationship.data)?;
        }

        if mode == ValidationMode::Create {
            for definition in self.attributes.iter().filter(|attr| attr.required) {
                match resource.attributes.get(&definition.name) {
                    None | Some(Value::Null) => {
                        return Err(ValidationError::missing_required(&definition.name));
                    }
                    Some(_) => {}
                }
            }

            for definition in self.relationships.iter().filter(|rel| rel.required) {
                if !resource.relationships.contains_key(&definition.name) {
                    return Err(ValidationError::MissingRequiredRelationship {
                        relationship: definition.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Validate new linkage for one relationship.
    pub fn validate_linkage(&self, name: &str, data: &RelationshipData) -> ValidationResult<()> {
        let definition = self.relationship_definition(name)?;

        match (definition.many, data) {
            (true, RelationshipData::ToOne(_)) => {
                return Err(ValidationError::RelationshipCardinality {
                    relationship: name.to_string(),
                    expected: "to-many".to_string(),
                });
            }
            (false, RelationshipData::ToMany(_)) => {
                return Err(ValidationError::RelationshipCardinality {
                    relationship: name.to_string(),
                    expected: "to-one".to_string(),
                });
            }
            (false, RelationshipData::ToOne(None)) if definition.required => {
                return Err(ValidationError::MissingRequiredRelationship {
                    relationship: name.to_string(),
                });
            }
            _ => {}
        }

        Self::check_identifier_types(definition, data.identifiers())
    }

    /// Validate removal of members from a to-many relationship.
    pub fn validate_member_removal(
        &self,
        name: &str,
        members: &[ResourceIdentifier],
    ) -> ValidationResult<()> {
        let definition = self.relationship_definition(name)?;
        if !definition.many {
            return Err(ValidationError::RelationshipCardinality {
                relationship: name.to_string(),
                expected: "to-many".to_string(),
            });
        }
        Self::check_identifier_types(definition, members.iter())
    }

    fn relationship_definition(&self, name: &str) -> ValidationResult<&RelationshipDefinition> {
        self.get_relationship(name)
            .ok_or_else(|| ValidationError::UnknownRelationship {
                relationship: name.to_string(),
                resource_type: self.resource_type.clone(),
            })
    }

    fn check_identifier_types<'a>(
        definition: &RelationshipDefinition,
        identifiers: impl IntoIterator<Item = &'a ResourceIdentifier>,
    ) -> ValidationResult<()> {
        for identifier in identifiers {
            if identifier.resource_type != definition.resource_type {
                return Err(ValidationError::RelationshipTypeMismatch {
                    relationship: definition.name.clone(),
                    expected: definition.resource_type.clone(),
                    actual: identifier.resource_type.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validate a single attribute against its definition.
    fn validate_attribute(
        &self,
        attr_def: &AttributeDefinition,
        value: &Value,
        mode: ValidationMode,
    ) -> ValidationResult<()> {
        match (attr_def.mutability, mode) {
            (Mutability::ReadOnly, _) => {
                return Err(ValidationError::ReadOnlyMutabilityViolation {
                    attribute: attr_def.name.clone(),
                });
            }
            (Mutability::Immutable, ValidationMode::Patch) => {
                return Err(ValidationError::ImmutableMutabilityViolation {
                    attribute: attr_def.name.clone(),
                });
            }
            _ => {}
        }

        if value.is_null() {
            if attr_def.required && mode == ValidationMode::Create {
                return Err(ValidationError::missing_required(&attr_def.name));
            }
            return Ok(());
        }

        if attr_def.multi_valued {
            let Some(items) = value.as_array() else {
                return Err(ValidationError::ExpectedMultiValue {
                    attribute: attr_def.name.clone(),
                });
            };
            for item in items {
                Self::validate_attribute_value(attr_def, item)?;
            }
        } else {
            if value.is_array() {
                return Err(ValidationError::ExpectedSingleValue {
                    attribute: attr_def.name.clone(),
                });
            }
            Self::validate_attribute_value(attr_def, value)?;
        }

        Ok(())
    }

    /// Validate the value of an attribute against its type and constraints.
    fn validate_attribute_value(attr_def: &AttributeDefinition, value: &Value) -> ValidationResult<()> {
        let type_ok = match attr_def.data_type {
            AttributeType::String | AttributeType::DateTime | AttributeType::Binary => {
                value.is_string()
            }
            AttributeType::Boolean => value.is_boolean(),
            AttributeType::Integer => value.is_i64() || value.is_u64(),
            AttributeType::Decimal => value.is_number(),
            AttributeType::Object => value.is_object(),
        };
        if !type_ok {
            return Err(ValidationError::invalid_type(
                &attr_def.name,
                type_name(attr_def.data_type),
                value_type(value),
            ));
        }

        let Some(text) = value.as_str() else {
            return Ok(());
        };

        match attr_def.data_type {
            AttributeType::String if !attr_def.canonical_values.is_empty() => {
                if !attr_def.canonical_values.iter().any(|allowed| allowed == text) {
                    return Err(ValidationError::InvalidCanonicalValue {
                        attribute: attr_def.name.clone(),
                        value: text.to_string(),
                        allowed: attr_def.canonical_values.clone(),
                    });
                }
            }
            AttributeType::DateTime => {
                if DateTime::<FixedOffset>::parse_from_rfc3339(text).is_err() {
                    return Err(ValidationError::InvalidDateTimeFormat {
                        attribute: attr_def.name.clone(),
                        value: text.to_string(),
                    });
                }
            }
            AttributeType::Binary => {
                if let Err(e) = STANDARD.decode(text) {
                    return Err(ValidationError::InvalidBinaryData {
                        attribute: attr_def.name.clone(),
                        details: e.to_string(),
                    });
                }
            }
            _ => {}
        }

        Ok(())
    }
}

fn type_name(data_type: AttributeType) -> &'static str {
    match data_type {
        AttributeType::String => "string",
        AttributeType::Boolean => "boolean",
        AttributeType::Integer => "integer",
        AttributeType::Decimal => "decimal",
        AttributeType::DateTime => "dateTime",
        AttributeType::Binary => "binary",
        AttributeType::Object => "object",
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
