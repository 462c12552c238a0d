//! Parsing of atomic request documents into [`Operation`] values.
//!
//! Parsing is side-effect free. Every shape error is reported with the index
//! of the offending operation.

use super::{Action, Operation, OperationData, ResourceRef};
use crate::error::{AtomicError, AtomicResult};
use crate::resource::{ResourceIdentifier, ResourceObject};
use serde_json::{Map, Value, json};

const OPERATIONS_MEMBER: &str = "atomic:operations";
const OPERATIONS_ALIAS: &str = "operations";

/// A parsed atomic operations request.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicOperationRequest {
    pub operations: Vec<Operation>,
}

impl AtomicOperationRequest {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Parse a request document from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> AtomicResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| AtomicError::malformed(format!("request body is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Parse a request document.
    pub fn from_value(document: Value) -> AtomicResult<Self> {
        let Value::Object(mut document) = document else {
            return Err(AtomicError::malformed("request document must be an object"));
        };

        let entries = document
            .remove(OPERATIONS_MEMBER)
            .or_else(|| document.remove(OPERATIONS_ALIAS))
            .ok_or_else(|| {
                AtomicError::malformed(format!("missing '{}' member", OPERATIONS_MEMBER))
            })?;

        let Value::Array(entries) = entries else {
            return Err(AtomicError::malformed(format!(
                "'{}' must be an array",
                OPERATIONS_MEMBER
            )));
        };

        let operations = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| parse_operation(index, entry))
            .collect::<AtomicResult<Vec<_>>>()?;

        Ok(Self { operations })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Render back to the wire document.
    pub fn to_json(&self) -> Value {
        let operations: Vec<Value> = self.operations.iter().map(operation_to_json).collect();
        json!({ OPERATIONS_MEMBER: operations })
    }
}

fn parse_operation(index: usize, entry: Value) -> AtomicResult<Operation> {
    let Value::Object(mut entry) = entry else {
        return Err(AtomicError::malformed_at(index, "operation must be an object"));
    };

    let op = match entry.get("op") {
        Some(Value::String(op)) => op.clone(),
        Some(_) => return Err(AtomicError::malformed_at(index, "'op' must be a string")),
        None => return Err(AtomicError::malformed_at(index, "missing 'op' member")),
    };
    let action = Action::parse(&op).ok_or(AtomicError::InvalidAction { index, action: op })?;

    let target = match entry.remove("ref") {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_ref(index, value)?),
    };
    let data = entry.remove("data");
    let relationship = target.as_ref().and_then(|t| t.relationship.clone());

    let data = match (action, relationship.is_some()) {
        (Action::Add, true) => {
            return Err(AtomicError::malformed_at(
                index,
                "'add' cannot target a relationship",
            ));
        }
        (Action::Add, false) | (Action::Update, false) => match data {
            Some(value @ Value::Object(_)) => {
                OperationData::Resource(parse_resource_object(index, value)?)
            }
            _ => {
                return Err(AtomicError::malformed_at(
                    index,
                    format!("'{}' requires a resource object in 'data'", action),
                ));
            }
        },
        (Action::Update, true) => match data {
            Some(Value::Null) => OperationData::ToOne(None),
            Some(value @ Value::Object(_)) => {
                OperationData::ToOne(Some(parse_identifier(index, value)?))
            }
            Some(Value::Array(items)) => OperationData::ToMany(parse_identifiers(index, items)?),
            _ => {
                return Err(AtomicError::malformed_at(
                    index,
                    "relationship 'update' requires null, an identifier or a list of identifiers",
                ));
            }
        },
        (Action::Remove, false) => match data {
            None | Some(Value::Null) => OperationData::Empty,
            Some(value @ Value::Object(_)) => {
                OperationData::ToOne(Some(parse_identifier(index, value)?))
            }
            Some(_) => {
                return Err(AtomicError::malformed_at(
                    index,
                    "'remove' of a resource accepts only a single identifier",
                ));
            }
        },
        (Action::Remove, true) => match data {
            Some(Value::Array(items)) => OperationData::ToMany(parse_identifiers(index, items)?),
            _ => {
                return Err(AtomicError::malformed_at(
                    index,
                    "relationship 'remove' requires a list of identifiers",
                ));
            }
        },
    };

    let resource_type = dispatch_type(index, target.as_ref(), &data)?;

    let operation = Operation {
        action,
        resource_type,
        target,
        data,
    };

    // Remove and relationship updates must say what they act on; add and
    // plain updates are checked later against the schema.
    let needs_identity = action == Action::Remove || operation.relationship().is_some();
    if needs_identity && operation.resource_id().is_none() {
        return Err(AtomicError::malformed_at(
            index,
            format!("'{}' requires a target resource id", action),
        ));
    }

    Ok(operation)
}

fn dispatch_type(
    index: usize,
    target: Option<&ResourceRef>,
    data: &OperationData,
) -> AtomicResult<String> {
    if let Some(target) = target.filter(|t| t.relationship.is_some()) {
        return Ok(target.resource_type.clone());
    }

    let (payload_type, payload_id) = match data {
        OperationData::Resource(resource) => (Some(&resource.resource_type), resource.id.as_ref()),
        OperationData::ToOne(Some(identifier)) => {
            (Some(&identifier.resource_type), Some(&identifier.id))
        }
        _ => (None, None),
    };

    if let (Some(payload_id), Some(target_id)) = (payload_id, target.and_then(|t| t.id.as_ref())) {
        if payload_id != target_id {
            return Err(AtomicError::malformed_at(
                index,
                format!(
                    "'data.id' ({}) does not match 'ref.id' ({})",
                    payload_id, target_id
                ),
            ));
        }
    }

    match (payload_type, target) {
        (Some(payload_type), Some(target)) if *payload_type != target.resource_type => {
            Err(AtomicError::malformed_at(
                index,
                format!(
                    "'data.type' ({}) does not match 'ref.type' ({})",
                    payload_type, target.resource_type
                ),
            ))
        }
        (Some(payload_type), _) => Ok(payload_type.clone()),
        (None, Some(target)) => Ok(target.resource_type.clone()),
        (None, None) => Err(AtomicError::malformed_at(
            index,
            "operation does not name a resource type",
        )),
    }
}

fn parse_ref(index: usize, value: Value) -> AtomicResult<ResourceRef> {
    let Value::Object(mut object) = value else {
        return Err(AtomicError::malformed_at(index, "'ref' must be an object"));
    };
    normalize_id(index, &mut object)?;
    let target: ResourceRef = serde_json::from_value(Value::Object(object))
        .map_err(|e| AtomicError::malformed_at(index, format!("invalid 'ref': {}", e)))?;
    if target.id.is_none() && target.lid.is_some() {
        return Err(lid_unsupported(index));
    }
    Ok(target)
}

fn parse_resource_object(index: usize, value: Value) -> AtomicResult<ResourceObject> {
    let Value::Object(mut object) = value else {
        return Err(AtomicError::malformed_at(index, "resource must be an object"));
    };
    normalize_id(index, &mut object)?;
    serde_json::from_value(Value::Object(object))
        .map_err(|e| AtomicError::malformed_at(index, format!("invalid resource object: {}", e)))
}

fn parse_identifier(index: usize, value: Value) -> AtomicResult<ResourceIdentifier> {
    let Value::Object(mut object) = value else {
        return Err(AtomicError::malformed_at(index, "identifier must be an object"));
    };
    if !object.contains_key("id") && object.contains_key("lid") {
        return Err(lid_unsupported(index));
    }
    normalize_id(index, &mut object)?;
    object.retain(|key, _| key == "type" || key == "id");
    serde_json::from_value(Value::Object(object))
        .map_err(|e| AtomicError::malformed_at(index, format!("invalid identifier: {}", e)))
}

fn parse_identifiers(index: usize, items: Vec<Value>) -> AtomicResult<Vec<ResourceIdentifier>> {
    items
        .into_iter()
        .map(|item| parse_identifier(index, item))
        .collect()
}

/// Integer ids are accepted and carried as strings.
fn normalize_id(index: usize, object: &mut Map<String, Value>) -> AtomicResult<()> {
    match object.get("id") {
        None | Some(Value::String(_)) => Ok(()),
        Some(Value::Number(n)) => {
            let id = n.to_string();
            object.insert("id".to_string(), Value::String(id));
            Ok(())
        }
        Some(Value::Null) => {
            object.remove("id");
            Ok(())
        }
        Some(_) => Err(AtomicError::malformed_at(index, "'id' must be a string")),
    }
}

fn lid_unsupported(index: usize) -> AtomicError {
    AtomicError::malformed_at(index, "local identifiers ('lid') are not supported")
}

fn operation_to_json(operation: &Operation) -> Value {
    let mut entry = Map::new();
    entry.insert("op".to_string(), json!(operation.action));
    if let Some(target) = &operation.target {
        entry.insert("ref".to_string(), json!(target));
    }
    match &operation.data {
        OperationData::Resource(resource) => {
            entry.insert("data".to_string(), json!(resource));
        }
        OperationData::ToOne(identifier) => {
            entry.insert("data".to_string(), json!(identifier));
        }
        OperationData::ToMany(identifiers) => {
            entry.insert("data".to_string(), json!(identifiers));
        }
        OperationData::Empty => {}
    }
    Value::Object(entry)
}
