//! # Atomic Batch Linter
//!
//! A command-line utility for checking atomic request documents before they
//! are sent to a server.
//!
//! ## Overview
//!
//! Each document is run through the same parser the engine uses, so a file
//! that lints cleanly is accepted by the operation model. When a schema
//! directory is given, resource payloads are also validated against the
//! matching schema:
//! - `add` payloads against the create schema
//! - `update` payloads against the derived patch schema
//! - relationship linkage against the relationship definitions
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin batch-lint requests/create-post.json
//! cargo run --bin batch-lint ./requests/ --schemas ./schemas/
//! ```
//!
//! ## Output Example
//!
//! ```text
//! Linting: create-post.json
//!   ✓ Valid - 3 operation(s): add post, update post, remove user
//!
//! Lint Summary:
//!   Valid documents: 1
//!   Invalid documents: 0
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: All documents are valid
//! - `1`: One or more documents are invalid or an error occurred

use jsonapi_atomic::operation::{Action, AtomicOperationRequest, OperationData};
use jsonapi_atomic::resource::RelationshipData;
use jsonapi_atomic::schema::Schema;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

type LintResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    let args: Vec<String> = env::args().collect();

    let Some((target, schema_dir)) = parse_args(&args) else {
        eprintln!("Usage: {} <request-file-or-directory> [--schemas <dir>]", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} requests/create-post.json", args[0]);
        eprintln!("  {} ./requests/ --schemas ./schemas/", args[0]);
        process::exit(1);
    };

    let schemas = match schema_dir {
        Some(dir) => match load_schemas(&dir) {
            Ok(schemas) => {
                println!("Loaded {} schema(s) from {}", schemas.len(), dir.display());
                schemas
            }
            Err(e) => {
                eprintln!("❌ Failed to load schemas: {}", e);
                process::exit(1);
            }
        },
        None => HashMap::new(),
    };

    let files = if target.is_file() {
        vec![target]
    } else if target.is_dir() {
        match json_files(&target) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Error reading directory: {}", e);
                process::exit(1);
            }
        }
    } else {
        eprintln!(
            "Error: '{}' is not a valid file or directory",
            target.display()
        );
        process::exit(1);
    };

    let mut valid_count = 0;
    let mut error_count = 0;

    for file in &files {
        println!("\nLinting: {}", file.display());
        match lint_file(file, &schemas) {
            Ok(summary) => {
                println!("  ✓ Valid - {}", summary);
                valid_count += 1;
            }
            Err(e) => {
                eprintln!("  ❌ Invalid - {}", e);
                error_count += 1;
            }
        }
    }

    println!("\nLint Summary:");
    println!("  Valid documents: {}", valid_count);
    println!("  Invalid documents: {}", error_count);

    if error_count > 0 {
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Option<(PathBuf, Option<PathBuf>)> {
    match args {
        [_, target] => Some((PathBuf::from(target), None)),
        [_, target, flag, schemas] if flag == "--schemas" => {
            Some((PathBuf::from(target), Some(PathBuf::from(schemas))))
        }
        _ => None,
    }
}

fn json_files(dir: &Path) -> LintResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_schemas(dir: &Path) -> LintResult<HashMap<String, Schema>> {
    let mut schemas = HashMap::new();
    for path in json_files(dir)? {
        let content = fs::read_to_string(&path)?;
        let schema: Schema = serde_json::from_str(&content)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        if schemas.contains_key(&schema.resource_type) {
            return Err(format!("duplicate schema for '{}'", schema.resource_type).into());
        }
        schemas.insert(schema.resource_type.clone(), schema);
    }
    Ok(schemas)
}

fn lint_file(path: &Path, schemas: &HashMap<String, Schema>) -> LintResult<String> {
    let content = fs::read(path)?;
    let request = AtomicOperationRequest::from_slice(&content)?;

    if !schemas.is_empty() {
        for (index, operation) in request.operations.iter().enumerate() {
            let schema = schemas.get(&operation.resource_type).ok_or_else(|| {
                format!(
                    "operation {}: no schema for resource type '{}'",
                    index, operation.resource_type
                )
            })?;
            check_payload(schema, operation.action, operation.relationship(), &operation.data)
                .map_err(|e| format!("operation {}: {}", index, e))?;
        }
    }

    let actions: Vec<String> = request
        .operations
        .iter()
        .map(|op| format!("{} {}", op.action, op.resource_type))
        .collect();
    Ok(format!(
        "{} operation(s): {}",
        request.len(),
        actions.join(", ")
    ))
}

fn check_payload(
    schema: &Schema,
    action: Action,
    relationship: Option<&str>,
    data: &OperationData,
) -> LintResult<()> {
    match (action, relationship, data) {
        (Action::Add, None, OperationData::Resource(resource)) => {
            schema.validate_create(resource)?;
        }
        (Action::Update, None, OperationData::Resource(resource)) => {
            schema.as_patch().validate_patch(resource)?;
        }
        (Action::Update, Some(name), OperationData::ToOne(linkage)) => {
            schema.validate_linkage(name, &RelationshipData::ToOne(linkage.clone()))?;
        }
        (Action::Update, Some(name), OperationData::ToMany(linkage)) => {
            schema.validate_linkage(name, &RelationshipData::ToMany(linkage.clone()))?;
        }
        (Action::Remove, Some(name), OperationData::ToMany(members)) => {
            schema.validate_member_removal(name, members)?;
        }
        _ => {}
    }
    Ok(())
}
