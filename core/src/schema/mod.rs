#![deny(missing_docs)]

//! # Schema Dialect Conversion
//!
//! Converts OpenAPI 2.x / 3.x Schema Objects into JSON Schema Draft-07.
//!
//! - Structural keywords (`allOf`, `items`, `properties`, ...) are recursed first.
//! - The keyword table in [`keywords`] is then applied to every node.
//! - A node that is itself a `{ $ref }` is left alone apart from reference
//!   synchronization: its target is converted on its own, wherever it ends up.
//!
//! Conversion never mutates its input and is idempotent.

pub mod keywords;

use serde_json::Value;
use std::collections::HashMap;

/// JSON Schema dialect marker written at the root of translated schemas.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Map from a source `$ref` string to the pointer it must be rewritten to.
pub type RefMap = HashMap<String, String>;

/// Keywords holding a list of subschemas.
const SCHEMA_ARRAYS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// Keywords holding a single subschema.
const SCHEMA_SINGLES: [&str; 8] = [
    "not",
    "additionalProperties",
    "additionalItems",
    "contains",
    "propertyNames",
    "if",
    "then",
    "else",
];

/// Keywords holding a map of subschemas.
const SCHEMA_MAPS: [&str; 4] = ["properties", "patternProperties", "definitions", "$defs"];

/// Converts `schema` into Draft-07, rewriting `$ref`s found in `references`.
pub fn convert(schema: &Value, references: &RefMap) -> Value {
    let mut out = schema.clone();
    convert_in_place(&mut out, references);
    out
}

/// In-place variant of [`convert`].
pub fn convert_in_place(node: &mut Value, references: &RefMap) {
    let Value::Object(map) = node else {
        return;
    };

    if let Some(reference) = map.get("$ref").and_then(Value::as_str).map(str::to_owned) {
        if let Some(target) = references.get(&reference) {
            map.insert("$ref".to_string(), Value::String(target.clone()));
        }
        return;
    }

    for key in SCHEMA_ARRAYS {
        if let Some(Value::Array(items)) = map.get_mut(key) {
            for item in items.iter_mut() {
                convert_in_place(item, references);
            }
        }
    }
    for key in SCHEMA_SINGLES {
        if let Some(sub) = map.get_mut(key) {
            convert_in_place(sub, references);
        }
    }
    match map.get_mut("items") {
        Some(Value::Array(items)) => {
            for item in items.iter_mut() {
                convert_in_place(item, references);
            }
        }
        Some(item) => convert_in_place(item, references),
        None => {}
    }
    for key in SCHEMA_MAPS {
        if let Some(Value::Object(entries)) = map.get_mut(key) {
            for sub in entries.values_mut() {
                convert_in_place(sub, references);
            }
        }
    }

    keywords::apply(map);
}

/// Converts a root schema and stamps the Draft-07 `$schema` marker on it.
///
/// Reference-only schemas are returned unstamped so they stay pure references.
pub fn convert_root(schema: &Value, references: &RefMap) -> Value {
    let mut out = convert(schema, references);
    if let Value::Object(map) = &mut out {
        if !map.contains_key("$ref") && !map.contains_key("$schema") {
            map.insert("$schema".to_string(), Value::String(DRAFT_07.to_string()));
        }
    }
    out
}
