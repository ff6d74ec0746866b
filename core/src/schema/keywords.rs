#![deny(missing_docs)]

//! # Keyword Converters
//!
//! Per-node rewrites for OpenAPI keywords that have no 1:1 Draft-07 equivalent.
//! Each converter runs only when its trigger keyword is present, and leaves
//! already-converted input unchanged.

use serde_json::{json, Map, Value};

/// Base64 alphabet pattern attached to `format: byte` strings.
pub const BASE64_PATTERN: &str =
    "^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$";

/// Extension recording keywords that were authored explicitly but dropped.
pub const EXPLICIT_PROPERTIES: &str = "x-explicit-properties";

/// A converter rewrites one schema node in place.
pub type KeywordConverter = fn(&mut Map<String, Value>);

/// Trigger keyword -> converter, applied in order.
///
/// `nullable` runs last because it may wrap the node in `anyOf`.
pub const KEYWORDS: &[(&str, KeywordConverter)] = &[
    ("exclusiveMinimum", exclusive_minimum),
    ("exclusiveMaximum", exclusive_maximum),
    ("format", format_range),
    ("format", byte_pattern),
    ("format", content_encoding),
    ("example", example),
    ("x-example", example),
    ("id", rename_id),
    ("nullable", nullable),
    ("x-nullable", nullable),
];

/// Applies the keyword table to a single schema node.
pub fn apply(map: &mut Map<String, Value>) {
    for (keyword, converter) in KEYWORDS {
        if map.contains_key(*keyword) {
            converter(map);
        }
    }
}

/// `nullable` / `x-nullable`.
pub fn nullable(map: &mut Map<String, Value>) {
    let flags: Vec<Value> = ["nullable", "x-nullable"]
        .iter()
        .filter_map(|k| map.remove(*k))
        .collect();
    if flags.is_empty() {
        return;
    }

    if !flags.iter().any(|f| f.as_bool() == Some(true)) {
        record_explicit(map, "nullable");
        return;
    }

    if let Some(Value::Array(values)) = map.get_mut("enum") {
        if !values.iter().any(Value::is_null) {
            values.push(Value::Null);
        }
    }

    if !map.contains_key("type") {
        if !map.contains_key("enum") {
            let original = std::mem::take(map);
            map.insert(
                "anyOf".to_string(),
                json!([Value::Object(original), { "type": "null" }]),
            );
        }
        return;
    }

    match map.get_mut("type") {
        Some(ty) if ty.is_string() => {
            if ty.as_str() != Some("null") {
                let single = ty.take();
                *ty = json!([single, "null"]);
            }
        }
        Some(Value::Array(types)) => {
            if !types.iter().any(|t| t.as_str() == Some("null")) {
                types.push(Value::String("null".to_string()));
            }
        }
        _ => {}
    }
}

/// `example` / `x-example` become a one-element `examples` list.
pub fn example(map: &mut Map<String, Value>) {
    match map.get("examples") {
        None | Some(Value::Array(_)) => {}
        Some(_) => return,
    }
    let values: Vec<Value> = ["example", "x-example"]
        .iter()
        .filter_map(|k| map.remove(*k))
        .collect();
    let entry = map
        .entry("examples")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(examples) = entry {
        for v in values {
            if !examples.contains(&v) {
                examples.push(v);
            }
        }
    }
}

/// Legacy boolean `exclusiveMinimum`.
pub fn exclusive_minimum(map: &mut Map<String, Value>) {
    exclusive_bound(map, "exclusiveMinimum", "minimum");
}

/// Legacy boolean `exclusiveMaximum`.
pub fn exclusive_maximum(map: &mut Map<String, Value>) {
    exclusive_bound(map, "exclusiveMaximum", "maximum");
}

fn exclusive_bound(map: &mut Map<String, Value>, keyword: &str, bound: &str) {
    match map.get(keyword) {
        Some(Value::Bool(true)) => match map.remove(bound) {
            Some(value) => {
                map.insert(keyword.to_string(), value);
            }
            None => {
                map.remove(keyword);
            }
        },
        Some(Value::Bool(false)) | Some(Value::Null) => {
            map.remove(keyword);
        }
        _ => {}
    }
}

/// Numeric `format`s clamp `minimum` / `maximum` to the format's range.
pub fn format_range(map: &mut Map<String, Value>) {
    let Some((lower, upper)) = map
        .get("format")
        .and_then(Value::as_str)
        .and_then(numeric_range)
    else {
        return;
    };
    if !is_numeric_type(map.get("type")) {
        return;
    }
    intersect(map, "minimum", "exclusiveMinimum", lower, |cur, b| cur >= b);
    intersect(map, "maximum", "exclusiveMaximum", upper, |cur, b| cur <= b);
}

/// `format: byte` gets a base64 `pattern`.
pub fn byte_pattern(map: &mut Map<String, Value>) {
    if map.get("format").and_then(Value::as_str) != Some("byte") {
        return;
    }
    if !map.contains_key("pattern") {
        map.insert(
            "pattern".to_string(),
            Value::String(BASE64_PATTERN.to_string()),
        );
    }
}

/// `format: base64` / `binary` become content keywords.
pub fn content_encoding(map: &mut Map<String, Value>) {
    let (keyword, value) = match map.get("format").and_then(Value::as_str) {
        Some("base64") => ("contentEncoding", "base64"),
        Some("binary") => ("contentMediaType", "application/octet-stream"),
        _ => return,
    };
    map.remove("format");
    map.entry(keyword)
        .or_insert_with(|| Value::String(value.to_string()));
}

/// `id` is renamed to `$id`.
pub fn rename_id(map: &mut Map<String, Value>) {
    if map.contains_key("$id") || !map.get("id").is_some_and(Value::is_string) {
        return;
    }
    if let Some(id) = map.remove("id") {
        map.insert("$id".to_string(), id);
    }
}

fn numeric_range(format: &str) -> Option<(Value, Value)> {
    match format {
        "int32" => Some((Value::from(i32::MIN), Value::from(i32::MAX))),
        "int64" => Some((Value::from(i64::MIN), Value::from(i64::MAX))),
        "float" => Some((Value::from(f64::from(f32::MIN)), Value::from(f64::from(f32::MAX)))),
        "double" => Some((Value::from(f64::MIN), Value::from(f64::MAX))),
        _ => None,
    }
}

fn is_numeric_type(ty: Option<&Value>) -> bool {
    let numeric = |t: &str| t == "integer" || t == "number";
    match ty {
        Some(Value::String(t)) => numeric(t.as_str()),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(numeric),
        _ => false,
    }
}

/// Keeps an existing bound when it is within the range, otherwise sets the range's.
fn intersect(
    map: &mut Map<String, Value>,
    keyword: &str,
    exclusive: &str,
    range_bound: Value,
    within: fn(f64, f64) -> bool,
) {
    let Some(limit) = range_bound.as_f64() else {
        return;
    };
    if let Some(current) = map.get(keyword).and_then(Value::as_f64) {
        if within(current, limit) {
            return;
        }
    } else if map
        .get(exclusive)
        .and_then(Value::as_f64)
        .is_some_and(|ex| within(ex, limit))
    {
        return;
    }
    map.insert(keyword.to_string(), range_bound);
}

fn record_explicit(map: &mut Map<String, Value>, keyword: &str) {
    let entry = map
        .entry(EXPLICIT_PROPERTIES)
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = entry {
        if !list.iter().any(|v| v.as_str() == Some(keyword)) {
            list.push(Value::String(keyword.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(v: Value) -> Value {
        let mut v = v;
        if let Value::Object(map) = &mut v {
            apply(map);
        }
        v
    }

    #[test]
    fn test_nullable_enum_gets_null() {
        let out = run(json!({"type": "string", "enum": ["a"], "nullable": true}));
        assert_eq!(out["enum"], json!(["a", null]));
        assert_eq!(out["type"], json!(["string", "null"]));
    }

    #[test]
    fn test_nullable_without_type_wraps() {
        let out = run(json!({"allOf": [{"$ref": "#/a"}], "nullable": true}));
        assert_eq!(
            out,
            json!({"anyOf": [{"allOf": [{"$ref": "#/a"}]}, {"type": "null"}]})
        );
    }

    #[test]
    fn test_nullable_false_is_recorded() {
        let out = run(json!({"type": "string", "nullable": false}));
        assert_eq!(out["type"], json!("string"));
        assert_eq!(out[EXPLICIT_PROPERTIES], json!(["nullable"]));
        assert!(out.get("nullable").is_none());
    }

    #[test]
    fn test_example_moves_to_examples() {
        let out = run(json!({"type": "string", "example": "hi"}));
        assert_eq!(out, json!({"type": "string", "examples": ["hi"]}));
        let out = run(json!({"x-example": 1, "examples": [0]}));
        assert_eq!(out["examples"], json!([0, 1]));
    }

    #[test]
    fn test_exclusive_minimum_true() {
        let out = run(json!({"type": "number", "minimum": 3, "exclusiveMinimum": true}));
        assert_eq!(out, json!({"type": "number", "exclusiveMinimum": 3}));
    }

    #[test]
    fn test_exclusive_maximum_false_dropped() {
        let out = run(json!({"type": "number", "maximum": 3, "exclusiveMaximum": false}));
        assert_eq!(out, json!({"type": "number", "maximum": 3}));
    }

    #[test]
    fn test_exclusive_without_bound_dropped() {
        let out = run(json!({"type": "number", "exclusiveMinimum": true}));
        assert_eq!(out, json!({"type": "number"}));
    }

    #[test]
    fn test_format_range_intersects_existing_bounds() {
        let out = run(json!({"type": "integer", "format": "int32", "minimum": 10, "maximum": 99999999999_i64}));
        assert_eq!(out["minimum"], json!(10));
        assert_eq!(out["maximum"], json!(2147483647));
    }

    #[test]
    fn test_format_range_respects_exclusive_bound() {
        let out = run(json!({"type": "integer", "format": "int32", "minimum": 0, "exclusiveMinimum": true}));
        assert_eq!(out["exclusiveMinimum"], json!(0));
        assert!(out.get("minimum").is_none());
        assert_eq!(out["maximum"], json!(2147483647));
    }

    #[test]
    fn test_format_range_ignores_strings() {
        let out = run(json!({"type": "string", "format": "int64"}));
        assert!(out.get("minimum").is_none());
    }

    #[test]
    fn test_int64_and_float_ranges() {
        let out = run(json!({"type": "integer", "format": "int64"}));
        assert_eq!(out["minimum"], json!(i64::MIN));
        assert_eq!(out["maximum"], json!(i64::MAX));
        let out = run(json!({"type": "number", "format": "float"}));
        assert_eq!(out["maximum"].as_f64(), Some(f64::from(f32::MAX)));
    }

    #[test]
    fn test_byte_pattern() {
        let out = run(json!({"type": "string", "format": "byte"}));
        assert_eq!(out["pattern"], json!(BASE64_PATTERN));
        assert_eq!(out["format"], json!("byte"));
    }

    #[test]
    fn test_binary_and_base64_content() {
        let out = run(json!({"type": "string", "format": "binary"}));
        assert_eq!(
            out,
            json!({"type": "string", "contentMediaType": "application/octet-stream"})
        );
        let out = run(json!({"type": "string", "format": "base64"}));
        assert_eq!(out, json!({"type": "string", "contentEncoding": "base64"}));
    }

    #[test]
    fn test_rename_id() {
        let out = run(json!({"id": "urn:thing", "type": "object"}));
        assert_eq!(out, json!({"type": "object", "$id": "urn:thing"}));
        let untouched = run(json!({"id": 5}));
        assert_eq!(untouched, json!({"id": 5}));
    }
}
