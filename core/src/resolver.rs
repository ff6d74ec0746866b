#![deny(missing_docs)]

//! # Reference Resolution
//!
//! Resolves local `$ref` JSON Pointers against the root document.
//!
//! These helpers never fetch external documents: a `$ref` with a non-empty document
//! part is rejected. Chained references are followed hop by hop, and a reference that
//! re-enters a location already on the resolution stack stops the chain and yields the
//! last reference object seen, so self-referential schemas resolve to a placeholder.

use crate::error::{EngineError, EngineResult};
use crate::pointer::{
    child, get_at, normalize_segment, pointer_to_path, split_reference, JsonPath, PathSegment,
};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Keys a Reference Object may carry to override the referenced target.
const OVERRIDE_KEYS: [&str; 2] = ["summary", "description"];

/// Stack of reference-bearing locations visited during one resolution.
#[derive(Debug, Default, Clone)]
pub struct SeenRefs {
    stack: Vec<JsonPath>,
}

impl SeenRefs {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a reference-bearing location was already visited.
    pub fn contains(&self, location: &[PathSegment]) -> bool {
        self.stack.iter().any(|p| p.as_slice() == location)
    }

    /// The most recently visited reference-bearing location.
    pub fn last(&self) -> Option<&JsonPath> {
        self.stack.last()
    }

    fn push(&mut self, location: JsonPath) {
        self.stack.push(location);
    }
}

/// A resolved `$ref` target together with its true location.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    /// The target value, owned only when Reference Object overrides were merged in.
    pub value: Cow<'a, Value>,
    /// Location of the target after the last `$ref` hop.
    pub location: JsonPath,
}

/// Returns true when the value is an object with a `$ref` key (of any type).
pub fn has_ref(value: &Value) -> bool {
    value.as_object().is_some_and(|m| m.contains_key("$ref"))
}

/// Extracts the `$ref` string of a reference object.
///
/// Fails with `EngineError::Type` when `$ref` is present but not a string.
pub fn ref_string(value: &Value) -> EngineResult<&str> {
    match value.get("$ref") {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EngineError::Type(format!(
            "$ref should be a string, found {}",
            json_kind(other)
        ))),
        None => Err(EngineError::Type("Object has no $ref".into())),
    }
}

/// Resolves a local pointer against `document`, following chained references.
///
/// `seen` carries the locations of reference objects already hopped through; pass a
/// fresh `SeenRefs` for an independent resolution.
pub fn resolve<'a>(
    document: &'a Value,
    reference: &str,
    seen: &mut SeenRefs,
) -> EngineResult<(&'a Value, JsonPath)> {
    let (doc_part, fragment) = split_reference(reference);
    if !doc_part.is_empty() {
        return Err(EngineError::Reference(format!(
            "Cannot resolve external references ('{}')",
            reference
        )));
    }
    let Some(fragment) = fragment else {
        return Err(EngineError::Type(format!(
            "'{}' is not a JSON Pointer",
            reference
        )));
    };
    let path = pointer_to_path(fragment)?;

    let mut value = document;
    let mut location: JsonPath = Vec::with_capacity(path.len());

    for segment in &path {
        let Some(next) = child(value, segment) else {
            return Err(EngineError::Reference(format!(
                "Could not resolve '{}': segment '{}' is not part of the document",
                reference, segment
            )));
        };
        location.push(normalize_segment(value, segment));
        value = next;

        if has_ref(value) {
            if seen.contains(&location) {
                // Cycle: hand back the last reference object instead of looping.
                let last = seen.last().cloned().unwrap_or_else(|| location.clone());
                tracing::trace!(reference, "reference cycle, returning last seen value");
                let fallback = get_at(document, &last).unwrap_or(value);
                return Ok((fallback, last));
            }
            let inner = ref_string(value)?;
            seen.push(location.clone());
            let (target, target_location) = resolve(document, inner, seen)?;
            value = target;
            location = target_location;
        }
    }

    Ok((value, location))
}

/// Follows a reference object found at `wrapper_location`.
pub fn follow<'a>(
    document: &'a Value,
    wrapper: &'a Value,
    wrapper_location: &[PathSegment],
) -> EngineResult<(&'a Value, JsonPath)> {
    let reference = ref_string(wrapper)?;
    let mut seen = SeenRefs::new();
    seen.push(wrapper_location.to_vec());
    tracing::trace!(reference, "following $ref");
    resolve(document, reference, &mut seen)
}

/// Resolves a reference object and applies its `summary` / `description` overrides.
///
/// The referencing site wins over the referenced target for those two keys.
pub fn resolve_reference_object<'a>(
    document: &'a Value,
    wrapper: &'a Value,
    wrapper_location: &[PathSegment],
) -> EngineResult<Resolution<'a>> {
    let (target, location) = follow(document, wrapper, wrapper_location)?;
    Ok(Resolution {
        value: apply_overrides(wrapper, target),
        location,
    })
}

/// Resolves `value` when it is a reference object; otherwise returns it untouched.
pub fn resolve_if_ref<'a>(
    document: &'a Value,
    value: &'a Value,
    location: &[PathSegment],
) -> EngineResult<Resolution<'a>> {
    if has_ref(value) {
        resolve_reference_object(document, value, location)
    } else {
        Ok(Resolution {
            value: Cow::Borrowed(value),
            location: location.to_vec(),
        })
    }
}

/// Merges the wrapper's `summary` / `description` onto the target.
pub(crate) fn apply_overrides<'a>(wrapper: &'a Value, target: &'a Value) -> Cow<'a, Value> {
    let overrides: Map<String, Value> = OVERRIDE_KEYS
        .iter()
        .filter_map(|k| wrapper.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect();

    match target {
        Value::Object(map) if !overrides.is_empty() => {
            let mut merged = map.clone();
            merged.extend(overrides);
            Cow::Owned(Value::Object(merged))
        }
        _ => Cow::Borrowed(target),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
