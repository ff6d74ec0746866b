#![deny(missing_docs)]

//! # Bundling
//!
//! Makes a subtree self-contained: every local `$ref` reachable from it is copied
//! into a reserved namespace of the output (`__bundled__` by default) at a path
//! mirroring its original location, and the reference is rewritten to point there.
//!
//! Failed references are collected under a second namespace (`__errors__`) keyed by
//! the original `$ref` string; the rest of the subtree still bundles.

use crate::config::TransformOptions;
use crate::error::{EngineError, EngineResult};
use crate::pointer::{
    child, get_at, path_to_pointer, pointer_to_path, ref_of, JsonPath, PathSegment,
};
use crate::resolver::{resolve, SeenRefs};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Output of a bundle call.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleResult {
    /// The target subtree with rewritten references and the namespaces attached.
    pub value: Value,
    /// Contents of the bundle namespace.
    pub components: Map<String, Value>,
    /// Failing `$ref` string -> error message.
    pub errors: IndexMap<String, String>,
}

/// Bundles the value at `pointer` and returns it with the namespaces attached.
pub fn bundle(document: &Value, pointer: &str, options: &TransformOptions) -> EngineResult<Value> {
    Ok(bundle_target(document, pointer, options)?.value)
}

/// Bundles the value at `pointer`, returning the namespaces separately as well.
pub fn bundle_target(
    document: &Value,
    pointer: &str,
    options: &TransformOptions,
) -> EngineResult<BundleResult> {
    options.validate()?;
    let path = pointer_to_path(pointer)?;
    if let Some(PathSegment::Key(first)) = path.first() {
        if *first == options.bundle_root || *first == options.errors_root {
            return Err(EngineError::Type(format!(
                "Cannot bundle the reserved namespace '{}'",
                first
            )));
        }
    }
    let Some(target) = get_at(document, &path) else {
        return Err(EngineError::Reference(format!(
            "'{}' is not part of the document",
            pointer
        )));
    };

    let mut bundler = Bundler {
        document,
        root: &options.bundle_root,
        inventory: HashMap::new(),
        placed: HashSet::new(),
        bundled: Value::Object(Map::new()),
        errors: IndexMap::new(),
        in_progress: Vec::new(),
    };
    let mut value = target.clone();
    bundler.walk(&mut value);

    let components = match bundler.bundled {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let errors = bundler.errors;
    tracing::debug!(
        pointer,
        bundled = bundler.inventory.len(),
        errors = errors.len(),
        "bundled subtree"
    );

    if let Value::Object(map) = &mut value {
        if !components.is_empty() {
            map.insert(options.bundle_root.clone(), Value::Object(components.clone()));
        }
        if !errors.is_empty() {
            let rendered = errors
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            map.insert(options.errors_root.clone(), Value::Object(rendered));
        }
    }

    Ok(BundleResult {
        value,
        components,
        errors,
    })
}

struct Bundler<'a> {
    document: &'a Value,
    root: &'a str,
    /// Original `$ref` string -> rewritten pointer.
    inventory: HashMap<String, String>,
    /// Target locations already copied into the bundle tree.
    placed: HashSet<JsonPath>,
    bundled: Value,
    errors: IndexMap<String, String>,
    /// Target locations currently being copied.
    in_progress: Vec<JsonPath>,
}

impl Bundler<'_> {
    fn walk(&mut self, node: &mut Value) {
        if let Some(reference) = ref_of(node).map(str::to_owned) {
            self.bundle_ref(node, &reference);
            return;
        }
        match node {
            Value::Object(map) => {
                for value in map.values_mut() {
                    self.walk(value);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.walk(item);
                }
            }
            _ => {}
        }
    }

    fn bundle_ref(&mut self, node: &mut Value, reference: &str) {
        if self.errors.contains_key(reference) {
            return;
        }
        if let Some(pointer) = self.inventory.get(reference) {
            set_ref(node, pointer.clone());
            return;
        }

        let document = self.document;
        let (target, location) = match resolve(document, reference, &mut SeenRefs::new()) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(reference, error = %e, "reference not bundled");
                self.errors.insert(reference.to_string(), e.to_string());
                return;
            }
        };
        if location.is_empty() {
            self.errors.insert(
                reference.to_string(),
                EngineError::Reference("Cannot bundle a reference to the document root".into())
                    .to_string(),
            );
            return;
        }

        let mut namespaced = Vec::with_capacity(location.len() + 1);
        namespaced.push(PathSegment::from(self.root));
        namespaced.extend(location.iter().cloned());
        let pointer = path_to_pointer(&namespaced);
        self.inventory.insert(reference.to_string(), pointer.clone());
        set_ref(node, pointer);

        // A nested target placed earlier does not count as its ancestor being placed.
        if self.in_progress.contains(&location) || self.placed.contains(&location) {
            return;
        }
        self.in_progress.push(location.clone());
        let mut copy = target.clone();
        self.walk(&mut copy);
        self.in_progress.pop();
        self.place(&location, copy);
        self.placed.insert(location);
    }

    /// Writes `value` at `location` inside the bundle tree, creating containers that
    /// mirror the document's shape (arrays keep their length, padded with `null`).
    fn place(&mut self, location: &[PathSegment], value: Value) {
        let mut node = &mut self.bundled;
        let mut shape = Some(self.document);
        for segment in location {
            if node.is_null() {
                *node = empty_like(shape);
            }
            shape = shape.and_then(|s| child(s, segment));
            node = match child_slot(node, segment) {
                Some(next) => next,
                None => return,
            };
        }
        *node = value;
    }
}

fn empty_like(shape: Option<&Value>) -> Value {
    match shape {
        Some(Value::Array(items)) => Value::Array(vec![Value::Null; items.len()]),
        _ => Value::Object(Map::new()),
    }
}

fn child_slot<'v>(node: &'v mut Value, segment: &PathSegment) -> Option<&'v mut Value> {
    match node {
        Value::Object(map) => Some(
            map.entry(segment.as_key().into_owned())
                .or_insert(Value::Null),
        ),
        Value::Array(items) => {
            let index = match segment {
                PathSegment::Index(i) => *i,
                PathSegment::Key(k) => k.parse().ok()?,
            };
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items.get_mut(index)
        }
        _ => None,
    }
}

fn set_ref(node: &mut Value, pointer: String) {
    if let Value::Object(map) = node {
        map.insert("$ref".to_string(), Value::String(pointer));
    }
}
