#![deny(missing_docs)]

//! # Component Extraction
//!
//! Builds the typed, deduplicated component pool for bundled operations.
//!
//! A `$ref` left in a translated schema is either:
//! - **shared**: its target is a direct entry of a document-level section
//!   (`components/<kind>/<name>`, or `definitions` / `parameters` / `responses` /
//!   `securityDefinitions` in OpenAPI 2). The target is hoisted once into the pool and
//!   the reference is rewritten to `#/components/<kind>/<index>`.
//! - **inline**: anything else. The target is converted and copied in place.
//!
//! Resolution failures never abort extraction; they are collected per `$ref`.

use crate::model::HttpOperation;
use crate::pointer::{ref_of, JsonPath, PathSegment};
use crate::resolver::{apply_overrides, resolve, SeenRefs};
use crate::schema::{convert, RefMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Sections of the component pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    /// Schemas.
    Schemas,
    /// Parameters.
    Parameters,
    /// Response headers.
    Headers,
    /// Examples.
    Examples,
    /// Security schemes.
    SecuritySchemes,
    /// Responses.
    Responses,
    /// Request bodies.
    RequestBodies,
}

impl ComponentKind {
    /// Section name as it appears in pointers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Headers => "headers",
            ComponentKind::Examples => "examples",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Responses => "responses",
            ComponentKind::RequestBodies => "requestBodies",
        }
    }

    /// Maps an OpenAPI 3 `components` section name.
    fn from_oas3(section: &str) -> Option<Self> {
        match section {
            "schemas" => Some(ComponentKind::Schemas),
            "parameters" => Some(ComponentKind::Parameters),
            "headers" => Some(ComponentKind::Headers),
            "examples" => Some(ComponentKind::Examples),
            "securitySchemes" => Some(ComponentKind::SecuritySchemes),
            "responses" => Some(ComponentKind::Responses),
            "requestBodies" => Some(ComponentKind::RequestBodies),
            _ => None,
        }
    }

    /// Maps an OpenAPI 2 top-level section name.
    fn from_oas2(section: &str) -> Option<Self> {
        match section {
            "definitions" => Some(ComponentKind::Schemas),
            "parameters" => Some(ComponentKind::Parameters),
            "responses" => Some(ComponentKind::Responses),
            "securityDefinitions" => Some(ComponentKind::SecuritySchemes),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns the component kind and key when `location` is a direct entry of a
/// document-level reusable section.
///
/// Deeper pointers (e.g. a property of a shared schema) are not shared.
pub fn component_slot(location: &[PathSegment]) -> Option<(ComponentKind, &str)> {
    match location {
        [PathSegment::Key(root), PathSegment::Key(section), PathSegment::Key(name)]
            if root == "components" =>
        {
            ComponentKind::from_oas3(section).map(|kind| (kind, name.as_str()))
        }
        [PathSegment::Key(section), PathSegment::Key(name)] => {
            ComponentKind::from_oas2(section).map(|kind| (kind, name.as_str()))
        }
        _ => None,
    }
}

/// One extracted value, tagged with the key it had in the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledComponent {
    /// Original component key.
    pub key: String,
    /// Converted value.
    pub value: Value,
}

/// Typed, zero-based indexed pool of extracted components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentPool {
    kinds: IndexMap<ComponentKind, Vec<PooledComponent>>,
    /// Resolved target location -> pool pointer.
    slots: HashMap<JsonPath, String>,
    /// Source `$ref` string -> pool pointer.
    refs: HashMap<String, String>,
}

impl ComponentPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next slot of `kind` for the target at `location` and returns
    /// its pointer.
    ///
    /// The slot holds `null` until `fill` is called, so references met while the
    /// value itself is being extracted already point at it.
    pub fn reserve(&mut self, kind: ComponentKind, key: &str, location: &[PathSegment]) -> String {
        let entries = self.kinds.entry(kind).or_default();
        entries.push(PooledComponent {
            key: key.to_string(),
            value: Value::Null,
        });
        let pointer = pool_pointer(kind, entries.len() - 1);
        self.slots.insert(location.to_vec(), pointer.clone());
        pointer
    }

    /// Remembers which slot a source `$ref` string ended up in.
    pub fn alias(&mut self, source_ref: &str, pointer: &str) {
        self.refs.insert(source_ref.to_string(), pointer.to_string());
    }

    /// Stores the value of a slot previously returned by `reserve`.
    pub fn fill(&mut self, kind: ComponentKind, index: usize, value: Value) {
        if let Some(entry) = self.kinds.get_mut(&kind).and_then(|e| e.get_mut(index)) {
            entry.value = value;
        }
    }

    /// The pool pointer a source `$ref` was already rewritten to, if any.
    pub fn slot_for(&self, source_ref: &str) -> Option<&str> {
        self.refs.get(source_ref).map(String::as_str)
    }

    /// The pool pointer reserved for a resolved target location, if any.
    pub fn slot_at(&self, location: &[PathSegment]) -> Option<&str> {
        self.slots.get(location).map(String::as_str)
    }

    /// Entries of one kind, in slot order.
    pub fn get(&self, kind: ComponentKind) -> &[PooledComponent] {
        self.kinds.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of entries across kinds.
    pub fn len(&self) -> usize {
        self.kinds.values().map(Vec::len).sum()
    }

    /// Whether no component was extracted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the pool as `{ "<kind>": [ ... ] }`. Object entries carry their
    /// source key under `key` unless they already define one.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for (kind, entries) in &self.kinds {
            let list = entries
                .iter()
                .map(|entry| match &entry.value {
                    Value::Object(map) => {
                        let mut map = map.clone();
                        map.entry("key")
                            .or_insert_with(|| Value::String(entry.key.clone()));
                        Value::Object(map)
                    }
                    other => other.clone(),
                })
                .collect();
            out.insert(kind.as_str().to_string(), Value::Array(list));
        }
        Value::Object(out)
    }
}

fn pool_pointer(kind: ComponentKind, index: usize) -> String {
    format!("#/components/{}/{}", kind, index)
}

/// Parses a pointer produced by `pool_pointer` back into its slot.
fn parse_pool_pointer(pointer: &str) -> Option<(ComponentKind, usize)> {
    let rest = pointer.strip_prefix("#/components/")?;
    let (section, index) = rest.split_once('/')?;
    Some((ComponentKind::from_oas3(section)?, index.parse().ok()?))
}

/// Walks translated schemas and hoists or inlines their `$ref`s.
#[derive(Debug)]
pub struct ComponentExtractor<'a> {
    document: &'a Value,
    pool: ComponentPool,
    errors: IndexMap<String, String>,
    /// Target locations of the inline references being expanded.
    inlining: Vec<JsonPath>,
}

impl<'a> ComponentExtractor<'a> {
    /// Creates an extractor resolving against `document`.
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            pool: ComponentPool::new(),
            errors: IndexMap::new(),
            inlining: Vec::new(),
        }
    }

    /// Extracts every schema slot of an operation.
    pub fn extract_operation(&mut self, operation: &mut HttpOperation) {
        for schema in operation.schemas_mut() {
            self.extract(schema);
        }
    }

    /// Extracts one schema tree in place.
    pub fn extract(&mut self, node: &mut Value) {
        if let Some(reference) = ref_of(node).map(str::to_owned) {
            self.replace_ref(node, &reference);
            return;
        }
        match node {
            Value::Object(map) => {
                for value in map.values_mut() {
                    self.extract(value);
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.extract(item);
                }
            }
            _ => {}
        }
    }

    /// The pool built so far and the references that failed to resolve.
    pub fn finish(self) -> (ComponentPool, IndexMap<String, String>) {
        (self.pool, self.errors)
    }

    fn replace_ref(&mut self, node: &mut Value, reference: &str) {
        if self.errors.contains_key(reference) {
            return;
        }
        if let Some(pointer) = self.pool.slot_for(reference) {
            set_ref(node, pointer.to_string());
            return;
        }

        let document = self.document;
        let (target, location) = match resolve(document, reference, &mut SeenRefs::new()) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(reference, error = %e, "component reference left unresolved");
                self.errors.insert(reference.to_string(), e.to_string());
                return;
            }
        };

        // Different spellings of one target share its slot.
        if let Some(pointer) = self.pool.slot_at(&location).map(str::to_owned) {
            self.pool.alias(reference, &pointer);
            set_ref(node, pointer);
            return;
        }

        match component_slot(&location) {
            Some((kind, key)) => self.hoist(node, reference, kind, key, &location, target),
            None if self.inlining.contains(&location) => {
                // Cyclic inline reference: break the cycle through the pool.
                let key = last_key(&location);
                self.hoist(node, reference, ComponentKind::Schemas, &key, &location, target);
            }
            None => self.inline(node, location, target),
        }
    }

    fn hoist(
        &mut self,
        node: &mut Value,
        reference: &str,
        kind: ComponentKind,
        key: &str,
        location: &[PathSegment],
        target: &Value,
    ) {
        let pointer = self.pool.reserve(kind, key, location);
        self.pool.alias(reference, &pointer);
        tracing::debug!(reference, %pointer, "hoisting shared component");
        let mut value = convert(target, &RefMap::new());
        self.extract(&mut value);
        if let Some((kind, index)) = parse_pool_pointer(&pointer) {
            self.pool.fill(kind, index, value);
        }
        set_ref(node, pointer);
    }

    fn inline(&mut self, node: &mut Value, location: JsonPath, target: &Value) {
        let wrapper = node.clone();
        let merged = apply_overrides(&wrapper, target).into_owned();
        let mut value = convert(&merged, &RefMap::new());
        self.inlining.push(location);
        self.extract(&mut value);
        self.inlining.pop();
        *node = value;
    }
}

fn set_ref(node: &mut Value, pointer: String) {
    if let Value::Object(map) = node {
        map.insert("$ref".to_string(), Value::String(pointer));
    }
}

fn last_key(location: &[PathSegment]) -> String {
    location
        .last()
        .map(|s| s.as_key().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_component_slot() {
        let oas3 = vec![
            PathSegment::from("components"),
            PathSegment::from("schemas"),
            PathSegment::from("User"),
        ];
        assert_eq!(component_slot(&oas3), Some((ComponentKind::Schemas, "User")));

        let oas2 = vec![PathSegment::from("definitions"), PathSegment::from("Pet")];
        assert_eq!(component_slot(&oas2), Some((ComponentKind::Schemas, "Pet")));

        let deep = vec![
            PathSegment::from("components"),
            PathSegment::from("schemas"),
            PathSegment::from("User"),
            PathSegment::from("properties"),
        ];
        assert_eq!(component_slot(&deep), None);

        let local = vec![PathSegment::from("paths"), PathSegment::from("/a")];
        assert_eq!(component_slot(&local), None);
    }

    #[test]
    fn test_shared_refs_hoisted_once() {
        let doc = json!({
            "components": {"schemas": {
                "User": {"type": "object", "properties": {"pet": {"$ref": "#/components/schemas/Pet"}}},
                "Pet": {"type": "string", "nullable": true}
            }}
        });
        let mut extractor = ComponentExtractor::new(&doc);
        let mut a = json!({"$ref": "#/components/schemas/User"});
        let mut b = json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}});
        extractor.extract(&mut a);
        extractor.extract(&mut b);
        let (pool, errors) = extractor.finish();

        assert!(errors.is_empty());
        assert_eq!(a, json!({"$ref": "#/components/schemas/0"}));
        assert_eq!(b["items"], json!({"$ref": "#/components/schemas/0"}));
        assert_eq!(pool.get(ComponentKind::Schemas).len(), 2);
        assert_eq!(pool.get(ComponentKind::Schemas)[1].key, "Pet");
        assert_eq!(
            pool.get(ComponentKind::Schemas)[1].value["type"],
            json!(["string", "null"])
        );
        let rendered = pool.to_value();
        assert_eq!(
            rendered["schemas"][0]["properties"]["pet"],
            json!({"$ref": "#/components/schemas/1"})
        );
        assert_eq!(rendered["schemas"][0]["key"], json!("User"));
    }

    #[test]
    fn test_aliased_refs_share_one_slot() {
        let doc = json!({
            "components": {"schemas": {
                "User": {"type": "object"},
                "UserAlias": {"$ref": "#/components/schemas/User"}
            }}
        });
        let mut extractor = ComponentExtractor::new(&doc);
        let mut a = json!({"$ref": "#/components/schemas/User"});
        let mut b = json!({"$ref": "#/components/schemas/UserAlias"});
        let mut c = json!({"$ref": "#/components/schemas/%55ser"});
        extractor.extract(&mut a);
        extractor.extract(&mut b);
        extractor.extract(&mut c);
        let (pool, errors) = extractor.finish();

        assert!(errors.is_empty());
        assert_eq!(a, json!({"$ref": "#/components/schemas/0"}));
        assert_eq!(b, a);
        assert_eq!(c, a);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(ComponentKind::Schemas)[0].key, "User");
        assert_eq!(pool.slot_for("#/components/schemas/UserAlias"), Some("#/components/schemas/0"));
    }

    #[test]
    fn test_local_refs_inlined() {
        let doc = json!({
            "paths": {"/a": {"get": {"x-shape": {"type": "integer", "format": "int32"}}}}
        });
        let mut extractor = ComponentExtractor::new(&doc);
        let mut schema = json!({"$ref": "#/paths/~1a/get/x-shape", "description": "site"});
        extractor.extract(&mut schema);
        let (pool, _) = extractor.finish();
        assert!(pool.is_empty());
        assert_eq!(schema["type"], json!("integer"));
        assert_eq!(schema["maximum"], json!(2147483647));
        assert_eq!(schema["description"], json!("site"));
    }

    #[test]
    fn test_cyclic_shared_refs_terminate() {
        let doc = json!({
            "definitions": {
                "Node": {"type": "object", "properties": {"next": {"$ref": "#/definitions/Node"}}}
            }
        });
        let mut extractor = ComponentExtractor::new(&doc);
        let mut schema = json!({"$ref": "#/definitions/Node"});
        extractor.extract(&mut schema);
        let (pool, _) = extractor.finish();
        assert_eq!(pool.len(), 1);
        assert_eq!(
            pool.get(ComponentKind::Schemas)[0].value["properties"]["next"],
            json!({"$ref": "#/components/schemas/0"})
        );
    }

    #[test]
    fn test_cyclic_inline_refs_fall_back_to_pool() {
        let doc = json!({
            "x-local": {"tree": {"type": "object", "properties": {"child": {"$ref": "#/x-local/tree"}}}}
        });
        let mut extractor = ComponentExtractor::new(&doc);
        let mut schema = json!({"$ref": "#/x-local/tree"});
        extractor.extract(&mut schema);
        let (pool, errors) = extractor.finish();
        assert!(errors.is_empty());
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(
            schema["properties"]["child"],
            json!({"$ref": "#/components/schemas/0"})
        );
        assert_eq!(pool.get(ComponentKind::Schemas)[0].key, "tree");
    }

    #[test]
    fn test_unresolvable_refs_recorded() {
        let doc = json!({});
        let mut extractor = ComponentExtractor::new(&doc);
        let mut schema = json!({"anyOf": [{"$ref": "#/missing"}, {"$ref": "ext.json#/a"}]});
        extractor.extract(&mut schema);
        let (_, errors) = extractor.finish();
        assert_eq!(errors.len(), 2);
        assert!(errors["ext.json#/a"].contains("Cannot resolve external references"));
        assert_eq!(schema["anyOf"][0], json!({"$ref": "#/missing"}));
    }
}
