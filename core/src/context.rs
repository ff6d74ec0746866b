#![deny(missing_docs)]

//! # Transform Context
//!
//! The traversal cursor shared by every transformer during one top-level call.
//!
//! - `path` is where the transformer currently stands in the source document.
//! - `resolved_path` is where that node really lives once `$ref`s along the way are
//!   followed; it is refreshed on every `fragment()` read.
//! - The identity store and the converted-schema cache live here too, so a fresh
//!   context per call means nothing leaks between unrelated transforms.

use crate::config::TransformOptions;
use crate::error::EngineResult;
use crate::identity::IdentityStore;
use crate::pointer::{child, normalize_segment, JsonPath, PathSegment};
use crate::resolver::{apply_overrides, follow, has_ref, resolve_if_ref, Resolution};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Per-transform state: document, cursor, identity store and schema cache.
#[derive(Debug)]
pub struct TransformContext<'a> {
    document: &'a Value,
    options: TransformOptions,
    path: JsonPath,
    resolved_path: Option<JsonPath>,
    pub(crate) ids: IdentityStore,
    pub(crate) schema_cache: HashMap<JsonPath, Value>,
}

/// Result of walking the cursor: the node, plus the reference object that led to it.
struct Walk<'a> {
    node: &'a Value,
    wrapper: Option<&'a Value>,
}

impl<'a> TransformContext<'a> {
    /// Creates a context positioned at the document root.
    pub fn new(document: &'a Value, options: TransformOptions) -> Self {
        Self {
            document,
            options,
            path: Vec::new(),
            resolved_path: None,
            ids: IdentityStore::default(),
            schema_cache: HashMap::new(),
        }
    }

    /// Creates a context that keeps naming with the memo table of an earlier
    /// context from the same top-level call.
    pub fn with_ids(document: &'a Value, options: TransformOptions, ids: IdentityStore) -> Self {
        Self {
            ids,
            ..Self::new(document, options)
        }
    }

    /// Hands back the memo table for the next context of the same call. The
    /// named-ancestor stack is dropped with the cursor.
    pub fn into_ids(self) -> IdentityStore {
        let mut ids = self.ids;
        ids.clear_owners();
        ids
    }

    /// The root document.
    pub fn document(&self) -> &'a Value {
        self.document
    }

    /// Options this transform was started with.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Current (un-resolved) cursor.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Location of the last node read through `fragment()`, after `$ref` hops.
    ///
    /// Read it right after the `fragment()` call it belongs to; the next read overwrites it.
    pub fn resolved_path(&self) -> Option<&[PathSegment]> {
        self.resolved_path.as_deref()
    }

    /// Appends segments to the cursor and returns the mark to hand back to `exit`.
    ///
    /// # Panics
    ///
    /// Entering with no segments is a caller bug and panics.
    pub fn enter<I, S>(&mut self, segments: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        let mark = self.path.len();
        self.path.extend(segments.into_iter().map(Into::into));
        assert!(
            self.path.len() > mark,
            "TransformContext::enter requires at least one segment"
        );
        mark
    }

    /// Truncates the cursor back to `mark`. Never grows it.
    pub fn exit(&mut self, mark: usize) {
        if mark < self.path.len() {
            self.path.truncate(mark);
        }
        self.ids.truncate_owners(mark);
        self.resolved_path = None;
    }

    /// Runs `f` with the cursor moved into `segments`, restoring it afterwards
    /// whatever `f` returns.
    pub fn scoped<I, S, R>(&mut self, segments: I, f: impl FnOnce(&mut Self) -> R) -> R
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        let mark = self.enter(segments);
        let out = f(self);
        self.exit(mark);
        out
    }

    /// Runs `f` with the cursor placed at an absolute path.
    ///
    /// Only root-level owners stay visible, so ids generated there hang off the
    /// service rather than whatever operation happened to be in progress.
    pub fn scoped_at<R>(&mut self, path: JsonPath, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved_path = std::mem::replace(&mut self.path, path);
        let saved_owners = self.ids.isolate();
        let out = f(self);
        self.path = saved_path;
        self.ids.restore(saved_owners);
        self.resolved_path = None;
        out
    }

    /// The node under the cursor, following every `$ref` on the way (including the
    /// node itself). `Ok(None)` when the path does not exist.
    pub fn fragment(&mut self) -> EngineResult<Option<&'a Value>> {
        Ok(self.walk(true)?.map(|w| w.node))
    }

    /// Like `fragment`, but a `$ref` at the cursor itself is returned unresolved.
    pub fn raw_fragment(&mut self) -> EngineResult<Option<&'a Value>> {
        Ok(self.walk(false)?.map(|w| w.node))
    }

    /// Like `fragment`, with the reference object's `summary` / `description`
    /// merged over the target when the cursor sits on a `$ref`.
    pub fn resolved_fragment(&mut self) -> EngineResult<Option<Cow<'a, Value>>> {
        Ok(self.walk(true)?.map(|w| match w.wrapper {
            Some(wrapper) => apply_overrides(wrapper, w.node),
            None => Cow::Borrowed(w.node),
        }))
    }

    /// Explicit dereference point for a value obtained from this document.
    pub fn resolve_if_ref(&self, value: &'a Value) -> EngineResult<Resolution<'a>> {
        resolve_if_ref(self.document, value, &self.path)
    }

    fn walk(&mut self, follow_last: bool) -> EngineResult<Option<Walk<'a>>> {
        let document = self.document;
        let mut node = document;
        let mut location: JsonPath = Vec::with_capacity(self.path.len());
        let mut wrapper = None;
        let last = self.path.len().saturating_sub(1);

        for (i, segment) in self.path.iter().enumerate() {
            let Some(next) = child(node, segment) else {
                // Soft failure: the (possibly resolved) value has no such child.
                self.resolved_path = None;
                return Ok(None);
            };
            location.push(normalize_segment(node, segment));
            node = next;
            wrapper = None;

            if has_ref(node) && (follow_last || i < last) {
                let (target, target_location) = follow(document, node, &location)?;
                wrapper = Some(node);
                node = target;
                location = target_location;
            }
        }

        self.resolved_path = Some(location);
        Ok(Some(Walk { node, wrapper }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                    }
                },
                "parameters": {
                    "Limit": {"name": "limit", "in": "query", "description": "target"}
                }
            },
            "paths": {
                "/items": {
                    "get": {
                        "parameters": [
                            {"$ref": "#/components/parameters/Limit", "description": "site"}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_enter_exit_marks() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        let m1 = ctx.enter(["paths", "/items"]);
        assert_eq!(m1, 0);
        let m2 = ctx.enter(["get"]);
        assert_eq!(m2, 2);
        assert_eq!(ctx.path().len(), 3);
        ctx.exit(m2);
        assert_eq!(ctx.path().len(), 2);
        ctx.exit(m1);
        assert!(ctx.path().is_empty());
        // exit never grows the path
        ctx.exit(5);
        assert!(ctx.path().is_empty());
    }

    #[test]
    #[should_panic(expected = "at least one segment")]
    fn test_enter_without_segments_panics() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter(Vec::<PathSegment>::new());
    }

    #[test]
    fn test_scoped_restores_on_error() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        let res: EngineResult<()> = ctx.scoped(["paths"], |ctx| {
            ctx.enter(["/items"]);
            Err(EngineError::General("boom".into()))
        });
        assert!(res.is_err());
        assert!(ctx.path().is_empty());
    }

    #[test]
    fn test_fragment_follows_refs_and_records_resolved_path() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter(["paths", "/items", "get", "parameters"]);
        ctx.enter([PathSegment::Index(0)]);
        let frag = ctx.fragment().unwrap().unwrap();
        assert_eq!(frag["name"], json!("limit"));
        let resolved = ctx.resolved_path().unwrap();
        assert_eq!(resolved[1], PathSegment::from("parameters"));
        assert_eq!(resolved[2], PathSegment::from("Limit"));
    }

    #[test]
    fn test_raw_fragment_keeps_final_ref() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter(["paths", "/items", "get", "parameters", "0"]);
        let raw = ctx.raw_fragment().unwrap().unwrap();
        assert!(raw.get("$ref").is_some());
    }

    #[test]
    fn test_resolved_fragment_applies_override() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter(["paths", "/items", "get", "parameters", "0"]);
        let frag = ctx.resolved_fragment().unwrap().unwrap();
        assert_eq!(frag["description"], json!("site"));
    }

    #[test]
    fn test_fragment_through_recursive_schema() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter([
            "components",
            "schemas",
            "Node",
            "properties",
            "next",
            "properties",
            "next",
        ]);
        let frag = ctx.fragment().unwrap().unwrap();
        assert_eq!(frag["type"], json!("object"));
        assert_eq!(ctx.resolved_path().unwrap().len(), 3);
    }

    #[test]
    fn test_fragment_missing_is_soft() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter(["paths", "/nope", "get"]);
        assert!(ctx.fragment().unwrap().is_none());
        assert!(ctx.resolved_path().is_none());
    }

    #[test]
    fn test_scoped_at_restores_cursor() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.enter(["paths", "/items"]);
        let name = ctx.scoped_at(
            vec![
                PathSegment::from("components"),
                PathSegment::from("parameters"),
                PathSegment::from("Limit"),
            ],
            |ctx| ctx.fragment().unwrap().unwrap()["name"].clone(),
        );
        assert_eq!(name, json!("limit"));
        assert_eq!(ctx.path().len(), 2);
    }
}
