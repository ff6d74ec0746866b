#![deny(missing_docs)]

//! # JSON Pointer Codec
//!
//! Path addressing used throughout the engine. A `JsonPath` is the ordered list of
//! object keys / array indices from the document root to a node, and is the only
//! way nodes are identified: two `$ref`s to the same target yield the same path.

use crate::error::{EngineError, EngineResult};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use std::fmt;

/// Characters escaped when a path is rendered as a URI fragment.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A single step in a `JsonPath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

impl PathSegment {
    /// Returns the segment as it appears inside a pointer (before escaping).
    pub fn as_key(&self) -> std::borrow::Cow<'_, str> {
        match self {
            PathSegment::Key(k) => std::borrow::Cow::Borrowed(k.as_str()),
            PathSegment::Index(i) => std::borrow::Cow::Owned(i.to_string()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Key(value)
    }
}

impl From<&String> for PathSegment {
    fn from(value: &String) -> Self {
        PathSegment::Key(value.clone())
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

/// Ordered segments from the document root to a node.
pub type JsonPath = Vec<PathSegment>;

/// Decodes a JSON Pointer segment (handles `~1` and `~0`).
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Escapes a single segment for use inside a pointer fragment.
pub fn encode_pointer_segment(segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    utf8_percent_encode(&escaped, FRAGMENT).to_string()
}

/// Splits a `$ref` into its document part and fragment (without the `#`).
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((doc, frag)) => (doc, Some(frag)),
        None => (reference, None),
    }
}

/// Returns true when the reference targets the current document.
pub fn is_local_reference(reference: &str) -> bool {
    let (doc, frag) = split_reference(reference);
    doc.is_empty() && frag.is_some()
}

/// Decodes a JSON Pointer (`#/a/b`, `/a/b`, `#` or empty) into a path.
///
/// Every segment decodes to `PathSegment::Key`; array positions are normalized
/// into `PathSegment::Index` when the path is walked against a document.
pub fn pointer_to_path(pointer: &str) -> EngineResult<JsonPath> {
    let body = match pointer.strip_prefix('#') {
        Some(rest) => rest,
        None => pointer,
    };
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = body.strip_prefix('/') else {
        return Err(EngineError::Type(format!(
            "Invalid JSON Pointer syntax: '{}'",
            pointer
        )));
    };
    Ok(rest
        .split('/')
        .map(|seg| PathSegment::Key(decode_pointer_segment(seg)))
        .collect())
}

/// Renders a path as a local `$ref` pointer (`#/a/b`).
pub fn path_to_pointer(path: &[PathSegment]) -> String {
    let mut out = String::from("#");
    for seg in path {
        out.push('/');
        out.push_str(&encode_pointer_segment(&seg.as_key()));
    }
    out
}

/// Looks up a direct child, treating numeric keys as array indices.
pub fn child<'v>(value: &'v Value, segment: &PathSegment) -> Option<&'v Value> {
    match (value, segment) {
        (Value::Object(map), seg) => map.get(&*seg.as_key()),
        (Value::Array(items), PathSegment::Index(i)) => items.get(*i),
        (Value::Array(items), PathSegment::Key(k)) => {
            k.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

/// Normalizes a segment against its container (`Key("0")` on an array becomes `Index(0)`).
pub fn normalize_segment(container: &Value, segment: &PathSegment) -> PathSegment {
    match (container, segment) {
        (Value::Array(_), PathSegment::Key(k)) => match k.parse::<usize>() {
            Ok(i) => PathSegment::Index(i),
            Err(_) => segment.clone(),
        },
        _ => segment.clone(),
    }
}

/// Walks a path without following references.
pub fn get_at<'v>(document: &'v Value, path: &[PathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(document, |node, seg| child(node, seg))
}

/// Returns the `$ref` string of a reference-shaped object, if any.
///
/// Only objects whose `$ref` is a string qualify.
pub fn ref_of(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}
