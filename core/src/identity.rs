#![deny(missing_docs)]

//! # Identity Generation
//!
//! Stable, content-derived identifiers for every emitted node.
//!
//! An id is built from the nearest named ancestor's id plus a semantic suffix
//! (method and erased path, parameter name, media type, ...), then hashed with
//! xxHash32. Ids are memoized by the node's *resolved* location, so two `$ref`s to
//! the same target always receive the same id.

use crate::components::component_slot;
use crate::config::HashingMode;
use crate::context::TransformContext;
use crate::error::EngineResult;
use crate::model::ParamLocation;
use crate::pointer::{path_to_pointer, JsonPath};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;
use xxhash_rust::xxh32::xxh32;

/// What kind of node is being named, with the semantic data its id is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdHint<'h> {
    /// The whole document.
    Service {
        /// Service name (`info.title`).
        name: &'h str,
    },
    /// A (method, path) operation.
    Operation {
        /// HTTP method.
        method: &'h str,
        /// Path template; parameter names are erased before hashing.
        path: &'h str,
    },
    /// A request parameter or response header.
    Parameter {
        /// Where the parameter is carried.
        location: ParamLocation,
        /// Parameter name.
        name: &'h str,
    },
    /// A request body.
    RequestBody,
    /// A response.
    Response {
        /// Status code.
        code: &'h str,
    },
    /// A media-type entry.
    Media {
        /// Media type.
        media_type: &'h str,
    },
    /// A property encoding.
    Encoding {
        /// Encoded property.
        property: &'h str,
    },
    /// A server.
    Server {
        /// Server URL.
        url: &'h str,
    },
    /// A security scheme.
    SecurityScheme {
        /// Key in the scheme map.
        key: &'h str,
    },
    /// A named example.
    Example {
        /// Example key.
        key: &'h str,
    },
    /// A declared tag.
    Tag {
        /// Tag name.
        name: &'h str,
    },
    /// A schema; its id is its resolved JSON Pointer.
    Schema,
}

/// Discriminant of an `IdHint`, used in memo keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// See `IdHint::Service`.
    Service,
    /// See `IdHint::Operation`.
    Operation,
    /// See `IdHint::Parameter`.
    Parameter,
    /// See `IdHint::RequestBody`.
    RequestBody,
    /// See `IdHint::Response`.
    Response,
    /// See `IdHint::Media`.
    Media,
    /// See `IdHint::Encoding`.
    Encoding,
    /// See `IdHint::Server`.
    Server,
    /// See `IdHint::SecurityScheme`.
    SecurityScheme,
    /// See `IdHint::Example`.
    Example,
    /// See `IdHint::Tag`.
    Tag,
    /// See `IdHint::Schema`.
    Schema,
}

impl IdHint<'_> {
    /// The hint's discriminant.
    pub fn kind(&self) -> IdKind {
        match self {
            IdHint::Service { .. } => IdKind::Service,
            IdHint::Operation { .. } => IdKind::Operation,
            IdHint::Parameter { .. } => IdKind::Parameter,
            IdHint::RequestBody => IdKind::RequestBody,
            IdHint::Response { .. } => IdKind::Response,
            IdHint::Media { .. } => IdKind::Media,
            IdHint::Encoding { .. } => IdKind::Encoding,
            IdHint::Server { .. } => IdKind::Server,
            IdHint::SecurityScheme { .. } => IdKind::SecurityScheme,
            IdHint::Example { .. } => IdKind::Example,
            IdHint::Tag { .. } => IdKind::Tag,
            IdHint::Schema => IdKind::Schema,
        }
    }

    /// Hints that may name a node synthesized from its parent (OpenAPI 2 `produces`,
    /// `schemes`, ...) share their parent's location, so the memo key also carries
    /// their semantic value. They never adopt the location's stable-id extension.
    fn discriminator(&self) -> Option<&str> {
        match self {
            IdHint::Media { media_type } => Some(media_type),
            IdHint::Encoding { property } => Some(property),
            IdHint::Server { url } => Some(url),
            IdHint::Example { key } => Some(key),
            _ => None,
        }
    }

    fn candidate(&self, parent: &str, shared_key: Option<&str>) -> String {
        match self {
            IdHint::Service { name } => format!("http_service-{}", name),
            IdHint::Operation { method, path } => format!(
                "http_operation-{}-{}-{}",
                parent,
                method.to_lowercase(),
                erase_path_parameters(path)
            ),
            IdHint::Parameter { location, name } => format!(
                "http_{}_param-{}-{}",
                location,
                parent,
                shared_key.unwrap_or(name)
            ),
            IdHint::RequestBody => format!("http_request_body-{}", parent),
            IdHint::Response { code } => {
                format!("http_response-{}-{}", parent, shared_key.unwrap_or(code))
            }
            IdHint::Media { media_type } => format!("http_media-{}-{}", parent, media_type),
            IdHint::Encoding { property } => format!("http_encoding-{}-{}", parent, property),
            IdHint::Server { url } => format!("http_server-{}-{}", parent, url),
            IdHint::SecurityScheme { key } => {
                format!("http_security-{}-{}", parent, shared_key.unwrap_or(key))
            }
            IdHint::Example { key } => {
                format!("example-{}-{}", parent, shared_key.unwrap_or(key))
            }
            IdHint::Tag { name } => format!("tag-{}-{}", parent, name),
            IdHint::Schema => String::new(),
        }
    }
}

type MemoKey = (JsonPath, IdKind, Option<String>);

/// An id that later ids may use as their parent, tagged with the cursor depth it
/// was generated at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Owner {
    depth: usize,
    id: String,
}

/// Per-transform memo table plus the stack of named ancestors.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    ids: HashMap<MemoKey, String>,
    owners: Vec<Owner>,
}

impl IdentityStore {
    /// Number of memoized ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been named yet.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn get(&self, key: &MemoKey) -> Option<&String> {
        self.ids.get(key)
    }

    fn remember(&mut self, key: MemoKey, id: String) {
        self.ids.insert(key, id);
    }

    fn own(&mut self, depth: usize, id: String) {
        self.owners.push(Owner { depth, id });
    }

    /// The nearest owner strictly above `depth`.
    fn parent(&self, depth: usize) -> Option<&str> {
        self.owners
            .iter()
            .rev()
            .find(|o| o.depth < depth)
            .map(|o| o.id.as_str())
    }

    /// The root-level owner (the service).
    fn root(&self) -> Option<&str> {
        self.owners
            .iter()
            .find(|o| o.depth == 0)
            .map(|o| o.id.as_str())
    }

    /// Drops owners generated below `mark`; called when the cursor exits to `mark`.
    pub(crate) fn truncate_owners(&mut self, mark: usize) {
        self.owners.retain(|o| o.depth <= mark);
    }

    pub(crate) fn clear_owners(&mut self) {
        self.owners.clear();
    }

    /// Keeps only root-level owners, returning the full stack for `restore`.
    pub(crate) fn isolate(&mut self) -> Vec<Owner> {
        let saved = self.owners.clone();
        self.owners.retain(|o| o.depth == 0);
        saved
    }

    /// Puts back a stack returned by `isolate`.
    pub(crate) fn restore(&mut self, saved: Vec<Owner>) {
        self.owners = saved;
    }
}

/// Collapses every `{param}` in a path template to `{}`.
pub fn erase_path_parameters(path: &str) -> Cow<'_, str> {
    static PARAM_RE: OnceLock<Regex> = OnceLock::new();
    let re = PARAM_RE.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("Invalid regex"));
    re.replace_all(path, "{}")
}

/// Renders a candidate string according to the hashing mode.
pub fn render_id(candidate: &str, mode: HashingMode) -> String {
    match mode {
        HashingMode::Stable => format!("{:08x}", xxh32(candidate.as_bytes(), 0)),
        HashingMode::Verbatim => candidate.to_string(),
    }
}

impl TransformContext<'_> {
    /// Names the node under the cursor.
    ///
    /// Order of precedence: a previously generated id for the same resolved node,
    /// then the document's stable-id extension, then the resolved pointer (schemas),
    /// then a hashed candidate built from the parent id and the hint.
    pub fn generate_id(&mut self, hint: IdHint<'_>) -> EngineResult<String> {
        let fragment = self.fragment()?;
        let location: JsonPath = match self.resolved_path() {
            Some(resolved) => resolved.to_vec(),
            None => self.path().to_vec(),
        };
        let discriminator = hint.discriminator().map(str::to_owned);
        let key: MemoKey = (location, hint.kind(), discriminator);

        // Operations own their whole path item so path-level parameters hang off them.
        let depth = match hint {
            IdHint::Operation { .. } => self.path().len().saturating_sub(1),
            _ => self.path().len(),
        };

        if let Some(id) = self.ids.get(&key).cloned() {
            if hint != IdHint::Schema {
                self.ids.own(depth, id.clone());
            }
            return Ok(id);
        }

        let declared = match hint.discriminator() {
            Some(_) => None,
            None => fragment
                .and_then(|f| f.get(&self.options().stable_id_extension))
                .and_then(|v| v.as_str())
                .map(str::to_owned),
        };

        let id = match (declared, hint) {
            (Some(declared), _) => declared,
            (None, IdHint::Schema) => path_to_pointer(&key.0),
            (None, _) => {
                let shared = component_slot(&key.0).map(|(_, name)| name.to_string());
                let parent = match shared {
                    Some(_) => self.ids.root(),
                    None => self.ids.parent(self.path().len()),
                }
                .unwrap_or_default();
                let candidate = hint.candidate(parent, shared.as_deref());
                tracing::trace!(%candidate, "generated id candidate");
                render_id(&candidate, self.options().hashing)
            }
        };

        self.ids.remember(key, id.clone());
        if hint != IdHint::Schema {
            self.ids.own(depth, id.clone());
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformOptions;
    use serde_json::{json, Value};

    fn operation_id(doc: &Value, path: &str, method: &str, options: TransformOptions) -> String {
        let mut ctx = TransformContext::new(doc, options);
        ctx.generate_id(IdHint::Service { name: "svc" }).unwrap();
        ctx.scoped(["paths", path, method], |ctx| {
            ctx.generate_id(IdHint::Operation { method, path }).unwrap()
        })
    }

    fn doc() -> Value {
        json!({
            "paths": {
                "/a/{x}": {"post": {}},
                "/a/{y}": {"post": {}},
                "/a/z": {"post": {}},
                "/items": {
                    "parameters": [{"name": "trace", "in": "header"}],
                    "get": {
                        "parameters": [
                            {"$ref": "#/components/parameters/Limit"},
                            {"$ref": "#/components/parameters/Limit"},
                            {"name": "q", "in": "query"}
                        ]
                    }
                },
                "/pinned": {"get": {"x-stable-id": "pinned-op"}}
            },
            "components": {
                "parameters": {"Limit": {"name": "limit", "in": "query"}}
            }
        })
    }

    #[test]
    fn test_erase_path_parameters() {
        assert_eq!(erase_path_parameters("/users/{id}/posts/{postId}"), "/users/{}/posts/{}");
        assert_eq!(erase_path_parameters("/users/static"), "/users/static");
    }

    #[test]
    fn test_path_parameter_collapsing() {
        let d = doc();
        let x = operation_id(&d, "/a/{x}", "post", TransformOptions::default());
        let y = operation_id(&d, "/a/{y}", "post", TransformOptions::default());
        let z = operation_id(&d, "/a/z", "post", TransformOptions::default());
        assert_eq!(x, y);
        assert_ne!(x, z);
        assert_eq!(x.len(), 8);
    }

    #[test]
    fn test_verbatim_mode_keeps_candidate() {
        let d = doc();
        let id = operation_id(&d, "/a/{x}", "POST", TransformOptions::verbatim());
        assert_eq!(id, "http_operation-http_service-svc-post-/a/{}");
    }

    #[test]
    fn test_reference_identity_stability() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        ctx.generate_id(IdHint::Service { name: "svc" }).unwrap();
        let mark = ctx.enter(["paths", "/items", "get"]);
        ctx.generate_id(IdHint::Operation { method: "get", path: "/items" })
            .unwrap();
        let hint = IdHint::Parameter {
            location: ParamLocation::Query,
            name: "limit",
        };
        let first = ctx.scoped(["parameters", "0"], |ctx| ctx.generate_id(hint).unwrap());
        let second = ctx.scoped(["parameters", "1"], |ctx| ctx.generate_id(hint).unwrap());
        let other = ctx.scoped(["parameters", "2"], |ctx| {
            ctx.generate_id(IdHint::Parameter {
                location: ParamLocation::Query,
                name: "q",
            })
            .unwrap()
        });
        assert_eq!(first, second);
        assert_ne!(first, other);
        ctx.exit(mark);
    }

    #[test]
    fn test_shared_parameter_id_is_operation_independent() {
        let d = json!({
            "paths": {
                "/a": {"get": {"parameters": [{"$ref": "#/components/parameters/Limit"}]}},
                "/b": {"get": {"parameters": [{"$ref": "#/components/parameters/Limit"}]}}
            },
            "components": {"parameters": {"Limit": {"name": "limit", "in": "query"}}}
        });
        let id_in = |path: &str| {
            let mut ctx = TransformContext::new(&d, TransformOptions::verbatim());
            ctx.generate_id(IdHint::Service { name: "svc" }).unwrap();
            ctx.scoped(["paths", path, "get"], |ctx| {
                ctx.generate_id(IdHint::Operation { method: "get", path })
                    .unwrap();
                ctx.scoped(["parameters", "0"], |ctx| {
                    ctx.generate_id(IdHint::Parameter {
                        location: ParamLocation::Query,
                        name: "limit",
                    })
                    .unwrap()
                })
            })
        };
        assert_eq!(id_in("/a"), id_in("/b"));
        assert_eq!(id_in("/a"), "http_query_param-http_service-svc-Limit");
    }

    #[test]
    fn test_path_level_parameter_parent_is_operation() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::verbatim());
        ctx.generate_id(IdHint::Service { name: "svc" }).unwrap();
        ctx.enter(["paths", "/items"]);
        let op = ctx.scoped(["get"], |ctx| {
            ctx.generate_id(IdHint::Operation { method: "get", path: "/items" })
                .unwrap()
        });
        let param = ctx.scoped(["parameters", "0"], |ctx| {
            ctx.generate_id(IdHint::Parameter {
                location: ParamLocation::Header,
                name: "trace",
            })
            .unwrap()
        });
        assert_eq!(param, format!("http_header_param-{}-trace", op));
    }

    #[test]
    fn test_stable_id_extension_wins() {
        let d = doc();
        let id = operation_id(&d, "/pinned", "get", TransformOptions::default());
        assert_eq!(id, "pinned-op");
    }

    #[test]
    fn test_schema_id_is_pointer() {
        let d = doc();
        let mut ctx = TransformContext::new(&d, TransformOptions::default());
        let id = ctx.scoped(["paths", "/items", "get", "parameters", "0"], |ctx| {
            ctx.generate_id(IdHint::Schema).unwrap()
        });
        assert_eq!(id, "#/components/parameters/Limit");
    }

    #[test]
    fn test_synthesized_media_discriminated() {
        let d = json!({"responses": {"200": {"description": "ok"}}});
        let mut ctx = TransformContext::new(&d, TransformOptions::verbatim());
        ctx.enter(["responses", "200"]);
        let json_id = ctx
            .generate_id(IdHint::Media { media_type: "application/json" })
            .unwrap();
        let xml_id = ctx
            .generate_id(IdHint::Media { media_type: "application/xml" })
            .unwrap();
        assert_ne!(json_id, xml_id);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(
            render_id("abc", HashingMode::Stable),
            render_id("abc", HashingMode::Stable)
        );
        assert_eq!(render_id("abc", HashingMode::Verbatim), "abc");
    }
}
