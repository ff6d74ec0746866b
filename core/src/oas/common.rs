#![deny(missing_docs)]

//! # Shared Accessors
//!
//! Field mapping common to OpenAPI 2 and 3: the operation shell, schema
//! translation (memoized per resolved location), examples, tags and security.
//!
//! Every function reads the node under the context's cursor.

use crate::context::TransformContext;
use crate::error::{EngineError, EngineResult};
use crate::identity::IdHint;
use crate::model::{Example, HttpOperation, HttpSecurityScheme, Tag};
use crate::pointer::{JsonPath, PathSegment};
use crate::resolver::has_ref;
use crate::schema::{convert, convert_root, RefMap};
use serde_json::{Map, Value};

/// A parameter position relative to its path item, after the path/operation merge.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParamRef {
    /// Segments from the path item to the parameter.
    pub rel: JsonPath,
    /// Parameter name.
    pub name: String,
    /// Raw `in` value.
    pub location: String,
}

/// Reads a string field.
pub(crate) fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Reads a boolean field, defaulting to `false`.
pub(crate) fn bool_field(node: &Value, key: &str) -> bool {
    node.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Reads a list of strings, skipping non-string entries.
pub(crate) fn string_list(node: &Value, key: &str) -> Vec<String> {
    node.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Keys of an object field, in document order. Extensions (`x-*`) are skipped.
pub(crate) fn object_keys(node: &Value, key: &str) -> Vec<String> {
    node.get(key)
        .and_then(Value::as_object)
        .map(|map| {
            map.keys()
                .filter(|k| !k.starts_with("x-"))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Names the document root as the service. Every per-operation context starts here.
pub(crate) fn name_service(ctx: &mut TransformContext<'_>) -> EngineResult<String> {
    let document = ctx.document();
    let name = service_name(document);
    ctx.generate_id(IdHint::Service { name: &name })
}

/// `info.title`, or the Postman collection name.
pub(crate) fn service_name(document: &Value) -> String {
    document
        .get("info")
        .and_then(|info| string_field(info, "title").or_else(|| string_field(info, "name")))
        .unwrap_or_default()
}

/// Fields every dialect reads the same way, with the operation id generated.
pub(crate) fn operation_shell(
    ctx: &mut TransformContext<'_>,
    path: &str,
    method: &str,
) -> EngineResult<HttpOperation> {
    let Some(node) = ctx.fragment()? else {
        return Err(EngineError::MissingOperation {
            path: path.to_string(),
            method: method.to_string(),
        });
    };
    let id = ctx.generate_id(IdHint::Operation { method, path })?;
    Ok(HttpOperation {
        id,
        iid: string_field(node, "operationId"),
        method: method.to_lowercase(),
        path: path.to_string(),
        summary: string_field(node, "summary"),
        description: string_field(node, "description"),
        deprecated: bool_field(node, "deprecated"),
        internal: bool_field(node, "x-internal"),
        tags: string_list(node, "tags"),
        ..Default::default()
    })
}

/// Path-level and operation-level parameters merged by `(name, in)`; the
/// operation's definition replaces the path item's in place.
///
/// Must be called with the cursor on the path item.
pub(crate) fn merged_parameters(
    ctx: &mut TransformContext<'_>,
    method: &str,
) -> EngineResult<Vec<ParamRef>> {
    let mut out: Vec<ParamRef> = Vec::new();
    let prefixes: [JsonPath; 2] = [Vec::new(), vec![PathSegment::from(method)]];
    for prefix in prefixes {
        let mut base = prefix;
        base.push(PathSegment::from("parameters"));
        let count = ctx.scoped(base.clone(), |ctx| {
            Ok::<_, EngineError>(ctx.fragment()?.and_then(Value::as_array).map_or(0, Vec::len))
        })?;

        for i in 0..count {
            let mut rel = base.clone();
            rel.push(PathSegment::Index(i));
            let Some(param) = ctx.scoped(rel.clone(), |ctx| ctx.fragment())? else {
                continue;
            };
            let (Some(name), Some(location)) =
                (string_field(param, "name"), string_field(param, "in"))
            else {
                continue;
            };
            match out
                .iter_mut()
                .find(|p| p.name == name && p.location == location)
            {
                Some(existing) => existing.rel = rel,
                None => out.push(ParamRef {
                    rel,
                    name,
                    location,
                }),
            }
        }
    }
    Ok(out)
}

/// Translates the schema under the cursor.
///
/// A schema that is itself a `$ref` is validated and returned as a reference;
/// its target is translated wherever it is used directly. Converted schemas are
/// memoized by resolved location and carry their id under the stable-id extension.
pub(crate) fn translate_schema(ctx: &mut TransformContext<'_>) -> EngineResult<Option<Value>> {
    let Some(raw) = ctx.raw_fragment()? else {
        return Ok(None);
    };
    if has_ref(raw) {
        ctx.fragment()?;
        return Ok(Some(convert(raw, &RefMap::new())));
    }
    let location = current_location(ctx);
    translate_at(ctx, location, raw).map(Some)
}

/// Translates a schema assembled from the node under the cursor (OpenAPI 2
/// non-body parameters and headers carry their schema inline).
pub(crate) fn translate_inline(ctx: &mut TransformContext<'_>, raw: &Value) -> EngineResult<Value> {
    ctx.fragment()?;
    let location = current_location(ctx);
    translate_at(ctx, location, raw)
}

fn current_location(ctx: &TransformContext<'_>) -> JsonPath {
    match ctx.resolved_path() {
        Some(resolved) => resolved.to_vec(),
        None => ctx.path().to_vec(),
    }
}

fn translate_at(
    ctx: &mut TransformContext<'_>,
    location: JsonPath,
    raw: &Value,
) -> EngineResult<Value> {
    if let Some(hit) = ctx.schema_cache.get(&location) {
        return Ok(hit.clone());
    }
    let mut converted = convert_root(raw, &RefMap::new());
    let id = ctx.generate_id(IdHint::Schema)?;
    if let Value::Object(map) = &mut converted {
        map.entry(ctx.options().stable_id_extension.clone())
            .or_insert(Value::String(id));
    }
    ctx.schema_cache.insert(location, converted.clone());
    Ok(converted)
}

/// OpenAPI 3 `examples` map, or a single `example` under the key `default`.
pub(crate) fn examples(ctx: &mut TransformContext<'_>) -> EngineResult<Vec<Example>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    if let Some(map) = node.get("examples").and_then(Value::as_object) {
        for key in map.keys() {
            let found = ctx.scoped(["examples", key.as_str()], |ctx| example(ctx, key))?;
            out.extend(found);
        }
    } else if let Some(value) = node.get("example") {
        out.push(ctx.scoped(["example"], |ctx| single_example(ctx, "default", value))?);
    }
    Ok(out)
}

/// An example whose value is given directly rather than as an Example Object.
pub(crate) fn single_example(
    ctx: &mut TransformContext<'_>,
    key: &str,
    value: &Value,
) -> EngineResult<Example> {
    Ok(Example {
        id: ctx.generate_id(IdHint::Example { key })?,
        key: key.to_string(),
        value: Some(value.clone()),
        ..Default::default()
    })
}

fn example(ctx: &mut TransformContext<'_>, key: &str) -> EngineResult<Option<Example>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    Ok(Some(Example {
        id: ctx.generate_id(IdHint::Example { key })?,
        key: key.to_string(),
        summary: string_field(&node, "summary"),
        description: string_field(&node, "description"),
        value: node.get("value").cloned(),
        external_value: string_field(&node, "externalValue"),
    }))
}

/// Document-level `tags`.
pub(crate) fn declared_tags(ctx: &mut TransformContext<'_>) -> EngineResult<Vec<Tag>> {
    let count = ctx
        .document()
        .get("tags")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let mut out = Vec::new();
    for i in 0..count {
        let tag = ctx.scoped(
            [PathSegment::from("tags"), PathSegment::Index(i)],
            |ctx| -> EngineResult<Option<Tag>> {
                let Some(node) = ctx.fragment()? else {
                    return Ok(None);
                };
                let Some(name) = string_field(node, "name") else {
                    return Ok(None);
                };
                Ok(Some(Tag {
                    id: ctx.generate_id(IdHint::Tag { name: &name })?,
                    description: string_field(node, "description"),
                    name,
                }))
            },
        )?;
        out.extend(tag);
    }
    Ok(out)
}

/// Every scheme declared in the document-level section, in document order.
pub(crate) fn declared_security_schemes(
    ctx: &mut TransformContext<'_>,
    section: &[&str],
) -> EngineResult<Vec<HttpSecurityScheme>> {
    let mut node = ctx.document();
    for segment in section {
        match node.get(*segment) {
            Some(next) => node = next,
            None => return Ok(Vec::new()),
        }
    }
    let keys: Vec<String> = node
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    let mut out = Vec::new();
    for key in keys {
        out.extend(ctx.scoped_at(section_path(section, &key), |ctx| {
            security_scheme(ctx, &key)
        })?);
    }
    Ok(out)
}

/// Resolves a list of security requirement objects against the scheme section.
///
/// Requirements naming an undeclared scheme drop that scheme.
pub(crate) fn security_requirements(
    ctx: &mut TransformContext<'_>,
    requirements: &Value,
    section: &[&str],
) -> EngineResult<Vec<Vec<HttpSecurityScheme>>> {
    let Some(list) = requirements.as_array() else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(list.len());
    for requirement in list {
        let Some(map) = requirement.as_object() else {
            continue;
        };
        let mut schemes = Vec::with_capacity(map.len());
        for (key, scopes) in map {
            let found = ctx.scoped_at(section_path(section, key), |ctx| security_scheme(ctx, key))?;
            if let Some(mut scheme) = found {
                scheme.scopes = scopes
                    .as_array()
                    .map(|s| s.iter().filter_map(Value::as_str).map(str::to_owned).collect())
                    .unwrap_or_default();
                schemes.push(scheme);
            }
        }
        out.push(schemes);
    }
    Ok(out)
}

/// Operation `security` when present (an empty list clears it), otherwise the
/// document's. Must be called with the cursor on the operation.
pub(crate) fn effective_security(
    ctx: &mut TransformContext<'_>,
    section: &[&str],
) -> EngineResult<Vec<Vec<HttpSecurityScheme>>> {
    let document = ctx.document();
    let requirements = match ctx.fragment()?.and_then(|op| op.get("security")) {
        Some(own) => own,
        None => match document.get("security") {
            Some(global) => global,
            None => return Ok(Vec::new()),
        },
    };
    security_requirements(ctx, requirements, section)
}

fn section_path(section: &[&str], key: &str) -> JsonPath {
    section
        .iter()
        .map(|s| PathSegment::from(*s))
        .chain(std::iter::once(PathSegment::from(key)))
        .collect()
}

/// Maps one security scheme object, normalizing OpenAPI 2 shapes
/// (`basic`, single-flow `oauth2`) to their OpenAPI 3 equivalents.
pub(crate) fn security_scheme(
    ctx: &mut TransformContext<'_>,
    key: &str,
) -> EngineResult<Option<HttpSecurityScheme>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    let Some(kind) = string_field(&node, "type") else {
        return Ok(None);
    };
    let id = ctx.generate_id(IdHint::SecurityScheme { key })?;

    let (kind, scheme) = match kind.as_str() {
        "basic" => ("http".to_string(), Some("basic".to_string())),
        _ => (kind, string_field(&node, "scheme")),
    };
    let flows = match node.get("flows") {
        Some(flows) => Some(flows.clone()),
        None => legacy_oauth_flow(&node),
    };

    Ok(Some(HttpSecurityScheme {
        id,
        key: key.to_string(),
        kind,
        description: string_field(&node, "description"),
        name: string_field(&node, "name"),
        location: string_field(&node, "in"),
        scheme,
        scopes: Vec::new(),
        flows,
    }))
}

/// OpenAPI 2 `flow` + URLs + `scopes` as an OpenAPI 3 `flows` object.
fn legacy_oauth_flow(node: &Value) -> Option<Value> {
    let flow = match node.get("flow").and_then(Value::as_str)? {
        "implicit" => "implicit",
        "password" => "password",
        "application" => "clientCredentials",
        "accessCode" => "authorizationCode",
        _ => return None,
    };
    let mut body = Map::new();
    for key in ["authorizationUrl", "tokenUrl"] {
        if let Some(v) = node.get(key) {
            body.insert(key.to_string(), v.clone());
        }
    }
    body.insert(
        "scopes".to_string(),
        node.get("scopes")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
    );
    let mut flows = Map::new();
    flows.insert(flow.to_string(), Value::Object(body));
    Some(Value::Object(flows))
}
