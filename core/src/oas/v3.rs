#![deny(missing_docs)]

//! # OpenAPI 3 Operations
//!
//! Maps OpenAPI 3.0 / 3.1 operations onto `HttpOperation`.
//!
//! - Path-level and operation-level parameters are merged by `(name, in)`.
//! - Servers come from the most specific level that declares any.
//! - Security schemes live under `components/securitySchemes`.

use crate::context::TransformContext;
use crate::error::{EngineError, EngineResult};
use crate::identity::IdHint;
use crate::model::{
    Encoding, HttpOperation, HttpParam, HttpRequestBody, HttpResponse, HttpServer, MediaContent,
    ParamLocation,
};
use crate::oas::common::{
    bool_field, effective_security, examples, merged_parameters, object_keys, operation_shell,
    string_field, translate_schema,
};
use crate::pointer::PathSegment;
use serde_json::Value;

/// Where OpenAPI 3 documents declare security schemes.
pub const SECURITY_SECTION: [&str; 2] = ["components", "securitySchemes"];

/// Transforms `paths.<path>.<method>`.
pub(crate) fn transform_operation(
    ctx: &mut TransformContext<'_>,
    path: &str,
    method: &str,
) -> EngineResult<HttpOperation> {
    ctx.scoped(["paths", path], |ctx| {
        let mut operation = ctx.scoped([method], |ctx| operation_shell(ctx, path, method))?;

        for param in merged_parameters(ctx, method)? {
            let Some(location) = ParamLocation::parse(&param.location) else {
                tracing::debug!(
                    name = %param.name,
                    location = %param.location,
                    "skipping parameter"
                );
                continue;
            };
            if let Some(found) = ctx.scoped(param.rel, |ctx| parameter(ctx, location))? {
                operation.request.push(location, found);
            }
        }

        operation.servers = servers(ctx, method)?;

        ctx.scoped([method], |ctx| -> EngineResult<()> {
            operation.request.body = ctx.scoped(["requestBody"], request_body)?;
            operation.responses = responses(ctx)?;
            operation.security = effective_security(ctx, &SECURITY_SECTION)?;
            Ok(())
        })?;
        Ok(operation)
    })
}

fn parameter(
    ctx: &mut TransformContext<'_>,
    location: ParamLocation,
) -> EngineResult<Option<HttpParam>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    let Some(name) = string_field(&node, "name") else {
        return Ok(None);
    };
    param_fields(ctx, &node, location, name).map(Some)
}

/// A response header: a parameter whose name comes from the map key.
fn header(ctx: &mut TransformContext<'_>, name: &str) -> EngineResult<Option<HttpParam>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    param_fields(ctx, &node, ParamLocation::Header, name.to_string()).map(Some)
}

fn param_fields(
    ctx: &mut TransformContext<'_>,
    node: &Value,
    location: ParamLocation,
    name: String,
) -> EngineResult<HttpParam> {
    let id = ctx.generate_id(IdHint::Parameter {
        location,
        name: &name,
    })?;
    let schema = match node.get("schema") {
        Some(_) => ctx.scoped(["schema"], translate_schema)?,
        None => match object_keys(node, "content").first() {
            Some(media_type) => {
                ctx.scoped(["content", media_type.as_str(), "schema"], translate_schema)?
            }
            None => None,
        },
    };
    Ok(HttpParam {
        id,
        style: string_field(node, "style")
            .unwrap_or_else(|| location.default_style().to_string()),
        required: location == ParamLocation::Path || bool_field(node, "required"),
        deprecated: bool_field(node, "deprecated"),
        explode: node.get("explode").and_then(Value::as_bool),
        description: string_field(node, "description"),
        schema,
        examples: examples(ctx)?,
        name,
    })
}

fn request_body(ctx: &mut TransformContext<'_>) -> EngineResult<Option<HttpRequestBody>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    Ok(Some(HttpRequestBody {
        id: ctx.generate_id(IdHint::RequestBody)?,
        required: bool_field(&node, "required"),
        description: string_field(&node, "description"),
        contents: media_contents(ctx)?,
    }))
}

/// Entries of the `content` map under the cursor.
fn media_contents(ctx: &mut TransformContext<'_>) -> EngineResult<Vec<MediaContent>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for media_type in object_keys(node, "content") {
        let found = ctx.scoped(["content", media_type.as_str()], |ctx| {
            media(ctx, &media_type)
        })?;
        out.extend(found);
    }
    Ok(out)
}

fn media(ctx: &mut TransformContext<'_>, media_type: &str) -> EngineResult<Option<MediaContent>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(None);
    };
    let id = ctx.generate_id(IdHint::Media { media_type })?;
    let schema = ctx.scoped(["schema"], translate_schema)?;
    let examples = examples(ctx)?;

    let mut encodings = Vec::new();
    for property in object_keys(node, "encoding") {
        let found = ctx.scoped(["encoding", property.as_str()], |ctx| {
            encoding(ctx, &property)
        })?;
        encodings.extend(found);
    }

    Ok(Some(MediaContent {
        id,
        media_type: media_type.to_string(),
        schema,
        examples,
        encodings,
    }))
}

fn encoding(ctx: &mut TransformContext<'_>, property: &str) -> EngineResult<Option<Encoding>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    Ok(Some(Encoding {
        id: ctx.generate_id(IdHint::Encoding { property })?,
        property: property.to_string(),
        media_type: string_field(&node, "contentType"),
        style: string_field(&node, "style"),
        explode: node.get("explode").and_then(Value::as_bool),
    }))
}

fn responses(ctx: &mut TransformContext<'_>) -> EngineResult<Vec<HttpResponse>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for code in object_keys(node, "responses") {
        let found = ctx.scoped(["responses", code.as_str()], |ctx| response(ctx, &code))?;
        out.extend(found);
    }
    Ok(out)
}

fn response(ctx: &mut TransformContext<'_>, code: &str) -> EngineResult<Option<HttpResponse>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    let id = ctx.generate_id(IdHint::Response { code })?;

    let mut headers = Vec::new();
    for name in object_keys(&node, "headers") {
        let found = ctx.scoped(["headers", name.as_str()], |ctx| header(ctx, &name))?;
        headers.extend(found);
    }

    Ok(Some(HttpResponse {
        id,
        code: code.to_string(),
        description: string_field(&node, "description"),
        headers,
        contents: media_contents(ctx)?,
    }))
}

/// Servers of the most specific level: operation, then path item, then document.
///
/// Must be called with the cursor on the path item.
fn servers(ctx: &mut TransformContext<'_>, method: &str) -> EngineResult<Vec<HttpServer>> {
    let on_operation = ctx.scoped([method], |ctx| {
        Ok::<_, EngineError>(has_servers(ctx.fragment()?))
    })?;
    if on_operation {
        return ctx.scoped([method], server_list);
    }
    if has_servers(ctx.fragment()?) {
        return server_list(ctx);
    }
    ctx.scoped_at(Vec::new(), server_list)
}

fn has_servers(node: Option<&Value>) -> bool {
    node.and_then(|n| n.get("servers"))
        .and_then(Value::as_array)
        .is_some_and(|s| !s.is_empty())
}

/// The `servers` array under the cursor.
pub(crate) fn server_list(ctx: &mut TransformContext<'_>) -> EngineResult<Vec<HttpServer>> {
    let count = ctx
        .fragment()?
        .and_then(|n| n.get("servers"))
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let found = ctx.scoped(
            [PathSegment::from("servers"), PathSegment::Index(i)],
            server,
        )?;
        out.extend(found);
    }
    Ok(out)
}

fn server(ctx: &mut TransformContext<'_>) -> EngineResult<Option<HttpServer>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(None);
    };
    let Some(url) = string_field(node, "url") else {
        return Ok(None);
    };
    Ok(Some(HttpServer {
        id: ctx.generate_id(IdHint::Server { url: &url })?,
        name: string_field(node, "x-name"),
        description: string_field(node, "description"),
        url,
    }))
}
