#![deny(missing_docs)]

//! # OpenAPI 2 Operations
//!
//! Maps Swagger 2.0 operations onto `HttpOperation`.
//!
//! - `in: body` becomes the request body, one content entry per `consumes` type.
//! - `in: formData` parameters are folded into an object schema for the form types.
//! - Non-body parameters and headers carry their schema inline; `collectionFormat`
//!   maps onto a serialization style.
//! - Responses get one content entry per `produces` type.
//! - `host` / `basePath` / `schemes` become servers.

use crate::context::TransformContext;
use crate::error::EngineResult;
use crate::identity::IdHint;
use crate::model::{
    HttpOperation, HttpParam, HttpRequestBody, HttpResponse, HttpServer, MediaContent,
    ParamLocation,
};
use crate::oas::common::{
    bool_field, effective_security, merged_parameters, object_keys, operation_shell,
    single_example, string_field, string_list, translate_inline, translate_schema, ParamRef,
};
use crate::pointer::PathSegment;
use serde_json::{Map, Value};

/// Where OpenAPI 2 documents declare security schemes.
pub const SECURITY_SECTION: [&str; 1] = ["securityDefinitions"];

/// Media type used when neither the operation nor the document declares one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Parameter / header keywords that make up their inline schema.
const INLINE_SCHEMA_KEYS: [&str; 18] = [
    "type",
    "format",
    "items",
    "default",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "enum",
    "multipleOf",
    "x-nullable",
    "description",
];

/// Transforms `paths.<path>.<method>`.
///
/// Content entries synthesized from `consumes` / `produces` are named one level
/// below the node that carries them, so their parent is that body or response.
pub(crate) fn transform_operation(
    ctx: &mut TransformContext<'_>,
    path: &str,
    method: &str,
) -> EngineResult<HttpOperation> {
    let document = ctx.document();
    ctx.scoped(["paths", path], |ctx| {
        let mut operation = ctx.scoped([method], |ctx| operation_shell(ctx, path, method))?;
        let node = ctx.scoped([method], |ctx| ctx.fragment())?;
        let consumes = media_types(node, document, "consumes");
        let produces = media_types(node, document, "produces");

        let mut form = Vec::new();
        for param in merged_parameters(ctx, method)? {
            match param.location.as_str() {
                "body" => {
                    operation.request.body =
                        ctx.scoped(param.rel, |ctx| body_parameter(ctx, &consumes))?;
                }
                "formData" => form.push(param),
                other => {
                    let Some(location) = ParamLocation::parse(other) else {
                        tracing::debug!(name = %param.name, location = other, "skipping parameter");
                        continue;
                    };
                    if let Some(found) = ctx.scoped(param.rel, |ctx| parameter(ctx, location))? {
                        operation.request.push(location, found);
                    }
                }
            }
        }
        if operation.request.body.is_none() && !form.is_empty() {
            operation.request.body = Some(form_body(ctx, method, &form, &consumes)?);
        }

        let schemes = node.map(|n| string_list(n, "schemes")).unwrap_or_default();
        operation.servers = servers(ctx, &schemes)?;

        ctx.scoped([method], |ctx| -> EngineResult<()> {
            operation.responses = responses(ctx, &produces)?;
            operation.security = effective_security(ctx, &SECURITY_SECTION)?;
            Ok(())
        })?;
        Ok(operation)
    })
}

/// `consumes` / `produces` of the operation, else of the document, else JSON.
fn media_types(operation: Option<&Value>, document: &Value, key: &str) -> Vec<String> {
    let own = operation.map(|op| string_list(op, key)).unwrap_or_default();
    if !own.is_empty() {
        return own;
    }
    let global = string_list(document, key);
    if !global.is_empty() {
        return global;
    }
    vec![DEFAULT_MEDIA_TYPE.to_string()]
}

/// Collects the schema keywords a non-body parameter or header carries inline.
fn inline_schema(node: &Value) -> Value {
    let mut schema = Map::new();
    for key in INLINE_SCHEMA_KEYS {
        if let Some(value) = node.get(key) {
            schema.insert(key.to_string(), value.clone());
        }
    }
    if schema.get("type").and_then(Value::as_str) == Some("file") {
        schema.insert("type".to_string(), Value::String("string".to_string()));
        schema.insert("format".to_string(), Value::String("binary".to_string()));
    }
    Value::Object(schema)
}

/// `collectionFormat` -> (style, explode).
fn collection_style(format: Option<&str>, location: ParamLocation) -> (String, Option<bool>) {
    let (style, explode) = match format {
        Some("csv") => (location.default_style(), Some(false)),
        Some("ssv") | Some("tsv") => ("spaceDelimited", None),
        Some("pipes") => ("pipeDelimited", None),
        Some("multi") => ("form", Some(true)),
        _ => (location.default_style(), None),
    };
    (style.to_string(), explode)
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
    let id = ctx.generate_id(IdHint::Parameter {
        location,
        name: &name,
    })?;
    let schema = translate_inline(ctx, &inline_schema(&node))?;
    let (style, explode) = collection_style(
        node.get("collectionFormat").and_then(Value::as_str),
        location,
    );
    let examples = match node.get("x-example") {
        Some(value) => vec![ctx.scoped(["x-example"], |ctx| {
            single_example(ctx, "default", value)
        })?],
        None => Vec::new(),
    };
    Ok(Some(HttpParam {
        id,
        name,
        style,
        required: location == ParamLocation::Path || bool_field(&node, "required"),
        deprecated: bool_field(&node, "x-deprecated"),
        explode,
        description: string_field(&node, "description"),
        schema: Some(schema),
        examples,
    }))
}

fn body_parameter(
    ctx: &mut TransformContext<'_>,
    consumes: &[String],
) -> EngineResult<Option<HttpRequestBody>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    let id = ctx.generate_id(IdHint::RequestBody)?;
    let schema = ctx.scoped(["schema"], translate_schema)?;
    let declared = node.get("x-examples").and_then(Value::as_object);

    let mut contents = Vec::with_capacity(consumes.len());
    for media_type in consumes {
        let id = ctx.scoped(["consumes"], |ctx| ctx.generate_id(IdHint::Media { media_type }))?;
        let mut examples = Vec::new();
        if let Some(value) = declared.and_then(|m| m.get(media_type)) {
            examples.push(ctx.scoped(["x-examples", media_type.as_str()], |ctx| {
                single_example(ctx, media_type, value)
            })?);
        }
        contents.push(MediaContent {
            id,
            media_type: media_type.clone(),
            schema: schema.clone(),
            examples,
            encodings: Vec::new(),
        });
    }

    Ok(Some(HttpRequestBody {
        id,
        required: bool_field(&node, "required"),
        description: string_field(&node, "description"),
        contents,
    }))
}

/// Folds `formData` parameters into one object schema. Must be called with the
/// cursor on the path item.
fn form_body(
    ctx: &mut TransformContext<'_>,
    method: &str,
    form: &[ParamRef],
    consumes: &[String],
) -> EngineResult<HttpRequestBody> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    let mut has_file = false;
    for param in form {
        let field = ctx.scoped(param.rel.clone(), |ctx| -> EngineResult<Option<(Value, bool)>> {
            let Some(node) = ctx.fragment()? else {
                return Ok(None);
            };
            let schema = translate_inline(ctx, &inline_schema(node))?;
            Ok(Some((schema, bool_field(node, "required"))))
        })?;
        let Some((schema, is_required)) = field else {
            continue;
        };
        has_file |= schema.get("contentMediaType").is_some();
        if is_required {
            required.push(Value::String(param.name.clone()));
        }
        properties.insert(param.name.clone(), schema);
    }

    let mut body = Map::new();
    body.insert("type".to_string(), Value::String("object".to_string()));
    body.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        body.insert("required".to_string(), Value::Array(required));
    }
    let body = Value::Object(body);

    let mut media_types: Vec<&str> = consumes
        .iter()
        .map(String::as_str)
        .filter(|m| *m == URLENCODED || *m == MULTIPART)
        .collect();
    if media_types.is_empty() {
        media_types.push(if has_file { MULTIPART } else { URLENCODED });
    }

    ctx.scoped([method], |ctx| {
        let id = ctx.generate_id(IdHint::RequestBody)?;
        let schema = translate_inline(ctx, &body)?;
        let mut contents = Vec::with_capacity(media_types.len());
        for media_type in media_types {
            contents.push(MediaContent {
                id: ctx.scoped(["consumes"], |ctx| {
                    ctx.generate_id(IdHint::Media { media_type })
                })?,
                media_type: media_type.to_string(),
                schema: Some(schema.clone()),
                ..Default::default()
            });
        }
        Ok(HttpRequestBody {
            id,
            required: body
                .get("required")
                .and_then(Value::as_array)
                .is_some_and(|r| !r.is_empty()),
            description: None,
            contents,
        })
    })
}

fn responses(
    ctx: &mut TransformContext<'_>,
    produces: &[String],
) -> EngineResult<Vec<HttpResponse>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for code in object_keys(node, "responses") {
        let found = ctx.scoped(["responses", code.as_str()], |ctx| {
            response(ctx, &code, produces)
        })?;
        out.extend(found);
    }
    Ok(out)
}

fn response(
    ctx: &mut TransformContext<'_>,
    code: &str,
    produces: &[String],
) -> EngineResult<Option<HttpResponse>> {
    let Some(node) = ctx.resolved_fragment()? else {
        return Ok(None);
    };
    let id = ctx.generate_id(IdHint::Response { code })?;

    let mut headers = Vec::new();
    for name in object_keys(&node, "headers") {
        let found = ctx.scoped(["headers", name.as_str()], |ctx| header(ctx, &name))?;
        headers.extend(found);
    }

    let declared = node.get("examples").and_then(Value::as_object);
    let mut media_types: Vec<String> = produces.to_vec();
    if let Some(declared) = declared {
        for media_type in declared.keys() {
            if !media_types.contains(media_type) {
                media_types.push(media_type.clone());
            }
        }
    }

    let mut contents = Vec::new();
    if node.get("schema").is_some() || declared.is_some() {
        let schema = ctx.scoped(["schema"], translate_schema)?;
        for media_type in &media_types {
            let id = ctx.scoped(["produces"], |ctx| ctx.generate_id(IdHint::Media { media_type }))?;
            let mut examples = Vec::new();
            if let Some(value) = declared.and_then(|m| m.get(media_type)) {
                examples.push(ctx.scoped(["examples", media_type.as_str()], |ctx| {
                    single_example(ctx, media_type, value)
                })?);
            }
            contents.push(MediaContent {
                id,
                media_type: media_type.clone(),
                schema: schema.clone(),
                examples,
                encodings: Vec::new(),
            });
        }
    }

    Ok(Some(HttpResponse {
        id,
        code: code.to_string(),
        description: string_field(&node, "description"),
        headers,
        contents,
    }))
}

fn header(ctx: &mut TransformContext<'_>, name: &str) -> EngineResult<Option<HttpParam>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(None);
    };
    let id = ctx.generate_id(IdHint::Parameter {
        location: ParamLocation::Header,
        name,
    })?;
    let schema = translate_inline(ctx, &inline_schema(node))?;
    let (style, explode) = collection_style(
        node.get("collectionFormat").and_then(Value::as_str),
        ParamLocation::Header,
    );
    Ok(Some(HttpParam {
        id,
        name: name.to_string(),
        style,
        explode,
        description: string_field(node, "description"),
        schema: Some(schema),
        ..Default::default()
    }))
}

/// One server per scheme from `host` + `basePath`. `schemes` overrides the
/// document's schemes when non-empty; `https` is assumed when neither has any.
pub(crate) fn servers(
    ctx: &mut TransformContext<'_>,
    schemes: &[String],
) -> EngineResult<Vec<HttpServer>> {
    let document = ctx.document();
    let Some(host) = string_field(document, "host") else {
        return Ok(Vec::new());
    };
    let base_path = string_field(document, "basePath").unwrap_or_default();
    let mut schemes = schemes.to_vec();
    if schemes.is_empty() {
        schemes = string_list(document, "schemes");
    }
    if schemes.is_empty() {
        schemes.push("https".to_string());
    }

    // Servers are synthesized from `host`; they are named there.
    ctx.scoped_at(vec![PathSegment::from("host")], |ctx| {
        let mut out = Vec::with_capacity(schemes.len());
        for scheme in &schemes {
            let url = format!("{}://{}{}", scheme, host, base_path);
            let url = url.trim_end_matches('/').to_string();
            out.push(HttpServer {
                id: ctx.generate_id(IdHint::Server { url: &url })?,
                url,
                ..Default::default()
            });
        }
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformOptions;
    use crate::oas::common::name_service;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(doc: &Value, path: &str, method: &str) -> HttpOperation {
        let mut ctx = TransformContext::new(doc, TransformOptions::default());
        name_service(&mut ctx).unwrap();
        transform_operation(&mut ctx, path, method).unwrap()
    }

    fn doc() -> Value {
        json!({
            "swagger": "2.0",
            "info": {"title": "Store", "version": "1"},
            "host": "store.example.com",
            "basePath": "/v1",
            "schemes": ["http", "https"],
            "produces": ["application/json", "application/xml"],
            "paths": {
                "/orders": {
                    "get": {
                        "parameters": [
                            {"name": "ids", "in": "query", "type": "array", "items": {"type": "integer", "format": "int32"}, "collectionFormat": "csv"},
                            {"name": "tags", "in": "query", "type": "array", "items": {"type": "string"}, "collectionFormat": "multi", "x-example": ["a"]},
                            {"$ref": "#/parameters/Limit"}
                        ],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "schema": {"$ref": "#/definitions/Order"},
                                "headers": {"X-Total": {"type": "integer", "format": "int64"}},
                                "examples": {"application/json": {"id": 1}}
                            },
                            "default": {"$ref": "#/responses/Error"}
                        },
                        "security": [{"basicAuth": []}]
                    },
                    "post": {
                        "consumes": ["application/json"],
                        "schemes": ["https"],
                        "parameters": [
                            {"name": "order", "in": "body", "required": true, "schema": {"type": "object", "x-nullable": true}}
                        ],
                        "responses": {"201": {"description": "created"}}
                    }
                },
                "/upload": {
                    "post": {
                        "parameters": [
                            {"name": "file", "in": "formData", "type": "file", "required": true},
                            {"name": "note", "in": "formData", "type": "string"}
                        ],
                        "responses": {"204": {"description": "done"}}
                    }
                }
            },
            "parameters": {"Limit": {"name": "limit", "in": "query", "type": "integer", "maximum": 50}},
            "responses": {"Error": {"description": "error", "schema": {"type": "string"}}},
            "definitions": {"Order": {"type": "object"}},
            "securityDefinitions": {"basicAuth": {"type": "basic"}}
        })
    }

    #[test]
    fn test_query_parameters() {
        let d = doc();
        let op = run(&d, "/orders", "get");
        let ids = &op.request.query[0];
        assert_eq!(ids.style, "form");
        assert_eq!(ids.explode, Some(false));
        assert_eq!(
            ids.schema.as_ref().unwrap()["items"]["maximum"],
            json!(2147483647)
        );
        let tags = &op.request.query[1];
        assert_eq!(tags.explode, Some(true));
        assert_eq!(tags.examples[0].value, Some(json!(["a"])));
        let limit = &op.request.query[2];
        assert_eq!(limit.name, "limit");
        assert_eq!(limit.schema.as_ref().unwrap()["maximum"], json!(50));
    }

    #[test]
    fn test_responses_per_produces() {
        let d = doc();
        let op = run(&d, "/orders", "get");
        let ok = &op.responses[0];
        let types: Vec<&str> = ok.contents.iter().map(|c| c.media_type.as_str()).collect();
        assert_eq!(types, vec!["application/json", "application/xml"]);
        assert_ne!(ok.contents[0].id, ok.contents[1].id);
        assert_eq!(ok.contents[0].examples[0].value, Some(json!({"id": 1})));
        assert!(ok.contents[1].examples.is_empty());
        assert_eq!(ok.headers[0].name, "X-Total");
        let fallback = &op.responses[1];
        assert_eq!(fallback.code, "default");
        assert_eq!(fallback.contents.len(), 2);
    }

    #[test]
    fn test_body_parameter_uses_consumes() {
        let d = doc();
        let op = run(&d, "/orders", "post");
        let body = op.request.body.unwrap();
        assert!(body.required);
        assert_eq!(body.contents.len(), 1);
        assert_eq!(
            body.contents[0].schema.as_ref().unwrap()["type"],
            json!(["object", "null"])
        );
        assert_eq!(op.servers.len(), 1);
        assert_eq!(op.servers[0].url, "https://store.example.com/v1");
    }

    #[test]
    fn test_form_data_folded() {
        let d = doc();
        let op = run(&d, "/upload", "post");
        let body = op.request.body.unwrap();
        assert!(body.required);
        assert_eq!(body.contents[0].media_type, "multipart/form-data");
        let schema = body.contents[0].schema.as_ref().unwrap();
        assert_eq!(schema["required"], json!(["file"]));
        assert_eq!(
            schema["properties"]["file"]["contentMediaType"],
            json!("application/octet-stream")
        );
    }

    #[test]
    fn test_servers_and_security() {
        let d = doc();
        let op = run(&d, "/orders", "get");
        let urls: Vec<&str> = op.servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["http://store.example.com/v1", "https://store.example.com/v1"]
        );
        assert_eq!(op.security[0][0].kind, "http");
        assert_eq!(op.security[0][0].scheme.as_deref(), Some("basic"));
    }
}
