#![deny(missing_docs)]

//! # Postman Collections
//!
//! Reads Postman Collection v2.0 / v2.1 documents into the same records the
//! OpenAPI transforms produce.
//!
//! - Requests are flattened out of their folders; folder names become tags.
//! - `{{name}}` placeholders are substituted from the collection's `variable` list.
//! - `:name` path segments become `{name}` templates.
//! - Saved responses become responses; their bodies become examples and an
//!   inferred schema.
//! - Requests sharing a (method, path) are merged into one operation.

use crate::config::TransformOptions;
use crate::context::TransformContext;
use crate::error::{EngineError, EngineResult};
use crate::identity::{IdHint, IdentityStore};
use crate::merge::{merge_operations, merge_responses};
use crate::model::{
    Example, HttpOperation, HttpParam, HttpRequest, HttpRequestBody, HttpResponse,
    HttpSecurityScheme, HttpServer, HttpService, MediaContent, ParamLocation,
};
use crate::oas::common::{
    bool_field, name_service, service_name, single_example, string_field, translate_inline,
};
use crate::oas::TransformReport;
use crate::pointer::{JsonPath, PathSegment};
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

const SCHEMA_HOST: &str = "getpostman.com";
const RELATIVE_BASE: &str = "http://localhost/";
const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Whether the document looks like a Postman Collection.
pub fn is_collection(document: &Value) -> bool {
    let declared = document
        .get("info")
        .and_then(|info| info.get("schema"))
        .and_then(Value::as_str)
        .is_some_and(|schema| schema.contains(SCHEMA_HOST));
    let items = document.get("item").is_some_and(Value::is_array);
    declared || (items && document.get("paths").is_none())
}

/// Collection-level `{{name}}` values.
#[derive(Debug, Default)]
struct Variables(HashMap<String, String>);

impl Variables {
    fn from_document(document: &Value) -> Self {
        let mut values = HashMap::new();
        for var in document
            .get("variable")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let Some(key) = string_field(var, "key").or_else(|| string_field(var, "id")) else {
                continue;
            };
            let value = match var.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => continue,
                Some(other) => other.to_string(),
            };
            values.insert(key, value);
        }
        Self(values)
    }

    /// Replaces known `{{name}}` placeholders; unknown ones are left as written.
    fn substitute<'t>(&self, text: &'t str) -> Cow<'t, str> {
        static VAR_RE: OnceLock<Regex> = OnceLock::new();
        let re = VAR_RE.get_or_init(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("Invalid regex"));
        re.replace_all(text, |caps: &Captures<'_>| match self.0.get(caps[1].trim()) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
    }
}

/// A request found somewhere in the item tree.
#[derive(Debug, Clone)]
struct RequestItem {
    location: JsonPath,
    name: Option<String>,
    folders: Vec<String>,
    method: String,
    path: String,
}

fn requests(document: &Value, vars: &Variables) -> Vec<RequestItem> {
    let mut out = Vec::new();
    collect(document, &[], &[], vars, &mut out);
    out
}

fn collect(
    node: &Value,
    location: &[PathSegment],
    folders: &[String],
    vars: &Variables,
    out: &mut Vec<RequestItem>,
) {
    let Some(items) = node.get("item").and_then(Value::as_array) else {
        return;
    };
    for (i, item) in items.iter().enumerate() {
        let mut here = location.to_vec();
        here.push(PathSegment::from("item"));
        here.push(PathSegment::Index(i));

        if let Some(request) = item.get("request") {
            let parsed = parse_url(url_of(request), vars);
            out.push(RequestItem {
                name: string_field(item, "name"),
                folders: folders.to_vec(),
                method: request_method(request),
                path: template_path(&parsed.segments),
                location: here,
            });
        } else if item.get("item").is_some() {
            let mut nested = folders.to_vec();
            nested.extend(string_field(item, "name"));
            collect(item, &here, &nested, vars, out);
        }
    }
}

/// A bare string request is a GET of that URL.
fn request_method(request: &Value) -> String {
    request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("get")
        .to_lowercase()
}

fn url_of(request: &Value) -> Option<&Value> {
    match request {
        Value::String(_) => Some(request),
        _ => request.get("url"),
    }
}

/// The parts of a request URL the transform needs.
#[derive(Debug, Default, PartialEq)]
struct ParsedUrl {
    origin: Option<String>,
    segments: Vec<String>,
    query: Vec<(String, Option<String>)>,
}

fn parse_raw(raw: &str) -> ParsedUrl {
    let relative = raw.starts_with('/');
    let url = if relative {
        Url::parse(RELATIVE_BASE).and_then(|base| base.join(raw))
    } else if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("https://{}", raw))
    };
    let Ok(url) = url else {
        tracing::debug!(raw, "unparseable request url");
        return ParsedUrl::default();
    };

    let origin = url.origin();
    ParsedUrl {
        origin: (!relative && origin.is_tuple()).then(|| origin.ascii_serialization()),
        segments: url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect(),
        query: url
            .query_pairs()
            .map(|(k, v)| {
                let value = (!v.is_empty()).then(|| v.into_owned());
                (k.into_owned(), value)
            })
            .collect(),
    }
}

/// Structured `url` fields win over what `raw` says.
fn parse_url(url: Option<&Value>, vars: &Variables) -> ParsedUrl {
    match url {
        Some(Value::String(raw)) => parse_raw(&vars.substitute(raw)),
        Some(node @ Value::Object(_)) => {
            let mut parsed = string_field(node, "raw")
                .map(|raw| parse_raw(&vars.substitute(&raw)))
                .unwrap_or_default();
            if let Some(path) = node.get("path") {
                parsed.segments = path_segments(path, vars);
            }
            if let Some(origin) = structured_origin(node, vars) {
                parsed.origin = Some(origin);
            }
            parsed
        }
        _ => ParsedUrl::default(),
    }
}

fn path_segments(path: &Value, vars: &Variables) -> Vec<String> {
    let raw: Vec<String> = match path {
        Value::String(s) => s.split('/').map(str::to_owned).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => string_field(other, "value"),
            })
            .collect(),
        _ => Vec::new(),
    };
    raw.iter()
        .map(|segment| vars.substitute(segment).into_owned())
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn structured_origin(url: &Value, vars: &Variables) -> Option<String> {
    let host = match url.get("host")? {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("."),
        _ => return None,
    };
    let host = vars.substitute(&host).into_owned();
    if host.is_empty() {
        return None;
    }
    if host.contains("://") {
        return Some(host.trim_end_matches('/').to_string());
    }
    let protocol = string_field(url, "protocol").unwrap_or_else(|| "https".to_string());
    let port = match url.get("port") {
        Some(Value::String(p)) => format!(":{}", vars.substitute(p)),
        Some(Value::Number(p)) => format!(":{}", p),
        _ => String::new(),
    };
    Some(format!("{}://{}{}", protocol, host, port))
}

/// `:name` segments become `{name}`.
fn template_path(segments: &[String]) -> String {
    let rendered: Vec<String> = segments
        .iter()
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{}}}", name),
            _ => segment.clone(),
        })
        .collect();
    format!("/{}", rendered.join("/"))
}

/// Postman descriptions are either a string or `{ content, type }`.
fn description_of(node: &Value) -> Option<String> {
    match node.get("description")? {
        Value::String(s) => Some(s.clone()),
        other => string_field(other, "content"),
    }
}

/// Transforms every request of the collection.
pub fn transform_operations(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<Vec<HttpOperation>> {
    Ok(transform_operations_report(document, options)?.operations)
}

/// Like `transform_operations`, also reporting the requests that failed.
///
/// Ids are memoized across the whole collection; a failed request's are discarded.
pub fn transform_operations_report(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<TransformReport> {
    let vars = Variables::from_document(document);
    let mut report = TransformReport::default();
    let mut ids = IdentityStore::default();
    for item in requests(document, &vars) {
        let mut ctx = TransformContext::with_ids(document, options.clone(), ids.clone());
        match transform_item(&mut ctx, &item, &vars) {
            Ok(operation) => {
                ids = ctx.into_ids();
                report.operations = merge_operations(&report.operations, &[operation]);
            }
            Err(error) => report.fail(options, &item.path, Some(&item.method), error)?,
        }
    }
    Ok(report)
}

/// Transforms the request(s) for `method` on the templated `path`.
pub fn transform_operation(
    document: &Value,
    path: &str,
    method: &str,
    options: &TransformOptions,
) -> EngineResult<HttpOperation> {
    let vars = Variables::from_document(document);
    let method = method.to_lowercase();
    let on_path: Vec<RequestItem> = requests(document, &vars)
        .into_iter()
        .filter(|item| item.path == path)
        .collect();
    if on_path.is_empty() {
        return Err(EngineError::MissingPath {
            path: path.to_string(),
        });
    }

    let mut merged = Vec::new();
    let mut ids = IdentityStore::default();
    for item in on_path.iter().filter(|item| item.method == method) {
        let mut ctx = TransformContext::with_ids(document, options.clone(), ids);
        let operation = transform_item(&mut ctx, item, &vars)?;
        ids = ctx.into_ids();
        merged = merge_operations(&merged, &[operation]);
    }
    merged
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::MissingOperation {
            path: path.to_string(),
            method,
        })
}

/// The collection as a service: name, version, description, servers and the
/// collection-level auth.
pub fn transform_service(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<HttpService> {
    let vars = Variables::from_document(document);
    let mut ctx = TransformContext::new(document, options.clone());
    let id = name_service(&mut ctx)?;
    let info = document.get("info").unwrap_or(&Value::Null);

    let mut origins: Vec<String> = Vec::new();
    for item in requests(document, &vars) {
        let request = ctx.scoped(item.location, |ctx| ctx.fragment())?;
        let origin = request
            .and_then(|node| node.get("request"))
            .and_then(|request| parse_url(url_of(request), &vars).origin);
        if let Some(origin) = origin {
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }
    }
    // Servers gathered from the requests are named at the item list.
    let servers = ctx.scoped_at(vec![PathSegment::from("item")], |ctx| {
        origins
            .iter()
            .map(|url| server(ctx, url))
            .collect::<EngineResult<Vec<_>>>()
    })?;

    let auth = ctx.scoped_at(vec![PathSegment::from("auth")], auth_scheme)?;
    let version = match info.get("version") {
        Some(Value::String(v)) => v.clone(),
        Some(Value::Object(parts)) => ["major", "minor", "patch"]
            .iter()
            .filter_map(|k| parts.get(*k))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("."),
        _ => String::new(),
    };

    Ok(HttpService {
        id,
        name: service_name(document),
        version,
        description: description_of(info),
        servers,
        security_schemes: auth.clone().into_iter().collect(),
        security: auth.map(|scheme| vec![vec![scheme]]).unwrap_or_default(),
        tags: Vec::new(),
    })
}

/// Cursor at the document root.
fn transform_item(
    ctx: &mut TransformContext<'_>,
    item: &RequestItem,
    vars: &Variables,
) -> EngineResult<HttpOperation> {
    name_service(ctx)?;
    tracing::debug!(path = %item.path, method = %item.method, "transforming request");

    ctx.scoped(item.location.clone(), |ctx| {
        let Some(node) = ctx.fragment()? else {
            return Err(EngineError::MissingOperation {
                path: item.path.clone(),
                method: item.method.clone(),
            });
        };
        let id = ctx.generate_id(IdHint::Operation {
            method: &item.method,
            path: &item.path,
        })?;
        let request = node.get("request").unwrap_or(&Value::Null);
        let parsed = parse_url(url_of(request), vars);

        let mut operation = HttpOperation {
            id,
            method: item.method.clone(),
            path: item.path.clone(),
            summary: item.name.clone(),
            description: description_of(request),
            tags: item.folders.clone(),
            ..Default::default()
        };
        operation.request =
            ctx.scoped(["request"], |ctx| http_request(ctx, request, &parsed, vars))?;
        if let Some(origin) = &parsed.origin {
            operation.servers = ctx.scoped(["request", "url"], |ctx| -> EngineResult<_> {
                Ok(vec![server(ctx, origin)?])
            })?;
        }
        operation.responses = responses(ctx, node, vars)?;
        operation.security = security(ctx, request)?;
        Ok(operation)
    })
}

fn server(ctx: &mut TransformContext<'_>, url: &str) -> EngineResult<HttpServer> {
    Ok(HttpServer {
        id: ctx.generate_id(IdHint::Server { url })?,
        url: url.to_string(),
        ..Default::default()
    })
}

/// Path, query and header parameters plus the body. Cursor on `request`.
fn http_request(
    ctx: &mut TransformContext<'_>,
    request: &Value,
    parsed: &ParsedUrl,
    vars: &Variables,
) -> EngineResult<HttpRequest> {
    let mut out = HttpRequest::default();
    let url = url_of(request);

    let declared: Vec<&Value> = url
        .and_then(|u| u.get("variable"))
        .and_then(Value::as_array)
        .map(|vs| vs.iter().collect())
        .unwrap_or_default();
    for (index, segment) in parsed.segments.iter().enumerate() {
        let Some(name) = segment.strip_prefix(':').filter(|n| !n.is_empty()) else {
            continue;
        };
        let location = match declared
            .iter()
            .position(|v| string_field(v, "key").as_deref() == Some(name))
        {
            Some(i) => vec![
                PathSegment::from("url"),
                PathSegment::from("variable"),
                PathSegment::Index(i),
            ],
            None => vec![
                PathSegment::from("url"),
                PathSegment::from("path"),
                PathSegment::Index(index),
            ],
        };
        let param = ctx.scoped(location, |ctx| {
            param(ctx, ParamLocation::Path, name, None, vars)
        })?;
        out.push(ParamLocation::Path, param);
    }

    match url.and_then(|u| u.get("query")).and_then(Value::as_array) {
        Some(entries) => {
            for (index, entry) in entries.iter().enumerate() {
                if bool_field(entry, "disabled") {
                    continue;
                }
                let Some(key) = string_field(entry, "key") else {
                    continue;
                };
                let found = ctx.scoped(query_location(index), |ctx| {
                    param(ctx, ParamLocation::Query, &key, None, vars)
                })?;
                out.push(ParamLocation::Query, found);
            }
        }
        // Only `raw` is known: the parameters are named where the list would be.
        None => {
            for (index, (key, value)) in parsed.query.iter().enumerate() {
                let found = ctx.scoped(query_location(index), |ctx| {
                    param(ctx, ParamLocation::Query, key, value.as_deref(), vars)
                })?;
                out.push(ParamLocation::Query, found);
            }
        }
    }

    let mut content_type = None;
    for (index, header) in header_list(request).into_iter().enumerate() {
        let Some(header) = header else { continue };
        if bool_field(header, "disabled") {
            continue;
        }
        let Some(key) = string_field(header, "key") else {
            continue;
        };
        if key.eq_ignore_ascii_case("content-type") {
            content_type = string_field(header, "value").map(|v| vars.substitute(&v).into_owned());
            continue;
        }
        let found = ctx.scoped(
            [PathSegment::from("header"), PathSegment::Index(index)],
            |ctx| param(ctx, ParamLocation::Header, &key, None, vars),
        )?;
        out.push(ParamLocation::Header, found);
    }

    if let Some(body) = request.get("body") {
        out.body = ctx.scoped(["body"], |ctx| {
            request_body(ctx, body, content_type.as_deref(), vars)
        })?;
    }
    Ok(out)
}

fn query_location(index: usize) -> JsonPath {
    vec![
        PathSegment::from("url"),
        PathSegment::from("query"),
        PathSegment::Index(index),
    ]
}

/// `header` lists, with `None` holding the place of non-object entries.
fn header_list(node: &Value) -> Vec<Option<&Value>> {
    node.get("header")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|h| h.is_object().then_some(h)).collect())
        .unwrap_or_default()
}

/// A string-valued parameter named at the cursor. Its `value` (or `fallback`
/// when the cursor names nothing) becomes the example.
fn param(
    ctx: &mut TransformContext<'_>,
    location: ParamLocation,
    name: &str,
    fallback: Option<&str>,
    vars: &Variables,
) -> EngineResult<HttpParam> {
    let node = ctx.fragment()?;
    let id = ctx.generate_id(IdHint::Parameter { location, name })?;
    let value = node
        .and_then(|n| n.get("value"))
        .and_then(Value::as_str)
        .or(fallback)
        .map(|v| Value::String(vars.substitute(v).into_owned()));
    let examples = match &value {
        Some(value) => example_list(ctx, value)?,
        None => Vec::new(),
    };
    Ok(HttpParam {
        id,
        name: name.to_string(),
        style: location.default_style().to_string(),
        required: location == ParamLocation::Path,
        description: node.and_then(description_of),
        schema: Some(translate_inline(ctx, &string_schema())?),
        examples,
        ..Default::default()
    })
}

fn string_schema() -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("string".to_string()));
    Value::Object(schema)
}

/// A one-element `default` example named below the cursor.
fn example_list(ctx: &mut TransformContext<'_>, value: &Value) -> EngineResult<Vec<Example>> {
    Ok(vec![ctx.scoped(["value"], |ctx| single_example(ctx, "default", value))?])
}

/// Cursor on `request.body`.
fn request_body(
    ctx: &mut TransformContext<'_>,
    body: &Value,
    content_type: Option<&str>,
    vars: &Variables,
) -> EngineResult<Option<HttpRequestBody>> {
    let Some(mode) = body.get("mode").and_then(Value::as_str) else {
        return Ok(None);
    };
    let (media_type, schema, example) = match mode {
        "raw" => {
            let raw = body.get("raw").and_then(Value::as_str).unwrap_or_default();
            let raw = vars.substitute(raw);
            if raw.trim().is_empty() {
                return Ok(None);
            }
            let language = body.pointer("/options/raw/language").and_then(Value::as_str);
            let media_type = content_type
                .map(str::to_owned)
                .unwrap_or_else(|| language_media_type(language).to_string());
            let example = parse_payload(&raw);
            (media_type, infer_schema(&example), Some(example))
        }
        "urlencoded" | "formdata" => {
            let fallback = if mode == "urlencoded" { URLENCODED } else { MULTIPART };
            let (schema, example) = form_fields(body.get(mode), vars);
            (
                content_type.unwrap_or(fallback).to_string(),
                schema,
                Some(example),
            )
        }
        "graphql" => {
            let example = body.get("graphql").cloned().unwrap_or(Value::Null);
            ("application/json".to_string(), infer_schema(&example), Some(example))
        }
        other => {
            tracing::debug!(mode = other, "unsupported body mode");
            return Ok(None);
        }
    };

    let id = ctx.generate_id(IdHint::RequestBody)?;
    let content = ctx.scoped([mode], |ctx| media(ctx, &media_type, &schema, example.as_ref()))?;
    Ok(Some(HttpRequestBody {
        id,
        required: true,
        description: None,
        contents: vec![content],
    }))
}

/// One content entry named at the cursor, its example one level below.
fn media(
    ctx: &mut TransformContext<'_>,
    media_type: &str,
    schema: &Value,
    example: Option<&Value>,
) -> EngineResult<MediaContent> {
    let id = ctx.generate_id(IdHint::Media { media_type })?;
    let schema = translate_inline(ctx, schema)?;
    let examples = match example {
        Some(value) => example_list(ctx, value)?,
        None => Vec::new(),
    };
    Ok(MediaContent {
        id,
        media_type: media_type.to_string(),
        schema: Some(schema),
        examples,
        encodings: Vec::new(),
    })
}

/// `urlencoded` / `formdata` entries as an object schema plus an example object.
fn form_fields(entries: Option<&Value>, vars: &Variables) -> (Value, Value) {
    let mut properties = Map::new();
    let mut example = Map::new();
    for entry in entries.and_then(Value::as_array).into_iter().flatten() {
        if bool_field(entry, "disabled") {
            continue;
        }
        let Some(key) = string_field(entry, "key") else {
            continue;
        };
        let mut property = string_schema();
        let value = if entry.get("type").and_then(Value::as_str) == Some("file") {
            if let Value::Object(map) = &mut property {
                map.insert("format".to_string(), Value::String("binary".to_string()));
            }
            entry.get("src").cloned()
        } else {
            string_field(entry, "value").map(|v| Value::String(vars.substitute(&v).into_owned()))
        };
        if let Some(value) = value {
            example.insert(key.clone(), value);
        }
        properties.insert(key, property);
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    (Value::Object(schema), Value::Object(example))
}

fn language_media_type(language: Option<&str>) -> &'static str {
    match language {
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("html") => "text/html",
        Some("javascript") => "application/javascript",
        _ => "text/plain",
    }
}

/// JSON when it parses as JSON, the text itself otherwise.
fn parse_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// A structural schema describing `value`.
fn infer_schema(value: &Value) -> Value {
    let mut schema = Map::new();
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(items) => {
            if let Some(first) = items.first() {
                schema.insert("items".to_string(), infer_schema(first));
            }
            "array"
        }
        Value::Object(map) => {
            let properties = map
                .iter()
                .map(|(k, v)| (k.clone(), infer_schema(v)))
                .collect();
            schema.insert("properties".to_string(), Value::Object(properties));
            "object"
        }
    };
    schema.insert("type".to_string(), Value::String(kind.to_string()));
    Value::Object(schema)
}

/// Saved responses; several for one status code merge into one response.
fn responses(
    ctx: &mut TransformContext<'_>,
    item: &Value,
    vars: &Variables,
) -> EngineResult<Vec<HttpResponse>> {
    let mut out = Vec::new();
    let saved = item.get("response").and_then(Value::as_array);
    for (index, node) in saved.into_iter().flatten().enumerate() {
        let response = ctx.scoped(
            [PathSegment::from("response"), PathSegment::Index(index)],
            |ctx| saved_response(ctx, node, vars),
        )?;
        out = merge_responses(&out, &[response]);
    }
    Ok(out)
}

fn saved_response(
    ctx: &mut TransformContext<'_>,
    node: &Value,
    vars: &Variables,
) -> EngineResult<HttpResponse> {
    let code = match node.get("code") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "default".to_string(),
    };
    let id = ctx.generate_id(IdHint::Response { code: &code })?;

    let mut headers = Vec::new();
    let mut content_type = None;
    for (index, header) in header_list(node).into_iter().enumerate() {
        let Some(header) = header else { continue };
        let Some(key) = string_field(header, "key") else {
            continue;
        };
        if key.eq_ignore_ascii_case("content-type") {
            content_type = string_field(header, "value");
            continue;
        }
        headers.push(ctx.scoped(
            [PathSegment::from("header"), PathSegment::Index(index)],
            |ctx| param(ctx, ParamLocation::Header, &key, None, vars),
        )?);
    }

    let mut contents = Vec::new();
    if let Some(body) = node.get("body").and_then(Value::as_str).filter(|b| !b.trim().is_empty()) {
        let media_type = content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_string())
            .unwrap_or_else(|| {
                let preview = node.get("_postman_previewlanguage").and_then(Value::as_str);
                language_media_type(preview).to_string()
            });
        let example = parse_payload(body);
        contents.push(ctx.scoped(["body"], |ctx| {
            media(ctx, &media_type, &infer_schema(&example), Some(&example))
        })?);
    }

    Ok(HttpResponse {
        id,
        code,
        description: string_field(node, "name").or_else(|| string_field(node, "status")),
        headers,
        contents,
    })
}

/// The request's `auth`, else the collection's; `noauth` clears it.
fn security(
    ctx: &mut TransformContext<'_>,
    request: &Value,
) -> EngineResult<Vec<Vec<HttpSecurityScheme>>> {
    let scheme = if request.get("auth").is_some() {
        ctx.scoped(["request", "auth"], auth_scheme)?
    } else {
        ctx.scoped_at(vec![PathSegment::from("auth")], auth_scheme)?
    };
    Ok(scheme.map(|s| vec![vec![s]]).unwrap_or_default())
}

/// Maps the `auth` object under the cursor.
fn auth_scheme(ctx: &mut TransformContext<'_>) -> EngineResult<Option<HttpSecurityScheme>> {
    let Some(node) = ctx.fragment()? else {
        return Ok(None);
    };
    let Some(kind) = string_field(node, "type") else {
        return Ok(None);
    };
    // Postman auth parameters are `[{ key, value }]` lists under the type's name.
    let setting = |key: &str| -> Option<String> {
        node.get(kind.as_str())
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|entry| string_field(entry, "key").as_deref() == Some(key))
            .and_then(|entry| string_field(entry, "value"))
    };

    let mut scheme = HttpSecurityScheme {
        key: kind.clone(),
        ..Default::default()
    };
    match kind.as_str() {
        "noauth" => return Ok(None),
        "basic" | "bearer" | "digest" => {
            scheme.kind = "http".to_string();
            scheme.scheme = Some(kind.clone());
        }
        "apikey" => {
            scheme.kind = "apiKey".to_string();
            scheme.name = setting("key");
            scheme.location = Some(setting("in").unwrap_or_else(|| "header".to_string()));
        }
        "oauth2" => {
            scheme.kind = "oauth2".to_string();
            let mut flow = Map::new();
            for (from, to) in [("authUrl", "authorizationUrl"), ("accessTokenUrl", "tokenUrl")] {
                if let Some(url) = setting(from) {
                    flow.insert(to.to_string(), Value::String(url));
                }
            }
            flow.insert("scopes".to_string(), Value::Object(Map::new()));
            let mut flows = Map::new();
            flows.insert("authorizationCode".to_string(), Value::Object(flow));
            scheme.flows = Some(Value::Object(flows));
        }
        other => {
            tracing::debug!(auth = other, "unsupported auth type");
            return Ok(None);
        }
    }
    scheme.id = ctx.generate_id(IdHint::SecurityScheme { key: &kind })?;
    Ok(Some(scheme))
}
