#![deny(missing_docs)]

//! # HTTP Models
//!
//! Canonical records emitted by the transforms, whatever the source dialect.
//!
//! Schemas stay as `serde_json::Value` (JSON Schema Draft-07 after conversion);
//! everything around them is typed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP methods recognized when iterating a document's paths.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "post", "put", "delete", "options", "head", "patch", "trace",
];

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// URL path template variable.
    Path,
    /// Query string.
    Query,
    /// Request header.
    Header,
    /// Cookie.
    Cookie,
}

impl ParamLocation {
    /// Parses the OpenAPI `in` value. `body` / `formData` are not parameters here.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }

    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }

    /// Default serialization style for the location.
    pub fn default_style(&self) -> &'static str {
        match self {
            ParamLocation::Path | ParamLocation::Header => "simple",
            ParamLocation::Query | ParamLocation::Cookie => "form",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A whole API description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpService {
    /// Stable id.
    pub id: String,
    /// `info.title` (or the collection name).
    pub name: String,
    /// `info.version`.
    pub version: String,
    /// `info.description`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Document-level servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<HttpServer>,
    /// Declared security schemes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_schemes: Vec<HttpSecurityScheme>,
    /// Document-level security requirements (alternatives of scheme sets).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Vec<HttpSecurityScheme>>,
    /// Declared tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// A single (method, path) operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpOperation {
    /// Stable id.
    pub id: String,
    /// `operationId`, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iid: Option<String>,
    /// Lowercase HTTP method.
    pub method: String,
    /// Path template as written in the document.
    pub path: String,
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `deprecated: true`.
    #[serde(default)]
    pub deprecated: bool,
    /// `x-internal: true`.
    #[serde(default)]
    pub internal: bool,
    /// Tag names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Effective servers (most specific level wins).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<HttpServer>,
    /// Request description.
    #[serde(default)]
    pub request: HttpRequest,
    /// Responses in document order.
    #[serde(default)]
    pub responses: Vec<HttpResponse>,
    /// Effective security requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Vec<HttpSecurityScheme>>,
}

impl HttpOperation {
    /// Every schema slot in the operation, for post-processing passes.
    pub fn schemas_mut(&mut self) -> Vec<&mut Value> {
        let mut out = Vec::new();
        let HttpRequest {
            path,
            query,
            headers,
            cookie,
            body,
        } = &mut self.request;
        for param in path
            .iter_mut()
            .chain(query.iter_mut())
            .chain(headers.iter_mut())
            .chain(cookie.iter_mut())
        {
            out.extend(param.schema.as_mut());
        }
        if let Some(body) = body {
            for content in &mut body.contents {
                out.extend(content.schema.as_mut());
            }
        }
        for response in &mut self.responses {
            for header in &mut response.headers {
                out.extend(header.schema.as_mut());
            }
            for content in &mut response.contents {
                out.extend(content.schema.as_mut());
            }
        }
        out
    }
}

/// The request side of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// Path parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<HttpParam>,
    /// Query parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<HttpParam>,
    /// Header parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HttpParam>,
    /// Cookie parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookie: Vec<HttpParam>,
    /// Request body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<HttpRequestBody>,
}

impl HttpRequest {
    /// Appends a parameter to the list for its location.
    pub fn push(&mut self, location: ParamLocation, param: HttpParam) {
        match location {
            ParamLocation::Path => self.path.push(param),
            ParamLocation::Query => self.query.push(param),
            ParamLocation::Header => self.headers.push(param),
            ParamLocation::Cookie => self.cookie.push(param),
        }
    }
}

/// A parameter or header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpParam {
    /// Stable id.
    pub id: String,
    /// Parameter / header name.
    pub name: String,
    /// Serialization style (`simple`, `form`, ...).
    pub style: String,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Whether the parameter is deprecated.
    #[serde(default)]
    pub deprecated: bool,
    /// Explicit `explode` flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Converted value schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Examples.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}

/// A request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestBody {
    /// Stable id.
    pub id: String,
    /// Whether the body is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// One entry per media type.
    #[serde(default)]
    pub contents: Vec<MediaContent>,
}

/// A response for one status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// Stable id.
    pub id: String,
    /// Status code or range (`200`, `4XX`, `default`).
    pub code: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Response headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HttpParam>,
    /// One entry per media type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<MediaContent>,
}

/// A payload description for one media type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    /// Stable id.
    pub id: String,
    /// Media type (`application/json`, ...).
    pub media_type: String,
    /// Converted payload schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Examples.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    /// Per-property encodings (multipart / form bodies).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encodings: Vec<Encoding>,
}

/// Encoding of one property in a form or multipart body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    /// Stable id.
    pub id: String,
    /// Property name.
    pub property: String,
    /// Content type for the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Serialization style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Explode flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
}

/// A named example value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    /// Stable id.
    pub id: String,
    /// Example key (`default` for single `example` values).
    pub key: String,
    /// Summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inline value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// URL of an external value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_value: Option<String>,
}

/// A server base URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpServer {
    /// Stable id.
    pub id: String,
    /// URL (templated variables are left as written).
    pub url: String,
    /// Optional display name (`x-name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A security scheme, passed through with light normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSecurityScheme {
    /// Stable id.
    pub id: String,
    /// Key in the document's scheme map.
    pub key: String,
    /// Scheme type (`apiKey`, `http`, `oauth2`, `openIdConnect`, `basic`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Header / query / cookie name for `apiKey`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Location for `apiKey`.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// HTTP auth scheme (`bearer`, `basic`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Scopes requested by the requirement that referenced this scheme.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// OAuth flows, as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<Value>,
}

/// A tag declared at document level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Stable id.
    pub id: String,
    /// Tag name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_location_parse() {
        assert_eq!(ParamLocation::parse("path"), Some(ParamLocation::Path));
        assert_eq!(ParamLocation::parse("body"), None);
        assert_eq!(ParamLocation::Query.default_style(), "form");
        assert_eq!(ParamLocation::Header.default_style(), "simple");
    }

    #[test]
    fn test_schemas_mut_visits_every_slot() {
        let mut op = HttpOperation::default();
        op.request.push(
            ParamLocation::Query,
            HttpParam {
                schema: Some(json!({"type": "string"})),
                ..Default::default()
            },
        );
        op.request.body = Some(HttpRequestBody {
            contents: vec![MediaContent {
                schema: Some(json!({"type": "object"})),
                ..Default::default()
            }],
            ..Default::default()
        });
        op.responses.push(HttpResponse {
            code: "200".into(),
            headers: vec![HttpParam {
                schema: Some(json!({"type": "integer"})),
                ..Default::default()
            }],
            contents: vec![MediaContent::default()],
            ..Default::default()
        });
        assert_eq!(op.schemas_mut().len(), 3);
    }

    #[test]
    fn test_security_scheme_serializes_wire_names() {
        let scheme = HttpSecurityScheme {
            key: "api_key".into(),
            kind: "apiKey".into(),
            location: Some("header".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&scheme).unwrap();
        assert_eq!(v["type"], json!("apiKey"));
        assert_eq!(v["in"], json!("header"));
    }
}
