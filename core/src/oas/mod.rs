#![deny(missing_docs)]

//! # OpenAPI Transforms
//!
//! Entry points turning a whole document into typed records.
//!
//! - **common**: accessors shared by both OpenAPI versions.
//! - **v2**: Swagger 2.0 operations.
//! - **v3**: OpenAPI 3.0 / 3.1 operations.
//!
//! Each operation is transformed with its own `TransformContext`, so one
//! operation's failure (a broken `$ref`, say) never leaks ids or cached schemas
//! into another.

pub mod common;
pub mod v2;
pub mod v3;

use crate::components::{ComponentExtractor, ComponentPool};
use crate::config::TransformOptions;
use crate::context::TransformContext;
use crate::error::{EngineError, EngineResult};
use crate::identity::IdentityStore;
use crate::model::{HttpOperation, HttpService, HTTP_METHODS};
use crate::postman;
use common::{
    declared_security_schemes, declared_tags, name_service, object_keys, security_requirements,
    service_name, string_field,
};
use indexmap::IndexMap;
use serde_json::Value;

/// The flavour of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `swagger: "2.0"`.
    OpenApi2,
    /// `openapi: 3.0.x`.
    OpenApi30,
    /// `openapi: 3.1.x`.
    OpenApi31,
    /// A Postman Collection (v2.x).
    Postman,
    /// Nothing recognisable.
    Unknown,
}

impl Dialect {
    /// Sniffs the dialect from the version markers of a parsed document.
    pub fn detect(document: &Value) -> Self {
        if let Some(version) = document.get("swagger").and_then(Value::as_str) {
            if version.starts_with('2') {
                return Dialect::OpenApi2;
            }
        }
        if let Some(version) = document.get("openapi").and_then(Value::as_str) {
            if version.starts_with("3.1") {
                return Dialect::OpenApi31;
            }
            if version.starts_with('3') {
                return Dialect::OpenApi30;
            }
        }
        if postman::is_collection(document) {
            return Dialect::Postman;
        }
        Dialect::Unknown
    }
}

/// Parses YAML or JSON source text into a document tree.
pub fn load_document(text: &str) -> EngineResult<Value> {
    let document: Value =
        serde_yaml::from_str(text).map_err(|e| EngineError::Parse(e.to_string()))?;
    if !document.is_object() {
        return Err(EngineError::Parse(
            "Document root must be a mapping".to_string(),
        ));
    }
    Ok(document)
}

/// One operation that could not be transformed.
#[derive(Debug)]
pub struct OperationFailure {
    /// Path template (or Postman request path).
    pub path: String,
    /// Lowercase method; `None` when the whole path item failed to resolve.
    pub method: Option<String>,
    /// Why it failed.
    pub error: EngineError,
}

/// Outcome of a best-effort batch transform.
#[derive(Debug, Default)]
pub struct TransformReport {
    /// Operations transformed successfully, in document order.
    pub operations: Vec<HttpOperation>,
    /// Operations that were skipped.
    pub failures: Vec<OperationFailure>,
}

impl TransformReport {
    /// Records a failure, or hands it back when the batch is not best-effort.
    pub(crate) fn fail(
        &mut self,
        options: &TransformOptions,
        path: &str,
        method: Option<&str>,
        error: EngineError,
    ) -> EngineResult<()> {
        if !options.best_effort {
            return Err(error);
        }
        tracing::warn!(path, method = ?method, error = %error, "dropping operation");
        self.failures.push(OperationFailure {
            path: path.to_string(),
            method: method.map(str::to_owned),
            error,
        });
        Ok(())
    }
}

/// Operations of a document together with the pool of shared components they use.
#[derive(Debug, Default)]
pub struct BundledOperations {
    /// Operations whose schema references point into `components`.
    pub operations: Vec<HttpOperation>,
    /// Hoisted shared components.
    pub components: ComponentPool,
    /// Failing `$ref` string -> error message.
    pub errors: IndexMap<String, String>,
}

/// Transforms `paths.<path>.<method>` of any supported dialect.
///
/// Fails with `MissingPath` / `MissingOperation` when the document lacks either.
pub fn transform_operation(
    document: &Value,
    path: &str,
    method: &str,
    options: &TransformOptions,
) -> EngineResult<HttpOperation> {
    options.validate()?;
    if Dialect::detect(document) == Dialect::Postman {
        return postman::transform_operation(document, path, method, options);
    }
    let mut ctx = TransformContext::new(document, options.clone());
    operation_in(&mut ctx, path, method)
}

/// Transforms one OpenAPI operation with a context positioned at the document root.
fn operation_in(
    ctx: &mut TransformContext<'_>,
    path: &str,
    method: &str,
) -> EngineResult<HttpOperation> {
    let method = method.to_lowercase();
    let dialect = Dialect::detect(ctx.document());
    let item = ctx.scoped(["paths", path], |ctx| ctx.fragment())?;
    let Some(item) = item else {
        return Err(EngineError::MissingPath {
            path: path.to_string(),
        });
    };
    if item.get(&method).is_none() {
        return Err(EngineError::MissingOperation {
            path: path.to_string(),
            method,
        });
    }

    name_service(ctx)?;
    tracing::debug!(path, method = %method, ?dialect, "transforming operation");
    match dialect {
        Dialect::OpenApi2 => v2::transform_operation(ctx, path, &method),
        _ => v3::transform_operation(ctx, path, &method),
    }
}

/// Transforms every operation of the document (paths x recognised methods).
///
/// With `best_effort` set, failing operations are logged and left out.
pub fn transform_operations(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<Vec<HttpOperation>> {
    Ok(transform_operations_report(document, options)?.operations)
}

/// Like `transform_operations`, also reporting what was skipped.
///
/// The whole batch shares one id memo table, so a fragment reached from several
/// operations is named once. Names given while an operation fails are discarded
/// with it.
pub fn transform_operations_report(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<TransformReport> {
    options.validate()?;
    if Dialect::detect(document) == Dialect::Postman {
        return postman::transform_operations_report(document, options);
    }

    let mut report = TransformReport::default();
    let mut ids = IdentityStore::default();
    for path in object_keys(document, "paths") {
        let mut ctx = TransformContext::new(document, options.clone());
        let item = match ctx.scoped(["paths", path.as_str()], |ctx| ctx.fragment()) {
            Ok(Some(item)) => item,
            Ok(None) => continue,
            Err(error) => {
                report.fail(options, &path, None, error)?;
                continue;
            }
        };
        for method in HTTP_METHODS {
            if item.get(method).is_none() {
                continue;
            }
            let mut ctx = TransformContext::with_ids(document, options.clone(), ids.clone());
            match operation_in(&mut ctx, &path, method) {
                Ok(operation) => {
                    ids = ctx.into_ids();
                    report.operations.push(operation);
                }
                Err(error) => report.fail(options, &path, Some(method), error)?,
            }
        }
    }
    tracing::debug!(
        operations = report.operations.len(),
        failures = report.failures.len(),
        "transformed document"
    );
    Ok(report)
}

/// Transforms the document-level description: name, version, servers,
/// security schemes and tags.
pub fn transform_service(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<HttpService> {
    options.validate()?;
    let dialect = Dialect::detect(document);
    if dialect == Dialect::Postman {
        return postman::transform_service(document, options);
    }

    let mut ctx = TransformContext::new(document, options.clone());
    let id = name_service(&mut ctx)?;
    let info = document.get("info").unwrap_or(&Value::Null);
    let section: &[&str] = match dialect {
        Dialect::OpenApi2 => &v2::SECURITY_SECTION,
        _ => &v3::SECURITY_SECTION,
    };
    let servers = match dialect {
        Dialect::OpenApi2 => v2::servers(&mut ctx, &[])?,
        _ => v3::server_list(&mut ctx)?,
    };
    let security_schemes = declared_security_schemes(&mut ctx, section)?;
    let security = match document.get("security") {
        Some(requirements) => security_requirements(&mut ctx, requirements, section)?,
        None => Vec::new(),
    };

    Ok(HttpService {
        id,
        name: service_name(document),
        version: string_field(info, "version").unwrap_or_default(),
        description: string_field(info, "description"),
        servers,
        security_schemes,
        security,
        tags: declared_tags(&mut ctx)?,
    })
}

/// Transforms every operation and hoists the shared components their schemas
/// reference into a pool; operation-local references are inlined.
pub fn bundle_operations(
    document: &Value,
    options: &TransformOptions,
) -> EngineResult<BundledOperations> {
    let mut operations = transform_operations(document, options)?;
    let mut extractor = ComponentExtractor::new(document);
    for operation in &mut operations {
        extractor.extract_operation(operation);
    }
    let (components, errors) = extractor.finish();
    tracing::debug!(
        components = components.len(),
        errors = errors.len(),
        "bundled operations"
    );
    Ok(BundledOperations {
        operations,
        components,
        errors,
    })
}
