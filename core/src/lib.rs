#![deny(missing_docs)]

//! # Apigraph Core
//!
//! Normalizes API descriptions (OpenAPI 2, OpenAPI 3.0 / 3.1, Postman
//! Collections) into one canonical, dereferenced graph of HTTP services and
//! operations.
//!
//! The engine underneath the per-dialect mapping:
//!
//! - **context**: the traversal cursor (`enter` / `exit`) with the resolved location.
//! - **resolver**: cycle-safe local `$ref` resolution.
//! - **identity**: stable, content-derived ids for every emitted node.
//! - **bundle** / **components**: self-contained subtrees and the shared component pool.
//! - **schema**: OpenAPI Schema Object -> JSON Schema Draft-07 conversion.
//! - **merge**: left-biased list merging for operations describing the same endpoint.

/// Shared error types.
pub mod error;

/// Transform options.
pub mod config;

/// JSON Pointer codec.
pub mod pointer;

/// Local `$ref` resolution.
pub mod resolver;

/// Traversal state.
pub mod context;

/// Stable identifiers.
pub mod identity;

/// Subtree bundling.
pub mod bundle;

/// Shared component extraction.
pub mod components;

/// Schema dialect conversion.
pub mod schema;

/// List merge combinators.
pub mod merge;

/// Output records.
pub mod model;

/// OpenAPI transforms.
pub mod oas;

/// Postman Collection transforms.
pub mod postman;

pub use bundle::{bundle, bundle_target, BundleResult};
pub use components::{ComponentExtractor, ComponentKind, ComponentPool};
pub use config::{HashingMode, TransformOptions};
pub use context::TransformContext;
pub use error::{EngineError, EngineResult};
pub use identity::{erase_path_parameters, IdHint, IdKind, IdentityStore};
pub use merge::{
    merge_contents, merge_headers, merge_lists, merge_operations, merge_responses, merge_servers,
};
pub use model::{
    Encoding, Example, HttpOperation, HttpParam, HttpRequest, HttpRequestBody, HttpResponse,
    HttpSecurityScheme, HttpServer, HttpService, MediaContent, ParamLocation, Tag, HTTP_METHODS,
};
pub use oas::{
    bundle_operations, load_document, transform_operation, transform_operations,
    transform_operations_report, transform_service, BundledOperations, Dialect, OperationFailure,
    TransformReport,
};
pub use pointer::{path_to_pointer, pointer_to_path, JsonPath, PathSegment};
pub use resolver::{resolve, resolve_if_ref, SeenRefs};
pub use schema::{convert, convert_root};
