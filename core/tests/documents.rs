use apigraph_core::{
    bundle_operations, load_document, transform_operation, transform_operations,
    transform_operations_report, transform_service, Dialect, EngineError, TransformOptions,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const PETSTORE_V2: &str = r##"
swagger: "2.0"
info:
  title: Petstore
  version: "1.0.0"
host: petstore.example.com
basePath: /v2
schemes: [https]
consumes: [application/json]
produces: [application/json]
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pets]
      parameters:
        - name: limit
          in: query
          type: integer
          format: int32
          maximum: 100
      responses:
        "200":
          description: A list of pets
          schema:
            type: array
            items:
              $ref: "#/definitions/Pet"
    post:
      operationId: createPet
      parameters:
        - name: pet
          in: body
          required: true
          schema:
            $ref: "#/definitions/Pet"
      responses:
        "201":
          description: Created
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        type: string
    get:
      operationId: showPet
      responses:
        "200":
          description: A pet
          schema:
            $ref: "#/definitions/Pet"
        default:
          description: Error
          schema:
            $ref: "#/definitions/Error"
definitions:
  Pet:
    type: object
    required: [id, name]
    properties:
      id:
        type: integer
        format: int64
      name:
        type: string
      tag:
        type: string
        x-nullable: true
  Error:
    type: object
    properties:
      message:
        type: string
"##;

const PETSTORE_V3: &str = r##"
openapi: 3.1.0
info:
  title: Petstore
  version: "2.0.0"
servers:
  - url: https://petstore.example.com/v3
paths:
  /pets/{petId}:
    get:
      operationId: showPet
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            type: string
        - $ref: "#/components/parameters/Fields"
      responses:
        "200":
          description: A pet
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pet"
        "404":
          $ref: "#/components/responses/NotFound"
components:
  parameters:
    Fields:
      name: fields
      in: query
      style: form
      explode: false
      schema:
        type: array
        items:
          type: string
  responses:
    NotFound:
      description: Not found
  schemas:
    Pet:
      type: object
      properties:
        id:
          type: integer
          format: int64
        owner:
          $ref: "#/components/schemas/Owner"
    Owner:
      type: object
      properties:
        pets:
          type: array
          items:
            $ref: "#/components/schemas/Pet"
"##;

const COLLECTION: &str = r#"{
  "info": {
    "name": "Petstore collection",
    "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"
  },
  "variable": [{"key": "host", "value": "https://petstore.example.com"}],
  "item": [
    {
      "name": "Pets",
      "item": [
        {
          "name": "List pets",
          "request": {"method": "GET", "url": "{{host}}/pets?limit=10"}
        },
        {
          "name": "Show pet",
          "request": {"method": "GET", "url": "{{host}}/pets/:petId"}
        }
      ]
    }
  ]
}"#;

#[test]
fn test_openapi2_document() {
    init_tracing();
    let doc = load_document(PETSTORE_V2).unwrap();
    assert_eq!(Dialect::detect(&doc), Dialect::OpenApi2);
    let ops = transform_operations(&doc, &TransformOptions::default()).unwrap();
    let keys: Vec<(&str, &str)> = ops
        .iter()
        .map(|op| (op.method.as_str(), op.path.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![("get", "/pets"), ("post", "/pets"), ("get", "/pets/{petId}")]
    );

    let list = &ops[0];
    assert_eq!(list.iid.as_deref(), Some("listPets"));
    assert_eq!(list.servers[0].url, "https://petstore.example.com/v2");
    let limit = list.request.query[0].schema.as_ref().unwrap();
    assert_eq!(limit["maximum"], json!(100));
    assert_eq!(limit["minimum"], json!(-2147483648_i64));

    let create = &ops[1];
    let body = create.request.body.as_ref().unwrap();
    assert!(body.required);
    assert_eq!(body.contents[0].media_type, "application/json");

    let show = &ops[2];
    assert_eq!(show.request.path[0].name, "petId");
    let codes: Vec<&str> = show.responses.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["200", "default"]);
}

#[test]
fn test_openapi2_service() {
    let doc = load_document(PETSTORE_V2).unwrap();
    let service = transform_service(&doc, &TransformOptions::default()).unwrap();
    assert_eq!(service.name, "Petstore");
    assert_eq!(service.version, "1.0.0");
    assert_eq!(service.servers[0].url, "https://petstore.example.com/v2");
}

#[test]
fn test_openapi3_document() {
    let doc = load_document(PETSTORE_V3).unwrap();
    assert_eq!(Dialect::detect(&doc), Dialect::OpenApi31);
    let op = transform_operation(&doc, "/pets/{petId}", "get", &TransformOptions::default())
        .unwrap();
    assert_eq!(op.servers[0].url, "https://petstore.example.com/v3");
    assert_eq!(op.request.query[0].name, "fields");
    assert_eq!(op.request.query[0].explode, Some(false));
    assert_eq!(op.responses[1].description.as_deref(), Some("Not found"));
    assert_eq!(
        op.responses[0].contents[0].schema,
        Some(json!({"$ref": "#/components/schemas/Pet"}))
    );
}

#[test]
fn test_bundled_operations_with_cycles() {
    let doc = load_document(PETSTORE_V3).unwrap();
    let bundled = bundle_operations(&doc, &TransformOptions::default()).unwrap();
    assert!(bundled.errors.is_empty());
    let pool = bundled.components.to_value();
    let schemas = pool["schemas"].as_array().unwrap();
    assert_eq!(schemas.len(), 2);
    assert_eq!(
        bundled.operations[0].responses[0].contents[0].schema,
        Some(json!({"$ref": "#/components/schemas/0"}))
    );
    assert_eq!(
        schemas[1]["properties"]["pets"]["items"],
        json!({"$ref": "#/components/schemas/0"})
    );
}

#[test]
fn test_postman_collection() {
    let doc = load_document(COLLECTION).unwrap();
    assert_eq!(Dialect::detect(&doc), Dialect::Postman);
    let ops = transform_operations(&doc, &TransformOptions::default()).unwrap();
    let paths: Vec<&str> = ops.iter().map(|op| op.path.as_str()).collect();
    assert_eq!(paths, vec!["/pets", "/pets/{petId}"]);
    assert_eq!(ops[0].request.query[0].name, "limit");
    assert_eq!(ops[0].request.query[0].examples[0].value, Some(json!("10")));
    assert_eq!(ops[1].request.path[0].name, "petId");
    assert_eq!(ops[1].servers[0].url, "https://petstore.example.com");

    let op = transform_operation(&doc, "/pets/{petId}", "get", &TransformOptions::default())
        .unwrap();
    assert_eq!(op.id, ops[1].id);
}

#[test]
fn test_best_effort_report() {
    init_tracing();
    let doc = json!({
        "openapi": "3.0.0",
        "info": {"title": "svc"},
        "paths": {
            "/good": {"get": {}},
            "/external": {"get": {"parameters": [{"$ref": "other.yaml#/Param"}]}},
            "/bad-type": {"get": {"responses": {"200": {"$ref": 42}}}}
        }
    });
    let report = transform_operations_report(&doc, &TransformOptions::default()).unwrap();
    assert_eq!(report.operations.len(), 1);
    assert_eq!(report.operations[0].path, "/good");
    let failed: Vec<&str> = report.failures.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(failed, vec!["/external", "/bad-type"]);
    assert!(matches!(report.failures[0].error, EngineError::Reference(_)));
    assert!(matches!(report.failures[1].error, EngineError::Type(_)));

    let strict = TransformOptions::from_yaml_str("bestEffort: false").unwrap();
    assert!(transform_operations(&doc, &strict).is_err());
}
