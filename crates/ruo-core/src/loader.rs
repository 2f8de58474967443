//! API definition document loading.
//!
//! Reads an OpenAPI-style document (JSON or YAML) into an [`ApiDefinition`].
//! Local `$ref`s are inlined before anything else is read, so the rest of the
//! pipeline never sees a reference.

use std::path::Path;

use http::Method;
use ruo_router::PathPattern;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::definition::{
    ApiDefinition, BodySpec, OperationBuilder, OperationDescriptor, ParameterLocation,
    ParameterSpec, SecurityRequirementSet,
};
use crate::error::DefinitionError;

const METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Keys a Swagger 2.0 non-body parameter carries its schema in.
const INLINE_SCHEMA_KEYS: [&str; 11] = [
    "type",
    "format",
    "items",
    "enum",
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
];

/// Loads API definition documents.
///
/// # Example
///
/// ```
/// use ruo_core::DefinitionLoader;
///
/// let definition = DefinitionLoader::from_yaml_str(r#"
/// openapi: 3.0.3
/// info: { title: users, version: 1.0.0 }
/// paths:
///   /users/{id}:
///     get:
///       operationId: getUser
///       parameters:
///         - { name: id, in: path, required: true, schema: { type: string } }
///       responses:
///         "200": { description: ok }
/// "#).unwrap();
///
/// assert_eq!(definition.version(), "1.0.0");
/// assert_eq!(definition.operations()[0].operation_id(), "getUser");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Loads a document from disk, choosing the parser by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<ApiDefinition, DefinitionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            other => Err(DefinitionError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Loads a JSON document.
    pub fn from_json_str(content: &str) -> Result<ApiDefinition, DefinitionError> {
        Self::from_value(serde_json::from_str(content)?)
    }

    /// Loads a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<ApiDefinition, DefinitionError> {
        Self::from_value(serde_yaml::from_str(content)?)
    }

    /// Builds a definition from an already-parsed document.
    pub fn from_value(document: Value) -> Result<ApiDefinition, DefinitionError> {
        if !document.is_object() {
            return Err(DefinitionError::invalid("", "document must be an object"));
        }

        let resolved = resolve_refs(&document, &document, "", &mut Vec::new())?;

        let version = resolved
            .pointer("/info/version")
            .and_then(scalar_text)
            .ok_or_else(|| DefinitionError::invalid("/info/version", "missing API version"))?;
        let title = resolved
            .pointer("/info/title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let default_security = match resolved.get("security") {
            Some(value) => parse_security(value, "/security")?,
            None => Vec::new(),
        };

        let security_schemes = resolved
            .pointer("/components/securitySchemes")
            .or_else(|| resolved.get("securityDefinitions"))
            .and_then(Value::as_object)
            .map(|schemes| schemes.keys().cloned().collect())
            .unwrap_or_default();

        let paths = resolved
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| DefinitionError::invalid("/paths", "missing 'paths' object"))?;

        let mut operations = Vec::new();
        for (template, item) in paths {
            let item_pointer = format!("/paths/{}", escape_pointer(template));
            let item = item.as_object().ok_or_else(|| {
                DefinitionError::invalid(&item_pointer, "path item must be an object")
            })?;
            let pattern = PathPattern::parse(template)?;

            let shared = match item.get("parameters") {
                Some(value) => parse_parameters(value, &format!("{item_pointer}/parameters"))?,
                None => Vec::new(),
            };

            for (name, operation) in item {
                if !METHODS.contains(&name.as_str()) {
                    continue;
                }
                let pointer = format!("{item_pointer}/{name}");
                let method = Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                    .map_err(|e| DefinitionError::invalid(&pointer, e.to_string()))?;
                let operation = parse_operation(
                    OperationContext {
                        method,
                        template,
                        pattern: &pattern,
                        pointer: &pointer,
                        shared: &shared,
                        default_security: &default_security,
                    },
                    operation,
                )?;
                debug!(
                    operation_id = operation.operation_id(),
                    method = %operation.method(),
                    path = operation.path(),
                    "Loaded operation"
                );
                operations.push(operation);
            }
        }

        Ok(ApiDefinition::new(
            title,
            version,
            operations,
            security_schemes,
            document,
        ))
    }
}

/// A parameter entry, which in Swagger 2.0 documents may be the body.
enum Declared {
    Parameter(ParameterSpec),
    Body(BodySpec),
}

struct OperationContext<'a> {
    method: Method,
    template: &'a str,
    pattern: &'a PathPattern,
    pointer: &'a str,
    shared: &'a [Declared],
    default_security: &'a [SecurityRequirementSet],
}

fn parse_operation(
    ctx: OperationContext<'_>,
    operation: &Value,
) -> Result<OperationDescriptor, DefinitionError> {
    let pointer = ctx.pointer;
    let operation = operation
        .as_object()
        .ok_or_else(|| DefinitionError::invalid(pointer, "operation must be an object"))?;

    let operation_id = match operation.get("operationId") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(_) => {
            return Err(DefinitionError::invalid(
                format!("{pointer}/operationId"),
                "operationId must be a non-empty string",
            ))
        }
        None => format!("{} {}", ctx.method, ctx.template),
    };

    let mut builder = OperationDescriptor::builder(operation_id)
        .method(ctx.method.clone())
        .path(ctx.template);

    if let Some(summary) = operation.get("summary").and_then(Value::as_str) {
        builder = builder.summary(summary);
    }
    for tag in operation
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        builder = builder.tag(tag);
    }

    let own = match operation.get("parameters") {
        Some(value) => parse_parameters(value, &format!("{pointer}/parameters"))?,
        None => Vec::new(),
    };

    let mut has_body = false;
    let mut declared_path_params = Vec::new();
    for declared in ctx.shared.iter().chain(own.iter()) {
        match declared {
            Declared::Parameter(spec) => {
                if spec.location == ParameterLocation::Path {
                    declared_path_params.push(spec.name.clone());
                }
                builder = builder.parameter(spec.clone());
            }
            Declared::Body(body) => {
                has_body = true;
                builder = builder.body(body.schema.clone(), body.required);
            }
        }
    }

    for name in &declared_path_params {
        if !ctx.pattern.param_names().any(|n| n == name) {
            return Err(DefinitionError::invalid(
                format!("{pointer}/parameters"),
                format!("path parameter '{name}' does not appear in '{}'", ctx.template),
            ));
        }
    }
    for name in ctx.pattern.param_names() {
        if !declared_path_params.iter().any(|n| n == name) {
            builder = builder.parameter(ParameterSpec::new(
                name,
                ParameterLocation::Path,
                json!({"type": "string"}),
            ));
        }
    }

    if let Some(request_body) = operation.get("requestBody") {
        if has_body {
            return Err(DefinitionError::invalid(
                format!("{pointer}/requestBody"),
                "operation declares both a body parameter and a requestBody",
            ));
        }
        let body = parse_request_body(request_body, &format!("{pointer}/requestBody"))?;
        builder = builder.body(body.schema, body.required);
    }

    if let Some(responses) = operation.get("responses") {
        builder = parse_responses(builder, responses, &format!("{pointer}/responses"))?;
    }

    let security = match operation.get("security") {
        Some(value) => parse_security(value, &format!("{pointer}/security"))?,
        None => ctx.default_security.to_vec(),
    };
    for set in security {
        builder = builder.security(set);
    }

    Ok(builder.build())
}

fn parse_parameters(value: &Value, pointer: &str) -> Result<Vec<Declared>, DefinitionError> {
    let items = value
        .as_array()
        .ok_or_else(|| DefinitionError::invalid(pointer, "parameters must be a list"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_parameter(item, &format!("{pointer}/{i}")))
        .collect()
}

fn parse_parameter(value: &Value, pointer: &str) -> Result<Declared, DefinitionError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| DefinitionError::invalid(pointer, "parameter is missing 'name'"))?;
    let location = value
        .get("in")
        .and_then(Value::as_str)
        .ok_or_else(|| DefinitionError::invalid(pointer, "parameter is missing 'in'"))?;
    let required = value
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let location = match location {
        "path" => ParameterLocation::Path,
        "query" => ParameterLocation::Query,
        "header" => ParameterLocation::Header,
        "body" => {
            let schema = value.get("schema").cloned().unwrap_or_else(|| json!({}));
            return Ok(Declared::Body(BodySpec { required, schema }));
        }
        other => {
            return Err(DefinitionError::invalid(
                pointer,
                format!("unsupported parameter location '{other}'"),
            ))
        }
    };

    let schema = match value.get("schema") {
        Some(schema) => schema.clone(),
        None => inline_schema(value),
    };

    let mut spec = ParameterSpec::new(name, location, schema);
    if required {
        spec = spec.required();
    }
    Ok(Declared::Parameter(spec))
}

fn inline_schema(parameter: &Value) -> Value {
    let mut schema = Map::new();
    for key in INLINE_SCHEMA_KEYS {
        if let Some(value) = parameter.get(key) {
            schema.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(schema)
}

fn parse_request_body(value: &Value, pointer: &str) -> Result<BodySpec, DefinitionError> {
    let body = value
        .as_object()
        .ok_or_else(|| DefinitionError::invalid(pointer, "requestBody must be an object"))?;
    let required = body
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let schema = body
        .get("content")
        .and_then(json_media_schema)
        .unwrap_or_else(|| json!({}));
    Ok(BodySpec { required, schema })
}

fn parse_responses(
    mut builder: OperationBuilder,
    value: &Value,
    pointer: &str,
) -> Result<OperationBuilder, DefinitionError> {
    let responses = value
        .as_object()
        .ok_or_else(|| DefinitionError::invalid(pointer, "responses must be an object"))?;

    for (status, response) in responses {
        let schema = response
            .get("content")
            .and_then(json_media_schema)
            .or_else(|| response.get("schema").cloned());
        builder = match schema {
            Some(schema) => builder.response(status.clone(), schema),
            None => builder.empty_response(status.clone()),
        };
    }
    Ok(builder)
}

/// Picks the schema of `application/json`, or else of the first `*json` media type.
fn json_media_schema(content: &Value) -> Option<Value> {
    let content = content.as_object()?;
    content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(media, _)| media.ends_with("json"))
                .map(|(_, v)| v)
        })
        .and_then(|media| media.get("schema"))
        .cloned()
}

fn parse_security(
    value: &Value,
    pointer: &str,
) -> Result<Vec<SecurityRequirementSet>, DefinitionError> {
    let sets = value
        .as_array()
        .ok_or_else(|| DefinitionError::invalid(pointer, "security must be a list"))?;

    let mut parsed = Vec::with_capacity(sets.len());
    for (i, set) in sets.iter().enumerate() {
        let set_pointer = format!("{pointer}/{i}");
        let schemes = set.as_object().ok_or_else(|| {
            DefinitionError::invalid(&set_pointer, "requirement set must be an object")
        })?;

        let mut requirement = SecurityRequirementSet::new();
        for (scheme, scopes) in schemes {
            let scopes = scopes
                .as_array()
                .ok_or_else(|| {
                    DefinitionError::invalid(
                        format!("{set_pointer}/{}", escape_pointer(scheme)),
                        "scopes must be a list",
                    )
                })?
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>();
            requirement = requirement.scheme_with_scopes(scheme.clone(), scopes);
        }
        parsed.push(requirement);
    }
    Ok(parsed)
}

/// Returns a copy of `node` with every local `$ref` replaced by its target.
fn resolve_refs(
    node: &Value,
    root: &Value,
    pointer: &str,
    stack: &mut Vec<String>,
) -> Result<Value, DefinitionError> {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                let unresolved = || DefinitionError::UnresolvedRef {
                    reference: reference.clone(),
                    pointer: pointer.to_string(),
                };
                let target_pointer = reference.strip_prefix('#').ok_or_else(unresolved)?;
                if stack.iter().any(|seen| seen == reference) {
                    return Err(DefinitionError::RecursiveRef {
                        reference: reference.clone(),
                        pointer: pointer.to_string(),
                    });
                }
                let target = root.pointer(target_pointer).ok_or_else(unresolved)?;

                stack.push(reference.clone());
                let resolved = resolve_refs(target, root, target_pointer, stack);
                stack.pop();
                return resolved;
            }

            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let child = format!("{pointer}/{}", escape_pointer(key));
                out.insert(key.clone(), resolve_refs(value, root, &child, stack)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| resolve_refs(item, root, &format!("{pointer}/{i}"), stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// YAML happily turns `version: 1.0` into a number.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
