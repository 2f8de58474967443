//! The schema capability: validate, coerce and prune.
//!
//! [`SchemaValidator`] is the seam the pipeline validates through. The
//! built-in [`JsonSchemaValidator`] compiles each schema once with the
//! `jsonschema` crate and reuses the compiled form on later requests.
//! OpenAPI 3.0 spellings (`nullable`, boolean `exclusiveMinimum` and
//! `exclusiveMaximum`, tuple `items`) are rewritten to their JSON Schema
//! equivalents before compiling.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::{json, Map, Number, Value};
use tracing::{debug, warn};

use crate::error::Violation;
use crate::BoxFuture;

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The value conforms; carries the (possibly coerced) value.
    Valid(Value),
    /// The value does not conform; carries every violation found.
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    /// Returns true for [`ValidationOutcome::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<Value, Vec<Violation>> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(violations) => Err(violations),
        }
    }
}

/// Validates a value against a schema.
///
/// Implementations may suspend, for example to fetch a remote schema.
/// `location` is the pointer prefix violations are reported under.
pub trait SchemaValidator: Send + Sync + 'static {
    /// Validates `value` against `schema`.
    fn validate<'a>(
        &'a self,
        value: Value,
        schema: &'a Value,
        location: &'a str,
    ) -> BoxFuture<'a, ValidationOutcome>;
}

/// The built-in validator, backed by `jsonschema`.
///
/// Compiled schemas are cached by the address of the schema value, which
/// lives as long as the operation catalog. A cached entry is only reused
/// while the schema at that address is still the one it was compiled from.
///
/// # Example
///
/// ```
/// use ruo_core::{JsonSchemaValidator, SchemaValidator};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let validator = JsonSchemaValidator::new();
/// let schema = json!({"type": "object", "required": ["name"]});
/// let outcome = validator.validate(json!({}), &schema, "/body").await;
/// assert!(!outcome.is_valid());
/// # });
/// ```
#[derive(Default)]
pub struct JsonSchemaValidator {
    cache: RwLock<HashMap<usize, CacheEntry>>,
}

struct CacheEntry {
    schema: Value,
    compiled: Compiled,
}

#[derive(Clone)]
enum Compiled {
    Ready(Arc<Validator>),
    Broken(Arc<str>),
}

impl JsonSchemaValidator {
    /// Creates a validator with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `value` against `schema`, returning every violation.
    ///
    /// A schema that does not compile yields a single violation at
    /// `location` on every call.
    #[must_use]
    pub fn check(&self, value: &Value, schema: &Value, location: &str) -> Vec<Violation> {
        match self.compiled(schema) {
            Compiled::Ready(validator) => collect_violations(&validator, value, location),
            Compiled::Broken(reason) => {
                vec![Violation::new(location, format!("schema is invalid: {reason}"))]
            }
        }
    }

    /// Returns how many compiled schemas are cached.
    #[must_use]
    pub fn cached_schemas(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn compiled(&self, schema: &Value) -> Compiled {
        let key = schema as *const Value as usize;
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = cache.get(&key) {
                if entry.schema == *schema {
                    return entry.compiled.clone();
                }
            }
        }

        let compiled = compile(schema);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key,
                CacheEntry {
                    schema: schema.clone(),
                    compiled: compiled.clone(),
                },
            );
        compiled
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cached_schemas", &self.cached_schemas())
            .finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate<'a>(
        &'a self,
        value: Value,
        schema: &'a Value,
        location: &'a str,
    ) -> BoxFuture<'a, ValidationOutcome> {
        let violations = self.check(&value, schema, location);
        let outcome = if violations.is_empty() {
            ValidationOutcome::Valid(value)
        } else {
            ValidationOutcome::Invalid(violations)
        };
        Box::pin(std::future::ready(outcome))
    }
}

fn compile(schema: &Value) -> Compiled {
    let mut translated = match schema {
        Value::Object(_) | Value::Bool(_) => schema.clone(),
        _ => Value::Bool(true),
    };
    to_json_schema(&mut translated);

    match jsonschema::validator_for(&translated) {
        Ok(validator) => {
            debug!("Compiled schema validator");
            Compiled::Ready(Arc::new(validator))
        }
        Err(e) => {
            warn!(error = %e, "Schema does not compile; values checked against it are rejected");
            Compiled::Broken(Arc::from(e.to_string()))
        }
    }
}

fn collect_violations(validator: &Validator, value: &Value, location: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    for error in validator.iter_errors(value) {
        let at = format!("{location}{}", error.instance_path().as_str());
        match error.kind() {
            ValidationErrorKind::Required { property } => {
                let name = property
                    .as_str()
                    .map_or_else(|| property.to_string(), str::to_string);
                violations.push(Violation::new(child(&at, &name), "is required"));
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                for name in unexpected {
                    violations.push(Violation::new(child(&at, name), "is not an allowed property"));
                }
            }
            _ => violations.push(Violation::new(at, error.to_string())),
        }
    }
    violations
}

/// Keywords whose value is a schema or a list of schemas.
const SUBSCHEMA_KEYWORDS: &[&str] = &[
    "items",
    "prefixItems",
    "additionalProperties",
    "not",
    "contains",
    "propertyNames",
    "allOf",
    "anyOf",
    "oneOf",
    "if",
    "then",
    "else",
];

/// Keywords whose value maps names to schemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &["properties", "patternProperties", "$defs", "definitions"];

/// Rewrites OpenAPI 3.0 schema spellings into JSON Schema 2020-12.
fn to_json_schema(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };

    for keyword in SUBSCHEMA_KEYWORDS {
        match map.get_mut(*keyword) {
            Some(Value::Array(members)) => members.iter_mut().for_each(to_json_schema),
            Some(member) => to_json_schema(member),
            None => {}
        }
    }
    for keyword in SCHEMA_MAP_KEYWORDS {
        if let Some(Value::Object(children)) = map.get_mut(*keyword) {
            children.values_mut().for_each(to_json_schema);
        }
    }

    if matches!(map.get("items"), Some(Value::Array(_))) {
        if let Some(tuple) = map.remove("items") {
            map.insert("prefixItems".to_string(), tuple);
        }
    }

    for (exclusive, bound) in [("exclusiveMinimum", "minimum"), ("exclusiveMaximum", "maximum")] {
        if let Some(Value::Bool(flag)) = map.get(exclusive) {
            let flag = *flag;
            map.remove(exclusive);
            if flag {
                if let Some(limit) = map.remove(bound) {
                    map.insert(exclusive.to_string(), limit);
                }
            }
        }
    }

    if map.remove("nullable") != Some(Value::Bool(true)) {
        return;
    }
    if let Some(Value::Array(allowed)) = map.get_mut("enum") {
        if !allowed.contains(&Value::Null) {
            allowed.push(Value::Null);
        }
    }
    match map.get_mut("type") {
        Some(Value::String(name)) => {
            let name = std::mem::take(name);
            map.insert("type".to_string(), json!([name, "null"]));
        }
        Some(Value::Array(names)) => {
            if !names.contains(&json!("null")) {
                names.push(json!("null"));
            }
        }
        Some(_) => {}
        None => {
            let rest = std::mem::take(map);
            map.insert("anyOf".to_string(), json!([Value::Object(rest), {"type": "null"}]));
        }
    }
}

/// Converts a raw path, query or header string into the schema's type.
///
/// Values that cannot be converted stay strings so validation reports them
/// as a type mismatch instead of silently dropping them.
///
/// # Example
///
/// ```
/// use ruo_core::schema::coerce;
/// use serde_json::json;
///
/// assert_eq!(coerce("42", &json!({"type": "integer"})), json!(42));
/// assert_eq!(coerce("a,b", &json!({"type": "array"})), json!(["a", "b"]));
/// assert_eq!(coerce("x", &json!({"type": "integer"})), json!("x"));
/// ```
#[must_use]
pub fn coerce(raw: &str, schema: &Value) -> Value {
    let keep = || Value::String(raw.to_string());
    match primary_type(schema) {
        Some("integer") => raw.parse::<i64>().map_or_else(|_| keep(), Value::from),
        Some("number") => raw.parse::<i64>().map_or_else(
            |_| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or_else(keep, Value::Number)
            },
            Value::from,
        ),
        Some("boolean") => match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => keep(),
        },
        Some("array") => {
            if raw.is_empty() {
                return Value::Array(Vec::new());
            }
            let items = schema.get("items").unwrap_or(&Value::Null);
            Value::Array(raw.split(',').map(|part| coerce(part, items)).collect())
        }
        Some("object") => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_object)
            .unwrap_or_else(keep),
        _ => keep(),
    }
}

/// Coerces every occurrence of a repeated query key.
///
/// Repeated keys only make sense for array schemas; for anything else the
/// first occurrence wins.
#[must_use]
pub fn coerce_all(raws: &[&str], schema: &Value) -> Value {
    match raws {
        [] => Value::Null,
        [single] => coerce(single, schema),
        many if primary_type(schema) == Some("array") => {
            let items = schema.get("items").unwrap_or(&Value::Null);
            Value::Array(many.iter().map(|raw| coerce(raw, items)).collect())
        }
        [first, ..] => coerce(first, schema),
    }
}

/// Removes fields the schema does not declare and nulls it does not allow.
///
/// Only objects whose schema lists `properties` are pruned; free-form
/// objects are left alone. Undeclared fields survive when
/// `additionalProperties` is `true` or a schema. A `null` survives when its
/// property schema accepts null (`nullable: true`, a `"null"` type, or no
/// `type` at all). Pruning is idempotent.
///
/// # Example
///
/// ```
/// use ruo_core::schema::prune;
/// use serde_json::json;
///
/// let schema = json!({
///     "type": "object",
///     "properties": {"id": {"type": "string"}, "name": {"type": "string"}}
/// });
/// let mut body = json!({"id": "1", "name": "A", "extra": null});
/// prune(&mut body, &schema);
/// assert_eq!(body, json!({"id": "1", "name": "A"}));
/// ```
pub fn prune(value: &mut Value, schema: &Value) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    match value {
        Value::Object(map) => {
            let Some(properties) = declared_properties(schema) else {
                return;
            };
            let additional = schema.get("additionalProperties");
            let keep_undeclared = matches!(additional, Some(Value::Bool(true) | Value::Object(_)));

            map.retain(|key, field| match properties.get(key.as_str()) {
                Some(property) => !field.is_null() || accepts_null(property),
                None => keep_undeclared,
            });

            for (key, field) in map.iter_mut() {
                match properties.get(key.as_str()) {
                    Some(property) => prune(field, property),
                    None => {
                        if let Some(extra @ Value::Object(_)) = additional {
                            prune(field, extra);
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    prune(item, item_schema);
                }
            }
        }
        _ => {}
    }
}

/// Collects `properties` from the schema and its `allOf` members.
fn declared_properties(schema: &Map<String, Value>) -> Option<HashMap<&str, &Value>> {
    let own = schema.get("properties").and_then(Value::as_object);
    let inherited = schema
        .get("allOf")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|member| member.get("properties").and_then(Value::as_object));

    let mut found = false;
    let mut properties = HashMap::new();
    for map in own.into_iter().chain(inherited) {
        found = true;
        for (key, property) in map {
            properties.entry(key.as_str()).or_insert(property);
        }
    }
    found.then_some(properties)
}

/// Returns true if a `null` value is legitimate under `schema`.
#[must_use]
pub fn accepts_null(schema: &Value) -> bool {
    let Some(schema) = schema.as_object() else {
        return !matches!(schema, Value::Bool(false));
    };
    if schema.get("nullable") == Some(&Value::Bool(true)) {
        return true;
    }
    match schema.get("type") {
        None => true,
        Some(expected) => type_names(expected).contains(&"null"),
    }
}

fn type_names(expected: &Value) -> Vec<&str> {
    match expected {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn primary_type(schema: &Value) -> Option<&str> {
    schema
        .get("type")
        .map(type_names)
        .and_then(|names| names.into_iter().find(|name| *name != "null"))
}

fn child(location: &str, key: &str) -> String {
    format!("{location}/{}", key.replace('~', "~0").replace('/', "~1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn locations(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(|v| v.location.as_str()).collect()
    }

    fn check(value: &Value, schema: &Value, location: &str) -> Vec<Violation> {
        JsonSchemaValidator::new().check(value, schema, location)
    }

    #[test]
    fn test_type_mismatch() {
        let v = check(&json!("x"), &json!({"type": "integer"}), "/query/limit");
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location, "/query/limit");
    }

    #[test]
    fn test_violations_are_aggregated() {
        let schema = json!({
            "type": "object",
            "required": ["name", "email"],
            "properties": {"age": {"type": "integer", "minimum": 0}}
        });
        let v = check(&json!({"age": -1}), &schema, "/body");
        let mut found = locations(&v);
        found.sort_unstable();
        assert_eq!(found, vec!["/body/age", "/body/email", "/body/name"]);
    }

    #[test]
    fn test_nested_locations() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        });
        let v = check(&json!({"tags": ["a", 1]}), &schema, "/body");
        assert_eq!(locations(&v), vec!["/body/tags/1"]);
    }

    #[test]
    fn test_nullable() {
        let nullable = json!({"type": "string", "nullable": true});
        assert!(check(&Value::Null, &nullable, "").is_empty());
        assert!(check(&json!("a"), &nullable, "").is_empty());
        assert!(!check(&json!(1), &nullable, "").is_empty());
        assert!(check(&Value::Null, &json!({"type": ["string", "null"]}), "").is_empty());
        assert!(!check(&Value::Null, &json!({"type": "string"}), "").is_empty());
    }

    #[test]
    fn test_nullable_enum_and_untyped() {
        let choice = json!({"type": "string", "enum": ["a", "b"], "nullable": true});
        assert!(check(&Value::Null, &choice, "").is_empty());
        assert!(!check(&json!("c"), &choice, "").is_empty());

        let composed = json!({"allOf": [{"type": "object"}], "nullable": true});
        assert!(check(&Value::Null, &composed, "").is_empty());
        assert!(check(&json!({}), &composed, "").is_empty());
        assert!(!check(&json!(1), &composed, "").is_empty());
    }

    #[test]
    fn test_string_constraints() {
        let schema = json!({
            "type": "string",
            "minLength": 2,
            "maxLength": 3,
            "pattern": "^[a-z]+$"
        });
        assert!(check(&json!("ab"), &schema, "").is_empty());
        assert_eq!(check(&json!("a"), &schema, "").len(), 1);
        assert_eq!(check(&json!("ABCD"), &schema, "").len(), 2);
    }

    #[test]
    fn test_schema_that_does_not_compile_is_a_violation() {
        let v = check(&json!("a"), &json!({"type": 5}), "/x");
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location, "/x");
        assert!(v[0].message.starts_with("schema is invalid"));
    }

    #[test]
    fn test_number_bounds() {
        let schema = json!({"type": "number", "minimum": 1, "maximum": 10});
        assert!(check(&json!(1), &schema, "").is_empty());
        assert!(!check(&json!(0), &schema, "").is_empty());
        assert!(!check(&json!(11), &schema, "").is_empty());

        let exclusive = json!({"exclusiveMinimum": 0, "exclusiveMaximum": 1});
        assert!(!check(&json!(0), &exclusive, "").is_empty());
        assert!(check(&json!(0.5), &exclusive, "").is_empty());
    }

    #[test]
    fn test_boolean_exclusive_bounds() {
        let legacy = json!({
            "minimum": 0,
            "exclusiveMinimum": true,
            "maximum": 5,
            "exclusiveMaximum": false
        });
        assert!(!check(&json!(0), &legacy, "").is_empty());
        assert!(check(&json!(5), &legacy, "").is_empty());
        assert!(!check(&json!(6), &legacy, "").is_empty());
    }

    #[test]
    fn test_enum_and_const() {
        assert!(check(&json!("a"), &json!({"enum": ["a", "b"]}), "").is_empty());
        assert!(!check(&json!("c"), &json!({"enum": ["a", "b"]}), "").is_empty());
        assert!(!check(&json!(1), &json!({"const": 2}), "").is_empty());
    }

    #[test]
    fn test_array_constraints() {
        let schema = json!({"type": "array", "minItems": 1, "maxItems": 2, "uniqueItems": true});
        assert!(check(&json!([1]), &schema, "").is_empty());
        assert!(!check(&json!([]), &schema, "").is_empty());
        assert!(!check(&json!([1, 2, 3]), &schema, "").is_empty());
        assert!(!check(&json!([1, 1]), &schema, "").is_empty());
    }

    #[test]
    fn test_additional_properties() {
        let closed = json!({
            "type": "object",
            "properties": {"a": {}},
            "additionalProperties": false
        });
        let v = check(&json!({"a": 1, "b": 2}), &closed, "/body");
        assert_eq!(locations(&v), vec!["/body/b"]);

        let typed = json!({"type": "object", "additionalProperties": {"type": "string"}});
        assert!(!check(&json!({"b": 2}), &typed, "").is_empty());
    }

    #[test]
    fn test_combinators() {
        let any = json!({"anyOf": [{"type": "string"}, {"type": "integer"}]});
        assert!(check(&json!(1), &any, "").is_empty());
        assert!(!check(&json!(true), &any, "").is_empty());

        let one = json!({"oneOf": [{"type": "number"}, {"type": "integer"}]});
        assert!(!check(&json!(1), &one, "").is_empty());
        assert!(check(&json!(1.5), &one, "").is_empty());

        let all = json!({"allOf": [{"required": ["a"]}, {"required": ["b"]}]});
        assert_eq!(check(&json!({}), &all, "").len(), 2);
    }

    #[test]
    fn test_pointer_escaping() {
        let schema = json!({"required": ["a/b"]});
        let v = check(&json!({}), &schema, "/body");
        assert_eq!(v[0].location, "/body/a~1b");
    }

    #[test]
    fn test_schema_is_compiled_once() {
        let validator = JsonSchemaValidator::new();
        let schema = json!({"type": "string", "pattern": "^[a-z]+$"});

        for _ in 0..3 {
            assert!(validator.check(&json!("abc"), &schema, "").is_empty());
        }
        assert!(!validator.check(&json!("ABC"), &schema, "").is_empty());
        assert_eq!(validator.cached_schemas(), 1);

        let other = json!({"type": "integer"});
        assert!(validator.check(&json!(1), &other, "").is_empty());
        assert_eq!(validator.cached_schemas(), 2);
    }

    #[test]
    fn test_cache_entry_is_replaced_when_schema_changes() {
        let validator = JsonSchemaValidator::new();
        let mut schema = json!({"type": "integer"});
        assert!(validator.check(&json!(1), &schema, "").is_empty());

        schema = json!({"type": "string"});
        assert!(!validator.check(&json!(1), &schema, "").is_empty());
        assert!(validator.check(&json!("1"), &schema, "").is_empty());
    }

    #[test]
    fn test_coerce_scalars() {
        assert_eq!(coerce("7", &json!({"type": "integer"})), json!(7));
        assert_eq!(coerce("1.5", &json!({"type": "number"})), json!(1.5));
        assert_eq!(coerce("3", &json!({"type": "number"})), json!(3));
        assert_eq!(coerce("true", &json!({"type": "boolean"})), json!(true));
        assert_eq!(coerce("yes", &json!({"type": "boolean"})), json!("yes"));
        assert_eq!(coerce("7", &json!({"type": "string"})), json!("7"));
        assert_eq!(coerce("7", &json!({})), json!("7"));
    }

    #[test]
    fn test_coerce_nullable_type_list() {
        assert_eq!(coerce("7", &json!({"type": ["null", "integer"]})), json!(7));
    }

    #[test]
    fn test_coerce_arrays() {
        let ints = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(coerce("1,2", &ints), json!([1, 2]));
        assert_eq!(coerce("", &ints), json!([]));
        assert_eq!(coerce_all(&["1", "2"], &ints), json!([1, 2]));
        assert_eq!(coerce_all(&["1", "2"], &json!({"type": "integer"})), json!(1));
    }

    #[test]
    fn test_coerce_object() {
        assert_eq!(
            coerce(r#"{"a":1}"#, &json!({"type": "object"})),
            json!({"a": 1})
        );
        assert_eq!(coerce("[1]", &json!({"type": "object"})), json!("[1]"));
    }

    #[test]
    fn test_prune_scenario() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "string"}, "name": {"type": "string"}}
        });
        let mut body = json!({"id": "1", "name": "A", "extra": null});
        prune(&mut body, &schema);
        assert_eq!(body, json!({"id": "1", "name": "A"}));
    }

    #[test]
    fn test_prune_keeps_legitimate_nulls() {
        let schema = json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "nullable": true},
                "nick": {"type": ["string", "null"]},
                "meta": {},
                "name": {"type": "string"}
            }
        });
        let mut body = json!({"email": null, "nick": null, "meta": null, "name": null});
        prune(&mut body, &schema);
        assert_eq!(body, json!({"email": null, "nick": null, "meta": null}));
    }

    #[test]
    fn test_prune_nested_and_arrays() {
        let schema = json!({
            "type": "object",
            "properties": {
                "users": {
                    "type": "array",
                    "items": {"type": "object", "properties": {"id": {"type": "string"}}}
                }
            }
        });
        let mut body = json!({"users": [{"id": "1", "secret": "x"}, {"id": "2"}]});
        prune(&mut body, &schema);
        assert_eq!(body, json!({"users": [{"id": "1"}, {"id": "2"}]}));
    }

    #[test]
    fn test_prune_respects_additional_properties() {
        let open = json!({"type": "object", "properties": {"a": {}}, "additionalProperties": true});
        let mut body = json!({"a": 1, "b": 2});
        prune(&mut body, &open);
        assert_eq!(body, json!({"a": 1, "b": 2}));

        let free_form = json!({"type": "object"});
        let mut body = json!({"b": null});
        prune(&mut body, &free_form);
        assert_eq!(body, json!({"b": null}));
    }

    #[test]
    fn test_prune_all_of_properties() {
        let schema = json!({
            "allOf": [
                {"properties": {"a": {"type": "string"}}},
                {"properties": {"b": {"type": "string"}}}
            ]
        });
        let mut body = json!({"a": "1", "b": "2", "c": "3"});
        prune(&mut body, &schema);
        assert_eq!(body, json!({"a": "1", "b": "2"}));
    }

    #[tokio::test]
    async fn test_validator_returns_value_when_valid() {
        let schema = json!({"type": "integer"});
        let validator = JsonSchemaValidator::new();
        let outcome = validator.validate(json!(5), &schema, "/q").await;
        assert_eq!(outcome, ValidationOutcome::Valid(json!(5)));
        assert_eq!(
            validator
                .validate(json!("5"), &schema, "/q")
                .await
                .into_result()
                .unwrap_err()
                .len(),
            1
        );
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 32, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("(id|name|email|tags|owner|[a-z]{1,3})", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn nested_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "name": {"type": "string"},
                "email": {"type": "string", "nullable": true},
                "tags": {"type": "array", "items": {"type": "string"}},
                "owner": {
                    "type": "object",
                    "properties": {"id": {"type": "string"}, "name": {}}
                }
            }
        })
    }

    proptest! {
        #[test]
        fn prop_prune_is_idempotent(mut body in arb_json()) {
            let schema = nested_schema();
            prune(&mut body, &schema);
            let once = body.clone();
            prune(&mut body, &schema);
            prop_assert_eq!(once, body);
        }
    }
}
