//! Structural redaction of captured records.
//!
//! Two passes, both pure:
//!
//! - **Keyed masking** for headers, query params, and request attributes:
//!   flat key-value maps where a configured set of names (matched
//!   case-insensitively) forces the sentinel.
//! - **Schema-guided body masking**: a depth-first walk over the decoded
//!   JSON tree. Record-shaped nodes are driven by their [`RecordSchema`];
//!   `#[redact]`-marked fields become the sentinel, nested record fields
//!   recurse with their own schema, and everything outside the
//!   [`ScopeBoundary`] is an opaque leaf.
//!
//! The walk never mutates its input's siblings: keys, order, and length are
//! preserved, and applying it twice yields the same tree as once.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::SensitiveFields;
use crate::record::HttpLogRecord;
use crate::schema::{RecordSchema, SchemaRegistry, ScopeBoundary};

/// Replacement for every masked value.
pub const REDACTED: &str = "[REDACTED]";

/// The redaction engine: sensitive-name sets normalized once at startup,
/// plus the schema registry and scope boundary for body traversal.
#[derive(Debug)]
pub struct Redactor {
    headers: HashSet<String>,
    query_params: HashSet<String>,
    request_attributes: HashSet<String>,
    boundary: ScopeBoundary,
    registry: Arc<SchemaRegistry>,
}

fn normalize(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| name.to_lowercase()).collect()
}

impl Redactor {
    pub fn new(
        sensitive: &SensitiveFields,
        boundary: ScopeBoundary,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            headers: normalize(&sensitive.headers),
            query_params: normalize(&sensitive.query_params),
            request_attributes: normalize(&sensitive.request_attributes),
            boundary,
            registry,
        }
    }

    /// Resolves a declared type path to a schema, boundary-gated.
    pub(crate) fn schema_for(&self, type_path: &str) -> Option<&'static RecordSchema> {
        self.registry
            .resolve(type_path)
            .filter(|schema| self.boundary.contains(schema.type_path))
    }

    /// Produces a sanitized copy of a record; the input is consumed, never
    /// aliased. `body_schema` is the schema of the body's declared type, if
    /// one resolved.
    pub fn redact_record(
        &self,
        record: HttpLogRecord,
        body_schema: Option<&RecordSchema>,
    ) -> HttpLogRecord {
        let HttpLogRecord {
            http_method,
            uri,
            remote_host,
            headers,
            request_params,
            request_attributes,
            body,
        } = record;
        HttpLogRecord {
            http_method,
            uri,
            remote_host,
            headers: headers.map(|headers| redact_keyed(&headers, &self.headers)),
            request_params: request_params.map(|params| redact_keyed(&params, &self.query_params)),
            request_attributes: request_attributes
                .map(|attributes| redact_keyed(&attributes, &self.request_attributes)),
            body: body.map(|body| self.redact_value(body, body_schema)),
        }
    }

    /// Depth-first masking of a decoded JSON tree.
    pub fn redact_value(&self, value: Value, schema: Option<&RecordSchema>) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.redact_value(item, schema))
                    .collect(),
            ),
            Value::Object(map) => match schema {
                Some(schema) => self.redact_record_fields(map, schema),
                None => Value::Object(
                    map.into_iter()
                        .map(|(key, value)| (key, self.redact_value(value, None)))
                        .collect(),
                ),
            },
            leaf => leaf,
        }
    }

    fn redact_record_fields(
        &self,
        map: serde_json::Map<String, Value>,
        schema: &RecordSchema,
    ) -> Value {
        let mut out = serde_json::Map::new();
        for (key, value) in map {
            // Null fields read as absent.
            if value.is_null() {
                continue;
            }
            match schema.field(&key) {
                Some(field) if field.redact => {
                    out.insert(key, Value::from(REDACTED));
                }
                Some(field) => {
                    let nested = self.schema_for(field.type_path);
                    out.insert(key, self.redact_value(value, nested));
                }
                // Keys the schema doesn't know (flattened extras, additional
                // properties) get the generic walk.
                None => {
                    out.insert(key, self.redact_value(value, None));
                }
            }
        }
        Value::Object(out)
    }
}

/// Masks the values of every entry whose lower-cased key is in `sensitive`.
///
/// Returns a new map; the caller's map is untouched. O(n) with an O(1) set
/// lookup per key.
pub fn redact_keyed<V>(map: &IndexMap<String, V>, sensitive: &HashSet<String>) -> IndexMap<String, V>
where
    V: Clone + From<&'static str>,
{
    map.iter()
        .map(|(key, value)| {
            if sensitive.contains(&key.to_lowercase()) {
                (key.clone(), V::from(REDACTED))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Loggable;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize, Loggable)]
    #[serde(rename_all = "camelCase")]
    struct Employee {
        id: u32,
        first_name: String,
        #[redact]
        ssn: String,
        employee_type: Option<String>,
        address: Option<Address>,
        previous_addresses: Vec<Address>,
    }

    #[derive(Serialize, Loggable)]
    #[serde(rename_all = "camelCase")]
    struct Address {
        state: String,
        city: String,
        #[redact]
        phone_number: String,
    }

    fn redactor() -> Redactor {
        redactor_with_boundary("")
    }

    fn redactor_with_boundary(prefix: &str) -> Redactor {
        let registry = SchemaRegistry::new()
            .register::<Employee>()
            .register::<Address>();
        Redactor::new(
            &SensitiveFields::default(),
            ScopeBoundary::new(prefix),
            Arc::new(registry),
        )
    }

    fn employee_schema() -> &'static RecordSchema {
        Employee::schema()
    }

    #[test]
    fn keyed_masking_is_case_insensitive_and_pure() {
        let sensitive: HashSet<String> = ["authorization".to_string()].into();
        let mut map = IndexMap::new();
        map.insert("AUTHORIZATION".to_string(), "Bearer xyz".to_string());
        map.insert("accept".to_string(), "application/json".to_string());

        let masked = redact_keyed(&map, &sensitive);
        assert_eq!(masked["AUTHORIZATION"], REDACTED);
        assert_eq!(masked["accept"], "application/json");
        // Caller's map is untouched.
        assert_eq!(map["AUTHORIZATION"], "Bearer xyz");
        // Key order preserved.
        assert_eq!(
            masked.keys().collect::<Vec<_>>(),
            ["AUTHORIZATION", "accept"]
        );
    }

    #[test]
    fn marked_fields_masked_at_any_depth() {
        let body = json!({
            "id": 7,
            "firstName": "John",
            "ssn": "123-45-6789",
            "address": { "state": "VA", "city": "Richmond", "phoneNumber": "555-1234" },
            "previousAddresses": [
                { "state": "NC", "city": "Durham", "phoneNumber": "555-9999" }
            ]
        });

        let masked = redactor().redact_value(body, Some(employee_schema()));
        assert_eq!(masked["firstName"], "John");
        assert_eq!(masked["ssn"], REDACTED);
        assert_eq!(masked["address"]["city"], "Richmond");
        assert_eq!(masked["address"]["phoneNumber"], REDACTED);
        assert_eq!(masked["previousAddresses"][0]["phoneNumber"], REDACTED);
        assert_eq!(masked["previousAddresses"][0]["city"], "Durham");
    }

    #[test]
    fn masking_is_idempotent() {
        let body = json!({
            "firstName": "John",
            "ssn": "123-45-6789",
            "address": { "city": "Richmond", "phoneNumber": "555-1234" }
        });
        let redactor = redactor();
        let once = redactor.redact_value(body, Some(employee_schema()));
        let twice = redactor.redact_value(once.clone(), Some(employee_schema()));
        assert_eq!(once, twice);
    }

    #[test]
    fn null_fields_read_as_absent() {
        let body = json!({
            "firstName": "John",
            "ssn": null,
            "address": null
        });
        let masked = redactor().redact_value(body, Some(employee_schema()));
        let object = masked.as_object().unwrap();
        assert!(!object.contains_key("ssn"));
        assert!(!object.contains_key("address"));
        assert_eq!(object["firstName"], "John");
    }

    #[test]
    fn out_of_boundary_types_are_opaque() {
        // A boundary no schema path can match: nothing is deep-traversed, so
        // nested markers never apply.
        let redactor = redactor_with_boundary("some_other_crate::");
        let schema = redactor.schema_for(std::any::type_name::<Employee>());
        assert!(schema.is_none());

        let body = json!({ "ssn": "123-45-6789" });
        let untouched = redactor.redact_value(body.clone(), schema);
        assert_eq!(untouched, body);
    }

    #[test]
    fn plain_maps_and_scalars_pass_through() {
        let redactor = redactor();
        let body = json!({ "anything": { "nested": [1, 2, 3] }, "note": "hi" });
        assert_eq!(redactor.redact_value(body.clone(), None), body);
        assert_eq!(redactor.redact_value(json!(42), Some(employee_schema())), json!(42));
        assert_eq!(redactor.redact_value(Value::Null, None), Value::Null);
    }

    #[test]
    fn record_pass_turns_typed_record_into_masked_map() {
        let record = HttpLogRecord {
            http_method: Some("POST".into()),
            headers: Some(IndexMap::from([
                ("Authorization".to_string(), "Bearer xyz".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ])),
            request_params: Some(IndexMap::from([
                ("apiKey".to_string(), "secret".to_string()),
                ("name".to_string(), "joe".to_string()),
            ])),
            body: Some(json!({ "ssn": "123-45-6789", "firstName": "John" })),
            ..HttpLogRecord::default()
        };

        let masked = redactor().redact_record(record, Some(employee_schema()));
        assert_eq!(masked.http_method.as_deref(), Some("POST"));
        assert_eq!(masked.headers.as_ref().unwrap()["Authorization"], REDACTED);
        assert_eq!(
            masked.headers.as_ref().unwrap()["accept"],
            "application/json"
        );
        assert_eq!(masked.request_params.as_ref().unwrap()["apiKey"], REDACTED);
        assert_eq!(masked.request_params.as_ref().unwrap()["name"], "joe");
        assert_eq!(masked.body.as_ref().unwrap()["ssn"], REDACTED);
        assert_eq!(masked.body.as_ref().unwrap()["firstName"], "John");
    }
}
