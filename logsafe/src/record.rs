//! The captured record and its assembly.
//!
//! One [`HttpLogRecord`] is built per captured request or response event,
//! sanitized by the redactor, serialized once at emission, and discarded.
//! Request records carry method/URI/host/headers/params (and optionally
//! attributes); response records carry headers and body only, the rest
//! belongs to the request side of the same transaction.

use std::fmt;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap};
use bytes::Bytes;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::config::LogSafeConfig;
use crate::extract;
use crate::routing::HandlerSpec;

/// String-keyed request attributes, attached to a request as an axum
/// extension by the application or an earlier middleware.
///
/// The servlet-style attribute bag has no typed equivalent in tower; anything
/// the host wants in the `requestAttributes` section of the record goes
/// through this extension.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes(pub IndexMap<String, Value>);

/// One captured request or response event.
///
/// Serializes to the emitted camelCase shape; absent fields are skipped
/// rather than written as nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpLogRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_params: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_attributes: Option<IndexMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl fmt::Display for HttpLogRecord {
    /// Renders the record as a single JSON line. Serialization failure
    /// degrades to a diagnostic string; emission never fails the request.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(e) => write!(f, "could not serialize log record: {e}"),
        }
    }
}

/// Assembles raw (unredacted) records from live request/response parts.
pub(crate) struct RecordBuilder<'a> {
    config: &'a LogSafeConfig,
}

impl<'a> RecordBuilder<'a> {
    pub(crate) fn new(config: &'a LogSafeConfig) -> Self {
        Self { config }
    }

    pub(crate) fn request_record(
        &self,
        parts: &axum::http::request::Parts,
        body: &Bytes,
        spec: &HandlerSpec,
    ) -> HttpLogRecord {
        let attributes = if self.config.include_request_attributes {
            parts
                .extensions
                .get::<RequestAttributes>()
                .map(|attributes| attributes.0.clone())
        } else {
            None
        };

        HttpLogRecord {
            http_method: Some(parts.method.to_string()),
            uri: Some(parts.uri.path().to_string()),
            remote_host: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string()),
            headers: Some(headers_as_map(&parts.headers)),
            request_params: Some(query_params_as_map(parts.uri.query())),
            request_attributes: attributes,
            body: extract::request_body_value(spec, content_type(&parts.headers), body),
        }
    }

    pub(crate) fn response_record(
        &self,
        parts: &axum::http::response::Parts,
        body: &Bytes,
        spec: &HandlerSpec,
    ) -> HttpLogRecord {
        HttpLogRecord {
            headers: Some(headers_as_map(&parts.headers)),
            body: extract::response_body_value(spec, content_type(&parts.headers), body),
            ..HttpLogRecord::default()
        }
    }
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

/// Collapses headers into an ordered map; repeated names keep the last
/// value, at the position of the first occurrence.
fn headers_as_map(headers: &HeaderMap) -> IndexMap<String, String> {
    let mut map = IndexMap::with_capacity(headers.len());
    for (name, value) in headers {
        map.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    map
}

/// Decodes the query string into an ordered map, last write wins for
/// duplicate names.
fn query_params_as_map(query: Option<&str>) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    if let Some(query) = query {
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            map.insert(name.into_owned(), value.into_owned());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method, Request, Uri};
    use serde_json::json;

    fn request_parts(uri: &str) -> axum::http::request::Parts {
        let (parts, ()) = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-custom", "one")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn display_renders_compact_json_without_absent_fields() {
        let record = HttpLogRecord {
            http_method: Some("GET".into()),
            uri: Some("/hello".into()),
            ..HttpLogRecord::default()
        };
        assert_eq!(record.to_string(), r#"{"httpMethod":"GET","uri":"/hello"}"#);
    }

    #[test]
    fn header_collapse_is_last_write_wins() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", HeaderValue::from_static("first"));
        headers.append("x-multi", HeaderValue::from_static("second"));
        headers.append("accept", HeaderValue::from_static("application/json"));

        let map = headers_as_map(&headers);
        assert_eq!(map["x-multi"], "second");
        assert_eq!(map.keys().collect::<Vec<_>>(), ["x-multi", "accept"]);
    }

    #[test]
    fn query_params_decode_with_last_write_wins() {
        let uri: Uri = "/search?apiKey=secret&name=joe%20b&name=joe".parse().unwrap();
        let map = query_params_as_map(uri.query());
        assert_eq!(map["apiKey"], "secret");
        assert_eq!(map["name"], "joe");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn request_record_populates_request_side_fields() {
        let config = LogSafeConfig::default();
        let builder = RecordBuilder::new(&config);
        let spec = HandlerSpec::new("create").request_body::<Value>();
        let parts = request_parts("/employees?apiKey=secret");
        let body = Bytes::from(r#"{"firstName":"John"}"#);

        let record = builder.request_record(&parts, &body, &spec);
        assert_eq!(record.http_method.as_deref(), Some("POST"));
        assert_eq!(record.uri.as_deref(), Some("/employees"));
        assert_eq!(record.headers.as_ref().unwrap()["x-custom"], "one");
        assert_eq!(record.request_params.as_ref().unwrap()["apiKey"], "secret");
        assert_eq!(record.body, Some(json!({ "firstName": "John" })));
        // Attributes stay off by default.
        assert!(record.request_attributes.is_none());
    }

    #[test]
    fn attributes_appear_only_when_enabled() {
        let config = LogSafeConfig {
            include_request_attributes: true,
            ..LogSafeConfig::default()
        };
        let builder = RecordBuilder::new(&config);
        let spec = HandlerSpec::new("create");
        let mut parts = request_parts("/employees");
        parts.extensions.insert(RequestAttributes(IndexMap::from([
            ("csrfToken".to_string(), json!("abc")),
        ])));

        let record = builder.request_record(&parts, &Bytes::new(), &spec);
        let attributes = record.request_attributes.unwrap();
        assert_eq!(attributes["csrfToken"], json!("abc"));
    }

    #[test]
    fn response_record_carries_headers_and_body_only() {
        let config = LogSafeConfig::default();
        let builder = RecordBuilder::new(&config);
        let spec = HandlerSpec::new("create").returns::<Value>();
        let (parts, ()) = axum::http::Response::builder()
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        let body = Bytes::from(r#"{"ok":true}"#);

        let record = builder.response_record(&parts, &body, &spec);
        assert!(record.http_method.is_none());
        assert!(record.uri.is_none());
        assert_eq!(record.body, Some(json!({ "ok": true })));
        assert_eq!(
            record.headers.as_ref().unwrap()["content-type"],
            "application/json"
        );
    }
}
