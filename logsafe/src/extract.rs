//! Body decoding, gated by content type and handler metadata.
//!
//! Capture only applies to JSON-compatible media types; anything else yields
//! no body without touching the buffered bytes. The decode target comes from
//! the resolved [`HandlerSpec`](crate::routing::HandlerSpec): a request needs
//! a declared body-bound parameter, a response needs a non-unit declared
//! return type. Bodies decode into a uniform `serde_json::Value` tree, the
//! shape the redactor walks.

use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

use crate::routing::HandlerSpec;

/// Whether a `Content-Type` header value is compatible with
/// `application/json`. Accepts `application/json` itself and structured
/// syntaxes with a `+json` suffix; parameters are ignored.
pub fn is_json_compatible(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == "application/json"
        || (media_type.starts_with("application/") && media_type.ends_with("+json"))
}

/// Decodes a captured request body.
///
/// `None` when the handler has no body-bound parameter, the content type is
/// not JSON-compatible, the buffer is empty, or the bytes are not valid
/// JSON. A request decode failure drops the body from the record rather
/// than failing the event.
pub(crate) fn request_body_value(
    spec: &HandlerSpec,
    content_type: Option<&str>,
    body: &Bytes,
) -> Option<Value> {
    spec.request_body_type()?;
    if !content_type.is_some_and(is_json_compatible) || body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(target: "logsafe", handler = spec.name(), error = %e, "error decoding request body");
            None
        }
    }
}

/// Decodes a captured response body.
///
/// `None` when the declared return type is unit or the content type is not
/// JSON-compatible. A decode failure falls back to the raw captured text,
/// typically a body produced by an error-handling path that doesn't match
/// the declared return type.
pub(crate) fn response_body_value(
    spec: &HandlerSpec,
    content_type: Option<&str>,
    body: &Bytes,
) -> Option<Value> {
    spec.response_body_type()?;
    if !content_type.is_some_and(is_json_compatible) || body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(target: "logsafe", handler = spec.name(), error = %e, "error decoding response body, logging raw");
            Some(Value::from(
                String::from_utf8_lossy(body).into_owned(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_type_gate() {
        assert!(is_json_compatible("application/json"));
        assert!(is_json_compatible("application/json; charset=utf-8"));
        assert!(is_json_compatible("Application/JSON"));
        assert!(is_json_compatible("application/problem+json"));
        assert!(!is_json_compatible("text/html"));
        assert!(!is_json_compatible("application/octet-stream"));
        assert!(!is_json_compatible("text/json+something"));
        assert!(!is_json_compatible(""));
    }

    #[test]
    fn request_body_requires_target_and_json() {
        let with_target = HandlerSpec::new("create").request_body::<Value>();
        let without_target = HandlerSpec::new("get");
        let body = Bytes::from(r#"{"a":1}"#);

        assert_eq!(
            request_body_value(&with_target, Some("application/json"), &body),
            Some(json!({ "a": 1 }))
        );
        assert_eq!(
            request_body_value(&without_target, Some("application/json"), &body),
            None
        );
        assert_eq!(request_body_value(&with_target, Some("text/html"), &body), None);
        assert_eq!(request_body_value(&with_target, None, &body), None);
        assert_eq!(
            request_body_value(&with_target, Some("application/json"), &Bytes::new()),
            None
        );
    }

    #[test]
    fn malformed_request_body_is_dropped() {
        let spec = HandlerSpec::new("create").request_body::<Value>();
        let body = Bytes::from("not json at all");
        assert_eq!(request_body_value(&spec, Some("application/json"), &body), None);
    }

    #[test]
    fn response_body_falls_back_to_raw_text() {
        let spec = HandlerSpec::new("create").returns::<Value>();
        let body = Bytes::from("oops, handler exploded");
        assert_eq!(
            response_body_value(&spec, Some("application/json"), &body),
            Some(Value::from("oops, handler exploded"))
        );
    }

    #[test]
    fn unit_return_type_yields_no_body() {
        let spec = HandlerSpec::new("delete").returns::<()>();
        let body = Bytes::from(r#"{"a":1}"#);
        assert_eq!(response_body_value(&spec, Some("application/json"), &body), None);
    }

    #[test]
    fn non_json_response_content_type_yields_no_body() {
        let spec = HandlerSpec::new("page").returns::<String>();
        let body = Bytes::from("<h1>hi</h1>");
        assert_eq!(
            response_body_value(&spec, Some("text/html; charset=utf-8"), &body),
            None
        );
        assert_eq!(response_body_value(&spec, None, &body), None);
    }
}
