//! Configuration for the logging filter.
//!
//! Everything here is plain data with serde support and full defaults; how
//! the values get populated (files, env, hardcoded) is the host's business.

use serde::Deserialize;

/// Names whose values are always masked, regardless of content.
///
/// Matching is case-insensitive. Defaults follow the usual suspects for each
/// position: credentials in headers, secrets in query strings, tokens in
/// request attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensitiveFields {
    pub headers: Vec<String>,
    pub query_params: Vec<String>,
    pub request_attributes: Vec<String>,
}

impl Default for SensitiveFields {
    fn default() -> Self {
        Self {
            headers: vec!["Authorization".into(), "x-api-key".into()],
            query_params: vec!["password".into(), "apiKey".into(), "token".into()],
            request_attributes: vec!["csrfToken".into(), "refreshToken".into()],
        }
    }
}

/// Configuration for [`LogFilterLayer`](crate::LogFilterLayer).
///
/// `log_request` and `log_response` are independent; all four combinations
/// are valid. `base_type_path` is the [`ScopeBoundary`](crate::schema::ScopeBoundary)
/// prefix for deep body traversal; empty admits every registered type.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogSafeConfig {
    /// Emit a record for each captured request. Default true.
    pub log_request: bool,
    /// Emit a record for each captured response. Default false.
    pub log_response: bool,
    /// Include request attributes in request records. Default false;
    /// attribute dumps tend to be excessively verbose.
    pub include_request_attributes: bool,
    /// Type-path prefix for deep body traversal.
    pub base_type_path: String,
    pub sensitive: SensitiveFields,
}

impl Default for LogSafeConfig {
    fn default() -> Self {
        Self {
            log_request: true,
            log_response: false,
            include_request_attributes: false,
            base_type_path: String::new(),
            sensitive: SensitiveFields::default(),
        }
    }
}
