//! # logsafe
//!
//! Axum middleware that emits sanitized, structured log records of HTTP
//! requests and responses, guaranteeing that sensitive values (credentials,
//! tokens, PII) never reach log storage in clear text.
//!
//! ## What it does
//!
//! - **Structural redaction**: captured JSON bodies are walked as trees and
//!   fields marked `#[redact]` on your domain types are masked at any
//!   nesting depth, driven by static schemas collected with
//!   [`#[derive(Loggable)]`](derive@Loggable). No reflection on the request
//!   path.
//! - **Keyed redaction**: configured header, query-parameter, and
//!   request-attribute names are masked case-insensitively.
//! - **Repeatable body capture**: request bodies are buffered once so the
//!   logger and your handler both read the full body; response bodies are
//!   buffered, logged, and copied back so the client sees exactly what the
//!   handler produced.
//! - **Never breaks the request**: every failure inside the pipeline
//!   degrades to a missing field and a warning. The HTTP transaction is
//!   unaffected.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use axum::{http::Method, routing::post, Json, Router};
//! use logsafe::{
//!     HandlerSpec, LogFilterLayer, LogSafeConfig, Loggable, RouteTable, SchemaRegistry,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Loggable)]
//! #[serde(rename_all = "camelCase")]
//! struct Employee {
//!     first_name: String,
//!     #[redact]
//!     ssn: String,
//! }
//!
//! async fn create(Json(employee): Json<Employee>) -> Json<Employee> {
//!     Json(employee)
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = SchemaRegistry::new().register::<Employee>();
//!     let routes = RouteTable::new().route(
//!         Method::POST,
//!         "/employees",
//!         HandlerSpec::new("create")
//!             .request_body::<Employee>()
//!             .returns::<Json<Employee>>(),
//!     );
//!     let layer = LogFilterLayer::new(LogSafeConfig::default(), registry, routes);
//!
//!     let app = Router::new().route("/employees", post(create)).layer(layer);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! A request like
//! `POST /employees {"firstName":"John","ssn":"123-45-6789"}` with an
//! `Authorization` header then logs as
//!
//! ```text
//! REQUEST DATA: {"httpMethod":"POST","uri":"/employees","headers":
//! {"authorization":"[REDACTED]", ...},"requestParams":{},
//! "body":{"firstName":"John","ssn":"[REDACTED]"}}
//! ```
//!
//! ## Pieces
//!
//! - [`schema`]: `Loggable` schemas, the registry, and the scope boundary.
//! - [`redact`]: the redaction engine and the `[REDACTED]` sentinel.
//! - [`record`]: the emitted record and its builder.
//! - [`extract`]: content-type gating and body decoding.
//! - [`routing`]: the `HandlerResolver` seam and the `RouteTable` helper.
//! - [`sink`]: the `RecordSink` seam and the default `tracing` sink.
//!
//! Handler resolution is deliberately external: axum does not expose its
//! route table to middleware, so the host describes its handlers once (the
//! body-bound parameter type and the return type, mirroring what a server
//! framework would know about a handler method) and hands the filter a
//! [`HandlerResolver`]. Unresolved requests pass through untouched.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::{Layer, Service};
use tracing::warn;

#[allow(unused_extern_crates)]
extern crate self as logsafe;

pub mod config;
pub mod extract;
pub mod record;
pub mod redact;
pub mod routing;
pub mod schema;
pub mod sink;

pub use config::{LogSafeConfig, SensitiveFields};
pub use logsafe_derive::Loggable;
pub use record::{HttpLogRecord, RequestAttributes};
pub use redact::{Redactor, REDACTED};
pub use routing::{HandlerResolver, HandlerSpec, RouteTable};
pub use schema::{Loggable, SchemaRegistry, ScopeBoundary};
pub use sink::{RecordKind, RecordSink, TracingSink};

use record::RecordBuilder;
use schema::RecordSchema;

/// Tower layer wrapping a service with the request/response logging filter.
///
/// Cheap to clone; all state (config, schemas, resolver, sink) is shared and
/// immutable after construction, so concurrent requests share nothing
/// mutable.
#[derive(Clone)]
pub struct LogFilterLayer {
    shared: Arc<Shared>,
}

impl LogFilterLayer {
    /// Builds a layer emitting through the default [`TracingSink`].
    pub fn new<R>(config: LogSafeConfig, registry: SchemaRegistry, resolver: R) -> Self
    where
        R: HandlerResolver,
    {
        Self::with_sink(config, registry, resolver, TracingSink)
    }

    /// Builds a layer emitting through a custom [`RecordSink`].
    pub fn with_sink<R, K>(
        config: LogSafeConfig,
        registry: SchemaRegistry,
        resolver: R,
        sink: K,
    ) -> Self
    where
        R: HandlerResolver,
        K: RecordSink,
    {
        let boundary = ScopeBoundary::new(config.base_type_path.clone());
        let redactor = Redactor::new(&config.sensitive, boundary, Arc::new(registry));
        Self {
            shared: Arc::new(Shared {
                config,
                redactor,
                resolver: Box::new(resolver),
                sink: Box::new(sink),
            }),
        }
    }
}

impl<S> Layer<S> for LogFilterLayer {
    type Service = LogFilterService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LogFilterService {
            inner,
            shared: self.shared.clone(),
        }
    }
}

/// The per-request filter. Created by [`LogFilterLayer`].
///
/// Everything runs inline on the request's own task: the request record is
/// emitted before the inner service is invoked, and the response record is
/// emitted after it completes but before the buffered body is handed back to
/// the client.
#[derive(Clone)]
pub struct LogFilterService<S> {
    inner: S,
    shared: Arc<Shared>,
}

struct Shared {
    config: LogSafeConfig,
    redactor: Redactor,
    resolver: Box<dyn HandlerResolver>,
    sink: Box<dyn RecordSink>,
}

impl Shared {
    fn body_schema(&self, type_path: Option<&str>) -> Option<&'static RecordSchema> {
        type_path.and_then(|path| self.redactor.schema_for(path))
    }

    fn log_request(&self, parts: &axum::http::request::Parts, body: &Bytes, spec: &HandlerSpec) {
        let record = RecordBuilder::new(&self.config).request_record(parts, body, spec);
        let schema = self.body_schema(spec.request_body_type());
        let record = self.redactor.redact_record(record, schema);
        self.sink.emit(RecordKind::Request, spec.name(), &record);
    }

    fn log_response(&self, parts: &axum::http::response::Parts, body: &Bytes, spec: &HandlerSpec) {
        let record = RecordBuilder::new(&self.config).response_record(parts, body, spec);
        let schema = self.body_schema(spec.response_body_type());
        let record = self.redactor.redact_record(record, schema);
        self.sink.emit(RecordKind::Response, spec.name(), &record);
    }
}

impl<S> Service<Request> for LogFilterService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the service that was driven to readiness and leave a fresh
        // clone behind; the inner call has to happen inside the async block,
        // after the body has been buffered.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let shared = self.shared.clone();

        Box::pin(async move {
            let spec = match shared.resolver.resolve(&request) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(target: "logsafe", error = %e, "error resolving request handler");
                    None
                }
            };

            // No handler: nothing to describe the body with, and nothing
            // worth logging (404s, pre-routing failures). Pass through.
            let Some(spec) = spec else {
                return inner.call(request).await;
            };

            // Buffer the whole request body once; every reader from here on
            // (the logger now, the handler next) gets the same bytes.
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(target: "logsafe", handler = spec.name(), error = %e, "error buffering request body");
                    Bytes::new()
                }
            };

            if shared.config.log_request {
                shared.log_request(&parts, &bytes, &spec);
            }

            let request = Request::from_parts(parts, Body::from(bytes));

            if shared.config.log_response {
                let response = inner.call(request).await?;
                let (parts, body) = response.into_parts();
                let bytes = match body.collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => {
                        warn!(target: "logsafe", handler = spec.name(), error = %e, "error buffering response body");
                        Bytes::new()
                    }
                };
                shared.log_response(&parts, &bytes, &spec);
                // Copy the buffered body back onto the real response;
                // without this the client would receive an empty body.
                Ok(Response::from_parts(parts, Body::from(bytes)))
            } else {
                // Skip the buffering overhead entirely when responses
                // aren't logged.
                inner.call(request).await
            }
        })
    }
}
