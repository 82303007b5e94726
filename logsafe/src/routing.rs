//! The routing collaborator: resolving a request to a handler descriptor.
//!
//! Routing itself is a black box here, since axum doesn't expose its route
//! table to middleware. Hosts implement [`HandlerResolver`]; [`RouteTable`]
//! is the minimal exact-match implementation used by the demo and tests.

use axum::extract::Request;
use axum::http::Method;

/// Errors crossing the resolver boundary.
pub use tower::BoxError;

/// Maps an incoming request to the descriptor of the handler that will serve
/// it. `Ok(None)` means no handler (a 404 or a pre-routing failure): the
/// filter passes the request through untouched. An `Err` is logged as a
/// warning and treated the same way; resolution failures never reach the
/// application.
pub trait HandlerResolver: Send + Sync + 'static {
    fn resolve(&self, request: &Request) -> Result<Option<HandlerSpec>, BoxError>;
}

/// Descriptor of a resolved handler: its name, the declared type of its
/// body-bound parameter (if any), and its declared return type.
///
/// Types are recorded as `std::any::type_name` paths and resolved against
/// the schema registry at capture time, including one level of
/// generic-wrapper unwrapping: declaring `returns::<Json<Employee>>()`
/// targets the `Employee` schema.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    name: &'static str,
    request_body: Option<&'static str>,
    response_type: Option<&'static str>,
}

impl HandlerSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            request_body: None,
            response_type: None,
        }
    }

    /// Declares the type of the handler parameter bound to the request body.
    /// Without this, request bodies are never captured for the handler.
    pub fn request_body<T: 'static>(mut self) -> Self {
        self.request_body = Some(std::any::type_name::<T>());
        self
    }

    /// Declares the handler's return type. Unit means no response body.
    pub fn returns<T: 'static>(mut self) -> Self {
        let path = std::any::type_name::<T>();
        self.response_type = (path != "()").then_some(path);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn request_body_type(&self) -> Option<&'static str> {
        self.request_body
    }

    pub(crate) fn response_body_type(&self) -> Option<&'static str> {
        self.response_type
    }
}

/// Exact-match method + path routing table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<(Method, String, HandlerSpec)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: Method, path: impl Into<String>, spec: HandlerSpec) -> Self {
        self.routes.push((method, path.into(), spec));
        self
    }
}

impl HandlerResolver for RouteTable {
    fn resolve(&self, request: &Request) -> Result<Option<HandlerSpec>, BoxError> {
        Ok(self
            .routes
            .iter()
            .find(|(method, path, _)| method == request.method() && path == request.uri().path())
            .map(|(_, _, spec)| spec.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: Method, uri: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn route_table_matches_method_and_path() {
        let table = RouteTable::new()
            .route(Method::POST, "/employees", HandlerSpec::new("create"))
            .route(Method::GET, "/employees", HandlerSpec::new("list"));

        let spec = table
            .resolve(&request(Method::POST, "/employees?x=1"))
            .unwrap()
            .unwrap();
        assert_eq!(spec.name(), "create");

        assert!(table
            .resolve(&request(Method::GET, "/missing"))
            .unwrap()
            .is_none());
        assert!(table
            .resolve(&request(Method::DELETE, "/employees"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unit_return_type_is_recorded_as_absent() {
        let spec = HandlerSpec::new("delete").returns::<()>();
        assert!(spec.response_body_type().is_none());

        let spec = HandlerSpec::new("get").returns::<String>();
        assert!(spec.response_body_type().is_some());
        assert!(spec.request_body_type().is_none());
    }
}
