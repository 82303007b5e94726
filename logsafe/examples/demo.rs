//! Demo server showing the filter on a small employee API.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example demo
//! ```
//!
//! Then exercise it:
//!
//! ```bash
//! # Marked fields (ssn, phoneNumber) and the Authorization header are
//! # masked in the log line; the response is untouched.
//! curl -s -X POST http://localhost:3000/employees \
//!   -H 'Content-Type: application/json' \
//!   -H 'Authorization: Bearer super-secret' \
//!   -d '{"firstName":"John","lastName":"Doe","ssn":"123-45-6789",
//!        "employeeType":"FULL_TIME",
//!        "address":{"city":"Springfield","phoneNumber":"555-0100"}}'
//!
//! # Configured query parameter names are masked too.
//! curl -s 'http://localhost:3000/employees/search?apiKey=secret&name=joe'
//! ```

use std::net::SocketAddr;

use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use logsafe::{
    HandlerSpec, LogFilterLayer, LogSafeConfig, Loggable, RouteTable, SchemaRegistry,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

#[derive(Debug, Clone, Serialize, Deserialize, Loggable)]
#[serde(rename_all = "camelCase")]
struct Address {
    city: String,
    #[redact]
    phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum EmployeeType {
    FullTime,
    PartTime,
    Contractor,
}

#[derive(Debug, Clone, Serialize, Deserialize, Loggable)]
#[serde(rename_all = "camelCase")]
struct Employee {
    first_name: String,
    last_name: String,
    #[redact]
    ssn: String,
    employee_type: EmployeeType,
    address: Address,
}

async fn create_employee(Json(employee): Json<Employee>) -> Json<Employee> {
    Json(employee)
}

async fn search_employees() -> Json<Vec<Employee>> {
    Json(vec![Employee {
        first_name: "Jane".into(),
        last_name: "Doe".into(),
        ssn: "987-65-4321".into(),
        employee_type: EmployeeType::PartTime,
        address: Address {
            city: "Shelbyville".into(),
            phone_number: "555-0199".into(),
        },
    }])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,logsafe=info".into()),
        )
        .init();

    let registry = SchemaRegistry::new()
        .register::<Employee>()
        .register::<Address>();

    let routes = RouteTable::new()
        .route(
            Method::POST,
            "/employees",
            HandlerSpec::new("create_employee")
                .request_body::<Employee>()
                .returns::<Json<Employee>>(),
        )
        .route(
            Method::GET,
            "/employees/search",
            HandlerSpec::new("search_employees").returns::<Json<Vec<Employee>>>(),
        );

    let config = LogSafeConfig {
        log_response: true,
        ..LogSafeConfig::default()
    };
    let layer = LogFilterLayer::new(config, registry, routes);

    let app = Router::new()
        .route("/employees", post(create_employee))
        .route("/employees/search", get(search_employees))
        .layer(layer);

    println!("Demo server running on http://localhost:3000");

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
