//! GraphQL exposure: schema index, validation, execution, HTTP transport
//!
//! The transport is deliberately thin. Parse, validation, and resolution
//! failures all come back as a well-formed GraphQL envelope with HTTP 200;
//! the status code never carries query-level outcomes.

pub mod executor;
pub mod schema;
pub mod validate;

pub use executor::{ExecutionContext, GraphQlExecutor};
pub use schema::SchemaIndex;

use crate::config::ServiceConfig;
use crate::core::GraphQlResponse;
use crate::datasource::DataSource;
use anyhow::Result;
use axum::{
    Router,
    extract::{Extension, Json},
    routing::post,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
struct GraphQlRequestBody {
    query: String,
    variables: Option<HashMap<String, serde_json::Value>>,
}

/// GraphQL API exposure implementation
///
/// Encapsulates the HTTP surface for the executor. The router carries one
/// POST endpoint plus CORS and request tracing layers.
pub struct GraphQlExposure;

impl GraphQlExposure {
    pub fn build_router(store: Arc<dyn DataSource>, config: &ServiceConfig) -> Router {
        let executor = Arc::new(GraphQlExecutor::new(store, config.max_query_depth));
        Router::new()
            .route("/graphql", post(graphql_handler))
            .layer(Extension(executor))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(store: Arc<dyn DataSource>, config: &ServiceConfig) -> Result<()> {
        let router = Self::build_router(store, config);
        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
        tracing::info!(addr = %config.bind_addr, "graphql service listening");
        axum::serve(listener, router).await?;
        Ok(())
    }
}

async fn graphql_handler(
    Extension(executor): Extension<Arc<GraphQlExecutor>>,
    Json(request): Json<GraphQlRequestBody>,
) -> Json<GraphQlResponse> {
    let variables = request.variables.unwrap_or_default();
    Json(executor.execute(&request.query, variables).await)
}
