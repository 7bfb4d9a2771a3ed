//! Standalone GraphQL server over the in-memory data source
//!
//! Reads an optional YAML config path from the first CLI argument and
//! serves `POST /graphql` on the configured address.

use anyhow::Result;
use blogql::config::ServiceConfig;
use blogql::datasource::{DataSource, InMemoryDataSource};
use blogql::graphql::GraphQlExposure;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServiceConfig::from_yaml_file(&path)?,
        None => ServiceConfig::default(),
    };
    tracing::info!(
        max_query_depth = config.max_query_depth,
        "starting graphql service"
    );

    let store: Arc<dyn DataSource> = Arc::new(InMemoryDataSource::new());
    GraphQlExposure::serve(store, &config).await
}
