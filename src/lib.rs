//! # BlogQL
//!
//! A GraphQL query-serving layer over a social blogging domain: users,
//! profiles, posts, member tiers, and subscriptions between users.
//!
//! ## Features
//!
//! - **Batched Resolution**: Per-request loaders coalesce sibling lookups
//!   into one bulk data-source call, so nested selections never degrade
//!   into per-row fetches
//! - **Depth Guard**: Queries deeper than the configured limit are rejected
//!   before any resolver runs
//! - **Partial Results**: A failing field resolves to `null` and reports a
//!   path-tagged error; sibling fields are unaffected
//! - **Pluggable Storage**: Everything behind the [`DataSource`] trait, with
//!   an in-memory implementation included
//! - **Configuration-Based**: Depth limit and bind address via YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blogql::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ServiceConfig::default();
//! let store: Arc<dyn DataSource> = Arc::new(InMemoryDataSource::new());
//! GraphQlExposure::serve(store, &config).await?;
//! ```
//!
//! [`DataSource`]: crate::datasource::DataSource

pub mod config;
pub mod core;
pub mod datasource;
pub mod graphql;
pub mod loader;

/// Re-exports of commonly used types and traits
pub mod prelude {
    pub use crate::config::ServiceConfig;
    pub use crate::core::{
        entity::{MemberType, MemberTypeId, Post, Profile, SubscriptionRow, User},
        error::{DataSourceError, GraphQlError, GraphQlResponse, PathSegment},
    };
    pub use crate::datasource::{DataSource, InMemoryDataSource, SubscriptionInclude};
    pub use crate::graphql::{GraphQlExecutor, GraphQlExposure, SchemaIndex};
    pub use crate::loader::{BatchFn, LoadError, Loader};
}
