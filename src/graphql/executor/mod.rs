//! Query execution over the parsed document
//!
//! The executor walks the `graphql-parser` AST directly. Every request gets
//! its own [`ExecutionContext`] carrying the per-request batch loaders, so
//! nothing cached during one request leaks into the next.

mod args;
mod context;
mod core;
mod fields;
mod mutation;
mod query;

pub use context::ExecutionContext;
pub use self::core::GraphQlExecutor;

use crate::graphql::validate::FragmentMap;
use serde_json::Value as Json;
use std::collections::HashMap;

/// Everything resolver functions need, bundled so the recursion only
/// threads a single reference.
pub(crate) struct Exec<'q> {
    pub(crate) ctx: ExecutionContext,
    pub(crate) fragments: FragmentMap<'q, 'q>,
    pub(crate) variables: HashMap<String, Json>,
}
