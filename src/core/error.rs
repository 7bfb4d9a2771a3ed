//! Typed errors and the wire-level GraphQL response envelope
//!
//! Two error worlds live here. [`DataSourceError`] and [`LoadError`] (in the
//! loader module) are internal typed errors; [`GraphQlError`] is the
//! serializable entry that ends up in the response's `errors` list. Every
//! code path from parse to the last resolver terminates in a
//! [`GraphQlResponse`] — nothing is thrown past the request boundary.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the data source collaborator.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// The referenced row does not exist. Only write paths report this;
    /// read paths represent a miss as `None` / an empty collection.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A write violated referential integrity (e.g. post for a missing author).
    #[error("invalid reference from {entity} to {referenced}: {id}")]
    InvalidReference {
        entity: &'static str,
        referenced: &'static str,
        id: Uuid,
    },

    /// The storage backend itself failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DataSourceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DataSourceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// One segment of a response path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        PathSegment::Field(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        PathSegment::Index(i)
    }
}

/// A single entry in the response's `errors` list.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
}

impl GraphQlError {
    /// An error not attached to any field (syntax or validation).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// A resolution error attached to the failing field's path.
    pub fn at_path(message: impl Into<String>, path: Vec<PathSegment>) -> Self {
        Self {
            message: message.into(),
            path: Some(path),
        }
    }
}

/// The response envelope: `{data, errors?}` after execution, `{errors}` alone
/// when the request never got past parse or validation.
#[derive(Debug, Serialize)]
pub struct GraphQlResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn data_with_errors(data: Value, errors: Vec<GraphQlError>) -> Self {
        Self {
            data: Some(data),
            errors,
        }
    }

    /// A pre-execution failure: no `data` key at all.
    pub fn errors(errors: Vec<GraphQlError>) -> Self {
        Self { data: None, errors }
    }
}
