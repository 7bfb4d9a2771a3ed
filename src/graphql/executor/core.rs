//! The request pipeline: parse, validate, execute
//!
//! One executor is built at startup and shared across requests; all
//! per-request state lives in the [`ExecutionContext`](super::ExecutionContext)
//! created inside [`GraphQlExecutor::execute`]. Query root fields resolve
//! concurrently so their loader calls coalesce; mutation root fields run in
//! document order, one at a time.

use super::{Exec, context::ExecutionContext, fields, mutation, query};
use crate::core::{GraphQlError, GraphQlResponse};
use crate::datasource::DataSource;
use crate::graphql::schema::SchemaIndex;
use crate::graphql::validate;
use futures::future::join_all;
use graphql_parser::query::{Definition, OperationDefinition, SelectionSet, parse_query};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

pub struct GraphQlExecutor {
    schema: SchemaIndex,
    store: Arc<dyn DataSource>,
    max_depth: usize,
}

impl GraphQlExecutor {
    pub fn new(store: Arc<dyn DataSource>, max_depth: usize) -> Self {
        Self {
            schema: SchemaIndex::social(),
            store,
            max_depth,
        }
    }

    /// Run one request end to end. Never fails: syntax and validation
    /// problems come back as an errors-only envelope, resolution problems
    /// as partial data plus an errors list.
    pub async fn execute(
        &self,
        source: &str,
        variables: HashMap<String, Json>,
    ) -> GraphQlResponse {
        let doc = match parse_query::<String>(source) {
            Ok(doc) => doc,
            Err(error) => {
                tracing::debug!(%error, "query failed to parse");
                return GraphQlResponse::errors(vec![GraphQlError::new(error.to_string())]);
            }
        };

        let violations = validate::validate(&self.schema, &doc, self.max_depth);
        if !violations.is_empty() {
            tracing::debug!(count = violations.len(), "query failed validation");
            return GraphQlResponse::errors(violations);
        }

        let fragments = validate::collect_fragments(&doc);
        let operation = doc.definitions.iter().find_map(|def| match def {
            Definition::Operation(op) => Some(op),
            Definition::Fragment(_) => None,
        });
        let Some(operation) = operation else {
            return GraphQlResponse::errors(vec![GraphQlError::new(
                "document contains no executable operation",
            )]);
        };

        let exec = Exec {
            ctx: ExecutionContext::new(self.store.clone()),
            fragments,
            variables,
        };
        let data = match operation {
            OperationDefinition::SelectionSet(set) => query_root(&exec, set).await,
            OperationDefinition::Query(op) => query_root(&exec, &op.selection_set).await,
            OperationDefinition::Mutation(op) => mutation_root(&exec, &op.selection_set).await,
            // Rejected by validation.
            OperationDefinition::Subscription(_) => Json::Null,
        };

        let errors = exec.ctx.take_errors();
        if errors.is_empty() {
            GraphQlResponse::data(data)
        } else {
            GraphQlResponse::data_with_errors(data, errors)
        }
    }
}

async fn query_root<'q>(exec: &Exec<'q>, set: &'q SelectionSet<'q, String>) -> Json {
    let roots = fields::flatten_fields(set, &exec.fragments, "RootQuery");
    let pairs = join_all(
        roots
            .into_iter()
            .map(|field| query::resolve_query_field(exec, field)),
    )
    .await;
    assemble(pairs)
}

async fn mutation_root<'q>(exec: &Exec<'q>, set: &'q SelectionSet<'q, String>) -> Json {
    let roots = fields::flatten_fields(set, &exec.fragments, "Mutations");
    let mut pairs = Vec::with_capacity(roots.len());
    for field in roots {
        pairs.push(mutation::resolve_mutation_field(exec, field).await);
    }
    assemble(pairs)
}

fn assemble(pairs: Vec<(String, Json)>) -> Json {
    Json::Object(pairs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::in_memory::InMemoryDataSource;
    use serde_json::json;
    use uuid::Uuid;

    fn executor() -> (GraphQlExecutor, Arc<InMemoryDataSource>) {
        let store = Arc::new(InMemoryDataSource::new());
        (GraphQlExecutor::new(store.clone(), 5), store)
    }

    #[tokio::test]
    async fn syntax_error_yields_errors_only() {
        let (executor, _) = executor();
        let response = executor.execute("query {", HashMap::new()).await;
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    }

    #[tokio::test]
    async fn unknown_field_is_rejected_before_execution() {
        let (executor, _) = executor();
        let response = executor
            .execute("{ users { id favoriteColor } }", HashMap::new())
            .await;
        assert!(response.data.is_none());
        assert!(
            response.errors[0].message.contains("favoriteColor"),
            "unexpected message: {}",
            response.errors[0].message
        );
    }

    #[tokio::test]
    async fn create_then_fetch_round_trip() {
        let (executor, _) = executor();
        let created = executor
            .execute(
                r#"mutation { createUser(dto: { name: "dana", balance: 12.5 }) { id name balance } }"#,
                HashMap::new(),
            )
            .await;
        assert!(created.errors.is_empty());
        let id = created.data.as_ref().unwrap()["createUser"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let mut variables = HashMap::new();
        variables.insert("id".to_string(), json!(id));
        let fetched = executor
            .execute(
                "query ($id: UUID!) { user(id: $id) { name balance } }",
                variables,
            )
            .await;
        assert_eq!(
            fetched.data.unwrap()["user"],
            json!({ "name": "dana", "balance": 12.5 })
        );
    }

    #[tokio::test]
    async fn missing_entity_resolves_to_null_without_error() {
        let (executor, _) = executor();
        let response = executor
            .execute(
                &format!("{{ user(id: \"{}\") {{ id }} }}", Uuid::new_v4()),
                HashMap::new(),
            )
            .await;
        assert!(response.errors.is_empty());
        assert_eq!(response.data.unwrap()["user"], Json::Null);
    }

    #[tokio::test]
    async fn failing_mutation_does_not_poison_siblings() {
        let (executor, _) = executor();
        let response = executor
            .execute(
                &format!(
                    r#"mutation {{
                        deleteUser(id: "{}")
                        createUser(dto: {{ name: "eli", balance: 0.0 }}) {{ name }}
                    }}"#,
                    Uuid::new_v4()
                ),
                HashMap::new(),
            )
            .await;
        let data = response.data.unwrap();
        assert_eq!(data["deleteUser"], Json::Null);
        assert_eq!(data["createUser"]["name"], json!("eli"));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].path.as_deref().map(|p| p.len()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn depth_six_is_rejected_depth_five_is_not() {
        let (executor, _) = executor();

        let five = "{ users { profile { user { posts { id } } } } }";
        let ok = executor.execute(five, HashMap::new()).await;
        assert!(ok.errors.is_empty(), "depth five rejected: {:?}", ok.errors);

        let six = "{ users { profile { user { profile { memberType { id } } } } } }";
        let rejected = executor.execute(six, HashMap::new()).await;
        assert!(rejected.data.is_none());
        assert!(rejected.errors[0].message.contains("depth"));
    }
}
