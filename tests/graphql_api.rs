//! End-to-end tests against the HTTP surface
//!
//! Every request goes through the real router: JSON body in, GraphQL
//! envelope out, always HTTP 200.

use axum_test::TestServer;
use blogql::config::ServiceConfig;
use blogql::datasource::InMemoryDataSource;
use blogql::graphql::GraphQlExposure;
use serde_json::{Value, json};
use std::sync::Arc;

fn test_server() -> (TestServer, Arc<InMemoryDataSource>) {
    let store = Arc::new(InMemoryDataSource::new());
    let app = GraphQlExposure::build_router(store.clone(), &ServiceConfig::default());
    (TestServer::new(app), store)
}

async fn run(server: &TestServer, query: &str) -> Value {
    run_with_variables(server, query, json!(null)).await
}

async fn run_with_variables(server: &TestServer, query: &str, variables: Value) -> Value {
    let mut body = json!({ "query": query });
    if !variables.is_null() {
        body["variables"] = variables;
    }
    let response = server.post("/graphql").json(&body).await;
    response.assert_status_ok();
    response.json()
}

async fn create_user(server: &TestServer, name: &str, balance: f64) -> String {
    let body = run(
        server,
        &format!(
            r#"mutation {{ createUser(dto: {{ name: "{name}", balance: {balance} }}) {{ id }} }}"#
        ),
    )
    .await;
    body["data"]["createUser"]["id"]
        .as_str()
        .expect("createUser should return an id")
        .to_string()
}

#[tokio::test]
async fn create_then_query_user_round_trip() {
    let (server, _) = test_server();
    let id = create_user(&server, "alice", 100.0).await;

    let body = run_with_variables(
        &server,
        "query ($id: UUID!) { user(id: $id) { id name balance } }",
        json!({ "id": id }),
    )
    .await;
    assert_eq!(
        body["data"]["user"],
        json!({ "id": id, "name": "alice", "balance": 100.0 })
    );
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn deleted_user_resolves_to_null() {
    let (server, _) = test_server();
    let id = create_user(&server, "bob", 0.0).await;

    let deleted = run(
        &server,
        &format!(r#"mutation {{ deleteUser(id: "{id}") }}"#),
    )
    .await;
    assert_eq!(deleted["data"]["deleteUser"], json!("deleted"));

    let body = run(&server, &format!(r#"{{ user(id: "{id}") {{ id }} }}"#)).await;
    assert_eq!(body["data"]["user"], Value::Null);
    assert!(body.get("errors").is_none());
}

#[tokio::test]
async fn unknown_field_rejected_without_data_key() {
    let (server, _) = test_server();
    let body = run(&server, "{ users { id nickname } }").await;
    assert!(body.get("data").is_none());
    let errors = body["errors"].as_array().expect("errors list");
    assert!(errors[0]["message"].as_str().unwrap().contains("nickname"));
}

#[tokio::test]
async fn depth_limit_guards_the_executor() {
    let (server, _) = test_server();

    let at_limit = run(&server, "{ users { profile { user { posts { id } } } } }").await;
    assert!(at_limit.get("errors").is_none(), "depth five should pass");

    let over = run(
        &server,
        "{ users { profile { user { profile { memberType { id } } } } } }",
    )
    .await;
    assert!(over.get("data").is_none());
    let message = over["errors"][0]["message"].as_str().unwrap();
    assert!(message.contains("depth"), "unexpected message: {message}");
}

#[tokio::test]
async fn subscribe_then_query_subscriptions() {
    let (server, _) = test_server();
    let subscriber = create_user(&server, "reader", 5.0).await;
    let author = create_user(&server, "writer", 5.0).await;

    let subscribed = run(
        &server,
        &format!(
            r#"mutation {{ subscribeTo(userId: "{subscriber}", authorId: "{author}") {{ id }} }}"#
        ),
    )
    .await;
    assert_eq!(subscribed["data"]["subscribeTo"]["id"], json!(subscriber));

    let body = run(
        &server,
        &format!(r#"{{ user(id: "{subscriber}") {{ userSubscribedTo {{ id name }} }} }}"#),
    )
    .await;
    assert_eq!(
        body["data"]["user"]["userSubscribedTo"],
        json!([{ "id": author, "name": "writer" }])
    );

    let reverse = run(
        &server,
        &format!(r#"{{ user(id: "{author}") {{ subscribedToUser {{ id }} }} }}"#),
    )
    .await;
    assert_eq!(
        reverse["data"]["user"]["subscribedToUser"],
        json!([{ "id": subscriber }])
    );

    let gone = run(
        &server,
        &format!(
            r#"mutation {{ unsubscribeFrom(userId: "{subscriber}", authorId: "{author}") }}"#
        ),
    )
    .await;
    assert_eq!(gone["data"]["unsubscribeFrom"], json!("unsubscribed"));

    let empty = run(
        &server,
        &format!(r#"{{ user(id: "{subscriber}") {{ userSubscribedTo {{ id }} }} }}"#),
    )
    .await;
    assert_eq!(empty["data"]["user"]["userSubscribedTo"], json!([]));
}

#[tokio::test]
async fn profile_and_member_tier_chain() {
    let (server, _) = test_server();
    let id = create_user(&server, "carol", 50.0).await;

    let created = run(
        &server,
        &format!(
            r#"mutation {{
                createProfile(dto: {{
                    userId: "{id}",
                    isMale: false,
                    yearOfBirth: 1990,
                    memberTypeId: "business"
                }}) {{ id yearOfBirth memberTypeId }}
            }}"#
        ),
    )
    .await;
    assert_eq!(created["data"]["createProfile"]["yearOfBirth"], json!(1990));
    assert_eq!(
        created["data"]["createProfile"]["memberTypeId"],
        json!("business")
    );

    let body = run(
        &server,
        &format!(
            r#"{{ user(id: "{id}") {{ profile {{ memberType {{ id discount postsLimitPerMonth }} }} }} }}"#
        ),
    )
    .await;
    assert_eq!(
        body["data"]["user"]["profile"]["memberType"],
        json!({ "id": "business", "discount": 7.5, "postsLimitPerMonth": 100 })
    );
}

#[tokio::test]
async fn posts_crud_through_the_api() {
    let (server, _) = test_server();
    let author = create_user(&server, "dave", 0.0).await;

    let created = run(
        &server,
        &format!(
            r#"mutation {{
                createPost(dto: {{ title: "first", content: "hello", authorId: "{author}" }}) {{ id title }}
            }}"#
        ),
    )
    .await;
    let post_id = created["data"]["createPost"]["id"].as_str().unwrap().to_string();

    let changed = run(
        &server,
        &format!(
            r#"mutation {{ changePost(id: "{post_id}", dto: {{ title: "second" }}) {{ title content }} }}"#
        ),
    )
    .await;
    assert_eq!(
        changed["data"]["changePost"],
        json!({ "title": "second", "content": "hello" })
    );

    let listed = run(
        &server,
        &format!(r#"{{ user(id: "{author}") {{ posts {{ id title }} }} }}"#),
    )
    .await;
    assert_eq!(
        listed["data"]["user"]["posts"],
        json!([{ "id": post_id, "title": "second" }])
    );

    let deleted = run(&server, &format!(r#"mutation {{ deletePost(id: "{post_id}") }}"#)).await;
    assert_eq!(deleted["data"]["deletePost"], json!("deleted"));
}

#[tokio::test]
async fn failing_field_reports_path_but_keeps_siblings() {
    let (server, _) = test_server();
    create_user(&server, "erin", 1.0).await;

    let missing = uuid::Uuid::new_v4();
    let body = run(
        &server,
        &format!(
            r#"mutation {{
                changeUser(id: "{missing}", dto: {{ name: "nobody" }}) {{ id }}
                createUser(dto: {{ name: "frank", balance: 3.0 }}) {{ name }}
            }}"#
        ),
    )
    .await;
    assert_eq!(body["data"]["changeUser"], Value::Null);
    assert_eq!(body["data"]["createUser"]["name"], json!("frank"));
    assert_eq!(body["errors"][0]["path"], json!(["changeUser"]));
}

#[tokio::test]
async fn aliases_and_fragments_are_honored() {
    let (server, _) = test_server();
    let id = create_user(&server, "grace", 9.0).await;

    let body = run(
        &server,
        &format!(
            r#"query {{
                someone: user(id: "{id}") {{ ...basics }}
            }}
            fragment basics on UserType {{ id name }}"#
        ),
    )
    .await;
    assert_eq!(
        body["data"]["someone"],
        json!({ "id": id, "name": "grace" })
    );
}

#[tokio::test]
async fn member_types_are_seeded() {
    let (server, _) = test_server();
    let body = run(&server, "{ memberTypes { id discount } }").await;
    let tiers = body["data"]["memberTypes"].as_array().expect("list");
    assert_eq!(tiers.len(), 2);

    let one = run(&server, r#"{ memberType(id: "basic") { postsLimitPerMonth } }"#).await;
    assert_eq!(
        one["data"]["memberType"]["postsLimitPerMonth"],
        json!(20)
    );
}
