//! Root query field resolution
//!
//! Top-level list fields do one bulk read for the base entities; the
//! `users` field additionally inspects the pre-flattened selection set to
//! decide whether the same round trip should carry subscription join rows,
//! then primes the user loader with every fetched row.

use super::{Exec, args, fields};
use crate::core::{GraphQlError, PathSegment};
use crate::datasource::SubscriptionInclude;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use graphql_parser::query::Field;
use serde_json::Value as Json;

pub(crate) fn resolve_query_field<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
) -> BoxFuture<'e, (String, Json)> {
    async move {
        let key = fields::response_key(field);
        let path = vec![PathSegment::Field(key.clone())];
        let value = match field.name.as_str() {
            "users" => users_query(exec, field, &path).await,
            "user" => user_query(exec, field, &path).await,
            "posts" => posts_query(exec, field, &path).await,
            "post" => post_query(exec, field, &path).await,
            "profiles" => profiles_query(exec, field, &path).await,
            "profile" => profile_query(exec, field, &path).await,
            "memberTypes" => member_types_query(exec, field, &path).await,
            "memberType" => member_type_query(exec, field, &path).await,
            // Validation guarantees the name is known.
            _ => Json::Null,
        };
        (key, value)
    }
    .boxed()
}

fn fail(exec: &Exec<'_>, path: &[PathSegment], message: impl Into<String>) -> Json {
    exec.ctx
        .push_error(GraphQlError::at_path(message, path.to_vec()));
    Json::Null
}

async fn users_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    // The executor, not the resolver, decides which join rows the list
    // fetch should eagerly include, from the flattened selection set.
    let selected = fields::flatten_fields(&field.selection_set, &exec.fragments, "UserType");
    let include = SubscriptionInclude {
        user_subscribed_to: selected.iter().any(|f| f.name == "userSubscribedTo"),
        subscribed_to_user: selected.iter().any(|f| f.name == "subscribedToUser"),
    };

    match exec.ctx.store.users(include).await {
        Ok(users) => {
            // Any later per-row lookup of these users hits the loader cache
            // instead of refetching.
            for user in &users {
                exec.ctx.user_by_id.prime(user.id, Some(user.clone()));
            }
            let items = join_all(users.into_iter().enumerate().map(|(index, user)| {
                let mut item_path = path.to_vec();
                item_path.push(PathSegment::Index(index));
                fields::user_object(exec, user, &field.selection_set, item_path)
            }))
            .await;
            Json::Array(items)
        }
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn user_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.user(&id).await {
        Ok(Some(user)) => {
            fields::user_object(exec, user, &field.selection_set, path.to_vec()).await
        }
        Ok(None) => Json::Null,
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn posts_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    match exec.ctx.store.posts().await {
        Ok(posts) => Json::Array(
            posts
                .iter()
                .map(|post| fields::post_object(exec, post, &field.selection_set))
                .collect(),
        ),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn post_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.post(&id).await {
        Ok(Some(post)) => fields::post_object(exec, &post, &field.selection_set),
        Ok(None) => Json::Null,
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn profiles_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    match exec.ctx.store.profiles().await {
        Ok(profiles) => {
            let items = join_all(profiles.into_iter().enumerate().map(|(index, profile)| {
                let mut item_path = path.to_vec();
                item_path.push(PathSegment::Index(index));
                fields::profile_object(exec, profile, &field.selection_set, item_path)
            }))
            .await;
            Json::Array(items)
        }
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn profile_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.profile(&id).await {
        Ok(Some(profile)) => {
            fields::profile_object(exec, profile, &field.selection_set, path.to_vec()).await
        }
        Ok(None) => Json::Null,
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn member_types_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    match exec.ctx.store.member_types().await {
        Ok(tiers) => Json::Array(
            tiers
                .iter()
                .map(|tier| fields::member_type_object(exec, tier, &field.selection_set))
                .collect(),
        ),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn member_type_query<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::member_type_id_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.member_type(id).await {
        Ok(Some(tier)) => fields::member_type_object(exec, &tier, &field.selection_set),
        Ok(None) => Json::Null,
        Err(error) => fail(exec, path, error.to_string()),
    }
}
