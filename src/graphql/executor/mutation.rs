//! Root mutation field resolution
//!
//! Writes are single data-source calls and are never batched — they are not
//! idempotent to coalesce. Deletions and unsubscription resolve to a status
//! string; every other mutation resolves the written entity against the
//! field's selection set.

use super::{Exec, args, fields};
use crate::core::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, GraphQlError, PathSegment,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use graphql_parser::query::Field;
use serde_json::Value as Json;

pub(crate) fn resolve_mutation_field<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
) -> BoxFuture<'e, (String, Json)> {
    async move {
        let key = fields::response_key(field);
        let path = vec![PathSegment::Field(key.clone())];
        let value = match field.name.as_str() {
            "createUser" => create_user(exec, field, &path).await,
            "changeUser" => change_user(exec, field, &path).await,
            "deleteUser" => delete_user(exec, field, &path).await,
            "createPost" => create_post(exec, field, &path).await,
            "changePost" => change_post(exec, field, &path).await,
            "deletePost" => delete_post(exec, field, &path).await,
            "createProfile" => create_profile(exec, field, &path).await,
            "changeProfile" => change_profile(exec, field, &path).await,
            "deleteProfile" => delete_profile(exec, field, &path).await,
            "subscribeTo" => subscribe_to(exec, field, &path).await,
            "unsubscribeFrom" => unsubscribe_from(exec, field, &path).await,
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

async fn create_user<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let input = match args::input_arg::<CreateUserInput>(field, "dto", &exec.variables) {
        Ok(input) => input,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.create_user(input).await {
        Ok(user) => fields::user_object(exec, user, &field.selection_set, path.to_vec()).await,
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn change_user<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    let input = match args::input_arg::<ChangeUserInput>(field, "dto", &exec.variables) {
        Ok(input) => input,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.update_user(&id, input).await {
        Ok(user) => fields::user_object(exec, user, &field.selection_set, path.to_vec()).await,
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn delete_user<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.delete_user(&id).await {
        Ok(()) => Json::String("deleted".to_string()),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn create_post<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let input = match args::input_arg::<CreatePostInput>(field, "dto", &exec.variables) {
        Ok(input) => input,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.create_post(input).await {
        Ok(post) => fields::post_object(exec, &post, &field.selection_set),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn change_post<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    let input = match args::input_arg::<ChangePostInput>(field, "dto", &exec.variables) {
        Ok(input) => input,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.update_post(&id, input).await {
        Ok(post) => fields::post_object(exec, &post, &field.selection_set),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn delete_post<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.delete_post(&id).await {
        Ok(()) => Json::String("deleted".to_string()),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn create_profile<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let input = match args::input_arg::<CreateProfileInput>(field, "dto", &exec.variables) {
        Ok(input) => input,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.create_profile(input).await {
        Ok(profile) => {
            fields::profile_object(exec, profile, &field.selection_set, path.to_vec()).await
        }
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn change_profile<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    let input = match args::input_arg::<ChangeProfileInput>(field, "dto", &exec.variables) {
        Ok(input) => input,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.update_profile(&id, input).await {
        Ok(profile) => {
            fields::profile_object(exec, profile, &field.selection_set, path.to_vec()).await
        }
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn delete_profile<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let id = match args::uuid_arg(field, "id", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.delete_profile(&id).await {
        Ok(()) => Json::String("deleted".to_string()),
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn subscribe_to<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let subscriber_id = match args::uuid_arg(field, "userId", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    let author_id = match args::uuid_arg(field, "authorId", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.subscribe(&subscriber_id, &author_id).await {
        Ok(user) => fields::user_object(exec, user, &field.selection_set, path.to_vec()).await,
        Err(error) => fail(exec, path, error.to_string()),
    }
}

async fn unsubscribe_from<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> Json {
    let subscriber_id = match args::uuid_arg(field, "userId", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    let author_id = match args::uuid_arg(field, "authorId", &exec.variables) {
        Ok(id) => id,
        Err(message) => return fail(exec, path, message),
    };
    match exec.ctx.store.unsubscribe(&subscriber_id, &author_id).await {
        Ok(()) => Json::String("unsubscribed".to_string()),
        Err(error) => fail(exec, path, error.to_string()),
    }
}
