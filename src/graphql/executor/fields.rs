//! Per-entity field resolution
//!
//! Scalar fields read straight off the parent struct; relation fields go
//! through the request's batch loaders so sibling resolutions coalesce into
//! one bulk fetch per relation. A failing field resolves to null and records
//! an error at its own path — siblings are never affected.

use super::Exec;
use crate::core::{GraphQlError, MemberType, PathSegment, Post, Profile, User};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use graphql_parser::query::{Field, Selection, SelectionSet, TypeCondition};
use serde_json::{Value as Json, json};

use crate::graphql::validate::FragmentMap;

/// The key the field's value is stored under in the response object.
pub(crate) fn response_key(field: &Field<'_, String>) -> String {
    field.alias.clone().unwrap_or_else(|| field.name.clone())
}

/// Expand fragment spreads and inline fragments into the flat field list
/// for an object of `type_name`.
pub(crate) fn flatten_fields<'q>(
    set: &'q SelectionSet<'q, String>,
    fragments: &FragmentMap<'q, 'q>,
    type_name: &str,
) -> Vec<&'q Field<'q, String>> {
    let mut fields = Vec::new();
    collect_fields(set, fragments, type_name, &mut Vec::new(), &mut fields);
    fields
}

fn collect_fields<'q>(
    set: &'q SelectionSet<'q, String>,
    fragments: &FragmentMap<'q, 'q>,
    type_name: &str,
    spread_stack: &mut Vec<&'q str>,
    out: &mut Vec<&'q Field<'q, String>>,
) {
    for selection in &set.items {
        match selection {
            Selection::Field(field) => out.push(field),
            Selection::InlineFragment(inline) => {
                let applies = match &inline.type_condition {
                    Some(TypeCondition::On(condition)) => condition.as_str() == type_name,
                    None => true,
                };
                if applies {
                    collect_fields(&inline.selection_set, fragments, type_name, spread_stack, out);
                }
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                if spread_stack.contains(&name) {
                    continue;
                }
                if let Some(fragment) = fragments.get(name) {
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if condition.as_str() == type_name {
                        spread_stack.push(name);
                        collect_fields(
                            &fragment.selection_set,
                            fragments,
                            type_name,
                            spread_stack,
                            out,
                        );
                        spread_stack.pop();
                    }
                }
            }
        }
    }
}

fn fail(exec: &Exec<'_>, path: &[PathSegment], message: impl Into<String>) -> Json {
    exec.ctx
        .push_error(GraphQlError::at_path(message, path.to_vec()));
    Json::Null
}

// === User ===

/// Resolve a user object against a selection set. Fields resolve
/// concurrently so their loader calls land in the same batch.
pub(crate) fn user_object<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    user: User,
    set: &'q SelectionSet<'q, String>,
    path: Vec<PathSegment>,
) -> BoxFuture<'e, Json> {
    async move {
        let fields = flatten_fields(set, &exec.fragments, "UserType");
        let resolved = join_all(
            fields
                .into_iter()
                .map(|field| user_field(exec, &user, field, &path)),
        )
        .await;
        object_from(resolved)
    }
    .boxed()
}

async fn user_field<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    user: &User,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> (String, Json) {
    let key = response_key(field);
    let mut field_path = path.to_vec();
    field_path.push(PathSegment::Field(key.clone()));

    let value = match field.name.as_str() {
        "id" => json!(user.id),
        "name" => json!(user.name),
        "balance" => json!(user.balance),
        "profile" => match exec.ctx.profile_by_user.load(user.id).await {
            Ok(Some(profile)) => {
                profile_object(exec, profile, &field.selection_set, field_path).await
            }
            Ok(None) => Json::Null,
            Err(error) => fail(exec, &field_path, error.to_string()),
        },
        "posts" => match exec.ctx.posts_by_author.load(user.id).await {
            Ok(posts) => Json::Array(
                posts
                    .iter()
                    .map(|post| post_object(exec, post, &field.selection_set))
                    .collect(),
            ),
            Err(error) => fail(exec, &field_path, error.to_string()),
        },
        "userSubscribedTo" => {
            subscription_field(exec, user, field, &field_path, SubscriptionSide::Authors).await
        }
        "subscribedToUser" => {
            subscription_field(exec, user, field, &field_path, SubscriptionSide::Subscribers).await
        }
        _ => Json::Null,
    };

    (key, value)
}

#[derive(Clone, Copy)]
enum SubscriptionSide {
    /// `userSubscribedTo`: the authors this user follows.
    Authors,
    /// `subscribedToUser`: the users following this author.
    Subscribers,
}

async fn subscription_field<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    user: &User,
    field: &'q Field<'q, String>,
    field_path: &[PathSegment],
    side: SubscriptionSide,
) -> Json {
    let rows = match side {
        SubscriptionSide::Authors => &user.user_subscribed_to,
        SubscriptionSide::Subscribers => &user.subscribed_to_user,
    };

    let loaded: Result<Vec<User>, String> = match rows {
        // Join rows came back with the parent fetch: batch-load the
        // referenced users. Rows whose user vanished are skipped.
        Some(rows) => {
            let ids = rows
                .iter()
                .map(|row| match side {
                    SubscriptionSide::Authors => row.author_id,
                    SubscriptionSide::Subscribers => row.subscriber_id,
                })
                .collect::<Vec<_>>();
            if ids.is_empty() {
                Ok(Vec::new())
            } else {
                exec.ctx
                    .user_by_id
                    .load_many(ids)
                    .await
                    .map(|users| users.into_iter().flatten().collect())
                    .map_err(|error| error.to_string())
            }
        }
        // Parent was fetched without join rows (single-row path): read the
        // relation directly.
        None => {
            let result = match side {
                SubscriptionSide::Authors => exec.ctx.store.subscriptions_of(&user.id).await,
                SubscriptionSide::Subscribers => exec.ctx.store.subscribers_of(&user.id).await,
            };
            result.map_err(|error| error.to_string())
        }
    };

    match loaded {
        Ok(users) => {
            let items = join_all(users.into_iter().enumerate().map(|(index, child)| {
                let mut child_path = field_path.to_vec();
                child_path.push(PathSegment::Index(index));
                user_object(exec, child, &field.selection_set, child_path)
            }))
            .await;
            Json::Array(items)
        }
        Err(message) => fail(exec, field_path, message),
    }
}

// === Profile ===

pub(crate) fn profile_object<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    profile: Profile,
    set: &'q SelectionSet<'q, String>,
    path: Vec<PathSegment>,
) -> BoxFuture<'e, Json> {
    async move {
        let fields = flatten_fields(set, &exec.fragments, "ProfileType");
        let resolved = join_all(
            fields
                .into_iter()
                .map(|field| profile_field(exec, &profile, field, &path)),
        )
        .await;
        object_from(resolved)
    }
    .boxed()
}

async fn profile_field<'e, 'q: 'e>(
    exec: &'e Exec<'q>,
    profile: &Profile,
    field: &'q Field<'q, String>,
    path: &[PathSegment],
) -> (String, Json) {
    let key = response_key(field);
    let mut field_path = path.to_vec();
    field_path.push(PathSegment::Field(key.clone()));

    let value = match field.name.as_str() {
        "id" => json!(profile.id),
        "isMale" => json!(profile.is_male),
        "yearOfBirth" => json!(profile.year_of_birth),
        "userId" => json!(profile.user_id),
        "memberTypeId" => json!(profile.member_type_id),
        "user" => match exec.ctx.user_by_id.load(profile.user_id).await {
            Ok(Some(user)) => user_object(exec, user, &field.selection_set, field_path).await,
            Ok(None) => Json::Null,
            Err(error) => fail(exec, &field_path, error.to_string()),
        },
        "memberType" => match exec.ctx.member_type_by_id.load(profile.member_type_id).await {
            Ok(Some(tier)) => member_type_object(exec, &tier, &field.selection_set),
            Ok(None) => Json::Null,
            Err(error) => fail(exec, &field_path, error.to_string()),
        },
        _ => Json::Null,
    };

    (key, value)
}

// === Post and MemberType (scalar-only) ===

pub(crate) fn post_object<'q>(
    exec: &Exec<'q>,
    post: &Post,
    set: &'q SelectionSet<'q, String>,
) -> Json {
    let fields = flatten_fields(set, &exec.fragments, "PostType");
    object_from(fields.into_iter().map(|field| {
        let value = match field.name.as_str() {
            "id" => json!(post.id),
            "title" => json!(post.title),
            "content" => json!(post.content),
            "authorId" => json!(post.author_id),
            _ => Json::Null,
        };
        (response_key(field), value)
    }))
}

pub(crate) fn member_type_object<'q>(
    exec: &Exec<'q>,
    tier: &MemberType,
    set: &'q SelectionSet<'q, String>,
) -> Json {
    let fields = flatten_fields(set, &exec.fragments, "MemberType");
    object_from(fields.into_iter().map(|field| {
        let value = match field.name.as_str() {
            "id" => json!(tier.id),
            "discount" => json!(tier.discount),
            "postsLimitPerMonth" => json!(tier.posts_limit_per_month),
            _ => Json::Null,
        };
        (response_key(field), value)
    }))
}

fn object_from(entries: impl IntoIterator<Item = (String, Json)>) -> Json {
    let mut map = serde_json::Map::new();
    for (key, value) in entries {
        map.insert(key, value);
    }
    Json::Object(map)
}
