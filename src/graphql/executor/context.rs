//! Per-request execution context
//!
//! One [`ExecutionContext`] is built at request entry and handed by reference
//! through the whole resolution tree. It owns one fresh [`Loader`] per
//! relation, so nothing resembling a cache survives the request. The data
//! source handle is shared read-only across all resolvers of the request.

use crate::core::{DataSourceError, GraphQlError, MemberType, MemberTypeId, Post, Profile, User};
use crate::datasource::DataSource;
use crate::loader::{BatchFn, Loader};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Request-scoped bundle of the data source handle and one loader per
/// relation, plus the field errors accumulated during resolution.
pub struct ExecutionContext {
    pub store: Arc<dyn DataSource>,
    /// User rows by primary key.
    pub user_by_id: Loader<Uuid, Option<User>>,
    /// Profile rows by the owning user's id (one-to-one).
    pub profile_by_user: Loader<Uuid, Option<Profile>>,
    /// Post rows grouped by author id (one-to-many).
    pub posts_by_author: Loader<Uuid, Vec<Post>>,
    /// Member tiers by tier id.
    pub member_type_by_id: Loader<MemberTypeId, Option<MemberType>>,
    errors: Mutex<Vec<GraphQlError>>,
}

impl ExecutionContext {
    pub fn new(store: Arc<dyn DataSource>) -> Self {
        Self {
            user_by_id: Loader::new("user_by_id", Arc::new(UserById::new(&store))),
            profile_by_user: Loader::new("profile_by_user", Arc::new(ProfileByUserId::new(&store))),
            posts_by_author: Loader::new("posts_by_author", Arc::new(PostsByAuthorId::new(&store))),
            member_type_by_id: Loader::new(
                "member_type_by_id",
                Arc::new(MemberTypeById::new(&store)),
            ),
            store,
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Record a field-level resolution error; the field itself resolves to
    /// null and siblings keep going.
    pub fn push_error(&self, error: GraphQlError) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error);
        }
    }

    pub fn take_errors(&self) -> Vec<GraphQlError> {
        match self.errors.lock() {
            Ok(mut errors) => std::mem::take(&mut *errors),
            Err(_) => Vec::new(),
        }
    }
}

struct UserById {
    store: Arc<dyn DataSource>,
}

impl UserById {
    fn new(store: &Arc<dyn DataSource>) -> Self {
        Self {
            store: store.clone(),
        }
    }
}

#[async_trait]
impl BatchFn<Uuid, Option<User>> for UserById {
    async fn fetch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Option<User>>, DataSourceError> {
        let rows = self.store.users_by_ids(keys).await?;
        Ok(rows.into_iter().map(|user| (user.id, Some(user))).collect())
    }
}

struct ProfileByUserId {
    store: Arc<dyn DataSource>,
}

impl ProfileByUserId {
    fn new(store: &Arc<dyn DataSource>) -> Self {
        Self {
            store: store.clone(),
        }
    }
}

#[async_trait]
impl BatchFn<Uuid, Option<Profile>> for ProfileByUserId {
    async fn fetch(
        &self,
        keys: &[Uuid],
    ) -> Result<HashMap<Uuid, Option<Profile>>, DataSourceError> {
        let rows = self.store.profiles_by_user_ids(keys).await?;
        Ok(rows
            .into_iter()
            .map(|profile| (profile.user_id, Some(profile)))
            .collect())
    }
}

struct PostsByAuthorId {
    store: Arc<dyn DataSource>,
}

impl PostsByAuthorId {
    fn new(store: &Arc<dyn DataSource>) -> Self {
        Self {
            store: store.clone(),
        }
    }
}

#[async_trait]
impl BatchFn<Uuid, Vec<Post>> for PostsByAuthorId {
    async fn fetch(&self, keys: &[Uuid]) -> Result<HashMap<Uuid, Vec<Post>>, DataSourceError> {
        let rows = self.store.posts_by_author_ids(keys).await?;
        let mut grouped: HashMap<Uuid, Vec<Post>> = HashMap::new();
        for post in rows {
            grouped.entry(post.author_id).or_default().push(post);
        }
        Ok(grouped)
    }
}

struct MemberTypeById {
    store: Arc<dyn DataSource>,
}

impl MemberTypeById {
    fn new(store: &Arc<dyn DataSource>) -> Self {
        Self {
            store: store.clone(),
        }
    }
}

#[async_trait]
impl BatchFn<MemberTypeId, Option<MemberType>> for MemberTypeById {
    async fn fetch(
        &self,
        keys: &[MemberTypeId],
    ) -> Result<HashMap<MemberTypeId, Option<MemberType>>, DataSourceError> {
        let rows = self.store.member_types_by_ids(keys).await?;
        Ok(rows.into_iter().map(|tier| (tier.id, Some(tier))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CreateUserInput;
    use crate::datasource::InMemoryDataSource;

    #[tokio::test]
    async fn contexts_do_not_share_loader_state() {
        let store = Arc::new(InMemoryDataSource::new());
        let user = store
            .create_user(CreateUserInput {
                name: "alice".to_string(),
                balance: 1.0,
            })
            .await
            .expect("create");

        let first = ExecutionContext::new(store.clone() as Arc<dyn DataSource>);
        first.user_by_id.load(user.id).await.expect("first load");
        let second = ExecutionContext::new(store.clone() as Arc<dyn DataSource>);
        second.user_by_id.load(user.id).await.expect("second load");

        // Each request scope fetched for itself.
        assert_eq!(store.fetch_counts().users_by_ids, 2);
    }
}
