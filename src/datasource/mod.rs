//! Data source collaborator boundary
//!
//! The resolution core treats persistent storage as a generic relational
//! collaborator with findUnique/findMany/create/update/delete semantics.
//! Everything behind [`DataSource`] may suspend; nothing in the core assumes
//! a particular backend.

pub mod in_memory;

pub use in_memory::InMemoryDataSource;

use crate::core::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, DataSourceError, MemberType, MemberTypeId, Post, Profile, User,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Which subscription join rows a bulk user fetch should eagerly include.
///
/// The executor derives this from the query's selection set ahead of
/// resolution so the list fetch can bring join rows back in the same round
/// trip instead of issuing one extra query per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionInclude {
    /// Include rows where the fetched user is the subscriber.
    pub user_subscribed_to: bool,
    /// Include rows where the fetched user is the author.
    pub subscribed_to_user: bool,
}

impl SubscriptionInclude {
    pub const NONE: SubscriptionInclude = SubscriptionInclude {
        user_subscribed_to: false,
        subscribed_to_user: false,
    };

    pub fn any(&self) -> bool {
        self.user_subscribed_to || self.subscribed_to_user
    }
}

/// Relational data source for the social blogging domain.
///
/// Single-row reads return `None` on a miss; bulk reads return only the rows
/// that exist, unordered — matching results back to input keys is the batch
/// loader's job. Write paths report a missing row as
/// [`DataSourceError::NotFound`].
#[async_trait]
pub trait DataSource: Send + Sync {
    // === Single-row reads ===

    async fn user(&self, id: &Uuid) -> Result<Option<User>, DataSourceError>;
    async fn post(&self, id: &Uuid) -> Result<Option<Post>, DataSourceError>;
    async fn profile(&self, id: &Uuid) -> Result<Option<Profile>, DataSourceError>;
    async fn member_type(&self, id: MemberTypeId) -> Result<Option<MemberType>, DataSourceError>;

    // === List reads ===

    /// List all users, optionally with their subscription join rows attached
    /// in the same round trip.
    async fn users(&self, include: SubscriptionInclude) -> Result<Vec<User>, DataSourceError>;
    async fn posts(&self) -> Result<Vec<Post>, DataSourceError>;
    async fn profiles(&self) -> Result<Vec<Profile>, DataSourceError>;
    async fn member_types(&self) -> Result<Vec<MemberType>, DataSourceError>;

    // === Bulk reads (batch loader backends) ===

    /// Users matching any of `ids`. At most one row per key.
    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, DataSourceError>;

    /// Profiles whose `user_id` matches any of `user_ids`. At most one row
    /// per key.
    async fn profiles_by_user_ids(&self, user_ids: &[Uuid])
    -> Result<Vec<Profile>, DataSourceError>;

    /// Posts whose `author_id` matches any of `author_ids`. Any number of
    /// rows per key.
    async fn posts_by_author_ids(&self, author_ids: &[Uuid])
    -> Result<Vec<Post>, DataSourceError>;

    /// Member tiers matching any of `ids`.
    async fn member_types_by_ids(
        &self,
        ids: &[MemberTypeId],
    ) -> Result<Vec<MemberType>, DataSourceError>;

    // === Subscription reads (single-parent fallback paths) ===

    /// Users subscribed to `author_id`.
    async fn subscribers_of(&self, author_id: &Uuid) -> Result<Vec<User>, DataSourceError>;

    /// Users that `subscriber_id` is subscribed to.
    async fn subscriptions_of(&self, subscriber_id: &Uuid) -> Result<Vec<User>, DataSourceError>;

    // === Writes (never batched) ===

    async fn create_user(&self, input: CreateUserInput) -> Result<User, DataSourceError>;
    async fn update_user(&self, id: &Uuid, input: ChangeUserInput)
    -> Result<User, DataSourceError>;
    async fn delete_user(&self, id: &Uuid) -> Result<(), DataSourceError>;

    async fn create_post(&self, input: CreatePostInput) -> Result<Post, DataSourceError>;
    async fn update_post(&self, id: &Uuid, input: ChangePostInput)
    -> Result<Post, DataSourceError>;
    async fn delete_post(&self, id: &Uuid) -> Result<(), DataSourceError>;

    async fn create_profile(&self, input: CreateProfileInput) -> Result<Profile, DataSourceError>;
    async fn update_profile(
        &self,
        id: &Uuid,
        input: ChangeProfileInput,
    ) -> Result<Profile, DataSourceError>;
    async fn delete_profile(&self, id: &Uuid) -> Result<(), DataSourceError>;

    /// Create a subscription join row and return the updated subscriber.
    async fn subscribe(
        &self,
        subscriber_id: &Uuid,
        author_id: &Uuid,
    ) -> Result<User, DataSourceError>;

    /// Remove the subscription join row, if present.
    async fn unsubscribe(
        &self,
        subscriber_id: &Uuid,
        author_id: &Uuid,
    ) -> Result<(), DataSourceError>;
}
