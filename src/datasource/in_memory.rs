//! In-memory implementation of the data source for testing and development

use crate::core::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, DataSourceError, MemberType, MemberTypeId, Post, Profile, SubscriptionRow,
    User,
};
use crate::datasource::{DataSource, SubscriptionInclude};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Snapshot of how many bulk fetches the store has served.
///
/// Batching tests assert on these to prove a fan-out query coalesced into
/// one round trip per relation instead of one per parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCounts {
    pub users_by_ids: usize,
    pub profiles_by_user_ids: usize,
    pub posts_by_author_ids: usize,
    pub member_types_by_ids: usize,
    pub user_lists: usize,
}

#[derive(Debug, Default)]
struct FetchStats {
    users_by_ids: AtomicUsize,
    profiles_by_user_ids: AtomicUsize,
    posts_by_author_ids: AtomicUsize,
    member_types_by_ids: AtomicUsize,
    user_lists: AtomicUsize,
}

/// In-memory data source.
///
/// Useful for testing and development. Uses `RwLock` for thread-safe access.
/// Member tiers are a closed set and are seeded at construction.
#[derive(Clone)]
pub struct InMemoryDataSource {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
    profiles: Arc<RwLock<HashMap<Uuid, Profile>>>,
    member_types: Arc<RwLock<HashMap<MemberTypeId, MemberType>>>,
    subscriptions: Arc<RwLock<Vec<SubscriptionRow>>>,
    stats: Arc<FetchStats>,
}

impl InMemoryDataSource {
    /// Create a new store with the two member tiers seeded.
    pub fn new() -> Self {
        let mut tiers = HashMap::new();
        tiers.insert(
            MemberTypeId::Basic,
            MemberType {
                id: MemberTypeId::Basic,
                discount: 2.5,
                posts_limit_per_month: 20,
            },
        );
        tiers.insert(
            MemberTypeId::Business,
            MemberType {
                id: MemberTypeId::Business,
                discount: 7.5,
                posts_limit_per_month: 100,
            },
        );

        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            posts: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
            member_types: Arc::new(RwLock::new(tiers)),
            subscriptions: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(FetchStats::default()),
        }
    }

    /// Bulk-fetch counters accumulated since construction.
    pub fn fetch_counts(&self) -> FetchCounts {
        FetchCounts {
            users_by_ids: self.stats.users_by_ids.load(Ordering::SeqCst),
            profiles_by_user_ids: self.stats.profiles_by_user_ids.load(Ordering::SeqCst),
            posts_by_author_ids: self.stats.posts_by_author_ids.load(Ordering::SeqCst),
            member_types_by_ids: self.stats.member_types_by_ids.load(Ordering::SeqCst),
            user_lists: self.stats.user_lists.load(Ordering::SeqCst),
        }
    }

    fn lock_err(what: &str) -> DataSourceError {
        DataSourceError::Storage(format!("failed to acquire {what} lock"))
    }

    fn join_rows_for(
        subscriptions: &[SubscriptionRow],
        user: &mut User,
        include: SubscriptionInclude,
    ) {
        if include.user_subscribed_to {
            user.user_subscribed_to = Some(
                subscriptions
                    .iter()
                    .filter(|row| row.subscriber_id == user.id)
                    .copied()
                    .collect(),
            );
        }
        if include.subscribed_to_user {
            user.subscribed_to_user = Some(
                subscriptions
                    .iter()
                    .filter(|row| row.author_id == user.id)
                    .copied()
                    .collect(),
            );
        }
    }
}

impl Default for InMemoryDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn user(&self, id: &Uuid) -> Result<Option<User>, DataSourceError> {
        let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
        Ok(users.get(id).cloned())
    }

    async fn post(&self, id: &Uuid) -> Result<Option<Post>, DataSourceError> {
        let posts = self.posts.read().map_err(|_| Self::lock_err("posts"))?;
        Ok(posts.get(id).cloned())
    }

    async fn profile(&self, id: &Uuid) -> Result<Option<Profile>, DataSourceError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| Self::lock_err("profiles"))?;
        Ok(profiles.get(id).cloned())
    }

    async fn member_type(&self, id: MemberTypeId) -> Result<Option<MemberType>, DataSourceError> {
        let tiers = self
            .member_types
            .read()
            .map_err(|_| Self::lock_err("member_types"))?;
        Ok(tiers.get(&id).cloned())
    }

    async fn users(&self, include: SubscriptionInclude) -> Result<Vec<User>, DataSourceError> {
        self.stats.user_lists.fetch_add(1, Ordering::SeqCst);
        let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
        let mut all: Vec<User> = users.values().cloned().collect();
        if include.any() {
            let subscriptions = self
                .subscriptions
                .read()
                .map_err(|_| Self::lock_err("subscriptions"))?;
            for user in &mut all {
                Self::join_rows_for(&subscriptions, user, include);
            }
        }
        Ok(all)
    }

    async fn posts(&self) -> Result<Vec<Post>, DataSourceError> {
        let posts = self.posts.read().map_err(|_| Self::lock_err("posts"))?;
        Ok(posts.values().cloned().collect())
    }

    async fn profiles(&self) -> Result<Vec<Profile>, DataSourceError> {
        let profiles = self
            .profiles
            .read()
            .map_err(|_| Self::lock_err("profiles"))?;
        Ok(profiles.values().cloned().collect())
    }

    async fn member_types(&self) -> Result<Vec<MemberType>, DataSourceError> {
        let tiers = self
            .member_types
            .read()
            .map_err(|_| Self::lock_err("member_types"))?;
        Ok(tiers.values().cloned().collect())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, DataSourceError> {
        self.stats.users_by_ids.fetch_add(1, Ordering::SeqCst);
        let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn profiles_by_user_ids(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<Profile>, DataSourceError> {
        self.stats
            .profiles_by_user_ids
            .fetch_add(1, Ordering::SeqCst);
        let profiles = self
            .profiles
            .read()
            .map_err(|_| Self::lock_err("profiles"))?;
        Ok(profiles
            .values()
            .filter(|profile| user_ids.contains(&profile.user_id))
            .cloned()
            .collect())
    }

    async fn posts_by_author_ids(&self, author_ids: &[Uuid]) -> Result<Vec<Post>, DataSourceError> {
        self.stats
            .posts_by_author_ids
            .fetch_add(1, Ordering::SeqCst);
        let posts = self.posts.read().map_err(|_| Self::lock_err("posts"))?;
        Ok(posts
            .values()
            .filter(|post| author_ids.contains(&post.author_id))
            .cloned()
            .collect())
    }

    async fn member_types_by_ids(
        &self,
        ids: &[MemberTypeId],
    ) -> Result<Vec<MemberType>, DataSourceError> {
        self.stats
            .member_types_by_ids
            .fetch_add(1, Ordering::SeqCst);
        let tiers = self
            .member_types
            .read()
            .map_err(|_| Self::lock_err("member_types"))?;
        Ok(ids.iter().filter_map(|id| tiers.get(id).cloned()).collect())
    }

    async fn subscribers_of(&self, author_id: &Uuid) -> Result<Vec<User>, DataSourceError> {
        let subscriptions = self
            .subscriptions
            .read()
            .map_err(|_| Self::lock_err("subscriptions"))?;
        let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
        Ok(subscriptions
            .iter()
            .filter(|row| &row.author_id == author_id)
            .filter_map(|row| users.get(&row.subscriber_id).cloned())
            .collect())
    }

    async fn subscriptions_of(&self, subscriber_id: &Uuid) -> Result<Vec<User>, DataSourceError> {
        let subscriptions = self
            .subscriptions
            .read()
            .map_err(|_| Self::lock_err("subscriptions"))?;
        let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
        Ok(subscriptions
            .iter()
            .filter(|row| &row.subscriber_id == subscriber_id)
            .filter_map(|row| users.get(&row.author_id).cloned())
            .collect())
    }

    async fn create_user(&self, input: CreateUserInput) -> Result<User, DataSourceError> {
        let user = User::new(input.name, input.balance);
        let mut users = self.users.write().map_err(|_| Self::lock_err("users"))?;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: &Uuid,
        input: ChangeUserInput,
    ) -> Result<User, DataSourceError> {
        let mut users = self.users.write().map_err(|_| Self::lock_err("users"))?;
        let user = users
            .get_mut(id)
            .ok_or_else(|| DataSourceError::not_found("user", id))?;
        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(balance) = input.balance {
            user.balance = balance;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &Uuid) -> Result<(), DataSourceError> {
        let mut users = self.users.write().map_err(|_| Self::lock_err("users"))?;
        users
            .remove(id)
            .ok_or_else(|| DataSourceError::not_found("user", id))?;
        drop(users);

        // Cascade: the relational schema deletes owned rows with the user.
        let mut posts = self.posts.write().map_err(|_| Self::lock_err("posts"))?;
        posts.retain(|_, post| &post.author_id != id);
        drop(posts);

        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| Self::lock_err("profiles"))?;
        profiles.retain(|_, profile| &profile.user_id != id);
        drop(profiles);

        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| Self::lock_err("subscriptions"))?;
        subscriptions.retain(|row| &row.subscriber_id != id && &row.author_id != id);
        Ok(())
    }

    async fn create_post(&self, input: CreatePostInput) -> Result<Post, DataSourceError> {
        {
            let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
            if !users.contains_key(&input.author_id) {
                return Err(DataSourceError::InvalidReference {
                    entity: "post",
                    referenced: "user",
                    id: input.author_id,
                });
            }
        }
        let post = Post::new(input.title, input.content, input.author_id);
        let mut posts = self.posts.write().map_err(|_| Self::lock_err("posts"))?;
        posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: &Uuid,
        input: ChangePostInput,
    ) -> Result<Post, DataSourceError> {
        let mut posts = self.posts.write().map_err(|_| Self::lock_err("posts"))?;
        let post = posts
            .get_mut(id)
            .ok_or_else(|| DataSourceError::not_found("post", id))?;
        if let Some(title) = input.title {
            post.title = title;
        }
        if let Some(content) = input.content {
            post.content = content;
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, id: &Uuid) -> Result<(), DataSourceError> {
        let mut posts = self.posts.write().map_err(|_| Self::lock_err("posts"))?;
        posts
            .remove(id)
            .ok_or_else(|| DataSourceError::not_found("post", id))?;
        Ok(())
    }

    async fn create_profile(&self, input: CreateProfileInput) -> Result<Profile, DataSourceError> {
        {
            let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
            if !users.contains_key(&input.user_id) {
                return Err(DataSourceError::InvalidReference {
                    entity: "profile",
                    referenced: "user",
                    id: input.user_id,
                });
            }
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            is_male: input.is_male,
            year_of_birth: input.year_of_birth,
            user_id: input.user_id,
            member_type_id: input.member_type_id,
        };
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| Self::lock_err("profiles"))?;
        profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        input: ChangeProfileInput,
    ) -> Result<Profile, DataSourceError> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| Self::lock_err("profiles"))?;
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| DataSourceError::not_found("profile", id))?;
        if let Some(is_male) = input.is_male {
            profile.is_male = is_male;
        }
        if let Some(year) = input.year_of_birth {
            profile.year_of_birth = year;
        }
        if let Some(tier) = input.member_type_id {
            profile.member_type_id = tier;
        }
        Ok(profile.clone())
    }

    async fn delete_profile(&self, id: &Uuid) -> Result<(), DataSourceError> {
        let mut profiles = self
            .profiles
            .write()
            .map_err(|_| Self::lock_err("profiles"))?;
        profiles
            .remove(id)
            .ok_or_else(|| DataSourceError::not_found("profile", id))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        subscriber_id: &Uuid,
        author_id: &Uuid,
    ) -> Result<User, DataSourceError> {
        let users = self.users.read().map_err(|_| Self::lock_err("users"))?;
        let subscriber = users
            .get(subscriber_id)
            .cloned()
            .ok_or_else(|| DataSourceError::not_found("user", subscriber_id))?;
        if !users.contains_key(author_id) {
            return Err(DataSourceError::not_found("user", author_id));
        }
        drop(users);

        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| Self::lock_err("subscriptions"))?;
        let row = SubscriptionRow {
            subscriber_id: *subscriber_id,
            author_id: *author_id,
        };
        if !subscriptions.contains(&row) {
            subscriptions.push(row);
        }
        Ok(subscriber)
    }

    async fn unsubscribe(
        &self,
        subscriber_id: &Uuid,
        author_id: &Uuid,
    ) -> Result<(), DataSourceError> {
        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| Self::lock_err("subscriptions"))?;
        subscriptions
            .retain(|row| !(&row.subscriber_id == subscriber_id && &row.author_id == author_id));
        Ok(())
    }
}
