//! Domain entities for the social blogging graph
//!
//! The entity graph is small and closed: users own posts and at most one
//! profile, profiles reference a member tier, and users subscribe to each
//! other through join rows. Relationships are foreign-key associations,
//! never embedded documents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Member tier identifier.
///
/// The tier set is closed, so it is modelled as an enum rather than an open
/// string. Wire representation is the lowercase tier name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberTypeId {
    Basic,
    Business,
}

impl MemberTypeId {
    /// All known tiers, in display order.
    pub const ALL: [MemberTypeId; 2] = [MemberTypeId::Basic, MemberTypeId::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberTypeId::Basic => "basic",
            MemberTypeId::Business => "business",
        }
    }
}

impl fmt::Display for MemberTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberTypeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(MemberTypeId::Basic),
            "business" => Ok(MemberTypeId::Business),
            other => Err(format!("unknown member type id: {other}")),
        }
    }
}

/// A member tier with its perks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberType {
    pub id: MemberTypeId,
    pub discount: f64,
    pub posts_limit_per_month: i32,
}

/// One side of the many-to-many subscription association between users.
///
/// `subscriber_id` follows `author_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRow {
    pub subscriber_id: Uuid,
    pub author_id: Uuid,
}

/// A user account.
///
/// The two subscription vectors carry join rows only when the fetch that
/// produced this value eagerly included them; `None` means "not fetched",
/// not "no subscriptions".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub balance: f64,
    /// Join rows where this user is the subscriber.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_subscribed_to: Option<Vec<SubscriptionRow>>,
    /// Join rows where this user is the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_to_user: Option<Vec<SubscriptionRow>>,
}

impl User {
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            balance,
            user_subscribed_to: None,
            subscribed_to_user: None,
        }
    }
}

/// A blog post, owned by its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

impl Post {
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            author_id,
        }
    }
}

/// A user profile. At most one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub is_male: bool,
    pub year_of_birth: i32,
    pub user_id: Uuid,
    pub member_type_id: MemberTypeId,
}

// === Input objects ===

/// Payload for `createUser`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub name: String,
    pub balance: f64,
}

/// Payload for `changeUser`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUserInput {
    pub name: Option<String>,
    pub balance: Option<f64>,
}

/// Payload for `createPost`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

/// Payload for `changePost`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Payload for `createProfile`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileInput {
    pub is_male: bool,
    pub year_of_birth: i32,
    pub user_id: Uuid,
    pub member_type_id: MemberTypeId,
}

/// Payload for `changeProfile`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeProfileInput {
    pub is_male: Option<bool>,
    pub year_of_birth: Option<i32>,
    pub member_type_id: Option<MemberTypeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_type_id_round_trips_through_str() {
        for id in MemberTypeId::ALL {
            assert_eq!(id.as_str().parse::<MemberTypeId>(), Ok(id));
        }
        assert!("premium".parse::<MemberTypeId>().is_err());
    }

    #[test]
    fn user_serializes_camel_case_and_skips_absent_join_rows() {
        let user = User::new("alice", 12.5);
        let json = serde_json::to_value(&user).expect("serialize");
        assert!(json.get("balance").is_some());
        assert!(json.get("userSubscribedTo").is_none());

        let author = Uuid::new_v4();
        let mut subscribed = User::new("bob", 0.0);
        subscribed.user_subscribed_to = Some(vec![SubscriptionRow {
            subscriber_id: subscribed.id,
            author_id: author,
        }]);
        let json = serde_json::to_value(&subscribed).expect("serialize");
        assert_eq!(
            json["userSubscribedTo"][0]["authorId"],
            serde_json::json!(author.to_string())
        );
    }
}
