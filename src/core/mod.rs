//! Core module containing the domain model and error types

pub mod entity;
pub mod error;

pub use entity::{
    ChangePostInput, ChangeProfileInput, ChangeUserInput, CreatePostInput, CreateProfileInput,
    CreateUserInput, MemberType, MemberTypeId, Post, Profile, SubscriptionRow, User,
};
pub use error::{DataSourceError, GraphQlError, GraphQlResponse, PathSegment};
