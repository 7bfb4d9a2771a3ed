//! Static type graph for the social blogging schema
//!
//! The executor does not interpret wire-level SDL; this index is the schema
//! collaborator it walks — object types with their field sets, and the root
//! query/mutation field sets. Validation checks selection sets against it
//! before any resolver runs.

use std::collections::HashMap;

/// What a field resolves to: a leaf scalar, a single object, or a list of
/// objects of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar,
    Object(&'static str),
    List(&'static str),
}

impl FieldType {
    /// The named object type behind this field, if any.
    pub fn object_name(&self) -> Option<&'static str> {
        match self {
            FieldType::Scalar => None,
            FieldType::Object(name) | FieldType::List(name) => Some(name),
        }
    }
}

/// An object type with its named fields.
#[derive(Debug)]
pub struct ObjectType {
    pub name: &'static str,
    fields: HashMap<&'static str, FieldType>,
}

impl ObjectType {
    fn new(name: &'static str, fields: &[(&'static str, FieldType)]) -> Self {
        Self {
            name,
            fields: fields.iter().copied().collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }
}

/// The complete type graph: object types plus the root field sets.
#[derive(Debug)]
pub struct SchemaIndex {
    types: HashMap<&'static str, ObjectType>,
    query_fields: HashMap<&'static str, FieldType>,
    mutation_fields: HashMap<&'static str, FieldType>,
}

impl SchemaIndex {
    /// The social blogging type graph.
    pub fn social() -> Self {
        use FieldType::{List, Object, Scalar};

        let user = ObjectType::new(
            "UserType",
            &[
                ("id", Scalar),
                ("name", Scalar),
                ("balance", Scalar),
                ("profile", Object("ProfileType")),
                ("posts", List("PostType")),
                ("userSubscribedTo", List("UserType")),
                ("subscribedToUser", List("UserType")),
            ],
        );
        let post = ObjectType::new(
            "PostType",
            &[
                ("id", Scalar),
                ("title", Scalar),
                ("content", Scalar),
                ("authorId", Scalar),
            ],
        );
        let profile = ObjectType::new(
            "ProfileType",
            &[
                ("id", Scalar),
                ("isMale", Scalar),
                ("yearOfBirth", Scalar),
                ("userId", Scalar),
                ("memberTypeId", Scalar),
                ("user", Object("UserType")),
                ("memberType", Object("MemberType")),
            ],
        );
        let member_type = ObjectType::new(
            "MemberType",
            &[
                ("id", Scalar),
                ("discount", Scalar),
                ("postsLimitPerMonth", Scalar),
            ],
        );

        let mut types = HashMap::new();
        for object in [user, post, profile, member_type] {
            types.insert(object.name, object);
        }

        let query_fields = HashMap::from([
            ("users", List("UserType")),
            ("user", Object("UserType")),
            ("posts", List("PostType")),
            ("post", Object("PostType")),
            ("profiles", List("ProfileType")),
            ("profile", Object("ProfileType")),
            ("memberTypes", List("MemberType")),
            ("memberType", Object("MemberType")),
        ]);

        let mutation_fields = HashMap::from([
            ("createUser", Object("UserType")),
            ("changeUser", Object("UserType")),
            ("deleteUser", Scalar),
            ("createPost", Object("PostType")),
            ("changePost", Object("PostType")),
            ("deletePost", Scalar),
            ("createProfile", Object("ProfileType")),
            ("changeProfile", Object("ProfileType")),
            ("deleteProfile", Scalar),
            ("subscribeTo", Object("UserType")),
            ("unsubscribeFrom", Scalar),
        ]);

        Self {
            types,
            query_fields,
            mutation_fields,
        }
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    pub fn query_field(&self, name: &str) -> Option<FieldType> {
        self.query_fields.get(name).copied()
    }

    pub fn mutation_field(&self, name: &str) -> Option<FieldType> {
        self.mutation_fields.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_fields_point_at_known_types() {
        let schema = SchemaIndex::social();
        for type_name in ["UserType", "PostType", "ProfileType", "MemberType"] {
            assert!(schema.object(type_name).is_some(), "missing {type_name}");
        }
        let user = schema.object("UserType").expect("user type");
        assert_eq!(user.field("posts"), Some(FieldType::List("PostType")));
        assert_eq!(
            user.field("profile"),
            Some(FieldType::Object("ProfileType"))
        );
        assert_eq!(user.field("nope"), None);
    }

    #[test]
    fn deletion_mutations_are_scalars() {
        let schema = SchemaIndex::social();
        assert_eq!(schema.mutation_field("deleteUser"), Some(FieldType::Scalar));
        assert_eq!(
            schema.mutation_field("subscribeTo"),
            Some(FieldType::Object("UserType"))
        );
    }
}
