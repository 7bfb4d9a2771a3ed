//! Argument coercion for field resolution
//!
//! Arguments come out of the parsed AST with variables still unresolved;
//! everything here substitutes the request's variable bindings and coerces
//! into the shapes resolvers need. Coercion failures are plain messages —
//! the caller attaches the field path and records them as resolution errors.

use crate::core::MemberTypeId;
use graphql_parser::query::{Field, Value as GqlValue};
use serde::de::DeserializeOwned;
use serde_json::{Value as Json, json};
use std::collections::HashMap;
use uuid::Uuid;

/// Convert an AST value to JSON, resolving variables from the request's
/// bindings. An unbound variable is an error.
pub fn to_json(
    value: &GqlValue<'_, String>,
    variables: &HashMap<String, Json>,
) -> Result<Json, String> {
    Ok(match value {
        GqlValue::Null => Json::Null,
        GqlValue::Int(i) => json!(i.as_i64().unwrap_or(0)),
        GqlValue::Float(f) => json!(f),
        GqlValue::String(s) => json!(s),
        GqlValue::Boolean(b) => json!(b),
        GqlValue::Enum(e) => json!(e),
        GqlValue::List(items) => Json::Array(
            items
                .iter()
                .map(|item| to_json(item, variables))
                .collect::<Result<_, _>>()?,
        ),
        GqlValue::Object(fields) => {
            let mut map = serde_json::Map::new();
            for (key, field_value) in fields {
                map.insert(key.clone(), to_json(field_value, variables)?);
            }
            Json::Object(map)
        }
        GqlValue::Variable(name) => variables
            .get(name)
            .cloned()
            .ok_or_else(|| format!("Variable \"${name}\" is not bound"))?,
    })
}

fn raw_arg<'q, 'a>(
    field: &'q Field<'a, String>,
    name: &str,
) -> Option<&'q GqlValue<'a, String>> {
    field
        .arguments
        .iter()
        .find(|(arg_name, _)| arg_name.as_str() == name)
        .map(|(_, value)| value)
}

fn required_arg(
    field: &Field<'_, String>,
    name: &str,
    variables: &HashMap<String, Json>,
) -> Result<Json, String> {
    let value = raw_arg(field, name)
        .ok_or_else(|| format!("Missing required argument \"{name}\""))?;
    to_json(value, variables)
}

/// A required UUID argument (ids are UUID strings on the wire).
pub fn uuid_arg(
    field: &Field<'_, String>,
    name: &str,
    variables: &HashMap<String, Json>,
) -> Result<Uuid, String> {
    let value = required_arg(field, name, variables)?;
    let text = value
        .as_str()
        .ok_or_else(|| format!("Argument \"{name}\" must be a UUID string"))?;
    Uuid::parse_str(text).map_err(|_| format!("Argument \"{name}\" is not a valid UUID: {text}"))
}

/// A required member tier argument, accepting the enum token or its string
/// form through a variable.
pub fn member_type_id_arg(
    field: &Field<'_, String>,
    name: &str,
    variables: &HashMap<String, Json>,
) -> Result<MemberTypeId, String> {
    let value = required_arg(field, name, variables)?;
    let text = value
        .as_str()
        .ok_or_else(|| format!("Argument \"{name}\" must be a member type id"))?;
    text.parse::<MemberTypeId>()
}

/// A required input object argument deserialized into its DTO type.
pub fn input_arg<T: DeserializeOwned>(
    field: &Field<'_, String>,
    name: &str,
    variables: &HashMap<String, Json>,
) -> Result<T, String> {
    let value = required_arg(field, name, variables)?;
    serde_json::from_value(value).map_err(|e| format!("Invalid argument \"{name}\": {e}"))
}
