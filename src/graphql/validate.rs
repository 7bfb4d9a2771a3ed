//! Pre-execution validation: schema conformance and the depth guard
//!
//! Both passes run before any resolver executes and every violation is
//! collected, not just the first. A non-empty result means the response is
//! `{"errors": [...]}` with no `data` key.

use crate::core::GraphQlError;
use crate::graphql::schema::{FieldType, ObjectType, SchemaIndex};
use graphql_parser::query::{
    Definition, Document, Field, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
    TypeCondition,
};
use std::collections::HashMap;

/// Validate a parsed document against the type graph and the depth limit.
pub fn validate(
    schema: &SchemaIndex,
    doc: &Document<'_, String>,
    max_depth: usize,
) -> Vec<GraphQlError> {
    let fragments = collect_fragments(doc);
    let mut errors = conformance_errors(schema, doc, &fragments);
    errors.extend(DepthGuard::new(max_depth).check(doc, &fragments));
    errors
}

/// Fragment definitions by name, borrowed from the parsed document. Shared
/// with the executor, which expands spreads at resolution time.
pub type FragmentMap<'d, 'a> = HashMap<&'d str, &'d FragmentDefinition<'a, String>>;

pub fn collect_fragments<'d, 'a>(doc: &'d Document<'a, String>) -> FragmentMap<'d, 'a> {
    doc.definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect()
}

#[derive(Clone, Copy)]
enum ParentType<'s> {
    Query,
    Mutation,
    Object(&'s ObjectType),
}

impl<'s> ParentType<'s> {
    fn name(&self) -> &str {
        match self {
            ParentType::Query => "RootQuery",
            ParentType::Mutation => "Mutations",
            ParentType::Object(object) => object.name,
        }
    }

    fn field(&self, schema: &SchemaIndex, name: &str) -> Option<FieldType> {
        match self {
            ParentType::Query => schema.query_field(name),
            ParentType::Mutation => schema.mutation_field(name),
            ParentType::Object(object) => object.field(name),
        }
    }
}

fn conformance_errors(
    schema: &SchemaIndex,
    doc: &Document<'_, String>,
    fragments: &FragmentMap<'_, '_>,
) -> Vec<GraphQlError> {
    let mut errors = Vec::new();

    for def in &doc.definitions {
        let Definition::Operation(op) = def else {
            continue;
        };
        match op {
            OperationDefinition::Query(query) => walk_set(
                schema,
                fragments,
                &query.selection_set,
                ParentType::Query,
                &mut Vec::new(),
                &mut errors,
            ),
            OperationDefinition::SelectionSet(set) => walk_set(
                schema,
                fragments,
                set,
                ParentType::Query,
                &mut Vec::new(),
                &mut errors,
            ),
            OperationDefinition::Mutation(mutation) => walk_set(
                schema,
                fragments,
                &mutation.selection_set,
                ParentType::Mutation,
                &mut Vec::new(),
                &mut errors,
            ),
            OperationDefinition::Subscription(_) => {
                errors.push(GraphQlError::new("Subscriptions are not supported"));
            }
        }
    }

    errors
}

fn walk_set<'d>(
    schema: &SchemaIndex,
    fragments: &FragmentMap<'d, '_>,
    set: &'d SelectionSet<'_, String>,
    parent: ParentType<'_>,
    spread_stack: &mut Vec<&'d str>,
    errors: &mut Vec<GraphQlError>,
) {
    for selection in &set.items {
        match selection {
            Selection::Field(field) => {
                walk_field(schema, fragments, field, parent, spread_stack, errors);
            }
            Selection::InlineFragment(inline) => {
                let target = match &inline.type_condition {
                    Some(TypeCondition::On(type_name)) => {
                        match schema.object(type_name.as_str()) {
                            Some(object) => ParentType::Object(object),
                            None => {
                                errors.push(GraphQlError::new(format!(
                                    "Unknown type \"{type_name}\" in inline fragment"
                                )));
                                continue;
                            }
                        }
                    }
                    None => parent,
                };
                walk_set(
                    schema,
                    fragments,
                    &inline.selection_set,
                    target,
                    spread_stack,
                    errors,
                );
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                if spread_stack.contains(&name) {
                    errors.push(GraphQlError::new(format!(
                        "Cannot spread fragment \"{name}\" within itself"
                    )));
                    continue;
                }
                let Some(fragment) = fragments.get(name) else {
                    errors.push(GraphQlError::new(format!("Unknown fragment \"{name}\"")));
                    continue;
                };
                let TypeCondition::On(type_name) = &fragment.type_condition;
                let Some(object) = schema.object(type_name.as_str()) else {
                    errors.push(GraphQlError::new(format!(
                        "Unknown type \"{type_name}\" in fragment \"{name}\""
                    )));
                    continue;
                };
                spread_stack.push(name);
                walk_set(
                    schema,
                    fragments,
                    &fragment.selection_set,
                    ParentType::Object(object),
                    spread_stack,
                    errors,
                );
                spread_stack.pop();
            }
        }
    }
}

fn walk_field<'d>(
    schema: &SchemaIndex,
    fragments: &FragmentMap<'d, '_>,
    field: &'d Field<'_, String>,
    parent: ParentType<'_>,
    spread_stack: &mut Vec<&'d str>,
    errors: &mut Vec<GraphQlError>,
) {
    let name = field.name.as_str();
    let Some(field_type) = parent.field(schema, name) else {
        errors.push(GraphQlError::new(format!(
            "Cannot query field \"{name}\" on type \"{}\"",
            parent.name()
        )));
        return;
    };

    match field_type {
        FieldType::Scalar => {
            if !field.selection_set.items.is_empty() {
                errors.push(GraphQlError::new(format!(
                    "Field \"{name}\" must not have a selection since its type has no subfields"
                )));
            }
        }
        FieldType::Object(type_name) | FieldType::List(type_name) => {
            if field.selection_set.items.is_empty() {
                errors.push(GraphQlError::new(format!(
                    "Field \"{name}\" of type \"{type_name}\" must have a selection of subfields"
                )));
                return;
            }
            // Relation targets always exist in the closed type graph.
            if let Some(object) = schema.object(type_name) {
                walk_set(
                    schema,
                    fragments,
                    &field.selection_set,
                    ParentType::Object(object),
                    spread_stack,
                    errors,
                );
            }
        }
    }
}

/// Rejects queries whose selection sets nest deeper than the configured
/// maximum. A root field counts as level one; fragment spreads do not add a
/// level of their own.
pub struct DepthGuard {
    max_depth: usize,
}

impl DepthGuard {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// One error per root field that nests too deep.
    pub fn check(
        &self,
        doc: &Document<'_, String>,
        fragments: &FragmentMap<'_, '_>,
    ) -> Vec<GraphQlError> {
        let mut errors = Vec::new();

        for def in &doc.definitions {
            let Definition::Operation(op) = def else {
                continue;
            };
            let set = match op {
                OperationDefinition::Query(query) => &query.selection_set,
                OperationDefinition::SelectionSet(set) => set,
                OperationDefinition::Mutation(mutation) => &mutation.selection_set,
                OperationDefinition::Subscription(_) => continue,
            };
            for selection in &set.items {
                if let Selection::Field(field) = selection {
                    let depth = 1 + set_depth(&field.selection_set, fragments, &mut Vec::new());
                    if depth > self.max_depth {
                        errors.push(GraphQlError::new(format!(
                            "\"{}\" exceeds the maximum query depth of {} (depth {depth})",
                            field.name, self.max_depth
                        )));
                    }
                }
            }
        }

        errors
    }
}

fn set_depth<'d>(
    set: &'d SelectionSet<'_, String>,
    fragments: &FragmentMap<'d, '_>,
    spread_stack: &mut Vec<&'d str>,
) -> usize {
    set.items
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) => 1 + set_depth(&field.selection_set, fragments, spread_stack),
            Selection::InlineFragment(inline) => {
                set_depth(&inline.selection_set, fragments, spread_stack)
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.fragment_name.as_str();
                if spread_stack.contains(&name) {
                    return 0;
                }
                let Some(fragment) = fragments.get(name) else {
                    return 0;
                };
                spread_stack.push(name);
                let depth = set_depth(&fragment.selection_set, fragments, spread_stack);
                spread_stack.pop();
                depth
            }
        })
        .max()
        .unwrap_or(0)
}
