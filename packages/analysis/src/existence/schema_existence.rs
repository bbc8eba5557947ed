//! Schema Propagation
//!
//! Turns a JSON Schema into existence entries. Required properties are
//! `DEFINITELY` present, optional ones `MAYBE`; an override forces every
//! node to the given existence (e.g. a whole branch that only maybe runs).

use super::existence_map::{Existence, ExistenceMap};
use crate::schema::{Items, Schema, SchemaObject};

/// Populate `map` under `source` from `schema`, rooted at `parent_path`.
pub fn set_existence_from_schema<P: AsRef<str>>(
    map: &mut ExistenceMap,
    source: &str,
    schema: &Schema,
    parent_path: &[P],
    existence_override: Option<Existence>,
) {
    let mut path: Vec<String> = parent_path.iter().map(|p| p.as_ref().to_string()).collect();
    let existence = existence_override.unwrap_or(Existence::Definitely);
    propagate(map, source, schema, &mut path, existence, existence_override, false);
}

impl ExistenceMap {
    /// See [`set_existence_from_schema`].
    pub fn set_existence_from_schema<P: AsRef<str>>(
        &mut self,
        source: &str,
        schema: &Schema,
        parent_path: &[P],
        existence_override: Option<Existence>,
    ) {
        set_existence_from_schema(self, source, schema, parent_path, existence_override);
    }
}

fn propagate(
    map: &mut ExistenceMap,
    source: &str,
    schema: &Schema,
    path: &mut Vec<String>,
    existence: Existence,
    existence_override: Option<Existence>,
    is_array: bool,
) {
    let object = match schema {
        Schema::Bool(false) => return,
        Schema::Bool(true) => {
            map.set_existence(source, path.as_slice(), existence, true, is_array);
            return;
        }
        Schema::Object(object) => object.as_ref(),
    };

    if object.is_array() {
        propagate_array(map, source, object, path, existence, existence_override);
        return;
    }

    if is_leaf(object) {
        map.set_existence(source, path.as_slice(), existence, false, is_array);
        return;
    }

    if object.is_composite() || object.properties.is_empty() || object.allows_additional_properties() {
        map.set_existence(source, path.as_slice(), existence, true, is_array);
        return;
    }

    map.set_existence(source, path.as_slice(), existence, false, is_array);
    for (key, property) in &object.properties {
        let child_existence = existence_override.unwrap_or(
            if existence == Existence::Definitely && object.is_required(key) {
                Existence::Definitely
            } else {
                Existence::Maybe
            },
        );
        path.push(key.clone());
        propagate(map, source, property, path, child_existence, existence_override, false);
        path.pop();
    }
}

/// A single item schema describes every element, so it is folded onto the
/// array's own node. Tuple items and `additionalItems` vary by index.
fn propagate_array(
    map: &mut ExistenceMap,
    source: &str,
    object: &SchemaObject,
    path: &mut Vec<String>,
    existence: Existence,
    existence_override: Option<Existence>,
) {
    let varies_by_index = matches!(
        object.additional_items,
        Some(Schema::Object(_)) | Some(Schema::Bool(true))
    );
    match &object.items {
        Some(Items::Single(items)) if !varies_by_index => {
            propagate(map, source, items, path, existence, existence_override, true);
        }
        _ => map.set_existence(source, path.as_slice(), existence, true, true),
    }
}

/// Primitive-typed schemas have no children.
fn is_leaf(object: &SchemaObject) -> bool {
    match &object.schema_type {
        Some(t) => !t.includes("object"),
        None => false,
    }
}
