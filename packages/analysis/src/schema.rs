//! JSON Schema
//!
//! The subset of JSON Schema that brick, mod and integration definitions use
//! to describe their inputs and outputs. Unknown keywords are ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A JSON Schema: either a boolean schema or a schema object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    Bool(bool),
    Object(Box<SchemaObject>),
}

/// Value of the `type` keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

impl SchemaType {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            SchemaType::Single(t) => t == name,
            SchemaType::Multiple(types) => types.iter().any(|t| t == name),
        }
    }
}

/// Value of the `items` keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    // listed first so a JSON array never decodes as a schema object
    Tuple(Vec<Schema>),
    Single(Schema),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,
}

impl SchemaObject {
    pub fn is_array(&self) -> bool {
        match &self.schema_type {
            Some(t) => t.includes("array"),
            None => self.items.is_some() || self.additional_items.is_some(),
        }
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    /// True when `additionalProperties` permits properties beyond the
    /// declared ones: `true`, or a non-empty schema.
    pub fn allows_additional_properties(&self) -> bool {
        match &self.additional_properties {
            Some(Schema::Bool(allowed)) => *allowed,
            Some(Schema::Object(schema)) => !schema.is_empty(),
            None => false,
        }
    }

    pub fn is_composite(&self) -> bool {
        !self.any_of.is_empty() || !self.one_of.is_empty() || !self.all_of.is_empty()
    }

    /// True for `{}` ignoring annotations.
    pub fn is_empty(&self) -> bool {
        self.schema_type.is_none()
            && self.properties.is_empty()
            && self.required.is_empty()
            && self.additional_properties.is_none()
            && self.items.is_none()
            && self.additional_items.is_none()
            && !self.is_composite()
    }
}

impl Schema {
    /// An object schema with no declared properties: any child may exist.
    pub fn permissive() -> Self {
        Schema::Object(Box::new(SchemaObject {
            schema_type: Some(SchemaType::Single("object".to_string())),
            ..SchemaObject::default()
        }))
    }

    /// An object schema with the given properties.
    pub fn object<I, K>(properties: I, required: &[&str]) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object(Box::new(SchemaObject {
            schema_type: Some(SchemaType::Single("object".to_string())),
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            required: required.iter().map(|r| r.to_string()).collect(),
            ..SchemaObject::default()
        }))
    }

    /// An array schema whose elements all match `items`.
    pub fn array(items: Schema) -> Self {
        Schema::Object(Box::new(SchemaObject {
            schema_type: Some(SchemaType::Single("array".to_string())),
            items: Some(Items::Single(items)),
            ..SchemaObject::default()
        }))
    }

    /// A leaf schema of the given primitive type.
    pub fn typed(type_name: &str) -> Self {
        Schema::Object(Box::new(SchemaObject {
            schema_type: Some(SchemaType::Single(type_name.to_string())),
            ..SchemaObject::default()
        }))
    }

    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn as_object(&self) -> Option<&SchemaObject> {
        match self {
            Schema::Object(schema) => Some(schema.as_ref()),
            Schema::Bool(_) => None,
        }
    }

    /// Merge object schemas property-wise, as when several readers feed the
    /// same `@input`. Anything other than plain object schemas merges to the
    /// permissive schema.
    pub fn merge_objects<'a, I>(schemas: I) -> Schema
    where
        I: IntoIterator<Item = &'a Schema>,
    {
        let mut merged = SchemaObject {
            schema_type: Some(SchemaType::Single("object".to_string())),
            ..SchemaObject::default()
        };
        for schema in schemas {
            let object = match schema.as_object() {
                Some(object) if !object.properties.is_empty() && !object.is_composite() => object,
                _ => return Schema::permissive(),
            };
            for (key, property) in &object.properties {
                merged.properties.insert(key.clone(), property.clone());
            }
            for required in &object.required {
                if !merged.is_required(required) {
                    merged.required.push(required.clone());
                }
            }
            if object.allows_additional_properties() {
                merged.additional_properties = Some(Schema::Bool(true));
            }
        }
        if merged.properties.is_empty() {
            return Schema::permissive();
        }
        Schema::Object(Box::new(merged))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::permissive()
    }
}
