/**
 * Pipeline AST
 *
 * Brick configurations and the expression values inside them. Pipelines are
 * stored as JSON where an object carrying `__type__` is an expression:
 *
 *   {"__type__": "var", "__value__": "@foo.bar"}
 *   {"__type__": "nunjucks", "__value__": "Hello {{ @input.name }}"}
 *   {"__type__": "pipeline", "__value__": [ ...bricks ]}
 *   {"__type__": "defer", "__value__": { ...document element }}
 */

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{AnalysisError, Result};

pub const EXPRESSION_TYPE_KEY: &str = "__type__";
pub const EXPRESSION_VALUE_KEY: &str = "__value__";

/// An ordered sequence of bricks.
pub type Pipeline = Vec<BrickConfig>;

/// One configured brick (operation) in a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrickConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub config: IndexMap<String, ConfigValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConfigValue>,
}

impl BrickConfig {
    pub fn new(id: impl Into<String>) -> Self {
        BrickConfig {
            id: id.into(),
            instance_id: None,
            label: None,
            config: IndexMap::new(),
            output_key: None,
            condition: None,
        }
    }

    /// A brick only runs conditionally when it has a guard other than a
    /// literal `true`.
    pub fn is_conditional(&self) -> bool {
        match &self.condition {
            None => false,
            Some(ConfigValue::Literal(Value::Null)) => false,
            Some(ConfigValue::Literal(Value::Bool(true))) => false,
            Some(_) => true,
        }
    }

    /// The output key with its sigil, e.g. `@foo` for `outputKey: "foo"`.
    pub fn output_variable(&self) -> Option<String> {
        let key = self.output_key.as_deref()?.trim();
        if key.is_empty() {
            return None;
        }
        Some(if key.starts_with('@') {
            key.to_string()
        } else {
            format!("@{}", key)
        })
    }

    /// A literal string config property, such as a loop's `elementKey`.
    pub fn literal_string(&self, name: &str) -> Option<&str> {
        match self.config.get(name) {
            Some(ConfigValue::Literal(Value::String(s))) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Kind of template text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Nunjucks,
    Mustache,
    Handlebars,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Nunjucks => "nunjucks",
            TemplateKind::Mustache => "mustache",
            TemplateKind::Handlebars => "handlebars",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "nunjucks" => Some(TemplateKind::Nunjucks),
            "mustache" => Some(TemplateKind::Mustache),
            "handlebars" => Some(TemplateKind::Handlebars),
            _ => None,
        }
    }
}

/// Expression values
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Variable reference, e.g. `@foo?.bar[0]`
    Var(String),
    /// Template text scanned for embedded variable references
    Template { kind: TemplateKind, text: String },
    /// Nested pipeline, run when the owning brick decides to
    Pipeline(Pipeline),
    /// Deferred body, evaluated lazily (e.g. once per list row)
    Defer(Box<ConfigValue>),
}

impl Expression {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Expression::Var(_) => "var",
            Expression::Template { kind, .. } => kind.as_str(),
            Expression::Pipeline(_) => "pipeline",
            Expression::Defer(_) => "defer",
        }
    }
}

/// A value in a brick's configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// JSON scalar: null, boolean, number or string
    Literal(Value),
    Object(IndexMap<String, ConfigValue>),
    Array(Vec<ConfigValue>),
    Expression(Expression),
}

impl ConfigValue {
    pub fn var(path: impl Into<String>) -> Self {
        ConfigValue::Expression(Expression::Var(path.into()))
    }

    pub fn nunjucks(text: impl Into<String>) -> Self {
        ConfigValue::Expression(Expression::Template {
            kind: TemplateKind::Nunjucks,
            text: text.into(),
        })
    }

    pub fn pipeline(pipeline: Pipeline) -> Self {
        ConfigValue::Expression(Expression::Pipeline(pipeline))
    }

    pub fn defer(body: ConfigValue) -> Self {
        ConfigValue::Expression(Expression::Defer(Box::new(body)))
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            ConfigValue::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Literal(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Decode a JSON value, recognizing `__type__` expression objects.
    pub fn from_json(value: &Value) -> Result<ConfigValue> {
        match value {
            Value::Object(entries) => match entries.get(EXPRESSION_TYPE_KEY) {
                Some(tag) => parse_expression(tag, entries).map(ConfigValue::Expression),
                None => entries
                    .iter()
                    .map(|(key, entry)| Ok((key.clone(), ConfigValue::from_json(entry)?)))
                    .collect::<Result<IndexMap<_, _>>>()
                    .map(ConfigValue::Object),
            },
            Value::Array(items) => items
                .iter()
                .map(ConfigValue::from_json)
                .collect::<Result<Vec<_>>>()
                .map(ConfigValue::Array),
            scalar => Ok(ConfigValue::Literal(scalar.clone())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ConfigValue::Literal(value) => value.clone(),
            ConfigValue::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), entry.to_json()))
                    .collect(),
            ),
            ConfigValue::Array(items) => Value::Array(items.iter().map(ConfigValue::to_json).collect()),
            ConfigValue::Expression(expression) => {
                let value = match expression {
                    Expression::Var(path) => Value::String(path.clone()),
                    Expression::Template { text, .. } => Value::String(text.clone()),
                    Expression::Pipeline(pipeline) => {
                        serde_json::to_value(pipeline).unwrap_or(Value::Array(Vec::new()))
                    }
                    Expression::Defer(body) => body.to_json(),
                };
                let mut entries = Map::new();
                entries.insert(
                    EXPRESSION_TYPE_KEY.to_string(),
                    Value::String(expression.type_tag().to_string()),
                );
                entries.insert(EXPRESSION_VALUE_KEY.to_string(), value);
                Value::Object(entries)
            }
        }
    }
}

fn parse_expression(tag: &Value, entries: &Map<String, Value>) -> Result<Expression> {
    let tag = tag
        .as_str()
        .ok_or_else(|| AnalysisError::invalid_pipeline("expression __type__ must be a string"))?;
    let value = entries.get(EXPRESSION_VALUE_KEY).unwrap_or(&Value::Null);

    let text = || -> Result<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s.clone()),
            other => Err(AnalysisError::invalid_pipeline(format!(
                "{} expression value must be a string, got {}",
                tag, other
            ))),
        }
    };

    if let Some(kind) = TemplateKind::from_tag(tag) {
        return Ok(Expression::Template { kind, text: text()? });
    }

    match tag {
        "var" => Ok(Expression::Var(text()?)),
        "pipeline" => match value {
            Value::Null => Ok(Expression::Pipeline(Vec::new())),
            Value::Array(_) => Ok(Expression::Pipeline(serde_json::from_value(value.clone())?)),
            other => Err(AnalysisError::invalid_pipeline(format!(
                "pipeline expression value must be an array, got {}",
                other
            ))),
        },
        "defer" => Ok(Expression::Defer(Box::new(ConfigValue::from_json(value)?))),
        other => Err(AnalysisError::invalid_pipeline(format!(
            "unknown expression type '{}'",
            other
        ))),
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ConfigValue::from_json(&value).map_err(D::Error::custom)
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Decode a pipeline from JSON text.
pub fn parse_pipeline(json: &str) -> Result<Pipeline> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a pipeline from a JSON value.
pub fn pipeline_from_value(value: Value) -> Result<Pipeline> {
    Ok(serde_json::from_value(value)?)
}

/// A layout element in a document brick's body.
#[derive(Debug, Clone, Copy)]
pub struct DocumentElement<'a> {
    pub element_type: &'a str,
    pub config: Option<&'a IndexMap<String, ConfigValue>>,
    pub children: &'a [ConfigValue],
}

impl<'a> DocumentElement<'a> {
    /// View `value` as a document element. `position` names it in errors.
    pub fn from_config(value: &'a ConfigValue, position: &str) -> Result<Self> {
        let entries = value.as_object().ok_or_else(|| {
            AnalysisError::business_rule(position, "document element must be an object")
        })?;
        let element_type = entries
            .get("type")
            .and_then(ConfigValue::as_str)
            .ok_or_else(|| AnalysisError::business_rule(position, "document element has no type"))?;
        let config = entries.get("config").and_then(ConfigValue::as_object);
        let children = entries
            .get("children")
            .and_then(ConfigValue::as_array)
            .unwrap_or(&[]);
        Ok(DocumentElement {
            element_type,
            config,
            children,
        })
    }

    pub fn is_list(&self) -> bool {
        self.element_type == "list"
    }

    pub fn config_value(&self, name: &str) -> Option<&'a ConfigValue> {
        self.config.and_then(|config| config.get(name))
    }
}
