//! Analyzer Configuration
//!
//! Root path, document brick ids and construct scope rules, loaded from a
//! camelCase JSON file or built in code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::constructs::builtin_construct_rules;
use crate::pipeline::DEFAULT_DOCUMENT_BRICK_ID;
use crate::schema::Schema;

/// How a control-flow brick scopes its nested pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructRule {
    pub brick_id: String,
    /// Config properties that must hold a pipeline expression when present.
    #[serde(default)]
    pub pipeline_props: Vec<String>,
    #[serde(default)]
    pub injections: Vec<Injection>,
}

/// A variable a construct binds inside one of its nested pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Injection {
    pub pipeline_prop: String,
    /// Literal config property naming the variable, e.g. `elementKey`.
    #[serde(default)]
    pub variable_key_prop: Option<String>,
    pub default_variable: String,
    /// Shape of the variable; unconstrained when absent.
    #[serde(default)]
    pub schema: Option<Schema>,
}

impl ConstructRule {
    pub fn new(brick_id: impl Into<String>, pipeline_props: &[&str]) -> Self {
        Self {
            brick_id: brick_id.into(),
            pipeline_props: pipeline_props.iter().map(|p| p.to_string()).collect(),
            injections: Vec::new(),
        }
    }

    pub fn inject(mut self, pipeline_prop: &str, variable_key_prop: &str, default_variable: &str) -> Self {
        self.injections.push(Injection {
            pipeline_prop: pipeline_prop.to_string(),
            variable_key_prop: Some(variable_key_prop.to_string()),
            default_variable: default_variable.to_string(),
            schema: None,
        });
        self
    }

    pub fn injections_for<'a>(&'a self, pipeline_prop: &'a str) -> impl Iterator<Item = &'a Injection> + 'a {
        self.injections
            .iter()
            .filter(move |injection| injection.pipeline_prop == pipeline_prop)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    /// Path prefix of the root pipeline's bricks.
    pub root_path: String,
    pub document_brick_ids: Vec<String>,
    /// Replaces the built-in rules when given.
    pub constructs: Vec<ConstructRule>,
    pub check_templates: bool,
    pub parallel_lookups: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root_path: "pipeline".to_string(),
            document_brick_ids: vec![DEFAULT_DOCUMENT_BRICK_ID.to_string()],
            constructs: builtin_construct_rules(),
            check_templates: true,
            parallel_lookups: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        if config.document_brick_ids.iter().any(|id| id.trim().is_empty()) {
            anyhow::bail!("documentBrickIds must not contain empty ids");
        }
        Ok(config)
    }

    pub fn construct_rule(&self, brick_id: &str) -> Option<&ConstructRule> {
        self.constructs.iter().find(|rule| rule.brick_id == brick_id)
    }

    pub fn is_document_brick(&self, brick_id: &str) -> bool {
        self.document_brick_ids.iter().any(|id| id == brick_id)
    }
}
