// Control-flow constructs
//
// Built-in scope rules for bricks that own nested pipelines, and the
// variables those rules bind.

use crate::config::ConstructRule;
use crate::error::{AnalysisError, Result};
use crate::pipeline::{BrickConfig, BrickPosition, ConfigValue, Expression};
use crate::schema::Schema;

pub const FOR_EACH_ID: &str = "@pixiebrix/for-each";
pub const FOR_EACH_ELEMENT_ID: &str = "@pixiebrix/for-each-element";
pub const TRY_EXCEPT_ID: &str = "@pixiebrix/try-except";
pub const IF_ELSE_ID: &str = "@pixiebrix/if-else";
pub const RETRY_ID: &str = "@pixiebrix/retry";

pub fn builtin_construct_rules() -> Vec<ConstructRule> {
    vec![
        ConstructRule::new(FOR_EACH_ID, &["body"]).inject("body", "elementKey", "element"),
        ConstructRule::new(FOR_EACH_ELEMENT_ID, &["body"]).inject("body", "elementKey", "element"),
        ConstructRule::new(TRY_EXCEPT_ID, &["try", "except"]).inject("except", "errorKey", "error"),
        ConstructRule::new(IF_ELSE_ID, &["if", "else"]),
        ConstructRule::new(RETRY_ID, &["body"]),
    ]
}

/// A variable bound inside one nested pipeline of a construct.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectedVariable {
    /// Name with its sigil, e.g. `@element`.
    pub name: String,
    pub schema: Option<Schema>,
}

/// Variables `rule` binds for the pipeline held in `brick`'s `property`.
pub fn injected_variables(rule: &ConstructRule, brick: &BrickConfig, property: &str) -> Vec<InjectedVariable> {
    rule.injections_for(property)
        .map(|injection| {
            let configured = injection
                .variable_key_prop
                .as_deref()
                .and_then(|prop| brick.literal_string(prop))
                .map(str::trim)
                .filter(|name| !name.is_empty());
            let name = configured.unwrap_or(injection.default_variable.as_str());
            InjectedVariable {
                name: with_sigil(name),
                schema: injection.schema.clone(),
            }
        })
        .collect()
}

/// A construct property named by its rule must hold a pipeline when present.
pub fn check_construct_shape(rule: &ConstructRule, brick: &BrickConfig, position: &BrickPosition) -> Result<()> {
    for prop in &rule.pipeline_props {
        match brick.config.get(prop) {
            None | Some(ConfigValue::Literal(serde_json::Value::Null)) => {}
            Some(ConfigValue::Expression(Expression::Pipeline(_))) => {}
            Some(_) => {
                return Err(AnalysisError::business_rule(
                    position.nested(["config", prop.as_str()]).as_str(),
                    format!("{} expects a pipeline in '{}'", brick.id, prop),
                ))
            }
        }
    }
    Ok(())
}

fn with_sigil(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}
