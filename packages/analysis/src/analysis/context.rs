//! Analysis Context
//!
//! Everything known about the surroundings of a pipeline before it is
//! walked: the mod's options, mod variables, integrations, the starter's
//! input shape and an optional execution trace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::existence::{Existence, ExistenceMap};
use crate::logging::Logger;
use crate::registry::{ModRegistry, ResolvedBricks};
use crate::schema::Schema;

pub const SOURCE_OPTIONS: &str = "options";
pub const SOURCE_OPTION_VALUES: &str = "options:values";
pub const SOURCE_MOD: &str = "mod";
pub const SOURCE_MOD_INFERRED: &str = "mod:inferred";
pub const SOURCE_INPUT: &str = "input";
pub const SOURCE_TRACE: &str = "trace";
pub const INTEGRATION_SOURCE_PREFIX: &str = "integration:";

pub const INPUT_VARIABLE: &str = "@input";
pub const OPTIONS_VARIABLE: &str = "@options";
pub const MOD_VARIABLE: &str = "@mod";

/// An integration configuration the mod depends on, bound to `@<outputKey>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationDependency {
    pub integration_id: String,
    pub output_key: String,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub config_schema: Option<Schema>,
}

/// Variables observed the last time a brick instance ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    pub instance_id: String,
    /// Object keyed by variable name, e.g. `{"@input": {...}}`.
    pub template_context: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisContext {
    pub mod_id: Option<String>,
    /// Takes precedence over the mod registry's schema.
    pub options_schema: Option<Schema>,
    pub option_values: Option<Value>,
    pub mod_state: Option<Value>,
    pub mod_variables_schema: Option<Schema>,
    pub integrations: Vec<IntegrationDependency>,
    /// Reader bricks whose outputs are merged into `@input`.
    pub reader_ids: Vec<String>,
    /// Takes precedence over the readers' schemas.
    pub input_schema: Option<Schema>,
    pub trace: Vec<TraceRecord>,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest trace record of a brick instance.
    pub fn trace_for(&self, instance_id: &str) -> Option<&Value> {
        self.trace
            .iter()
            .rev()
            .find(|record| record.instance_id == instance_id)
            .map(|record| &record.template_context)
    }

    /// The scope visible to the first brick of the root pipeline.
    pub fn build_root_map(
        &self,
        mods: Option<&dyn ModRegistry>,
        bricks: &ResolvedBricks,
        logger: &dyn Logger,
    ) -> ExistenceMap {
        let mut map = ExistenceMap::new();

        let options_schema = self.resolve_options_schema(mods, logger);
        map.set_existence_from_schema(SOURCE_OPTIONS, &options_schema, &[OPTIONS_VARIABLE], None);
        if let Some(values) = &self.option_values {
            map.set_existence_from_values(SOURCE_OPTION_VALUES, values, &[OPTIONS_VARIABLE]);
        }

        let unknown_mod_shape = self.mod_state.is_none() && self.mod_variables_schema.is_none();
        map.set_existence(SOURCE_MOD, &[MOD_VARIABLE], Existence::Definitely, unknown_mod_shape, false);
        if let Some(state) = &self.mod_state {
            map.set_existence_from_values(SOURCE_MOD, state, &[MOD_VARIABLE]);
        }
        if let Some(schema) = &self.mod_variables_schema {
            map.set_existence_from_schema(SOURCE_MOD_INFERRED, schema, &[MOD_VARIABLE], Some(Existence::Maybe));
        }

        for integration in &self.integrations {
            let key = integration.output_key.trim().trim_start_matches('@');
            if key.is_empty() {
                logger.warn(&format!(
                    "Skipping integration {} without an output key",
                    integration.integration_id
                ));
                continue;
            }
            let source = format!("{}{}", INTEGRATION_SOURCE_PREFIX, key);
            let schema = integration.config_schema.clone().unwrap_or_default();
            let existence = integration.is_optional.then_some(Existence::Maybe);
            map.set_existence_from_schema(&source, &schema, &[format!("@{}", key)], existence);
        }

        let input_schema = match &self.input_schema {
            Some(schema) => schema.clone(),
            None => bricks.resolve_reader_schema(&self.reader_ids, logger),
        };
        map.set_existence_from_schema(SOURCE_INPUT, &input_schema, &[INPUT_VARIABLE], None);

        map
    }

    fn resolve_options_schema(&self, mods: Option<&dyn ModRegistry>, logger: &dyn Logger) -> Schema {
        if let Some(schema) = &self.options_schema {
            return schema.clone();
        }
        let (mod_id, registry) = match (self.mod_id.as_deref(), mods) {
            (Some(mod_id), Some(registry)) => (mod_id, registry),
            _ => return Schema::permissive(),
        };
        match registry.options_schema(mod_id) {
            Ok(schema) => schema,
            Err(error) => {
                logger.warn(&format!("Using permissive @options for {}: {}", mod_id, error));
                Schema::permissive()
            }
        }
    }
}
