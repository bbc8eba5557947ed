// Brick and Mod Registries
//
// Read-only lookups of brick definitions and mod option schemas, plus the
// per-run cache of resolved definitions.

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::RegistryError;
use crate::logging::Logger;
use crate::pipeline::BrickConfig;
use crate::schema::Schema;

/// A brick type known to the registry.
pub trait BrickDefinition: Debug + Send + Sync {
    fn id(&self) -> &str;

    fn input_schema(&self) -> Schema;

    /// Shape of the brick's output. May depend on the configured brick, e.g.
    /// a brick returning one property per configured field. `None` when the
    /// brick declares no output schema.
    fn output_schema(&self, config: &BrickConfig) -> Option<Schema>;
}

pub trait BrickRegistry: Send + Sync {
    fn lookup(&self, id: &str) -> Result<Arc<dyn BrickDefinition>, RegistryError>;
}

pub trait ModRegistry: Send + Sync {
    fn options_schema(&self, mod_id: &str) -> Result<Schema, RegistryError>;
}

/// A brick definition with fixed schemas.
#[derive(Debug, Clone)]
pub struct StaticBrick {
    id: String,
    input_schema: Schema,
    output_schema: Option<Schema>,
}

impl StaticBrick {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_schema: Schema::permissive(),
            output_schema: None,
        }
    }

    pub fn with_input_schema(mut self, schema: Schema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = Some(schema);
        self
    }
}

impl BrickDefinition for StaticBrick {
    fn id(&self) -> &str {
        &self.id
    }

    fn input_schema(&self) -> Schema {
        self.input_schema.clone()
    }

    fn output_schema(&self, _config: &BrickConfig) -> Option<Schema> {
        self.output_schema.clone()
    }
}

#[derive(Debug, Default)]
pub struct MemoryBrickRegistry {
    bricks: IndexMap<String, Arc<dyn BrickDefinition>>,
}

impl MemoryBrickRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: Arc<dyn BrickDefinition>) {
        self.bricks.insert(definition.id().to_string(), definition);
    }

    pub fn with_brick(mut self, definition: impl BrickDefinition + 'static) -> Self {
        self.register(Arc::new(definition));
        self
    }

    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }
}

impl BrickRegistry for MemoryBrickRegistry {
    fn lookup(&self, id: &str) -> Result<Arc<dyn BrickDefinition>, RegistryError> {
        self.bricks
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryModRegistry {
    schemas: IndexMap<String, Schema>,
}

impl MemoryModRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options_schema(mut self, mod_id: impl Into<String>, schema: Schema) -> Self {
        self.schemas.insert(mod_id.into(), schema);
        self
    }
}

impl ModRegistry for MemoryModRegistry {
    fn options_schema(&self, mod_id: &str) -> Result<Schema, RegistryError> {
        self.schemas
            .get(mod_id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(mod_id))
    }
}

/// Brick definitions looked up once for a run.
#[derive(Debug, Default)]
pub struct ResolvedBricks {
    entries: IndexMap<String, Result<Arc<dyn BrickDefinition>, RegistryError>>,
}

impl ResolvedBricks {
    /// Look up every id. Lookups are independent of each other, so with
    /// `parallel` set they run on the rayon pool; results keep `ids` order.
    pub fn resolve<I>(registry: &dyn BrickRegistry, ids: I, parallel: bool) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let ids: Vec<String> = ids.into_iter().collect();
        let results: Vec<(String, Result<Arc<dyn BrickDefinition>, RegistryError>)> = if parallel {
            ids.into_par_iter()
                .map(|id| {
                    let result = registry.lookup(&id);
                    (id, result)
                })
                .collect()
        } else {
            ids.into_iter()
                .map(|id| {
                    let result = registry.lookup(&id);
                    (id, result)
                })
                .collect()
        };
        Self {
            entries: results.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn BrickDefinition>, RegistryError> {
        match self.entries.get(id) {
            Some(result) => result.clone(),
            None => Err(RegistryError::not_found(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The output shape of `brick`. Never fails: an unknown brick or a
    /// brick without a declared output yields the permissive schema.
    pub fn resolve_output_schema(&self, brick: &BrickConfig, logger: &dyn Logger) -> Schema {
        match self.get(&brick.id) {
            Ok(definition) => match definition.output_schema(brick) {
                Some(schema) => schema,
                None => {
                    logger.debug(&format!("Brick {} declares no output schema", brick.id));
                    Schema::permissive()
                }
            },
            Err(error) => {
                logger.warn(&format!(
                    "Using permissive output schema for {}: {}",
                    brick.id, error
                ));
                Schema::permissive()
            }
        }
    }

    /// The merged output shape of the given reader bricks, or the permissive
    /// schema when there are none or any lookup fails.
    pub fn resolve_reader_schema(&self, reader_ids: &[String], logger: &dyn Logger) -> Schema {
        if reader_ids.is_empty() {
            return Schema::permissive();
        }
        let mut schemas = Vec::with_capacity(reader_ids.len());
        for id in reader_ids {
            match self.get(id) {
                Ok(definition) => {
                    let reader = BrickConfig::new(id.clone());
                    schemas.push(definition.output_schema(&reader).unwrap_or_default());
                }
                Err(error) => {
                    logger.warn(&format!("Using permissive @input, reader {}: {}", id, error));
                    return Schema::permissive();
                }
            }
        }
        Schema::merge_objects(schemas.iter())
    }
}
