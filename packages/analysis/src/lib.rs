//! Brick Analysis
//!
//! Static variable analysis for brick pipelines: which `@variables` exist at
//! every point of a pipeline tree, and which references might not be defined.

pub mod analysis;
pub mod chars;
pub mod config;
pub mod error;
pub mod existence;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod template_parser;
pub mod util;

pub use analysis::{AnalysisContext, AnalysisResult, Annotation, AnnotationSeverity, Registries, VarAnalysis};
pub use config::{AnalyzerConfig, ConstructRule, Injection};
pub use error::{AnalysisError, RegistryError, Result};
pub use existence::{Existence, ExistenceMap};
pub use pipeline::{BrickConfig, ConfigValue, Expression, Pipeline};
pub use schema::Schema;

/// Analyze `pipeline` with the default configuration.
pub fn analyze(pipeline: &Pipeline, context: AnalysisContext, registries: Registries) -> Result<AnalysisResult> {
    VarAnalysis::with_defaults(context, registries).run(pipeline)
}
