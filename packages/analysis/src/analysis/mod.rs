//! Variable scope analysis

pub mod annotation;
pub mod constructs;
pub mod context;
pub mod var_analysis;

pub use annotation::{Annotation, AnnotationDetail, AnnotationList, AnnotationSeverity, VariableProblem, VAR_ANALYSIS_ID};
pub use constructs::{builtin_construct_rules, injected_variables, InjectedVariable};
pub use context::{AnalysisContext, IntegrationDependency, TraceRecord};
pub use var_analysis::{AnalysisResult, Registries, VarAnalysis};
