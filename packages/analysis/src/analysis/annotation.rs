// Annotations
//
// Diagnostics reported against tree positions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::chars;
use crate::pipeline::{BrickPosition, Expression};

pub const VAR_ANALYSIS_ID: &str = "var";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDetail {
    /// Raw expression text: the variable path or the whole template.
    pub expression: String,
    /// Expression type tag, e.g. `var` or `nunjucks`.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub position: String,
    pub message: String,
    pub severity: AnnotationSeverity,
    pub analysis_id: String,
    pub detail: AnnotationDetail,
}

/// Why an undefined reference was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableProblem {
    /// Nothing but whitespace.
    Empty,
    /// The sigil alone.
    BareSigil,
    MissingSigil,
    MaybeUndefined,
}

impl VariableProblem {
    pub fn classify(reference: &str) -> Self {
        let reference = reference.trim();
        if reference.is_empty() {
            VariableProblem::Empty
        } else if reference == "@" {
            VariableProblem::BareSigil
        } else if !reference.starts_with(chars::AT) {
            VariableProblem::MissingSigil
        } else {
            VariableProblem::MaybeUndefined
        }
    }

    pub fn message(&self, reference: &str) -> String {
        match self {
            VariableProblem::Empty => "No variable provided".to_string(),
            VariableProblem::BareSigil => "Invalid variable name".to_string(),
            VariableProblem::MissingSigil => "Variable name should start with @".to_string(),
            VariableProblem::MaybeUndefined => {
                format!("Variable \"{}\" might not be defined", reference.trim())
            }
        }
    }

    pub fn severity(&self) -> AnnotationSeverity {
        match self {
            VariableProblem::MaybeUndefined => AnnotationSeverity::Warning,
            _ => AnnotationSeverity::Error,
        }
    }
}

impl Annotation {
    /// Annotation for an undefined `reference` found in `expression`.
    pub fn undefined_variable(position: &BrickPosition, reference: &str, expression: &Expression) -> Self {
        let problem = VariableProblem::classify(reference);
        let raw = match expression {
            Expression::Var(path) => path.clone(),
            Expression::Template { text, .. } => text.clone(),
            _ => reference.to_string(),
        };
        Annotation {
            position: position.to_string(),
            message: problem.message(reference),
            severity: problem.severity(),
            analysis_id: VAR_ANALYSIS_ID.to_string(),
            detail: AnnotationDetail {
                expression: raw,
                kind: expression.type_tag().to_string(),
            },
        }
    }
}

/// Annotations of one run, unique by (message, position).
#[derive(Debug, Default)]
pub struct AnnotationList {
    annotations: Vec<Annotation>,
    seen: IndexSet<(String, String)>,
}

impl AnnotationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal (message, position) pair was already added.
    pub fn push(&mut self, annotation: Annotation) -> bool {
        let key = (annotation.message.clone(), annotation.position.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.annotations.push(annotation);
        true
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn into_vec(self) -> Vec<Annotation> {
        self.annotations
    }
}
