//! Variable Analysis
//!
//! Walks a pipeline tracking which variables exist at every brick and
//! reports references that are not provably defined.
//!
//! Scoping works with two stacks:
//!
//! - `frames`: one per pipeline level (root, every nested pipeline). A frame
//!   holds the variables inherited from its parent and the outputs of the
//!   bricks visited so far at that level. Popping a frame discards the
//!   outputs of its bricks, so nothing leaks out of a branch or loop body.
//! - `active`: the map that expressions are checked against, pushed for the
//!   duration of a brick or a deferred list body.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use super::annotation::{Annotation, AnnotationList};
use super::constructs::{check_construct_shape, injected_variables};
use super::context::{AnalysisContext, SOURCE_TRACE};
use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::existence::{Existence, ExistenceMap};
use crate::logging::{LogLevel, Logger, NullLogger};
use crate::pipeline::{
    walk_brick, walk_deferred, walk_pipeline, BrickConfig, BrickIdCollector, BrickPosition, ConfigValue,
    DeferredContext, Expression, Pipeline, PipelineContext, PipelineVisitor, LIST_ELEMENT_PROP,
};
use crate::registry::{BrickRegistry, ModRegistry, ResolvedBricks};
use crate::template_parser::Parser;

const DEFAULT_LIST_ELEMENT_KEY: &str = "element";
const LIST_ELEMENT_KEY_PROP: &str = "elementKey";

/// The registries a run reads from.
#[derive(Clone)]
pub struct Registries {
    pub bricks: Arc<dyn BrickRegistry>,
    pub mods: Option<Arc<dyn ModRegistry>>,
}

impl Registries {
    pub fn new(bricks: Arc<dyn BrickRegistry>) -> Self {
        Self { bricks, mods: None }
    }

    pub fn with_mods(mut self, mods: Arc<dyn ModRegistry>) -> Self {
        self.mods = Some(mods);
        self
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Scope visible at every brick and deferred body, by tree position.
    pub known_vars: IndexMap<String, ExistenceMap>,
    pub annotations: Vec<Annotation>,
}

impl AnalysisResult {
    pub fn known_vars_at(&self, position: &str) -> Option<&ExistenceMap> {
        self.known_vars.get(position)
    }

    pub fn annotations_at<'a>(&'a self, position: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |annotation| annotation.position == position)
    }
}

#[derive(Debug, Default)]
struct ScopeFrame {
    vars: ExistenceMap,
    outputs: ExistenceMap,
}

impl ScopeFrame {
    fn new(vars: ExistenceMap) -> Self {
        Self {
            vars,
            outputs: ExistenceMap::new(),
        }
    }

    fn visible(&self) -> ExistenceMap {
        let mut map = self.vars.clone();
        map.add_source_map(&self.outputs);
        map
    }
}

pub struct VarAnalysis {
    context: AnalysisContext,
    registries: Registries,
    config: AnalyzerConfig,
    logger: Arc<dyn Logger>,
    template_parser: Parser,

    resolved: ResolvedBricks,
    frames: Vec<ScopeFrame>,
    active: Vec<ExistenceMap>,
    known_vars: IndexMap<String, ExistenceMap>,
    annotations: AnnotationList,
}

impl VarAnalysis {
    pub fn new(
        context: AnalysisContext,
        registries: Registries,
        config: AnalyzerConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            context,
            registries,
            config,
            logger,
            template_parser: Parser::new(),
            resolved: ResolvedBricks::default(),
            frames: Vec::new(),
            active: Vec::new(),
            known_vars: IndexMap::new(),
            annotations: AnnotationList::new(),
        }
    }

    /// Analysis with the default configuration and no logging.
    pub fn with_defaults(context: AnalysisContext, registries: Registries) -> Self {
        Self::new(context, registries, AnalyzerConfig::default(), Arc::new(NullLogger::new()))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze `pipeline`. Each call starts from a clean state, so repeated
    /// runs over the same input give the same result.
    pub fn run(&mut self, pipeline: &Pipeline) -> Result<AnalysisResult> {
        self.reset();

        let mut ids = BrickIdCollector::collect(pipeline)?;
        ids.extend(self.context.reader_ids.iter().cloned());
        self.resolved = ResolvedBricks::resolve(
            self.registries.bricks.as_ref(),
            ids,
            self.config.parallel_lookups,
        );
        self.logger
            .debug(&format!("Resolved {} brick definitions", self.resolved.len()));

        let root = self.context.build_root_map(
            self.registries.mods.as_deref(),
            &self.resolved,
            self.logger.as_ref(),
        );
        self.frames.push(ScopeFrame::new(root));
        let root_position = BrickPosition::root(self.config.root_path.clone());
        self.visit_root_pipeline(&root_position, pipeline)?;
        self.frames.pop();

        let result = AnalysisResult {
            known_vars: std::mem::take(&mut self.known_vars),
            annotations: std::mem::take(&mut self.annotations).into_vec(),
        };
        self.logger.debug(&format!(
            "Analysis finished: {} scopes, {} annotations",
            result.known_vars.len(),
            result.annotations.len()
        ));
        Ok(result)
    }

    fn reset(&mut self) {
        self.resolved = ResolvedBricks::default();
        self.frames.clear();
        self.active.clear();
        self.known_vars.clear();
        self.annotations = AnnotationList::new();
    }

    fn debug(&self, message: impl FnOnce() -> String) {
        if self.logger.is_enabled(LogLevel::Debug) {
            self.logger.debug(&message());
        }
    }

    fn current_scope(&self) -> Option<&ExistenceMap> {
        self.active.last().or_else(|| self.frames.last().map(|frame| &frame.vars))
    }

    /// The scope a brick sees: inherited variables, earlier siblings'
    /// outputs and, when traced, the variables it last ran with.
    fn brick_scope(&self, brick: &BrickConfig) -> ExistenceMap {
        let mut map = self
            .frames
            .last()
            .map(ScopeFrame::visible)
            .unwrap_or_default();
        let traced = brick
            .instance_id
            .as_deref()
            .and_then(|instance_id| self.context.trace_for(instance_id));
        if let Some(template_context) = traced {
            map.set_existence_from_values(SOURCE_TRACE, template_context, &[] as &[&str]);
        }
        map
    }

    /// Record `brick`'s output in the current frame for later siblings.
    fn add_output(&mut self, position: &BrickPosition, brick: &BrickConfig) {
        let variable = match brick.output_variable() {
            Some(variable) => variable,
            None => return,
        };
        let schema = self
            .resolved
            .resolve_output_schema(brick, self.logger.as_ref());
        let existence_override = brick.is_conditional().then_some(Existence::Maybe);
        if let Some(frame) = self.frames.last_mut() {
            frame
                .outputs
                .set_existence_from_schema(position.as_str(), &schema, &[variable.as_str()], existence_override);
        }
        self.debug(|| {
            format!(
                "{} outputs {} ({})",
                position,
                variable,
                if existence_override.is_some() { "maybe" } else { "definitely" }
            )
        });
    }

    fn check_reference(&mut self, position: &BrickPosition, reference: &str, expression: &Expression) {
        let defined = self
            .current_scope()
            .map(|scope| scope.is_variable_defined(reference.trim()))
            .unwrap_or(false);
        if !defined {
            self.annotations
                .push(Annotation::undefined_variable(position, reference, expression));
        }
    }
}

impl PipelineVisitor for VarAnalysis {
    fn is_document_brick(&self, brick: &BrickConfig) -> bool {
        self.config.is_document_brick(&brick.id)
    }

    fn visit_pipeline(
        &mut self,
        position: &BrickPosition,
        pipeline: &Pipeline,
        context: PipelineContext<'_>,
    ) -> Result<()> {
        if context.is_root() {
            return walk_pipeline(self, position, pipeline, context);
        }

        let mut vars = self.current_scope().cloned().unwrap_or_default();
        if let (Some(parent), Some(property), None) = (context.parent, context.property, context.element_type) {
            if let Some(rule) = self.config.construct_rule(&parent.id) {
                for variable in injected_variables(rule, parent, property) {
                    match &variable.schema {
                        Some(schema) => {
                            vars.set_existence_from_schema(position.as_str(), schema, &[variable.name.as_str()], None)
                        }
                        None => vars.set_variable_existence(position.as_str(), &variable.name, Existence::Definitely, true),
                    }
                }
            }
        }

        self.frames.push(ScopeFrame::new(vars));
        self.debug(|| format!("push frame {} (depth {})", position, self.frames.len()));
        let result = walk_pipeline(self, position, pipeline, context);
        self.frames.pop();
        self.debug(|| format!("pop frame {}", position));
        result
    }

    fn visit_brick(&mut self, position: &BrickPosition, brick: &BrickConfig) -> Result<()> {
        let scope = self.brick_scope(brick);
        self.known_vars.insert(position.to_string(), scope.clone());
        self.debug(|| format!("recorded scope {}", position));

        if let Some(rule) = self.config.construct_rule(&brick.id) {
            check_construct_shape(rule, brick, position)?;
        }

        self.active.push(scope);
        let result = walk_brick(self, position, brick);
        self.active.pop();
        result?;

        self.add_output(position, brick);
        Ok(())
    }

    fn visit_expression(&mut self, position: &BrickPosition, expression: &Expression) -> Result<()> {
        match expression {
            Expression::Var(path) => self.check_reference(position, path, expression),
            Expression::Template { text, .. } => {
                if !self.config.check_templates {
                    return Ok(());
                }
                let parsed = self.template_parser.parse(text);
                if let Some(error) = parsed.error {
                    self.logger.warn(&format!(
                        "Skipping malformed template at {}: {} (index {})",
                        position, error.message, error.index
                    ));
                    return Ok(());
                }
                for variable in &parsed.variables {
                    self.check_reference(position, variable, expression);
                }
            }
            Expression::Pipeline(_) | Expression::Defer(_) => {}
        }
        Ok(())
    }

    fn visit_deferred(
        &mut self,
        position: &BrickPosition,
        body: &ConfigValue,
        context: DeferredContext<'_>,
    ) -> Result<()> {
        let element = match context.list_element {
            Some(element) => element,
            None => {
                let scope = self.current_scope().cloned().unwrap_or_default();
                self.known_vars.insert(position.to_string(), scope);
                self.debug(|| format!("recorded deferred scope {}", position));
                return walk_deferred(self, position, body, context);
            }
        };

        let key = element
            .config_value(LIST_ELEMENT_KEY_PROP)
            .and_then(ConfigValue::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .unwrap_or(DEFAULT_LIST_ELEMENT_KEY);
        let mut scope = self.current_scope().cloned().unwrap_or_default();
        scope.set_variable_existence(position.as_str(), key, Existence::Definitely, true);
        self.known_vars.insert(position.to_string(), scope.clone());
        self.debug(|| format!("recorded {} scope {}", LIST_ELEMENT_PROP, position));

        self.active.push(scope);
        let result = walk_deferred(self, position, body, context);
        self.active.pop();
        result
    }
}
