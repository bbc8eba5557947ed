//! Pipeline Visitor
//!
//! Generic recursive descent over a pipeline tree. The visitor knows where
//! bricks, expressions and nested or deferred pipelines are, but nothing about
//! what an analysis does with them. Each `visit_*` method defaults to the
//! matching `walk_*` function, so an implementation overrides the node kinds
//! it cares about and calls back into `walk_*` to keep descending.

use indexmap::IndexSet;
use serde_json::Value;

use super::ast::{BrickConfig, ConfigValue, DocumentElement, Expression, Pipeline};
use super::position::BrickPosition;
use crate::error::{AnalysisError, Result};

pub const DEFAULT_DOCUMENT_BRICK_ID: &str = "@pixiebrix/document";
pub const DOCUMENT_BODY_PROP: &str = "body";
pub const LIST_ELEMENT_PROP: &str = "element";

/// Where a nested pipeline sits relative to the brick that owns it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineContext<'a> {
    /// Brick whose configuration holds the pipeline; `None` for the root.
    pub parent: Option<&'a BrickConfig>,
    /// Top-level config property of `parent` holding the pipeline.
    pub property: Option<&'a str>,
    /// Type of the document element holding the pipeline, if any.
    pub element_type: Option<&'a str>,
}

impl<'a> PipelineContext<'a> {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Where a deferred body sits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredContext<'a> {
    pub parent: Option<&'a BrickConfig>,
    /// The list element repeating the body, when the body is a document row.
    pub list_element: Option<DocumentElement<'a>>,
}

/// Brick and property owning a config value during the walk.
#[derive(Debug, Clone, Copy)]
struct ValueOwner<'a> {
    brick: &'a BrickConfig,
    property: &'a str,
    element_type: Option<&'a str>,
}

pub trait PipelineVisitor {
    /// Whether the brick's `body` is a tree of document elements.
    fn is_document_brick(&self, brick: &BrickConfig) -> bool {
        brick.id == DEFAULT_DOCUMENT_BRICK_ID
    }

    fn visit_root_pipeline(&mut self, position: &BrickPosition, pipeline: &Pipeline) -> Result<()> {
        self.visit_pipeline(position, pipeline, PipelineContext::root())
    }

    fn visit_pipeline(
        &mut self,
        position: &BrickPosition,
        pipeline: &Pipeline,
        context: PipelineContext<'_>,
    ) -> Result<()> {
        walk_pipeline(self, position, pipeline, context)
    }

    fn visit_brick(&mut self, position: &BrickPosition, brick: &BrickConfig) -> Result<()> {
        walk_brick(self, position, brick)
    }

    /// Variable references and templates.
    fn visit_expression(&mut self, _position: &BrickPosition, _expression: &Expression) -> Result<()> {
        Ok(())
    }

    fn visit_literal(&mut self, _position: &BrickPosition, _value: &Value) -> Result<()> {
        Ok(())
    }

    /// The body of a document brick. Other config properties of the brick
    /// are walked as usual.
    fn visit_document(&mut self, position: &BrickPosition, brick: &BrickConfig) -> Result<()> {
        walk_document(self, position, brick)
    }

    fn visit_document_element(
        &mut self,
        position: &BrickPosition,
        element: DocumentElement<'_>,
        brick: &BrickConfig,
    ) -> Result<()> {
        walk_document_element(self, position, element, brick)
    }

    fn visit_deferred(
        &mut self,
        position: &BrickPosition,
        body: &ConfigValue,
        context: DeferredContext<'_>,
    ) -> Result<()> {
        walk_deferred(self, position, body, context)
    }
}

pub fn walk_pipeline<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    position: &BrickPosition,
    pipeline: &Pipeline,
    _context: PipelineContext<'_>,
) -> Result<()> {
    for (index, brick) in pipeline.iter().enumerate() {
        visitor.visit_brick(&position.nested([index.to_string()]), brick)?;
    }
    Ok(())
}

pub fn walk_brick<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    position: &BrickPosition,
    brick: &BrickConfig,
) -> Result<()> {
    if let Some(condition) = &brick.condition {
        let owner = ValueOwner {
            brick,
            property: "if",
            element_type: None,
        };
        walk_config_value(visitor, &position.nested(["if"]), condition, owner)?;
    }

    let is_document = visitor.is_document_brick(brick);
    for (key, value) in &brick.config {
        if is_document && key == DOCUMENT_BODY_PROP {
            visitor.visit_document(position, brick)?;
            continue;
        }
        let owner = ValueOwner {
            brick,
            property: key,
            element_type: None,
        };
        walk_config_value(visitor, &position.nested(["config", key.as_str()]), value, owner)?;
    }
    Ok(())
}

pub fn walk_document<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    position: &BrickPosition,
    brick: &BrickConfig,
) -> Result<()> {
    let body = match brick.config.get(DOCUMENT_BODY_PROP) {
        None => return Ok(()),
        Some(ConfigValue::Array(elements)) => elements,
        Some(_) => {
            return Err(AnalysisError::business_rule(
                position.nested(["config", DOCUMENT_BODY_PROP]).as_str(),
                "document body must be a list of elements",
            ))
        }
    };

    for (index, value) in body.iter().enumerate() {
        let element_position = position.nested(["config", DOCUMENT_BODY_PROP, index.to_string().as_str()]);
        let element = DocumentElement::from_config(value, element_position.as_str())?;
        visitor.visit_document_element(&element_position, element, brick)?;
    }
    Ok(())
}

pub fn walk_document_element<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    position: &BrickPosition,
    element: DocumentElement<'_>,
    brick: &BrickConfig,
) -> Result<()> {
    if element.is_list() {
        match element.config_value(LIST_ELEMENT_PROP) {
            Some(ConfigValue::Expression(Expression::Defer(_))) => {}
            _ => {
                return Err(AnalysisError::business_rule(
                    position.as_str(),
                    "list element must have a deferred element body",
                ))
            }
        }
    }

    if let Some(config) = element.config {
        for (key, value) in config {
            let value_position = position.nested(["config", key.as_str()]);
            if element.is_list() && key == LIST_ELEMENT_PROP {
                if let ConfigValue::Expression(Expression::Defer(body)) = value {
                    let context = DeferredContext {
                        parent: Some(brick),
                        list_element: Some(element),
                    };
                    visitor.visit_deferred(&value_position.nested(["__value__"]), body, context)?;
                }
                continue;
            }
            let owner = ValueOwner {
                brick,
                property: key,
                element_type: Some(element.element_type),
            };
            walk_config_value(visitor, &value_position, value, owner)?;
        }
    }

    for (index, value) in element.children.iter().enumerate() {
        let child_position = position.nested(["children", index.to_string().as_str()]);
        let child = DocumentElement::from_config(value, child_position.as_str())?;
        visitor.visit_document_element(&child_position, child, brick)?;
    }
    Ok(())
}

/// A list row is a document element; any other deferred body is walked as a
/// plain config value.
pub fn walk_deferred<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    position: &BrickPosition,
    body: &ConfigValue,
    context: DeferredContext<'_>,
) -> Result<()> {
    match (context.parent, context.list_element) {
        (Some(brick), Some(_)) => {
            let element = DocumentElement::from_config(body, position.as_str())?;
            visitor.visit_document_element(position, element, brick)
        }
        (Some(brick), None) => {
            let owner = ValueOwner {
                brick,
                property: "",
                element_type: None,
            };
            walk_config_value(visitor, position, body, owner)
        }
        (None, _) => Ok(()),
    }
}

fn walk_config_value<V: PipelineVisitor + ?Sized>(
    visitor: &mut V,
    position: &BrickPosition,
    value: &ConfigValue,
    owner: ValueOwner<'_>,
) -> Result<()> {
    match value {
        ConfigValue::Literal(literal) => visitor.visit_literal(position, literal),
        ConfigValue::Object(entries) => {
            for (key, entry) in entries {
                walk_config_value(visitor, &position.nested([key.as_str()]), entry, owner)?;
            }
            Ok(())
        }
        ConfigValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_config_value(visitor, &position.nested([index.to_string()]), item, owner)?;
            }
            Ok(())
        }
        ConfigValue::Expression(Expression::Pipeline(pipeline)) => {
            let context = PipelineContext {
                parent: Some(owner.brick),
                property: Some(owner.property).filter(|p| !p.is_empty()),
                element_type: owner.element_type,
            };
            visitor.visit_pipeline(&position.nested(["__value__"]), pipeline, context)
        }
        ConfigValue::Expression(Expression::Defer(body)) => {
            let context = DeferredContext {
                parent: Some(owner.brick),
                list_element: None,
            };
            visitor.visit_deferred(&position.nested(["__value__"]), body, context)
        }
        ConfigValue::Expression(expression) => visitor.visit_expression(position, expression),
    }
}

/// Distinct brick ids of a tree, nested pipelines included, in visit order.
#[derive(Debug, Default)]
pub struct BrickIdCollector {
    pub ids: IndexSet<String>,
}

impl BrickIdCollector {
    pub fn collect(pipeline: &Pipeline) -> Result<IndexSet<String>> {
        let mut collector = BrickIdCollector::default();
        collector.visit_root_pipeline(&BrickPosition::root(""), pipeline)?;
        Ok(collector.ids)
    }
}

impl PipelineVisitor for BrickIdCollector {
    fn visit_brick(&mut self, position: &BrickPosition, brick: &BrickConfig) -> Result<()> {
        if !self.ids.contains(&brick.id) {
            self.ids.insert(brick.id.clone());
        }
        walk_brick(self, position, brick)
    }
}
