//! Pipeline tree
//!
//! Brick configurations, tree positions and the generic walker.

pub mod ast;
pub mod position;
pub mod visitor;

pub use ast::{
    parse_pipeline, pipeline_from_value, BrickConfig, ConfigValue, DocumentElement, Expression, Pipeline,
    TemplateKind,
};
pub use position::BrickPosition;
pub use visitor::{
    walk_brick, walk_deferred, walk_document, walk_document_element, walk_pipeline, BrickIdCollector,
    DeferredContext, PipelineContext, PipelineVisitor, DEFAULT_DOCUMENT_BRICK_ID, DOCUMENT_BODY_PROP,
    LIST_ELEMENT_PROP,
};
