//! Existence tracking
//!
//! The scope table type and the schema propagator that fills it.

pub mod existence_map;
pub mod schema_existence;

pub use existence_map::{Existence, ExistenceMap, ExistenceNode, NodeFlags};
pub use schema_existence::set_existence_from_schema;
