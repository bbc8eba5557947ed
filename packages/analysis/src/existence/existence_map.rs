//! Existence Map
//!
//! Records, per source, which variable paths are definitely or maybe present.
//! Sources are kept apart so a later write for one source replaces only that
//! source's knowledge.

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::chars;
use crate::util::{is_index_segment, to_path};

/// Whether a variable path is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Existence {
    Maybe,
    Definitely,
}

bitflags! {
    /// Per-node markers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Any child path under this node is considered defined.
        const ALLOW_ANY_CHILD = 0b0001;
        /// The node is an array; its element shape is recorded on the node itself.
        const IS_ARRAY = 0b0010;
    }
}

impl NodeFlags {
    pub fn from_bools(allow_any_child: bool, is_array: bool) -> Self {
        let mut flags = NodeFlags::empty();
        flags.set(NodeFlags::ALLOW_ANY_CHILD, allow_any_child);
        flags.set(NodeFlags::IS_ARRAY, is_array);
        flags
    }
}

/// One path segment in the tree of a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistenceNode {
    existence: Option<Existence>,
    flags: NodeFlags,
    children: IndexMap<String, ExistenceNode>,
}

impl ExistenceNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn existence(&self) -> Option<Existence> {
        self.existence
    }

    pub fn allow_any_child(&self) -> bool {
        self.flags.contains(NodeFlags::ALLOW_ANY_CHILD)
    }

    pub fn is_array(&self) -> bool {
        self.flags.contains(NodeFlags::IS_ARRAY)
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn children(&self) -> &IndexMap<String, ExistenceNode> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&ExistenceNode> {
        self.children.get(name)
    }

    /// Union `other` into this node: strongest existence, flags or-ed,
    /// children merged recursively.
    fn merge_from(&mut self, other: &ExistenceNode) {
        self.existence = self.existence.max(other.existence);
        self.flags |= other.flags;
        for (name, child) in &other.children {
            self.children
                .entry(name.clone())
                .or_default()
                .merge_from(child);
        }
    }
}

impl Serialize for ExistenceNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExistenceNode", 4)?;
        state.serialize_field("existence", &self.existence)?;
        state.serialize_field("allowAnyChild", &self.allow_any_child())?;
        state.serialize_field("isArray", &self.is_array())?;
        state.serialize_field("children", &self.children)?;
        state.end()
    }
}

/// Map from source to the tree of variables that source provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExistenceMap {
    sources: IndexMap<String, ExistenceNode>,
}

impl ExistenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node at `path` under `source`, overwriting its existence and
    /// flags. Ancestors are created as needed and are at least as present as
    /// the node itself.
    pub fn set_existence<P: AsRef<str>>(
        &mut self,
        source: &str,
        path: &[P],
        existence: Existence,
        allow_any_child: bool,
        is_array: bool,
    ) {
        let mut node = self.sources.entry(source.to_string()).or_default();
        for (i, segment) in path.iter().enumerate() {
            node = node.children.entry(segment.as_ref().to_string()).or_default();
            if i + 1 < path.len() {
                node.existence = node.existence.max(Some(existence));
            }
        }
        if path.is_empty() {
            return;
        }
        node.existence = Some(existence);
        node.flags = NodeFlags::from_bools(allow_any_child, is_array);
    }

    /// Mark every path reachable in a concrete value as `DEFINITELY` present.
    /// Array elements are folded onto the array's own node.
    pub fn set_existence_from_values<P: AsRef<str>>(&mut self, source: &str, value: &Value, parent_path: &[P]) {
        let mut path: Vec<String> = parent_path.iter().map(|p| p.as_ref().to_string()).collect();
        self.set_from_value(source, value, &mut path);
    }

    fn set_from_value(&mut self, source: &str, value: &Value, path: &mut Vec<String>) {
        let is_array = value.is_array();
        if !path.is_empty() {
            self.set_existence(source, path.as_slice(), Existence::Definitely, false, is_array);
        }
        match value {
            Value::Object(entries) => {
                for (key, child) in entries {
                    path.push(key.clone());
                    self.set_from_value(source, child, path);
                    path.pop();
                }
            }
            Value::Array(elements) => {
                for element in elements {
                    self.set_from_value(source, element, path);
                }
                if !path.is_empty() {
                    self.mark_array(source, path);
                }
            }
            _ => {}
        }
    }

    /// Re-apply the array marker after element values wrote to the same node.
    fn mark_array(&mut self, source: &str, path: &[String]) {
        let mut node = match self.sources.get_mut(source) {
            Some(node) => node,
            None => return,
        };
        for segment in path {
            node = match node.children.get_mut(segment) {
                Some(child) => child,
                None => return,
            };
        }
        node.flags |= NodeFlags::IS_ARRAY;
    }

    /// Declare a single variable (`@element`, `error`) under `source`. The
    /// sigil is added when missing.
    pub fn set_variable_existence(
        &mut self,
        source: &str,
        variable_name: &str,
        existence: Existence,
        allow_any_child: bool,
    ) {
        let name = if variable_name.starts_with(chars::AT) {
            variable_name.to_string()
        } else {
            format!("{}{}", chars::AT, variable_name)
        };
        let path = to_path(&name);
        self.set_existence(source, path.as_slice(), existence, allow_any_child, false);
    }

    /// True when some source proves the path exists, either by reaching a
    /// node with an existence tag or by passing a node that allows any child.
    pub fn is_variable_defined(&self, path: &str) -> bool {
        self.get_existence(path).is_some()
    }

    /// The strongest existence any source reports for `path`. Paths below an
    /// allow-any-child node report `MAYBE` unless a source knows better.
    pub fn get_existence(&self, path: &str) -> Option<Existence> {
        let segments = to_path(path);
        if segments.is_empty() {
            return None;
        }
        self.sources
            .values()
            .filter_map(|root| lookup(root, segments.as_slice()))
            .max()
    }

    /// Merge another map's sources into this one. A source present in both is
    /// replaced by `other`'s version.
    pub fn add_source_map(&mut self, other: &ExistenceMap) {
        for (source, node) in &other.sources {
            self.sources.insert(source.clone(), node.clone());
        }
    }

    pub fn sources(&self) -> impl Iterator<Item = (&String, &ExistenceNode)> {
        self.sources.iter()
    }

    pub fn source(&self, source: &str) -> Option<&ExistenceNode> {
        self.sources.get(source)
    }

    pub fn has_source(&self, source: &str) -> bool {
        self.sources.contains_key(source)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources folded into one tree, as offered by autocompletion.
    pub fn merged(&self) -> ExistenceNode {
        let mut merged = ExistenceNode::new();
        for node in self.sources.values() {
            merged.merge_from(node);
        }
        merged.existence = None;
        merged
    }

    /// Top-level variable names across all sources, first occurrence order.
    pub fn variable_names(&self) -> Vec<String> {
        self.merged().children.keys().cloned().collect()
    }
}

fn lookup(root: &ExistenceNode, segments: &[String]) -> Option<Existence> {
    let mut node = root;
    for segment in segments {
        if node.allow_any_child() {
            return match node.child(segment) {
                Some(child) => child.existence.or(Some(Existence::Maybe)),
                None => Some(Existence::Maybe),
            };
        }
        match node.child(segment) {
            Some(child) => node = child,
            None if node.is_array() && is_index_segment(segment) => continue,
            None => return None,
        }
    }
    node.existence.or_else(|| node.allow_any_child().then_some(Existence::Maybe))
}
