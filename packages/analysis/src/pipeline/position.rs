//! Tree positions
//!
//! Dot-separated paths addressing nodes of a pipeline tree, e.g.
//! `pipeline.0.config.body.__value__.1.config.text`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::join_path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrickPosition {
    pub path: String,
}

impl BrickPosition {
    pub fn root(path: impl Into<String>) -> Self {
        BrickPosition { path: path.into() }
    }

    /// A position below this one.
    pub fn nested<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts = std::iter::once(self.path.clone())
            .chain(segments.into_iter().map(|s| s.as_ref().to_string()));
        BrickPosition {
            path: join_path(parts),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for BrickPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
