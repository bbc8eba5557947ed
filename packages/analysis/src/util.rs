//! Path Utilities
//!
//! Helpers for variable paths (`@foo.bar[0]['baz qux']?.x`) and tree paths
//! (`pipeline.0.config.body.__value__.1`).

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;

use crate::chars;

/// Segments of a variable path. Most references are a handful of segments deep.
pub type PathSegments = SmallVec<[String; 4]>;

static INDEX_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// Split a variable reference into its segments.
///
/// Dots and `?.` separate members, `[0]` is a numeric index and `['a b']` /
/// `["a b"]` a quoted key. An unterminated bracket takes the rest of the input
/// as its key. Empty segments are dropped.
pub fn to_path(path: &str) -> PathSegments {
    let mut segments = PathSegments::new();
    let mut current = String::new();
    let mut iter = path.trim().chars().peekable();

    while let Some(ch) = iter.next() {
        match ch {
            chars::PERIOD => flush(&mut segments, &mut current),
            chars::QUESTION if iter.peek() == Some(&chars::PERIOD) => {
                iter.next();
                flush(&mut segments, &mut current);
            }
            chars::LBRACKET => {
                flush(&mut segments, &mut current);
                let quote = match iter.peek() {
                    Some(&q) if chars::is_quote(q) => {
                        iter.next();
                        Some(q)
                    }
                    _ => None,
                };
                let mut key = String::new();
                match quote {
                    Some(q) => {
                        while let Some(c) = iter.next() {
                            if c == chars::BACKSLASH {
                                if let Some(escaped) = iter.next() {
                                    key.push(escaped);
                                }
                            } else if c == q {
                                break;
                            } else {
                                key.push(c);
                            }
                        }
                        // Skip up to the closing bracket
                        for c in iter.by_ref() {
                            if c == chars::RBRACKET {
                                break;
                            }
                        }
                        segments.push(key);
                    }
                    None => {
                        for c in iter.by_ref() {
                            if c == chars::RBRACKET {
                                break;
                            }
                            key.push(c);
                        }
                        let key = key.trim();
                        if !key.is_empty() {
                            segments.push(key.to_string());
                        }
                    }
                }
            }
            _ => current.push(ch),
        }
    }
    flush(&mut segments, &mut current);
    segments
}

fn flush(segments: &mut PathSegments, current: &mut String) {
    if !current.is_empty() {
        segments.push(std::mem::take(current));
    }
}

/// True for segments that address an array element (`0`, `12`).
pub fn is_index_segment(segment: &str) -> bool {
    INDEX_SEGMENT.is_match(segment)
}

/// Join tree path segments with dots, skipping empty ones.
pub fn join_path<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(chars::PERIOD);
        }
        out.push_str(part);
    }
    out
}
