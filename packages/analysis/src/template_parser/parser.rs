/**
 * Template Variable Parser
 *
 * Extracts `@variable` references from template text. Never fails: on
 * malformed input the references found before the problem are returned
 * together with a description of what went wrong.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::lexer::{Lexer, TagKind, Token};

static TAG_OPENER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[{%#]").expect("valid regex"));
static RAW_CLOSER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{%-?\s*end(raw|verbatim)\s*-?%\}").expect("valid regex"));

/// Statement tags whose body is literal text.
const RAW_OPENERS: &[&str] = &["raw", "verbatim"];

/// Where and why scanning a template stopped early
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParseError {
    pub message: String,
    pub index: usize,
}

/// Result of extracting variables from a template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParseResult {
    pub variables: Vec<String>,
    pub error: Option<TemplateParseError>,
}

/// Parser for template variable references
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            lexer: Lexer::new(),
        }
    }

    pub fn parse(&self, template: &str) -> TemplateParseResult {
        let mut result = TemplateParseResult::default();
        if !TAG_OPENER.is_match(template) {
            return result;
        }

        let mut i = 0;
        while let Some(tag) = self.lexer.next_tag(template, i) {
            i = tag.end;
            if tag.kind == TagKind::Comment {
                if !tag.terminated {
                    result.error = Some(TemplateParseError {
                        message: "Unterminated comment".to_string(),
                        index: tag.start,
                    });
                }
                continue;
            }

            let tokens = self.lexer.tokenize(&tag.content);

            if tag.kind == TagKind::Statement && tag.terminated {
                let raw = tokens
                    .first()
                    .filter(|t| t.is_identifier() && RAW_OPENERS.contains(&t.str_value.as_str()));
                if let Some(opener) = raw {
                    // the body is literal text, so tags inside it must not be split
                    match find_raw_end(template, tag.end, &opener.str_value) {
                        Some(end) => {
                            i = end;
                            continue;
                        }
                        None => return result,
                    }
                }
            }

            if let Some(error) = collect_variables(&tokens, &mut result.variables) {
                result.error = Some(TemplateParseError {
                    message: error.str_value.clone(),
                    // token offsets are relative to the content, after the 2-char opener
                    index: tag.start + 2 + error.index,
                });
                return result;
            }

            if !tag.terminated {
                result.error = Some(TemplateParseError {
                    message: "Unterminated tag".to_string(),
                    index: tag.start,
                });
                return result;
            }
        }

        result
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offset just past the `{% end<opener> %}` matching a raw block
/// whose body starts at `from`.
fn find_raw_end(template: &str, from: usize, opener: &str) -> Option<usize> {
    RAW_CLOSER
        .captures_iter(&template[from..])
        .find(|captures| captures.get(1).map_or(false, |name| name.as_str() == opener))
        .and_then(|captures| captures.get(0))
        .map(|closer| from + closer.end())
}

/// Push variable tokens not yet seen. Returns the error token, if any.
fn collect_variables<'t>(tokens: &'t [Token], variables: &mut Vec<String>) -> Option<&'t Token> {
    for token in tokens {
        if token.is_error() {
            return Some(token);
        }
        if token.is_variable() && !variables.contains(&token.str_value) {
            variables.push(token.str_value.clone());
        }
    }
    None
}

/// Ordered, de-duplicated variable references in `template`.
pub fn parse_template_variables(template: &str) -> Vec<String> {
    Parser::new().parse(template).variables
}
