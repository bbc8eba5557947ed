/**
 * Template Parser Module
 *
 * Variable extraction for nunjucks/mustache/handlebars template text.
 */
pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, TagKind, TemplateTag, Token, TokenType};
pub use parser::{parse_template_variables, Parser, TemplateParseError, TemplateParseResult};
