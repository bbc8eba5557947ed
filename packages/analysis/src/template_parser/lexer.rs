/**
 * Template Lexer
 *
 * Splits template text into tags (`{{ }}`, `{% %}`, `{# #}`) and tokenizes
 * the inside of a tag. Text outside tags is never tokenized.
 */

use serde::{Deserialize, Serialize};

use crate::chars;

/// Kind of template tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    /// `{{ ... }}`
    Output,
    /// `{% ... %}`
    Statement,
    /// `{# ... #}`
    Comment,
}

impl TagKind {
    fn closer(&self) -> &'static str {
        match self {
            TagKind::Output => "}}",
            TagKind::Statement => "%}",
            TagKind::Comment => "#}",
        }
    }
}

/// A tag found in template text. `content` excludes the delimiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTag {
    pub kind: TagKind,
    pub start: usize,
    pub end: usize,
    pub content: String,
    pub terminated: bool,
}

/// Token types inside a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenType {
    Character = 0,
    Identifier = 1,
    Variable = 2,
    String = 3,
    Number = 4,
    Error = 5,
}

/// Token representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub end: usize,
    pub token_type: TokenType,
    pub str_value: String,
}

impl Token {
    pub fn new(index: usize, end: usize, token_type: TokenType, str_value: String) -> Self {
        Token {
            index,
            end,
            token_type,
            str_value,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.token_type == TokenType::Variable
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type == TokenType::Identifier
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Identifier && self.str_value == keyword
    }

    pub fn is_character(&self, code: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.chars().next() == Some(code)
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }
}

/// Template lexer
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    /// Find every tag in `template`. Scanning stops after an unterminated tag.
    pub fn split_tags(&self, template: &str) -> Vec<TemplateTag> {
        let mut tags = Vec::new();
        let mut i = 0;
        while let Some(tag) = self.next_tag(template, i) {
            i = tag.end;
            let terminated = tag.terminated;
            tags.push(tag);
            if !terminated {
                break;
            }
        }
        tags
    }

    /// The first tag opening at or after byte offset `from`. An unterminated
    /// tag runs to the end of the template.
    pub fn next_tag(&self, template: &str, from: usize) -> Option<TemplateTag> {
        let mut i = from;
        while let Some(offset) = template.get(i..)?.find(chars::LBRACE) {
            let open = i + offset;
            let kind = match template[open + 1..].chars().next() {
                Some(chars::LBRACE) => TagKind::Output,
                Some(chars::PERCENT) => TagKind::Statement,
                Some(chars::HASH) => TagKind::Comment,
                _ => {
                    i = open + 1;
                    continue;
                }
            };
            let content_start = open + 2;
            let closer = kind.closer();
            let close = match kind {
                TagKind::Comment => template[content_start..].find(closer).map(|o| content_start + o),
                _ => find_closer(template, content_start, closer),
            };
            return Some(match close {
                Some(close) => TemplateTag {
                    kind,
                    start: open,
                    end: close + closer.len(),
                    content: template[content_start..close].to_string(),
                    terminated: true,
                },
                None => TemplateTag {
                    kind,
                    start: open,
                    end: template.len(),
                    content: template[content_start..].to_string(),
                    terminated: false,
                },
            });
        }
        None
    }

    /// Tokenize the content of a single tag.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        Scanner::new(text).scan()
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Find `closer` from `from`, ignoring occurrences inside quoted strings.
fn find_closer(input: &str, from: usize, closer: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut iter = input[from..].char_indices().peekable();

    while let Some((offset, ch)) = iter.next() {
        let index = from + offset;
        if let Some(q) = quote {
            if ch == chars::BACKSLASH {
                iter.next();
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        if chars::is_quote(ch) {
            quote = Some(ch);
        } else if input[index..].starts_with(closer) {
            return Some(index);
        }
    }
    None
}

/// Scanner for the inside of a tag
struct Scanner<'a> {
    input: &'a str,
    length: usize,
    index: usize,
    peek: char,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        let peek = input.chars().next().unwrap_or(chars::EOF);
        Scanner {
            input,
            length: input.len(),
            index: 0,
            peek,
            tokens: Vec::new(),
        }
    }

    fn scan(mut self) -> Vec<Token> {
        while let Some(token) = self.scan_token() {
            let stop = token.is_error();
            self.tokens.push(token);
            if stop {
                break;
            }
        }
        self.tokens
    }

    fn advance(&mut self) {
        self.index += self.peek.len_utf8();
        self.peek = self.char_at(self.index);
    }

    fn char_at(&self, index: usize) -> char {
        if index < self.length {
            self.input[index..].chars().next().unwrap_or(chars::EOF)
        } else {
            chars::EOF
        }
    }

    fn scan_token(&mut self) -> Option<Token> {
        while self.index < self.length && chars::is_whitespace(self.peek) {
            self.advance();
        }

        if self.index >= self.length {
            return None;
        }

        let start = self.index;
        let ch = self.peek;

        if ch == chars::AT {
            return Some(self.scan_variable(start));
        }
        if chars::is_identifier_start(ch) {
            return Some(self.scan_identifier(start));
        }
        if chars::is_digit(ch) {
            return Some(self.scan_number(start));
        }
        if chars::is_quote(ch) {
            return Some(self.scan_string(start, ch));
        }

        self.advance();
        Some(Token::new(start, self.index, TokenType::Character, ch.to_string()))
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while chars::is_identifier_part(self.peek) {
            self.advance();
        }
        Token::new(
            start,
            self.index,
            TokenType::Identifier,
            self.input[start..self.index].to_string(),
        )
    }

    fn scan_number(&mut self, start: usize) -> Token {
        while chars::is_digit(self.peek) || self.peek == chars::PERIOD {
            self.advance();
        }
        Token::new(
            start,
            self.index,
            TokenType::Number,
            self.input[start..self.index].to_string(),
        )
    }

    fn scan_string(&mut self, start: usize, quote: char) -> Token {
        self.advance();
        let mut value = String::new();
        loop {
            if self.index >= self.length {
                return self.error(start, "Unterminated quote");
            }
            let ch = self.peek;
            self.advance();
            if ch == chars::BACKSLASH {
                if self.index >= self.length {
                    return self.error(start, "Unterminated quote");
                }
                value.push(self.peek);
                self.advance();
            } else if ch == quote {
                return Token::new(start, self.index, TokenType::String, value);
            } else {
                value.push(ch);
            }
        }
    }

    /// Scan `@name` followed by member, optional-member and index accessors.
    /// A dynamic index (`@a[@b]`, `@a[i]`) ends the path before the bracket.
    fn scan_variable(&mut self, start: usize) -> Token {
        self.advance();
        if !chars::is_identifier_start(self.peek) {
            return Token::new(start, self.index, TokenType::Variable, chars::AT.to_string());
        }
        while chars::is_identifier_part(self.peek) {
            self.advance();
        }

        loop {
            let path_end = self.index;
            match self.peek {
                chars::PERIOD if chars::is_identifier_start(self.char_at(self.index + 1)) => {
                    self.advance();
                    while chars::is_identifier_part(self.peek) {
                        self.advance();
                    }
                }
                chars::QUESTION if self.char_at(self.index + 1) == chars::PERIOD => {
                    let after = self.char_at(self.index + 2);
                    if chars::is_identifier_start(after) {
                        self.advance();
                        self.advance();
                        while chars::is_identifier_part(self.peek) {
                            self.advance();
                        }
                    } else if after == chars::LBRACKET {
                        self.advance();
                        self.advance();
                        if !self.scan_static_index() {
                            return self.end_variable(start, path_end);
                        }
                    } else {
                        break;
                    }
                }
                chars::LBRACKET => {
                    if !self.scan_static_index() {
                        return self.end_variable(start, path_end);
                    }
                }
                _ => break,
            }
        }

        Token::new(
            start,
            self.index,
            TokenType::Variable,
            self.input[start..self.index].to_string(),
        )
    }

    /// Consume `[123]` or `['key']`. Returns false, leaving the scanner
    /// positioned on the bracket, when the index is not a static key.
    /// An unterminated static key is reported as an error token after the
    /// variable so parsing stops there.
    fn scan_static_index(&mut self) -> bool {
        let bracket = self.index;
        let next = self.char_at(bracket + 1);

        if chars::is_digit(next) {
            let mut i = bracket + 1;
            while chars::is_digit(self.char_at(i)) {
                i += 1;
            }
            if self.char_at(i) != chars::RBRACKET {
                return false;
            }
            self.jump(i + 1);
            return true;
        }

        if chars::is_quote(next) {
            let mut i = bracket + 2;
            loop {
                let ch = self.char_at(i);
                if ch == chars::EOF {
                    return false;
                }
                if ch == chars::BACKSLASH {
                    i += 1 + self.char_at(i + 1).len_utf8();
                    continue;
                }
                if ch == next {
                    break;
                }
                i += ch.len_utf8();
            }
            if self.char_at(i + 1) != chars::RBRACKET {
                return false;
            }
            self.jump(i + 2);
            return true;
        }

        false
    }

    fn jump(&mut self, index: usize) {
        self.index = index.min(self.length);
        self.peek = self.char_at(self.index);
    }

    /// Emit the variable scanned so far. When the rest of the tag cannot be
    /// tokenized (an unterminated key), an error token follows it.
    fn end_variable(&mut self, start: usize, path_end: usize) -> Token {
        let token = Token::new(
            start,
            path_end,
            TokenType::Variable,
            self.input[start..path_end].to_string(),
        );
        self.jump(path_end);
        if self.peek == chars::LBRACKET && !self.has_closing_bracket(path_end) {
            self.tokens.push(token);
            let error = self.error(path_end, "Unterminated index");
            return error;
        }
        token
    }

    fn has_closing_bracket(&self, from: usize) -> bool {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for ch in self.input[from..].chars().skip(1) {
            if escaped {
                escaped = false;
                continue;
            }
            match quote {
                Some(_) if ch == chars::BACKSLASH => escaped = true,
                Some(q) if ch == q => quote = None,
                Some(_) => {}
                None if chars::is_quote(ch) => quote = Some(ch),
                None if ch == chars::RBRACKET => return true,
                None => {}
            }
        }
        false
    }

    fn error(&mut self, start: usize, message: &str) -> Token {
        let token = Token::new(start, self.length, TokenType::Error, message.to_string());
        self.jump(self.length);
        token
    }
}
