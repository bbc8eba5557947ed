/*
 * Character Codes
 *
 * Characters the template scanner and path parser care about.
 */

// Special characters
pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const NEWLINE: char = '\n';
pub const RETURN: char = '\r';
pub const SPACE: char = ' ';
pub const NBSP: char = '\u{00A0}';

// Punctuation
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const PERCENT: char = '%';
pub const SQ: char = '\'';
pub const PERIOD: char = '.';
pub const QUESTION: char = '?';
pub const AT: char = '@';
pub const BACKSLASH: char = '\\';
pub const UNDERSCORE: char = '_';

// Brackets
pub const LBRACKET: char = '[';
pub const RBRACKET: char = ']';
pub const LBRACE: char = '{';

/// Check if character is whitespace
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == NEWLINE || ch == RETURN || ch == NBSP || (ch < ' ' && ch != EOF)
}

/// Check if character is a digit
pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

/// Check if character is a quote that opens a template string literal
pub fn is_quote(ch: char) -> bool {
    ch == SQ || ch == DQ
}

/// Check if character can start a variable name after the `@` sigil
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == UNDERSCORE || ch == DOLLAR
}

/// Check if character can be part of a variable name
pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || is_digit(ch)
}
