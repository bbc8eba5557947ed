/**
 * Lexer Tests
 *
 * Tag splitting and in-tag tokenization of template text.
 */

#[cfg(test)]
mod tests {
    use brick_analysis::template_parser::{Lexer, TagKind, Token, TokenType};

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new().tokenize(text)
    }

    fn expect_variable_token(token: &Token, index: usize, end: usize, value: &str) {
        assert!(token.is_variable(), "Expected variable token, got {:?}", token);
        assert_eq!(token.index, index, "Token index mismatch");
        assert_eq!(token.end, end, "Token end mismatch");
        assert_eq!(token.str_value, value);
    }

    fn variables(text: &str) -> Vec<String> {
        lex(text)
            .into_iter()
            .filter(|t| t.is_variable())
            .map(|t| t.str_value)
            .collect()
    }

    mod split_tags {
        use super::*;

        #[test]
        fn should_find_output_statement_and_comment_tags() {
            let tags = Lexer::new().split_tags("a {{ @x }} b {% if @y %} c {# @z #}");
            let kinds: Vec<TagKind> = tags.iter().map(|t| t.kind).collect();
            assert_eq!(kinds, vec![TagKind::Output, TagKind::Statement, TagKind::Comment]);
            assert_eq!(tags[0].content, " @x ");
            assert_eq!(tags[0].start, 2);
            assert_eq!(tags[0].end, 10);
            assert!(tags.iter().all(|t| t.terminated));
        }

        #[test]
        fn should_ignore_single_braces() {
            let tags = Lexer::new().split_tags("{ \"json\": 1 } {{ @x }}");
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].content, " @x ");
        }

        #[test]
        fn should_not_close_inside_strings() {
            let tags = Lexer::new().split_tags("{{ \"}}\" + @x }}");
            assert_eq!(tags.len(), 1);
            assert_eq!(tags[0].content, " \"}}\" + @x ");
        }

        #[test]
        fn should_stop_after_unterminated_tag() {
            let tags = Lexer::new().split_tags("{{ @a }} {{ @b {% if %}");
            assert_eq!(tags.len(), 2);
            assert!(tags[0].terminated);
            assert!(!tags[1].terminated);
        }

        #[test]
        fn next_tag_should_start_from_offset() {
            let lexer = Lexer::new();
            let template = "{{ @a }} {% raw %}";
            let first = lexer.next_tag(template, 0).expect("first tag");
            let second = lexer.next_tag(template, first.end).expect("second tag");
            assert_eq!(second.kind, TagKind::Statement);
            assert_eq!(second.content, " raw ");
            assert!(lexer.next_tag(template, second.end).is_none());
        }
    }

    mod tokenize {
        use super::*;

        #[test]
        fn should_tokenize_simple_variable() {
            let tokens = lex("@foo");
            assert_eq!(tokens.len(), 1);
            expect_variable_token(&tokens[0], 0, 4, "@foo");
        }

        #[test]
        fn should_tokenize_dotted_variable() {
            let tokens = lex(" @foo.bar.baz ");
            expect_variable_token(&tokens[0], 1, 13, "@foo.bar.baz");
        }

        #[test]
        fn should_tokenize_optional_chaining() {
            assert_eq!(variables("@foo?.bar?.[0]"), vec!["@foo?.bar?.[0]"]);
        }

        #[test]
        fn should_tokenize_bracket_access() {
            assert_eq!(variables("@foo[0].bar"), vec!["@foo[0].bar"]);
            assert_eq!(variables("@foo['bar baz']"), vec!["@foo['bar baz']"]);
            assert_eq!(variables("@foo[\"a\"].b"), vec!["@foo[\"a\"].b"]);
        }

        #[test]
        fn should_stop_at_dynamic_index() {
            assert_eq!(variables("@foo[@i].bar"), vec!["@foo", "@i"]);
            assert_eq!(variables("@foo[i]"), vec!["@foo"]);
        }

        #[test]
        fn should_not_tokenize_filters_as_variables() {
            let tokens = lex("@name | upper | truncate(3)");
            assert_eq!(variables("@name | upper | truncate(3)"), vec!["@name"]);
            assert!(tokens[1].is_character('|'));
            assert!(tokens[2].is_keyword("upper"));
        }

        #[test]
        fn should_tokenize_variables_in_filter_arguments() {
            assert_eq!(variables("@a | default(@b.c)"), vec!["@a", "@b.c"]);
        }

        #[test]
        fn should_not_tokenize_variables_in_strings() {
            let tokens = lex("'@foo' ~ @bar");
            assert_eq!(tokens[0].token_type, TokenType::String);
            assert_eq!(tokens[0].str_value, "@foo");
            assert_eq!(variables("'@foo' ~ @bar"), vec!["@bar"]);
        }

        #[test]
        fn should_return_bare_sigil() {
            let tokens = lex("@ + 1");
            expect_variable_token(&tokens[0], 0, 1, "@");
        }

        #[test]
        fn should_not_include_trailing_period() {
            assert_eq!(variables("@foo."), vec!["@foo"]);
        }

        #[test]
        fn should_tokenize_numbers_and_identifiers() {
            let tokens = lex("loop.index 12.5");
            assert!(tokens[0].is_keyword("loop"));
            assert!(tokens[1].is_character('.'));
            assert!(tokens[2].is_identifier());
            assert_eq!(tokens[3].token_type, TokenType::Number);
            assert_eq!(tokens[3].str_value, "12.5");
        }

        #[test]
        fn should_report_unterminated_string() {
            let tokens = lex("@a ~ 'oops");
            assert_eq!(tokens.len(), 3);
            assert!(tokens[2].is_error());
            assert_eq!(tokens[2].str_value, "Unterminated quote");
        }

        #[test]
        fn should_report_unterminated_index() {
            let tokens = lex("@a['b");
            assert_eq!(tokens.len(), 2);
            expect_variable_token(&tokens[0], 0, 2, "@a");
            assert!(tokens[1].is_error());
            assert_eq!(tokens[1].str_value, "Unterminated index");
        }
    }
}
