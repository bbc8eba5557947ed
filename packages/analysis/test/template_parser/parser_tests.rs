/**
 * Parser Tests
 *
 * Variable extraction from whole templates.
 */

#[cfg(test)]
mod tests {
    use brick_analysis::template_parser::{parse_template_variables, Parser};

    fn vars(template: &str) -> Vec<String> {
        parse_template_variables(template)
    }

    #[test]
    fn should_return_nothing_for_plain_text() {
        assert!(vars("Hello @world, no tags here").is_empty());
        assert!(vars("").is_empty());
    }

    #[test]
    fn should_extract_output_variables() {
        assert_eq!(vars("Hello {{ @input.name }}!"), vec!["@input.name"]);
    }

    #[test]
    fn should_extract_statement_variables() {
        let template = "{% for item in @input.items %}{{ item.title }} {{ @options.suffix }}{% endfor %}";
        assert_eq!(vars(template), vec!["@input.items", "@options.suffix"]);
    }

    #[test]
    fn should_exclude_roots_without_sigil() {
        assert!(vars("{{ item.title }} {{ loop.index }}").is_empty());
    }

    #[test]
    fn should_exclude_filters() {
        assert_eq!(vars("{{ @name | upper | replace('a', @b) }}"), vec!["@name", "@b"]);
    }

    #[test]
    fn should_deduplicate_in_first_occurrence_order() {
        assert_eq!(vars("{{ @b }} {{ @a }} {{ @b }}"), vec!["@b", "@a"]);
    }

    #[test]
    fn should_skip_comments() {
        assert_eq!(vars("{# {{ @hidden }} #}{{ @shown }}"), vec!["@shown"]);
    }

    #[test]
    fn should_skip_raw_blocks() {
        let template = "{% raw %}{{ @literal }}{% endraw %}{{ @real }}";
        assert_eq!(vars(template), vec!["@real"]);
    }

    #[test]
    fn raw_block_should_not_swallow_following_tags() {
        assert_eq!(vars("{% raw %}{{ {% endraw %}{{ @missing }}"), vec!["@missing"]);
        assert_eq!(
            vars("{% verbatim %}{% endraw %}{{ @hidden }}{% endverbatim %}{{ @shown }}"),
            vec!["@shown"]
        );
    }

    #[test]
    fn unclosed_raw_block_should_hide_the_rest() {
        let result = Parser::new().parse("{{ @a }}{% raw %}{{ @b }}");
        assert_eq!(result.variables, vec!["@a"]);
        assert!(result.error.is_none());
    }

    #[test]
    fn should_keep_bracket_paths() {
        assert_eq!(vars("{{ @foo['bar baz'][0] }}"), vec!["@foo['bar baz'][0]"]);
    }

    #[test]
    fn should_report_bare_sigil() {
        assert_eq!(vars("{{ @ }}"), vec!["@"]);
    }

    mod malformed {
        use super::*;

        #[test]
        fn unterminated_tag_should_keep_earlier_variables() {
            let result = Parser::new().parse("{{ @a }} {{ @b ");
            assert_eq!(result.variables, vec!["@a", "@b"]);
            let error = result.error.expect("error");
            assert_eq!(error.message, "Unterminated tag");
            assert_eq!(error.index, 9);
        }

        #[test]
        fn unterminated_string_should_stop_parsing() {
            let result = Parser::new().parse("{{ @a ~ 'x }} {{ @b }}");
            assert_eq!(result.variables, vec!["@a"]);
            assert!(result.error.is_some());
        }

        #[test]
        fn unterminated_comment_should_be_an_error() {
            let result = Parser::new().parse("{{ @a }}{# never closed");
            assert_eq!(result.variables, vec!["@a"]);
            assert_eq!(result.error.expect("error").message, "Unterminated comment");
        }

        #[test]
        fn parser_should_be_reusable() {
            let parser = Parser::new();
            let first = parser.parse("{{ @a ");
            let second = parser.parse("{{ @b }}");
            assert!(first.error.is_some());
            assert_eq!(second.variables, vec!["@b"]);
            assert!(second.error.is_none());
        }
    }
}
