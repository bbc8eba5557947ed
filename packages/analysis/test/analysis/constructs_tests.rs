/**
 * Construct Scoping Tests
 *
 * Loops, branches, error handlers and document lists.
 */

#[path = "../util/mod.rs"]
mod util;

#[cfg(test)]
mod tests {
    use super::util::{analyze, defer, messages, nunjucks, pipeline, registries, sub_pipeline, var, ECHO, IDENTITY};
    use brick_analysis::analysis::{AnalysisContext, VarAnalysis};
    use brick_analysis::config::{AnalyzerConfig, ConstructRule};
    use brick_analysis::existence::Existence;
    use brick_analysis::logging::NullLogger;
    use serde_json::json;
    use std::sync::Arc;

    mod loops {
        use super::*;

        #[test]
        fn element_should_be_defined_in_body_only() {
            let result = analyze(json!([
                {"id": "@pixiebrix/for-each", "config": {
                    "elements": var("@input.items"),
                    "body": sub_pipeline(json!([
                        {"id": ECHO, "config": {"message": var("@element")}}
                    ]))
                }},
                {"id": IDENTITY, "config": {}}
            ]));
            assert!(result.annotations.is_empty(), "{:?}", result.annotations);
            assert!(result.known_vars["pipeline.0.config.body.__value__.0"].is_variable_defined("@element"));
            assert!(!result.known_vars["pipeline.0"].is_variable_defined("@element"));
            assert!(!result.known_vars["pipeline.1"].is_variable_defined("@element"));
        }

        #[test]
        fn element_after_loop_should_be_reported() {
            let result = analyze(json!([
                {"id": "@pixiebrix/for-each", "config": {"body": sub_pipeline(json!([]))}},
                {"id": ECHO, "config": {"message": var("@element")}}
            ]));
            assert_eq!(messages(&result), vec!["Variable \"@element\" might not be defined"]);
        }

        #[test]
        fn configured_element_key_should_be_used() {
            let result = analyze(json!([
                {"id": "@pixiebrix/for-each-element", "config": {
                    "selector": "li",
                    "elementKey": "item",
                    "body": sub_pipeline(json!([
                        {"id": ECHO, "config": {"a": var("@item.text"), "b": var("@element")}}
                    ]))
                }}
            ]));
            assert_eq!(messages(&result), vec!["Variable \"@element\" might not be defined"]);
            assert_eq!(
                result.annotations[0].position,
                "pipeline.0.config.body.__value__.0.config.b"
            );
        }

        #[test]
        fn body_outputs_should_not_leak() {
            let result = analyze(json!([
                {"id": "@pixiebrix/for-each", "config": {"body": sub_pipeline(json!([
                    {"id": ECHO, "outputKey": "inner", "config": {}},
                    {"id": ECHO, "config": {"message": var("@inner.message")}}
                ]))}},
                {"id": ECHO, "config": {"message": var("@inner")}}
            ]));
            assert_eq!(result.annotations.len(), 1);
            assert_eq!(result.annotations[0].position, "pipeline.1.config.message");
        }

        #[test]
        fn outer_outputs_should_be_visible_in_body() {
            let result = analyze(json!([
                {"id": ECHO, "outputKey": "outer", "config": {}},
                {"id": "@pixiebrix/for-each", "config": {"body": sub_pipeline(json!([
                    {"id": ECHO, "config": {"message": var("@outer.message")}}
                ]))}}
            ]));
            assert!(result.annotations.is_empty());
        }

        #[test]
        fn non_pipeline_body_should_fail_the_run() {
            let tree = pipeline(json!([
                {"id": "@pixiebrix/for-each", "config": {"body": "not a pipeline"}}
            ]));
            let error = VarAnalysis::with_defaults(AnalysisContext::default(), registries())
                .run(&tree)
                .unwrap_err();
            assert!(error.is_business_rule());
        }
    }

    mod branches {
        use super::*;

        #[test]
        fn branch_outputs_should_stay_in_their_branch() {
            let result = analyze(json!([
                {"id": "@pixiebrix/if-else", "config": {
                    "condition": var("@input.flag"),
                    "if": sub_pipeline(json!([
                        {"id": ECHO, "outputKey": "y", "config": {}},
                        {"id": ECHO, "config": {"message": var("@y.message")}}
                    ])),
                    "else": sub_pipeline(json!([
                        {"id": ECHO, "config": {"message": var("@y")}}
                    ]))
                }},
                {"id": ECHO, "config": {"message": var("@y")}}
            ]));
            let positions: Vec<&str> = result.annotations.iter().map(|a| a.position.as_str()).collect();
            assert_eq!(
                positions,
                vec!["pipeline.0.config.else.__value__.0.config.message", "pipeline.1.config.message"]
            );
        }

        #[test]
        fn construct_output_should_be_visible_after_it() {
            let result = analyze(json!([
                {"id": "@pixiebrix/if-else", "outputKey": "y", "config": {
                    "condition": true,
                    "if": sub_pipeline(json!([{"id": ECHO, "outputKey": "y", "config": {}}]))
                }},
                {"id": ECHO, "config": {"message": var("@y")}}
            ]));
            assert!(result.annotations.is_empty());
            assert_eq!(
                result.known_vars["pipeline.1"].get_existence("@y"),
                Some(Existence::Definitely)
            );
        }

        #[test]
        fn guarded_construct_output_should_be_maybe() {
            let result = analyze(json!([
                {"id": "@pixiebrix/if-else", "outputKey": "y", "if": var("@input.run"), "config": {
                    "if": sub_pipeline(json!([]))
                }},
                {"id": IDENTITY, "config": {}}
            ]));
            assert_eq!(result.known_vars["pipeline.1"].get_existence("@y"), Some(Existence::Maybe));
        }

        #[test]
        fn missing_else_branch_should_be_allowed() {
            let result = analyze(json!([
                {"id": "@pixiebrix/if-else", "config": {"condition": true, "if": sub_pipeline(json!([])), "else": null}}
            ]));
            assert!(result.annotations.is_empty());
        }
    }

    mod error_handlers {
        use super::*;

        #[test]
        fn error_should_only_be_defined_in_except() {
            let result = analyze(json!([
                {"id": "@pixiebrix/try-except", "config": {
                    "try": sub_pipeline(json!([{"id": ECHO, "config": {"message": var("@error.message")}}])),
                    "except": sub_pipeline(json!([{"id": ECHO, "config": {"message": var("@error.message")}}]))
                }}
            ]));
            assert_eq!(result.annotations.len(), 1);
            assert_eq!(
                result.annotations[0].position,
                "pipeline.0.config.try.__value__.0.config.message"
            );
        }

        #[test]
        fn configured_error_key_should_be_used() {
            let result = analyze(json!([
                {"id": "@pixiebrix/try-except", "config": {
                    "errorKey": "failure",
                    "except": sub_pipeline(json!([{"id": ECHO, "config": {"message": var("@failure.name")}}]))
                }}
            ]));
            assert!(result.annotations.is_empty());
        }

        #[test]
        fn retry_body_should_get_its_own_frame() {
            let result = analyze(json!([
                {"id": "@pixiebrix/retry", "config": {"body": sub_pipeline(json!([
                    {"id": ECHO, "outputKey": "attempt", "config": {}}
                ]))}},
                {"id": ECHO, "config": {"message": var("@attempt")}}
            ]));
            assert_eq!(result.annotations.len(), 1);
        }
    }

    mod documents {
        use super::*;

        fn document(body: serde_json::Value) -> serde_json::Value {
            json!([{"id": "@pixiebrix/document", "config": {"body": body}}])
        }

        #[test]
        fn list_variable_should_only_exist_in_its_element() {
            let result = analyze(document(json!([
                {"type": "list", "config": {
                    "array": var("@input.rows"),
                    "elementKey": "row",
                    "element": defer(json!({"type": "text", "config": {"text": nunjucks("{{ @row.name }}")}}))
                }},
                {"type": "text", "config": {"text": var("@row")}}
            ])));
            assert_eq!(result.annotations.len(), 1);
            assert_eq!(result.annotations[0].position, "pipeline.0.config.body.1.config.text");
            let deferred = "pipeline.0.config.body.0.config.element.__value__";
            assert!(result.known_vars[deferred].is_variable_defined("@row.name"));
        }

        #[test]
        fn list_should_default_to_element() {
            let result = analyze(document(json!([
                {"type": "list", "config": {
                    "array": var("@input.rows"),
                    "element": defer(json!({"type": "text", "config": {"text": var("@element.title")}}))
                }}
            ])));
            assert!(result.annotations.is_empty());
        }

        #[test]
        fn nested_lists_should_stack_variables() {
            let result = analyze(document(json!([
                {"type": "list", "config": {
                    "array": var("@input.groups"),
                    "elementKey": "group",
                    "element": defer(json!({"type": "list", "config": {
                        "array": var("@group.items"),
                        "elementKey": "item",
                        "element": defer(json!({"type": "text", "config": {
                            "text": nunjucks("{{ @group.name }}: {{ @item.name }}")
                        }}))
                    }}))
                }}
            ])));
            assert!(result.annotations.is_empty(), "{:?}", result.annotations);
        }

        #[test]
        fn button_pipelines_inside_lists_should_see_the_list_variable() {
            let result = analyze(document(json!([
                {"type": "list", "config": {
                    "array": var("@input.rows"),
                    "element": defer(json!({"type": "button", "config": {"onClick": sub_pipeline(json!([
                        {"id": ECHO, "config": {"message": var("@element.id")}}
                    ]))}}))
                }}
            ])));
            assert!(result.annotations.is_empty(), "{:?}", result.annotations);
            assert!(result
                .known_vars
                .contains_key("pipeline.0.config.body.0.config.element.__value__.config.onClick.__value__.0"));
        }

        #[test]
        fn custom_document_brick_ids_should_be_walked_as_documents() {
            let config = AnalyzerConfig {
                document_brick_ids: vec!["@acme/panel".to_string()],
                ..Default::default()
            };
            let tree = pipeline(json!([{"id": "@acme/panel", "config": {"body": [
                {"type": "list", "config": {
                    "array": var("@input.rows"),
                    "element": defer(json!({"type": "text", "config": {"text": var("@element")}}))
                }}
            ]}}]));
            let result = VarAnalysis::new(AnalysisContext::default(), registries(), config, Arc::new(NullLogger::new()))
                .run(&tree)
                .unwrap();
            assert!(result.annotations.is_empty());
        }
    }

    #[test]
    fn plain_deferred_body_should_record_its_scope() {
        let result = analyze(json!([
            {"id": ECHO, "outputKey": "first", "config": {"message": "hi"}},
            {"id": ECHO, "config": {"later": defer(json!({"v": var("@z")}))}}
        ]));
        let deferred = "pipeline.1.config.later.__value__";
        let scope = result.known_vars_at(deferred).expect("deferred scope");
        assert!(scope.is_variable_defined("@first.message"));
        assert!(!scope.is_variable_defined("@z"));
        assert_eq!(result.annotations.len(), 1);
        assert_eq!(result.annotations[0].position, "pipeline.1.config.later.__value__.v");
    }

    #[test]
    fn custom_construct_rules_should_inject_variables() {
        let config = AnalyzerConfig {
            constructs: vec![ConstructRule::new("@acme/map", &["each"]).inject("each", "as", "value")],
            ..Default::default()
        };
        let tree = pipeline(json!([
            {"id": "@acme/map", "config": {"as": "entry", "each": sub_pipeline(json!([
                {"id": ECHO, "config": {"message": var("@entry.key")}}
            ]))}}
        ]));
        let result = VarAnalysis::new(AnalysisContext::default(), registries(), config, Arc::new(NullLogger::new()))
            .run(&tree)
            .unwrap();
        assert!(result.annotations.is_empty());
    }
}
