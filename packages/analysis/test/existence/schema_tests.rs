/**
 * Schema Propagation Tests
 *
 * JSON Schema shapes turned into existence entries.
 */

#[cfg(test)]
mod tests {
    use brick_analysis::existence::{set_existence_from_schema, Existence, ExistenceMap};
    use brick_analysis::schema::Schema;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> Schema {
        Schema::from_value(value).expect("valid schema")
    }

    fn propagate(value: serde_json::Value) -> ExistenceMap {
        let mut map = ExistenceMap::new();
        set_existence_from_schema(&mut map, "out", &schema(value), &["@out"], None);
        map
    }

    #[test]
    fn required_properties_should_be_definitely() {
        let map = propagate(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "number"}},
            "required": ["a"]
        }));
        assert_eq!(map.get_existence("@out"), Some(Existence::Definitely));
        assert_eq!(map.get_existence("@out.a"), Some(Existence::Definitely));
        assert_eq!(map.get_existence("@out.b"), Some(Existence::Maybe));
    }

    #[test]
    fn listed_properties_are_defined_and_others_are_not() {
        let map = propagate(json!({
            "type": "object",
            "properties": {"bar": {"type": "string"}, "opt": {"type": "string"}},
            "required": ["bar"]
        }));
        assert!(map.is_variable_defined("@out.bar"));
        assert!(map.is_variable_defined("@out.opt"));
        assert!(!map.is_variable_defined("@out.baz"));
    }

    #[test]
    fn optional_parent_should_make_children_maybe() {
        let map = propagate(json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": {"id": {"type": "string"}},
                    "required": ["id"]
                }
            }
        }));
        assert_eq!(map.get_existence("@out.user"), Some(Existence::Maybe));
        assert_eq!(map.get_existence("@out.user.id"), Some(Existence::Maybe));
    }

    #[test]
    fn override_should_force_every_node() {
        let mut map = ExistenceMap::new();
        let s = schema(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a"]
        }));
        map.set_existence_from_schema("out", &s, &["@out"], Some(Existence::Maybe));
        assert_eq!(map.get_existence("@out"), Some(Existence::Maybe));
        assert_eq!(map.get_existence("@out.a"), Some(Existence::Maybe));
    }

    #[test]
    fn additional_properties_true_should_allow_any_child() {
        let map = propagate(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": true
        }));
        assert!(map.is_variable_defined("@out.anything.at.all"));
    }

    #[test]
    fn additional_properties_schema_should_allow_any_child() {
        let map = propagate(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": {"type": "string"}
        }));
        assert!(map.is_variable_defined("@out.other"));
    }

    #[test]
    fn object_without_properties_should_allow_any_child() {
        assert!(propagate(json!({"type": "object"})).is_variable_defined("@out.x.y"));
        assert!(propagate(json!({})).is_variable_defined("@out.x"));
    }

    #[test]
    fn true_schema_should_be_permissive() {
        let map = propagate(json!(true));
        assert!(map.is_variable_defined("@out.whatever"));
    }

    #[test]
    fn false_schema_should_define_nothing() {
        let map = propagate(json!(false));
        assert!(!map.is_variable_defined("@out"));
    }

    #[test]
    fn composite_schemas_should_be_permissive() {
        let map = propagate(json!({
            "anyOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}},
                {"type": "object", "properties": {"b": {"type": "string"}}}
            ]
        }));
        assert!(map.is_variable_defined("@out.c"));
    }

    mod arrays {
        use super::*;

        #[test]
        fn single_items_should_recurse_at_the_same_path() {
            let map = propagate(json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}},
                    "required": ["name"]
                }
            }));
            assert!(map.is_variable_defined("@out.name"));
            assert!(map.is_variable_defined("@out[0].name"));
            assert!(!map.is_variable_defined("@out[0].age"));
        }

        #[test]
        fn true_items_should_allow_any_child() {
            let map = propagate(json!({"type": "array", "items": true}));
            assert!(map.is_variable_defined("@out[3].anything"));
        }

        #[test]
        fn tuple_items_should_allow_any_child() {
            let map = propagate(json!({
                "type": "array",
                "items": [{"type": "string"}, {"type": "object", "properties": {"x": {"type": "number"}}}]
            }));
            assert!(map.is_variable_defined("@out[1].y"));
        }

        #[test]
        fn additional_items_should_allow_any_child() {
            let map = propagate(json!({
                "type": "array",
                "items": {"type": "object", "properties": {"x": {"type": "number"}}},
                "additionalItems": {"type": "string"}
            }));
            assert!(map.is_variable_defined("@out[0].y"));
        }

        #[test]
        fn array_without_items_should_allow_any_child() {
            let map = propagate(json!({"type": "array"}));
            assert!(map.is_variable_defined("@out[0]"));
        }
    }

    #[test]
    fn nested_parent_path_should_be_respected() {
        let mut map = ExistenceMap::new();
        let s = schema(json!({"type": "object", "properties": {"b": {"type": "string"}}, "required": ["b"]}));
        map.set_existence_from_schema("s", &s, &["@a", "inner"], None);
        assert!(map.is_variable_defined("@a.inner.b"));
        assert!(!map.is_variable_defined("@a.b"));
    }
}
