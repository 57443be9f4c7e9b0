//! Response parsing and record validation tests.

use serde_json::json;

use secondsight::{
    OverallAction, extract_json_candidate, parse_activity, parse_json_from_response,
    validate_record,
};

fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

// ── Candidate extraction ───────────────────────────────────────────

#[test]
fn fenced_block_wins_over_surrounding_braces() {
    let text = "{ignored} prose\n```json\n{\"overall_action\": \"food\"}\n```\ntrailing {also ignored}";
    assert_eq!(extract_json_candidate(text), "{\"overall_action\": \"food\"}");
}

#[test]
fn untagged_and_uppercase_fences_are_accepted() {
    assert_eq!(extract_json_candidate("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    assert_eq!(extract_json_candidate("```JSON\n{\"a\": 1}\n```"), "{\"a\": 1}");
}

#[test]
fn fence_keeps_nested_objects_whole() {
    let text = "```json\n{\"a\": {\"b\": 1}}\n```";
    assert_eq!(extract_json_candidate(text), "{\"a\": {\"b\": 1}}");
}

#[test]
fn brace_span_runs_from_first_to_last() {
    let text = "Result: {\"a\": {\"b\": 2}} done";
    assert_eq!(extract_json_candidate(text), "{\"a\": {\"b\": 2}}");
}

#[test]
fn text_without_braces_is_returned_whole() {
    assert_eq!(extract_json_candidate("  plain words "), "  plain words ");
}

// ── Parsing ────────────────────────────────────────────────────────

#[test]
fn parses_bare_object() {
    let map = parse_json_from_response(r#"{"overall_action": "sleep"}"#).expect("object");
    assert_eq!(map["overall_action"], "sleep");
}

#[test]
fn rejects_invalid_json() {
    assert!(parse_json_from_response("I cannot help with that.").is_none());
    assert!(parse_json_from_response("{not: json}").is_none());
}

#[test]
fn rejects_non_objects_and_empty_objects() {
    assert!(parse_json_from_response("[1, 2, 3]").is_none());
    assert!(parse_json_from_response("42").is_none());
    assert!(parse_json_from_response("{}").is_none());
}

#[test]
fn two_separate_objects_fail_to_parse() {
    // The greedy span covers both objects, which is not valid JSON.
    assert!(parse_json_from_response(r#"{"a": 1} and {"b": 2}"#).is_none());
}

// ── Validation ─────────────────────────────────────────────────────

#[test]
fn schema_coercion_example() {
    let text = "here is json: ```json\n{\"overall_action\":\"dancing\",\"sub_action\":5,\"description\":\"\"}\n``` thanks";
    let record = parse_activity(text, 0).expect("record");

    assert_eq!(record.overall_action, OverallAction::Unknown);
    assert_eq!(record.sub_action, "5");
    assert_eq!(record.description, "");
}

#[test]
fn sampled_second_overrides_model_second() {
    let text = r#"{"second": 99, "overall_action":"food","sub_action":"","description":"eating"}"#;
    let record = parse_activity(text, 7).expect("record");

    assert_eq!(record.second, 7);
    assert_eq!(record.overall_action, OverallAction::Food);
    assert_eq!(record.description, "eating");
}

#[test]
fn every_category_is_recognised() {
    for category in OverallAction::CATEGORIES {
        let record = validate_record(&object(json!({"overall_action": category.as_str()})), 0);
        assert_eq!(record.overall_action, category);
    }
}

#[test]
fn category_matching_is_case_sensitive() {
    let record = validate_record(&object(json!({"overall_action": "Sport"})), 0);
    assert_eq!(record.overall_action, OverallAction::Unknown);
}

#[test]
fn non_string_category_is_unknown() {
    let record = validate_record(&object(json!({"overall_action": 3})), 0);
    assert_eq!(record.overall_action, OverallAction::Unknown);
}

#[test]
fn missing_fields_become_empty_strings() {
    let record = validate_record(&object(json!({"overall_action": "work"})), 2);
    assert_eq!(record.sub_action, "");
    assert_eq!(record.description, "");
}

#[test]
fn falsy_values_become_empty_strings() {
    for value in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
        let record = validate_record(&object(json!({"sub_action": value})), 0);
        assert_eq!(record.sub_action, "", "value {value} should coerce to empty");
    }
}

#[test]
fn truthy_values_become_their_json_text() {
    let cases = [
        (json!(true), "true"),
        (json!(2.5), "2.5"),
        (json!(["a"]), "[\"a\"]"),
        (json!({"k": 1}), "{\"k\":1}"),
        (json!("sitting"), "sitting"),
    ];
    for (value, expected) in cases {
        let record = validate_record(&object(json!({"sub_action": value})), 0);
        assert_eq!(record.sub_action, expected);
    }
}

#[test]
fn short_description_is_accepted_as_alias() {
    let record = validate_record(
        &object(json!({"overall_action": "leisure", "short_description": "reading"})),
        1,
    );
    assert_eq!(record.description, "reading");
}

#[test]
fn description_takes_precedence_over_alias() {
    let record = validate_record(
        &object(json!({"description": "running", "short_description": "jogging"})),
        1,
    );
    assert_eq!(record.description, "running");
}

#[test]
fn empty_description_falls_back_to_alias() {
    let record = validate_record(
        &object(json!({"description": "", "short_description": "jogging"})),
        1,
    );
    assert_eq!(record.description, "jogging");
}

#[test]
fn records_serialize_with_canonical_field_names() {
    let record = parse_activity(
        r#"{"overall_action":"sport","sub_action":"cycling","short_description":"on a bike"}"#,
        4,
    )
    .expect("record");

    let value = serde_json::to_value(&record).expect("serialize");
    assert_eq!(
        value,
        json!({
            "second": 4,
            "overall_action": "sport",
            "sub_action": "cycling",
            "description": "on a bike"
        })
    );
}
