//! Property tests for response classification.

use myfatoorah_client::{ApiError, gateway::classify_body};
use proptest::prelude::*;
use serde_json::{Value, json};

fn error_field_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        "[ -~]{0,24}".prop_map(Value::from),
        prop::collection::vec(("[A-Z][a-z]{0,8}", "[a-z ]{1,16}"), 0..4).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(name, error)| json!({"Name": name, "Error": error}))
                .collect::<Value>()
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_success_flag_wins_over_error_fields(
        message in error_field_strategy(),
        validation in error_field_strategy(),
        data_error in error_field_strategy(),
    ) {
        let body = json!({
            "IsSuccess": true,
            "Message": message,
            "ValidationErrors": validation,
            "Data": {"ErrorMessage": data_error}
        })
        .to_string();

        let response = classify_body(&body);
        prop_assert!(response.is_success());
        prop_assert!(response.error().is_none());
    }

    #[test]
    fn test_html_body_yields_collapsed_text(
        words in prop::collection::vec("[a-zA-Z0-9]{1,10}", 1..8),
        gaps in prop::collection::vec(prop_oneof![Just(" "), Just("\n  "), Just("\t"), Just("  ")], 8),
    ) {
        let mut text = String::new();
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                text.push_str(gaps[i % gaps.len()]);
            }
            text.push_str(word);
        }
        let body = format!("<html><body><div class=\"error\">\n{text}\n</div></body></html>");

        let response = classify_body(&body);
        prop_assert_eq!(response.error(), Some(&ApiError::Html(words.join(" "))));
    }

    #[test]
    fn test_validation_errors_keep_order(
        entries in prop::collection::btree_map("[A-Z][a-zA-Z]{0,10}", "[a-z][a-z ]{0,15}", 1..10),
    ) {
        let list: Vec<Value> =
            entries.iter().map(|(name, error)| json!({"Name": name, "Error": error})).collect();
        let body = json!({"IsSuccess": false, "Message": "Invalid data", "ValidationErrors": list})
            .to_string();

        let response = classify_body(&body);
        let expected: Vec<String> =
            entries.iter().map(|(name, error)| format!("{name}: {error}")).collect();

        let error = response.error().map(ApiError::message);
        prop_assert_eq!(error, Some(expected.join(", ")));
        prop_assert!(matches!(response.error(), Some(ApiError::Validation(v)) if v.len() == entries.len()));
    }
}
