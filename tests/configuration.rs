//! Pipeline options and inference settings.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use secondsight::{
    CancellationToken, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_MODEL,
    InferenceConfig, PipelineOptions, SecondSightError,
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn default_options() {
    let options = PipelineOptions::default();
    assert_eq!(options.concurrency_limit(), DEFAULT_CONCURRENCY_LIMIT);
    assert_eq!(options.output_dir(), Some(Path::new("output")));
    assert!(options.validate().is_ok());
}

#[test]
fn builder_chaining() {
    let options = PipelineOptions::new()
        .with_concurrency_limit(2)
        .with_batch_size(0)
        .with_cancellation(CancellationToken::new())
        .with_output_dir("results");

    assert_eq!(options.concurrency_limit(), 2);
    assert_eq!(options.output_dir(), Some(Path::new("results")));

    let debug = format!("{options:?}");
    assert!(debug.contains("batch_size: 1"), "{debug}");
    assert!(debug.contains("has_cancellation: true"), "{debug}");
}

#[test]
fn persistence_can_be_disabled() {
    let options = PipelineOptions::new().without_persistence();
    assert!(options.output_dir().is_none());
}

#[test]
fn zero_concurrency_is_rejected() {
    let options = PipelineOptions::new().with_concurrency_limit(0);
    assert!(matches!(
        options.validate(),
        Err(SecondSightError::InvalidConcurrency(0))
    ));
}

#[test]
fn missing_api_key() {
    let error = InferenceConfig::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(
        error,
        SecondSightError::MissingConfiguration {
            variable: "OPENAI_API_KEY"
        }
    ));
    assert!(error.to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn blank_api_key_counts_as_missing() {
    let error = InferenceConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
    assert!(matches!(error, SecondSightError::MissingConfiguration { .. }));
}

#[test]
fn defaults_with_key_only() {
    let config = InferenceConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
    assert_eq!(config.api_key, "sk-test");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.max_tokens, 1000);
    assert_eq!(config.timeout, Duration::from_secs(180));
}

#[test]
fn overrides_are_applied() {
    let config = InferenceConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ("OPENAI_MODEL", "llava"),
        ("OPENAI_MAX_TOKENS", "250"),
        ("OPENAI_TIMEOUT_SECS", "30"),
    ]))
    .unwrap();

    assert_eq!(config.base_url, "http://localhost:8080/v1");
    assert_eq!(config.model, "llava");
    assert_eq!(config.max_tokens, 250);
    assert_eq!(config.timeout, Duration::from_secs(30));
}

#[test]
fn blank_overrides_keep_defaults() {
    let config = InferenceConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_MODEL", ""),
    ]))
    .unwrap();
    assert_eq!(config.model, DEFAULT_MODEL);
}

#[test]
fn unparsable_numbers_are_rejected() {
    let error = InferenceConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_MAX_TOKENS", "lots"),
    ]))
    .unwrap_err();
    assert!(matches!(
        error,
        SecondSightError::InvalidConfiguration {
            field: "OPENAI_MAX_TOKENS",
            ..
        }
    ));

    let error = InferenceConfig::from_lookup(lookup(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_TIMEOUT_SECS", "-5"),
    ]))
    .unwrap_err();
    assert!(matches!(
        error,
        SecondSightError::InvalidConfiguration {
            field: "OPENAI_TIMEOUT_SECS",
            ..
        }
    ));
}

#[test]
fn debug_hides_the_key() {
    let config = InferenceConfig::new("sk-very-secret").with_model("gpt-4o-mini");
    let debug = format!("{config:?}");
    assert!(!debug.contains("sk-very-secret"));
    assert!(debug.contains("<redacted>"));
    assert!(debug.contains("gpt-4o-mini"));
}
