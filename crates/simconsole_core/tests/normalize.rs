use pretty_assertions::assert_eq;
use serde_json::json;
use simconsole_core::{decode_lenient, normalize, LogField, LogRecord, NormalizeError};

fn field(key: &str, value: serde_json::Value) -> LogField {
    LogField {
        key: key.to_string(),
        value: Some(value),
    }
}

#[test]
fn json_line_is_kept_verbatim() {
    let record = normalize(r#"{"level":"ERROR","count":0}"#).unwrap();

    assert!(record.is_structured());
    assert_eq!(record, LogRecord::Structured(json!({"level": "ERROR", "count": 0})));
}

#[test]
fn json_line_is_not_validated() {
    let nested = r#"{"span":{"id":7},"tags":["a","b"],"extra":null}"#;
    assert_eq!(
        normalize(nested).unwrap(),
        LogRecord::Structured(json!({"span": {"id": 7}, "tags": ["a", "b"], "extra": null}))
    );

    // Any JSON document is accepted, not only objects.
    assert_eq!(normalize("42").unwrap(), LogRecord::Structured(json!(42)));
    assert_eq!(normalize(r#""plain""#).unwrap(), LogRecord::Structured(json!("plain")));
}

#[test]
fn key_value_line_is_classified() {
    let record = normalize("{level=INFO, count=3, ok=true, msg=hello world}").unwrap();

    assert!(!record.is_structured());
    assert_eq!(
        record,
        LogRecord::Fields(vec![
            field("level", json!("INFO")),
            field("count", json!(3)),
            field("ok", json!(true)),
            field("msg", json!("hello world")),
        ])
    );
    assert_eq!(
        record.to_json(),
        json!({"level": "INFO", "count": 3, "ok": true, "msg": "hello world"})
    );
}

#[test]
fn booleans_numbers_and_strings() {
    let record = normalize("{a=false, b=-2.5, c=1e3, d=True, e=12abc}").unwrap();

    assert_eq!(record.get("a"), Some(&json!(false)));
    assert_eq!(record.get("b"), Some(&json!(-2.5)));
    assert_eq!(record.get("c").and_then(|c| c.as_f64()), Some(1000.0));
    assert_eq!(record.get("d"), Some(&json!("True")));
    assert_eq!(record.get("e"), Some(&json!("12abc")));
}

#[test]
fn every_brace_is_stripped() {
    let record = normalize("{outer={inner=1}, tail=x}}").unwrap();

    // `outer={inner=1}` loses its braces and splits on the first `=` only,
    // leaving a string value that still holds an `=`.
    assert_eq!(
        record,
        LogRecord::Fields(vec![field("outer", json!("inner=1")), field("tail", json!("x"))])
    );
}

#[test]
fn braces_are_optional() {
    assert_eq!(
        normalize("pid=12, user=root").unwrap().to_json(),
        json!({"pid": 12, "user": "root"})
    );
}

#[test]
fn token_without_equals_is_undefined() {
    let record = normalize("{level=WARN, orphan, n=1}").unwrap();

    assert_eq!(
        record,
        LogRecord::Fields(vec![
            field("level", json!("WARN")),
            LogField {
                key: "orphan".to_string(),
                value: None,
            },
            field("n", json!(1)),
        ])
    );
    assert!(record.contains_key("orphan"));
    assert_eq!(record.get("orphan"), None);
    assert_eq!(record.to_json(), json!({"level": "WARN", "n": 1}));
}

#[test]
fn empty_after_stripping_is_empty_record() {
    assert_eq!(normalize("{}").unwrap(), LogRecord::Structured(json!({})));
    assert_eq!(normalize("}{").unwrap(), LogRecord::Fields(Vec::new()));
    assert_eq!(normalize("  ").unwrap(), LogRecord::Fields(Vec::new()));
    assert_eq!(decode_lenient("{ }").unwrap().to_json(), json!({}));
}

#[test]
fn duplicate_keys_keep_first_position_and_last_value() {
    let record = normalize("{a=1, b=2, a=3}").unwrap();
    assert_eq!(
        record,
        LogRecord::Fields(vec![field("a", json!(3)), field("b", json!(2))])
    );
}

#[test]
fn empty_value_counts_as_numeric_and_fails() {
    // An empty value classifies as a number, which is not valid JSON.
    let err = normalize("{level=INFO, msg=}").unwrap_err();
    assert!(matches!(err, NormalizeError::Undecodable { ref line, .. } if line == "{level=INFO, msg=}"));
}

#[test]
fn numeric_looking_values_that_are_not_json_numbers_fail() {
    for line in ["{n=+5}", "{n=.5}", "{n=0x1F}", "{n=Infinity}", "{n=007}"] {
        assert!(normalize(line).is_err(), "{line}");
    }
}

#[test]
fn quotes_inside_values_fail() {
    assert!(normalize(r#"{msg=say "hi"}"#).is_err());
}

#[test]
fn out_of_range_numbers_are_kept_verbatim() {
    let record = normalize(r#"{"v":1e400,"level":"WARN"}"#).unwrap();
    assert!(record.is_structured());
    assert_eq!(record.to_json().to_string(), r#"{"v":1e400,"level":"WARN"}"#);

    let record = normalize("{v=1e400, level=WARN}").unwrap();
    assert!(!record.is_structured());
    assert_eq!(record.to_json().to_string(), r#"{"v":1e400,"level":"WARN"}"#);
}

#[test]
fn normalize_is_idempotent() {
    let lines = [
        r#"{"level":"ERROR","count":0}"#,
        "{level=INFO, count=3, ok=true, msg=hello world}",
        "{level=WARN, orphan}",
        "{n=+5}",
    ];
    for line in lines {
        assert_eq!(normalize(line), normalize(line), "{line}");
    }
}
