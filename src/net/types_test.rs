use super::*;
use serde_json::json;

#[test]
fn scalar_text_reads_numbers_and_strings() {
    assert_eq!(scalar_text(&json!(7)), Some("7".to_owned()));
    assert_eq!(scalar_text(&json!("NV07")), Some("NV07".to_owned()));
}

#[test]
fn scalar_text_rejects_other_shapes() {
    assert_eq!(scalar_text(&json!(null)), None);
    assert_eq!(scalar_text(&json!("")), None);
    assert_eq!(scalar_text(&json!({"id": 1})), None);
    assert_eq!(scalar_text(&json!(true)), None);
}

#[derive(Debug, serde::Deserialize)]
struct IdHolder {
    #[serde(default, deserialize_with = "deserialize_scalar_text")]
    id: Option<String>,
}

#[test]
fn deserialize_scalar_text_accepts_number() {
    let holder: IdHolder = serde_json::from_str(r#"{"id": 42}"#).unwrap();
    assert_eq!(holder.id.as_deref(), Some("42"));
}

#[test]
fn deserialize_scalar_text_missing_and_null() {
    let missing: IdHolder = serde_json::from_str("{}").unwrap();
    assert!(missing.id.is_none());
    let null: IdHolder = serde_json::from_str(r#"{"id": null}"#).unwrap();
    assert!(null.id.is_none());
}

#[test]
fn request_options_builders_accumulate() {
    let options = RequestOptions::default()
        .header("X-Trace", "1")
        .header("Accept", "application/json")
        .raw_body("plain");
    assert_eq!(options.headers.len(), 2);
    assert_eq!(options.headers[0], ("X-Trace".to_owned(), "1".to_owned()));
    assert_eq!(options.raw_body.as_deref(), Some("plain"));
}
