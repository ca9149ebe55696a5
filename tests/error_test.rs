//! Tests for error types

use trueno_metrics::Error;

#[test]
fn test_format_error() {
    let error = Error::Format("missing column step".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Format error"));
    assert!(error_str.contains("missing column step"));
}

#[test]
fn test_coercion_error() {
    let error = Error::Coercion {
        row: 7,
        column: "value".to_string(),
        raw: "n/a".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("value"));
    assert!(error_str.contains("\"n/a\""));
    assert!(error_str.contains("row 7"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("cache_capacity must be greater than 0".to_string());
    assert!(format!("{error}").starts_with("Invalid input"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_error_debug() {
    let error = Error::Format("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Format"));
}
