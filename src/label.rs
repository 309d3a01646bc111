//! Metric name validation and L-value string construction (spec §3, §4.4).

use crate::error::PromError;

/// First character of a Prometheus metric name: letter, underscore, or colon.
fn is_valid_first_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

/// Subsequent characters: letter, digit, underscore, or colon.
fn is_valid_subsequent_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Validates a metric (or registry) name against `^[a-zA-Z_:][a-zA-Z0-9_:]*$`.
pub fn validate_metric_name(name: &str) -> Result<(), PromError> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| PromError::InvalidName("name must not be empty".to_string()))?;
    if !is_valid_first_char(first) {
        return Err(PromError::InvalidName(format!(
            "name must start with [a-zA-Z_:], got {first:?} in {name:?}"
        )));
    }
    for c in chars {
        if !is_valid_subsequent_char(c) {
            return Err(PromError::InvalidName(format!(
                "name may only contain [a-zA-Z0-9_:], got invalid char {c:?} in {name:?}"
            )));
        }
    }
    Ok(())
}

/// Escapes a label value for exposition: backslash, double quote, and
/// newline, per the Prometheus text format (the C original this library
/// is modeled on does not escape; this is a deliberate divergence, see
/// DESIGN.md).
pub fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds the canonical `name{k1="v1",k2="v2"}` (or `name_suffix{...}`)
/// L-value string for a sample. Braces are omitted when there are no
/// labels.
pub fn build_l_value(name: &str, suffix: Option<&str>, label_keys: &[String], label_values: &[String]) -> String {
    let mut out = String::with_capacity(name.len() + 16 * label_keys.len());
    out.push_str(name);
    if let Some(suffix) = suffix {
        out.push('_');
        out.push_str(suffix);
    }
    if label_keys.is_empty() {
        return out;
    }
    out.push('{');
    for (i, (key, value)) in label_keys.iter().zip(label_values.iter()).enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_label_value(value));
        out.push('"');
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_the_spec_regex() {
        assert!(validate_metric_name("a").is_ok());
        assert!(validate_metric_name("_").is_ok());
        assert!(validate_metric_name(":").is_ok());
        assert!(validate_metric_name("http_requests_total").is_ok());
        assert!(validate_metric_name("process_cpu:rate1m").is_ok());
        assert!(validate_metric_name("Z9_:ok").is_ok());

        assert!(validate_metric_name("").is_err());
        assert!(validate_metric_name("1abc").is_err());
        assert!(validate_metric_name("bad-name").is_err());
        assert!(validate_metric_name("bad.name").is_err());
        assert!(validate_metric_name("bad name").is_err());
    }

    #[test]
    fn builds_l_value_with_no_labels() {
        let v = build_l_value("test_counter", None, &[], &[]);
        assert_eq!(v, "test_counter");
    }

    #[test]
    fn builds_l_value_with_labels_and_suffix() {
        let keys = vec!["method".to_string(), "code".to_string()];
        let values = vec!["GET".to_string(), "200".to_string()];
        let v = build_l_value("http_requests", Some("total"), &keys, &values);
        assert_eq!(v, r#"http_requests_total{method="GET",code="200"}"#);
    }

    #[test]
    fn escapes_quotes_backslashes_and_newlines() {
        let keys = vec!["label".to_string()];
        let values = vec!["a\"b\\c\nd".to_string()];
        let v = build_l_value("m", None, &keys, &values);
        assert_eq!(v, r#"m{label="a\"b\\c\nd"}"#);
    }
}
