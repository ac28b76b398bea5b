//! Code exercised by the sample suites: a small slice of a cloud client
//! (credential loading, request signing helpers, instance metadata parsing)

use chrono::DateTime;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("field '{0}' not found in metadata document")]
    MissingField(String),

    #[error("field '{0}' is not a string")]
    NotAString(String),

    #[error("malformed metadata document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),
}

pub type SampleResult<T> = Result<T, SampleError>;

/// Static access credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Read credentials through `lookup`, typically `std::env::var(..).ok()`
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> SampleResult<Self> {
        let access_key_id =
            lookup("ACCESS_KEY_ID").ok_or(SampleError::MissingVar("ACCESS_KEY_ID"))?;
        let secret_access_key =
            lookup("SECRET_ACCESS_KEY").ok_or(SampleError::MissingVar("SECRET_ACCESS_KEY"))?;

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: lookup("SESSION_TOKEN"),
        })
    }
}

/// Format a Unix timestamp as `YYYYMMDD'T'HHMMSS'Z'`
pub fn format_amz_date(unix_secs: i64) -> SampleResult<String> {
    let date = DateTime::from_timestamp(unix_secs, 0)
        .ok_or(SampleError::TimestampOutOfRange(unix_secs))?;
    Ok(date.format("%Y%m%dT%H%M%SZ").to_string())
}

/// Build a canonical query string: keys sorted, unreserved characters kept,
/// everything else percent-encoded
pub fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Extract a top-level string field from a JSON metadata document
pub fn parse_json_field(body: &str, field: &str) -> SampleResult<String> {
    let doc: Value = serde_json::from_str(body)?;
    let value = doc
        .get(field)
        .ok_or_else(|| SampleError::MissingField(field.to_string()))?;

    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SampleError::NotAString(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amz_date() {
        assert_eq!(format_amz_date(0).unwrap(), "19700101T000000Z");
        assert_eq!(format_amz_date(1_440_938_160).unwrap(), "20150830T123600Z");
        assert_eq!(format_amz_date(951_782_400).unwrap(), "20000229T000000Z");
        assert!(matches!(
            format_amz_date(i64::MAX),
            Err(SampleError::TimestampOutOfRange(i64::MAX))
        ));
    }

    #[test]
    fn test_canonical_query() {
        assert_eq!(
            canonical_query(&[("b", "2"), ("a", "x y"), ("Action", "List")]),
            "Action=List&a=x%20y&b=2"
        );
    }

    #[test]
    fn test_parse_json_field() {
        let doc = r#"{ "region": "eu-west-1", "instanceId" : "i-0abc", "port": 80 }"#;
        assert_eq!(parse_json_field(doc, "instanceId").unwrap(), "i-0abc");
        assert!(matches!(
            parse_json_field(doc, "zone"),
            Err(SampleError::MissingField(field)) if field == "zone"
        ));
        assert!(matches!(
            parse_json_field(doc, "port"),
            Err(SampleError::NotAString(_))
        ));
        assert!(matches!(
            parse_json_field("{ \"region\": ", "region"),
            Err(SampleError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_json_field_ignores_nested_keys() {
        let doc = r#"{ "identity": { "region": "us-east-1" }, "region": "eu-west-1" }"#;
        assert_eq!(parse_json_field(doc, "region").unwrap(), "eu-west-1");
    }
}
