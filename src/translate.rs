//! Translation of extracted responses into keyspace results

use tracing::warn;

use crate::error::{Error, Result};
use crate::extract::RawResponse;
use crate::types::KeysResult;

/// Parse the body of `raw` into a [`KeysResult`] carrying the index headers.
///
/// An error code in the body is returned as part of the result when it is
/// listed in `accepted_errors`; any other error code fails with
/// [`Error::Etcd`].
pub(crate) fn translate(raw: RawResponse, accepted_errors: &[u32]) -> Result<KeysResult> {
    let body = match raw.body {
        Some(body) if !body.is_empty() => body,
        _ => return Err(Error::EmptyResponse),
    };

    let mut result: KeysResult = serde_json::from_str(&body)?;
    result.etcd_index = raw.etcd_index;
    result.raft_index = raw.raft_index;
    result.raft_term = raw.raft_term;

    if let Some(code) = result.error_code {
        if !accepted_errors.contains(&code) {
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| format!("etcd error code {}", code));
            warn!("etcd error {}: {} (status {})", code, message, raw.status);
            return Err(Error::Etcd {
                message,
                result: Box::new(result),
            });
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error_code;

    fn raw(status: u16, body: Option<&str>) -> RawResponse {
        RawResponse {
            body: body.map(str::to_string),
            status,
            etcd_index: Some(12),
            raft_index: Some(3400),
            raft_term: None,
        }
    }

    #[test]
    fn test_node_result_carries_counters() {
        let body = r#"{"action":"get","node":{"key":"/a","value":"1","modifiedIndex":11,"createdIndex":10}}"#;
        let result = translate(raw(200, Some(body)), &[]).unwrap();
        assert!(!result.is_error());
        assert_eq!(result.value(), Some("1"));
        assert_eq!(result.etcd_index, Some(12));
        assert_eq!(result.raft_index, Some(3400));
        assert_eq!(result.raft_term, None);
    }

    #[test]
    fn test_absent_body_is_empty_response() {
        assert!(matches!(translate(raw(200, None), &[]), Err(Error::EmptyResponse)));
    }

    #[test]
    fn test_empty_body_is_not_an_empty_node() {
        let err = translate(raw(200, Some("")), &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
        assert!(err.is_transport());

        // A real, empty node is a valid result.
        let result = translate(raw(200, Some(r#"{"node":{}}"#)), &[]).unwrap();
        assert_eq!(result.node.unwrap().key, "");
    }

    #[test]
    fn test_malformed_body_is_parse_failure() {
        assert!(matches!(translate(raw(200, Some("{not json")), &[]), Err(Error::Json(_))));
        assert!(matches!(translate(raw(200, Some("1.2.3")), &[]), Err(Error::Json(_))));
    }

    #[test]
    fn test_accepted_error_code_is_returned() {
        let body = r#"{"errorCode":101,"message":"Compare failed","cause":"[a != b]","index":8}"#;
        let result = translate(raw(412, Some(body)), &[error_code::TEST_FAILED]).unwrap();
        assert!(result.is_error());
        assert_eq!(result.error_code, Some(101));
        assert_eq!(result.message.as_deref(), Some("Compare failed"));
        assert_eq!(result.etcd_index, Some(12));
    }

    #[test]
    fn test_unaccepted_error_code_fails_with_result() {
        let body = r#"{"errorCode":100,"message":"Key not found","cause":"/x","index":8}"#;
        let err = translate(raw(404, Some(body)), &[error_code::TEST_FAILED]).unwrap_err();
        assert_eq!(err.to_string(), "Key not found");
        assert_eq!(err.error_code(), Some(100));
        let result = err.result().unwrap();
        assert_eq!(result.cause.as_deref(), Some("/x"));
        assert_eq!(result.etcd_index, Some(12));
    }

    #[test]
    fn test_error_code_without_message() {
        let err = translate(raw(400, Some(r#"{"errorCode":209}"#)), &[]).unwrap_err();
        assert_eq!(err.to_string(), "etcd error code 209");
    }
}
