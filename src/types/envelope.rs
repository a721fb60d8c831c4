//! Backend call envelope

use serde::{Deserialize, Serialize};

/// Request body: which backend function to run and its payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEnvelope {
    /// Backend function name
    pub function_name: String,
    /// Function arguments
    pub data: serde_json::Value,
}

impl CallEnvelope {
    /// Create an envelope for `function_name`
    pub fn new(function_name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            function_name: function_name.into(),
            data,
        }
    }
}

/// Error body `{ error: { code, message, suggestion? } }`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details
    pub error: BackendErrorBody,
}

/// Error details reported by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendErrorBody {
    /// Machine-readable error code
    #[serde(default = "unknown_code")]
    pub code: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Operator-actionable hint
    #[serde(default)]
    pub suggestion: Option<String>,
}

fn unknown_code() -> String {
    "UNKNOWN".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let envelope = CallEnvelope::new("getWebsite", serde_json::json!({"websiteId": "w1"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"functionName": "getWebsite", "data": {"websiteId": "w1"}})
        );
    }

    #[test]
    fn test_error_envelope_defaults() {
        let parsed: ErrorEnvelope =
            serde_json::from_str(r#"{"error": {"message": "boom"}}"#).unwrap();
        assert_eq!(parsed.error.code, "UNKNOWN");
        assert_eq!(parsed.error.message, "boom");
        assert!(parsed.error.suggestion.is_none());
    }
}
