//! JSON envelope — spec §7: `{success:false, error, suggestion?, context?}`
//! on failure. Success responses carry whatever shape the tool produces,
//! so only the failure envelope is a fixed struct.

use crate::error::ToolError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ErrorEnvelope {
    pub fn from_error(err: &ToolError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            suggestion: err.suggestion(),
            context: Some(serde_json::json!({ "kind": err.kind().as_str() })),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"success": false, "error": "failed to serialize error"}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_suggestion_when_present() {
        let err = ToolError::NotReady { index_stats_hint: true };
        let envelope = ErrorEnvelope::from_error(&err);
        assert!(!envelope.success);
        assert!(envelope.suggestion.is_some());
    }
}
