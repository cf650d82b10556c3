use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Uniform `{success, data?, error?}` envelope returned by every lookup tool.
///
/// Fields are private and the type is serialize-only, so [`ToolResult::ok`] and
/// [`ToolResult::err`] are the only ways to build one: a failed result always
/// carries an error and never carries data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Text handed back to the model as the tool message content.
    pub fn to_model_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":"tool result could not be serialized"}"#.to_string()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub call: ToolCall,
    pub result: ToolResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failed_result_serializes_without_data() {
        let r = ToolResult::err("medications must be a list");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({ "success": false, "error": "medications must be a list" }));
    }

    #[test]
    fn successful_result_serializes_without_error() {
        let r = ToolResult::ok(json!({ "severity": "none" }));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({ "success": true, "data": { "severity": "none" } }));
        assert!(r.error().is_none());
    }

    #[test]
    fn constructors_keep_the_envelope_shape() {
        let failed = ToolResult::err("");
        assert!(!failed.success());
        assert!(failed.data().is_none());
        assert_eq!(failed.error(), Some(""));
        assert_eq!(failed.to_model_text(), r#"{"success":false,"error":""}"#);

        let ok = ToolResult::ok(Value::Null);
        assert!(ok.success());
        assert!(ok.error().is_none());
        assert_eq!(ok.to_model_text(), r#"{"success":true,"data":null}"#);
    }
}
