use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default = "default_success_message")]
    pub message: String,
}

impl SuccessResponse {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

impl Default for SuccessResponse {
    fn default() -> Self {
        Self {
            success: default_success(),
            message: default_success_message(),
        }
    }
}

fn default_success() -> bool {
    true
}

fn default_success_message() -> String {
    "Operation completed successfully".to_string()
}
