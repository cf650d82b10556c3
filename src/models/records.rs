use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::provider::TokenUsage;

const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    ThumbsUp,
    ThumbsDown,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::ThumbsUp => "thumbs_up",
            Rating::ThumbsDown => "thumbs_down",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: String,
    pub rating: Rating,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub message_id: String,
    pub rating: Rating,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn from_request(req: FeedbackRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_id: req.message_id,
            rating: req.rating,
            comment: req.comment.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        }
    }
}

/// Where a turn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    Api,
    Sms,
    Cli,
    Eval,
}

impl UsageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageSource::Api => "api",
            UsageSource::Sms => "sms",
            UsageSource::Cli => "cli",
            UsageSource::Eval => "eval",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub source: UsageSource,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub estimated_tokens: bool,
    pub estimated_usd: f64,
    pub query_preview: String,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// `redacted_query` must already have been through PHI redaction.
    pub fn new(source: UsageSource, model: &str, usage: TokenUsage, estimated_usd: f64, redacted_query: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            model: model.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            estimated_tokens: usage.estimated,
            estimated_usd,
            query_preview: preview(redacted_query),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub turns: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_usd: f64,
}

fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let flat = flat.trim();
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat.to_string();
    }
    let mut out: String = flat.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}
