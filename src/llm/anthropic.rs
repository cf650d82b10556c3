use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::llm::provider::{estimate_tokens, LLMProvider, LLMResponse, Message, TokenUsage};
use crate::tools::definition::{ToolCall, ToolDefinition};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const CLIENT_USER_AGENT: &str = concat!("care-agent/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self, AppError> {
        let base_url = base_url
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| AppError::Config(format!("invalid api key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            client,
            model,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn post(&self, body: &Value) -> Result<AnthropicMessageResponse, AppError> {
        let resp = self
            .client
            .post(self.endpoint())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Anthropic error: {status} {text}")));
        }

        resp.json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed response body: {e}")))
    }

    fn build_body(
        &self,
        messages: Vec<Message>,
        tools: &[ToolDefinition],
        temperature: f64,
        max_tokens: u32,
    ) -> Value {
        let (system, converted) = convert_messages(messages);
        let mut body = json!({
            "model": self.model,
            "messages": converted,
            "max_tokens": max_tokens,
            "temperature": temperature
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|t| {
                        json!({
                            "name": t.name,
                            "description": t.description,
                            "input_schema": t.parameters
                        })
                    })
                    .collect(),
            );
        }
        body
    }

    fn into_response(&self, parsed: AnthropicMessageResponse, body: &Value) -> LLMResponse {
        let mut content = String::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        for block in parsed.content {
            match block.r#type.as_str() {
                "text" => {
                    if let Some(text) = block.text {
                        content.push_str(&text);
                    }
                }
                "tool_use" => {
                    if let (Some(id), Some(name)) = (block.id, block.name) {
                        tool_calls.push(ToolCall {
                            id,
                            name,
                            arguments: block.input.unwrap_or(Value::Null),
                        });
                    }
                }
                _ => {}
            }
        }

        let prompt_tokens = parsed.usage.as_ref().and_then(|u| u.input_tokens);
        let completion_tokens = parsed.usage.as_ref().and_then(|u| u.output_tokens);
        let estimated = prompt_tokens.is_none() || completion_tokens.is_none();

        let output_estimate_text = if tool_calls.is_empty() {
            content.clone()
        } else {
            format!(
                "{content}\n{}",
                serde_json::to_string(&tool_calls).unwrap_or_default()
            )
        };

        LLMResponse {
            content,
            usage: TokenUsage {
                input_tokens: prompt_tokens.unwrap_or_else(|| estimate_tokens(&body.to_string())),
                output_tokens: completion_tokens
                    .unwrap_or_else(|| estimate_tokens(&output_estimate_text)),
                estimated,
            },
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            finish_reason: parsed.stop_reason,
            tool_calls,
        }
    }
}

/// Anthropic keeps the system prompt out of the message list and wants tool
/// results as `tool_result` blocks inside a user turn.
fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<Value>) {
    let mut system_parts: Vec<String> = Vec::new();
    let mut out: Vec<Value> = Vec::new();

    for msg in messages {
        match msg {
            Message::System { content } => {
                if !content.trim().is_empty() {
                    system_parts.push(content);
                }
            }
            Message::User { content } => {
                out.push(json!({
                    "role": "user",
                    "content": [{ "type": "text", "text": content }]
                }));
            }
            Message::Assistant { content, tool_calls } => {
                let mut blocks = Vec::new();
                if !content.trim().is_empty() {
                    blocks.push(json!({ "type": "text", "text": content }));
                }
                for tc in tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": tc.id,
                        "name": tc.name,
                        "input": tc.arguments
                    }));
                }
                if blocks.is_empty() {
                    blocks.push(json!({ "type": "text", "text": "" }));
                }
                out.push(json!({ "role": "assistant", "content": blocks }));
            }
            Message::Tool {
                tool_call_id,
                content,
                ..
            } => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content
                });
                // Consecutive tool results belong in the same user turn.
                if let Some(last) = out.last_mut().filter(|l| is_tool_result_turn(l)) {
                    if let Some(blocks) = last["content"].as_array_mut() {
                        blocks.push(block);
                        continue;
                    }
                }
                out.push(json!({ "role": "user", "content": [block] }));
            }
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, out)
}

fn is_tool_result_turn(turn: &Value) -> bool {
    turn["role"] == "user"
        && turn["content"]
            .as_array()
            .map(|blocks| !blocks.is_empty() && blocks.iter().all(|b| b["type"] == "tool_result"))
            .unwrap_or(false)
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: Vec<Message>,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, AppError> {
        let body = self.build_body(messages, &[], temperature, max_tokens);
        let parsed = self.post(&body).await?;
        Ok(self.into_response(parsed, &body))
    }

    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: &[ToolDefinition],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, AppError> {
        let body = self.build_body(messages, tools, temperature, max_tokens);
        let parsed = self.post(&body).await?;
        Ok(self.into_response(parsed, &body))
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageResponse {
    model: Option<String>,
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    r#type: String,
    text: Option<String>,
    id: Option<String>,
    name: Option<String>,
    input: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}
