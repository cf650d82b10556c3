use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::llm::provider::{estimate_tokens, LLMProvider, LLMResponse, Message, TokenUsage};
use crate::tools::definition::{ToolCall, ToolDefinition};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const CLIENT_USER_AGENT: &str = concat!("care-agent/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAICompatibleProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self, AppError> {
        let base_url = normalize_openai_compatible_base_url(base_url);
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AppError::Config(format!("invalid api key header: {e}")))?,
        );
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
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn post(&self, body: &Value) -> Result<ChatResponse, AppError> {
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
            return Err(AppError::Upstream(format!(
                "OpenAI-compatible error: {status} {text}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| AppError::Upstream(format!("malformed response body: {e}")))
    }

    fn into_response(&self, parsed: ChatResponse, body: &Value) -> Result<LLMResponse, AppError> {
        let ChatResponse { choices, model, usage } = parsed;
        let choice = choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Upstream("No choices".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments));
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        let prompt_tokens = usage.as_ref().and_then(|u| u.prompt_tokens);
        let completion_tokens = usage.as_ref().and_then(|u| u.completion_tokens);
        let estimated = prompt_tokens.is_none() || completion_tokens.is_none();

        let output_estimate_text = if tool_calls.is_empty() {
            content.clone()
        } else {
            format!(
                "{content}\n{}",
                serde_json::to_string(&tool_calls).unwrap_or_default()
            )
        };

        Ok(LLMResponse {
            content,
            usage: TokenUsage {
                input_tokens: prompt_tokens.unwrap_or_else(|| estimate_tokens(&body.to_string())),
                output_tokens: completion_tokens
                    .unwrap_or_else(|| estimate_tokens(&output_estimate_text)),
                estimated,
            },
            model: model.unwrap_or_else(|| self.model.clone()),
            finish_reason: choice.finish_reason,
            tool_calls,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn provider_name(&self) -> &'static str {
        "openai_compatible"
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
        let openai_messages = messages.into_iter().map(to_openai_message).collect::<Vec<_>>();
        let body = json!({
            "model": self.model,
            "messages": openai_messages,
            "temperature": temperature,
            "max_tokens": max_tokens
        });

        let parsed = self.post(&body).await?;
        self.into_response(parsed, &body)
    }

    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        tools: &[ToolDefinition],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, AppError> {
        if tools.is_empty() {
            return self.chat(messages, temperature, max_tokens).await;
        }

        let tool_defs = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    }
                })
            })
            .collect::<Vec<_>>();

        let openai_messages = messages.into_iter().map(to_openai_message).collect::<Vec<_>>();

        let body = json!({
            "model": self.model,
            "messages": openai_messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "tools": tool_defs,
            "tool_choice": "auto"
        });

        let parsed = self.post(&body).await?;
        self.into_response(parsed, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

fn to_openai_message(msg: Message) -> Value {
    match msg {
        Message::System { content } => json!({ "role": "system", "content": content }),
        Message::User { content } => json!({ "role": "user", "content": content }),
        Message::Assistant { content, tool_calls } => {
            if tool_calls.is_empty() {
                return json!({ "role": "assistant", "content": content });
            }
            let mapped = tool_calls
                .into_iter()
                .map(|tc| {
                    // The wire format wants arguments as a JSON-encoded string.
                    let args = match tc.arguments {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": { "name": tc.name, "arguments": args }
                    })
                })
                .collect::<Vec<_>>();
            let content = if content.is_empty() { Value::Null } else { Value::String(content) };
            json!({ "role": "assistant", "content": content, "tool_calls": mapped })
        }
        Message::Tool {
            tool_call_id,
            name,
            content,
        } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": name,
            "content": content
        }),
    }
}

pub fn normalize_openai_compatible_base_url(base_url: Option<String>) -> String {
    let Some(mut base) = base_url else {
        return DEFAULT_OPENAI_BASE_URL.to_string();
    };
    base = base.trim().to_string();
    if base.is_empty() {
        return DEFAULT_OPENAI_BASE_URL.to_string();
    }

    // Users sometimes paste the full endpoint.
    let trimmed = base.trim_end_matches('/');
    if let Some(stripped) = trimmed.strip_suffix("/chat/completions") {
        base = stripped.to_string();
    }

    // Only append /v1 when no path provided.
    match url::Url::parse(&base) {
        Ok(url) => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return format!("{}/v1", base.trim_end_matches('/'));
            }
            base.trim_end_matches('/').to_string()
        }
        Err(_) => base.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_normalization() {
        assert_eq!(normalize_openai_compatible_base_url(None), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(normalize_openai_compatible_base_url(Some("  ".into())), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(
            normalize_openai_compatible_base_url(Some("http://localhost:11434".into())),
            "http://localhost:11434/v1"
        );
        assert_eq!(
            normalize_openai_compatible_base_url(Some("https://gw.example.com/v1/chat/completions".into())),
            "https://gw.example.com/v1"
        );
        assert_eq!(
            normalize_openai_compatible_base_url(Some("https://gw.example.com/openai/v1/".into())),
            "https://gw.example.com/openai/v1"
        );
    }

    #[test]
    fn assistant_tool_calls_carry_string_arguments() {
        let msg = Message::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: "symptom_lookup".into(),
                arguments: json!({ "symptoms": ["fever"] }),
            }],
        };
        let v = to_openai_message(msg);
        assert!(v["content"].is_null());
        let args = v["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(args).unwrap()["symptoms"][0], "fever");
    }

    #[test]
    fn tool_message_keeps_call_id() {
        let v = to_openai_message(Message::Tool {
            tool_call_id: "call_9".into(),
            name: "procedure_lookup".into(),
            content: "{\"success\":true}".into(),
        });
        assert_eq!(v["role"], "tool");
        assert_eq!(v["tool_call_id"], "call_9");
    }
}
