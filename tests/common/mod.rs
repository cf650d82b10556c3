#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use care_agent::config::AppConfig;
use care_agent::error::AppError;
use care_agent::llm::provider::{LLMProvider, LLMResponse, Message, TokenUsage};
use care_agent::orchestration::pipeline::TurnPipeline;
use care_agent::state::build_pipeline;
use care_agent::tools::definition::{ToolCall, ToolDefinition};

/// In-process provider that replays canned replies and counts calls.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<LLMResponse, AppError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let mut replies = VecDeque::new();
        replies.push_back(Err(AppError::Upstream(message.to_string())));
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "gpt-4o"
    }

    async fn chat(&self, messages: Vec<Message>, _temperature: f64, _max_tokens: u32) -> Result<LLMResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Upstream("script exhausted".to_string())))
    }

    async fn chat_with_tools(
        &self,
        messages: Vec<Message>,
        _tools: &[ToolDefinition],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<LLMResponse, AppError> {
        self.chat(messages, temperature, max_tokens).await
    }
}

pub fn text(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        usage: TokenUsage { input_tokens: 100, output_tokens: 20, estimated: false },
        model: "gpt-4o".to_string(),
        finish_reason: Some("stop".to_string()),
        tool_calls: Vec::new(),
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        usage: TokenUsage { input_tokens: 80, output_tokens: 10, estimated: false },
        model: "gpt-4o".to_string(),
        finish_reason: Some("tool_calls".to_string()),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }],
    }
}

pub fn pipeline(llm: Arc<ScriptedProvider>) -> TurnPipeline {
    build_pipeline(&AppConfig::default(), llm)
}
