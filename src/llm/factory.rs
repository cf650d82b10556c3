use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::llm::anthropic::AnthropicProvider;
use crate::llm::openai_compatible::OpenAICompatibleProvider;
use crate::llm::provider::{LLMProvider, LLMResponse, Message};
use crate::models::llm::{LLMRuntimeConfig, ProviderKind};

pub fn provider_from_runtime_config(cfg: &LLMRuntimeConfig) -> Result<Arc<dyn LLMProvider>, AppError> {
    if cfg.api_key.trim().is_empty() {
        return Err(AppError::Config("model config is missing api_key".to_string()));
    }

    let model = cfg.effective_model().to_string();
    let provider: Arc<dyn LLMProvider> = match cfg.provider {
        ProviderKind::OpenaiCompatible => Arc::new(OpenAICompatibleProvider::new(
            cfg.api_key.clone(),
            model,
            cfg.base_url.clone(),
        )?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            cfg.api_key.clone(),
            model,
            cfg.base_url.clone(),
        )?),
    };

    Ok(provider)
}

/// Like [`provider_from_runtime_config`], but a missing or unusable config
/// yields an [`UnavailableProvider`] so the failure shows up per turn instead
/// of at startup.
pub fn provider_or_unavailable(cfg: &LLMRuntimeConfig) -> Arc<dyn LLMProvider> {
    match provider_from_runtime_config(cfg) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(error = %e, "no usable LLM provider configured; turns will fail until one is set");
            Arc::new(UnavailableProvider {
                model: cfg.effective_model().to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Stand-in provider that fails every call with a configuration error.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    model: String,
    reason: String,
}

#[async_trait]
impl LLMProvider for UnavailableProvider {
    fn provider_name(&self) -> &'static str {
        "unavailable"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        _messages: Vec<Message>,
        _temperature: f64,
        _max_tokens: u32,
    ) -> Result<LLMResponse, AppError> {
        Err(AppError::Config(format!(
            "no LLM provider available ({}); set OPENAI_API_KEY or ANTHROPIC_API_KEY",
            self.reason
        )))
    }
}
