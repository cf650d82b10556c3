use serde::{Deserialize, Serialize};

use crate::llm::provider::TokenUsage;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// USD per 1k tokens, (input, output).
const MODEL_PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o", 0.0025, 0.01),
    ("claude-sonnet-4-20250514", 0.003, 0.015),
];
const FALLBACK_PRICING: (f64, f64) = (0.003, 0.012);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompatible,
    Anthropic,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenaiCompatible => DEFAULT_OPENAI_MODEL,
            ProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRuntimeConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    #[serde(default)]
    pub model_id: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub input_price_per_1k: Option<f64>,
    #[serde(default)]
    pub output_price_per_1k: Option<f64>,
}

impl Default for LLMRuntimeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: String::new(),
            api_key: String::new(),
            base_url: None,
            input_price_per_1k: None,
            output_price_per_1k: None,
        }
    }
}

impl LLMRuntimeConfig {
    /// Configured model id, or the provider's default when none was given.
    pub fn effective_model(&self) -> &str {
        let model = self.model_id.trim();
        if model.is_empty() {
            self.provider.default_model()
        } else {
            model
        }
    }

    pub fn pricing(&self) -> (f64, f64) {
        let (input, output) = MODEL_PRICING
            .iter()
            .find(|(model, _, _)| *model == self.effective_model())
            .map(|(_, i, o)| (*i, *o))
            .unwrap_or(FALLBACK_PRICING);
        (
            self.input_price_per_1k.unwrap_or(input),
            self.output_price_per_1k.unwrap_or(output),
        )
    }

    pub fn estimate_cost_usd(&self, usage: &TokenUsage) -> f64 {
        let (input, output) = self.pricing();
        f64::from(usage.input_tokens) / 1000.0 * input + f64::from(usage.output_tokens) / 1000.0 * output
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::OpenaiCompatible
}
