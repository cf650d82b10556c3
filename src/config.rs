//! Runtime configuration.
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual fields. Everything has a default, so an empty
//! environment still yields a config that starts (with an unavailable model).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::llm::{LLMRuntimeConfig, ProviderKind};

pub const CONFIG_ENV: &str = "CARE_AGENT_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LLMRuntimeConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub guardrails: GuardrailSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Model round trips allowed to request tools before a final answer is forced.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailSettings {
    /// Literal phrases refused in addition to the built-in persona rules.
    #[serde(default)]
    pub extra_blocked_phrases: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory with dataset JSON files; embedded copies are used when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_temperature() -> f64 {
    0.0
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_max_tool_rounds() -> u32 {
    6
}

impl AppConfig {
    /// Load from `path` (or `$CARE_AGENT_CONFIG`), then apply process env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(from_env);

        let mut config = match path {
            Some(p) => Self::load_from_path(&p)?,
            None => AppConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("invalid config {}: {e}", path.display())))?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply overrides from a key lookup. Empty values count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if self.llm.api_key.trim().is_empty() {
            let openai = get("OPENAI_API_KEY");
            let anthropic = get("ANTHROPIC_API_KEY");
            match (self.llm.provider, openai, anthropic) {
                (ProviderKind::Anthropic, _, Some(key)) => self.llm.api_key = key,
                (_, Some(key), _) => {
                    self.llm.provider = ProviderKind::OpenaiCompatible;
                    self.llm.api_key = key;
                }
                (_, None, Some(key)) => {
                    self.llm.provider = ProviderKind::Anthropic;
                    self.llm.api_key = key;
                }
                _ => {}
            }
        }
        if let Some(model) = get("LLM_MODEL") {
            self.llm.model_id = model;
        }
        if let Some(base_url) = get("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(bind) = get("CARE_AGENT_BIND") {
            self.server.bind = bind;
        }
        if let Some(dir) = get("CARE_AGENT_DATA_DIR") {
            self.data.dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = get("STORE_SQLITE_PATH") {
            self.store.sqlite_path = Some(PathBuf::from(path));
        }
    }
}
