use std::sync::Arc;
use std::time::Instant;

use crate::agents::assistant::ClinicalAgent;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::guardrails::PersonaGuard;
use crate::llm::factory::provider_or_unavailable;
use crate::llm::provider::LLMProvider;
use crate::orchestration::pipeline::TurnPipeline;
use crate::store::sqlite::SqliteStore;
use crate::tools::data::ClinicalData;
use crate::tools::executor::ToolExecutor;

pub const APP_NAME: &str = "care-agent";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TurnPipeline>,
    pub store: Arc<SqliteStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<TurnPipeline>, store: Arc<SqliteStore>) -> Self {
        Self {
            pipeline,
            store,
            started_at: Instant::now(),
        }
    }

    /// Wire datasets, provider, guardrails and store from config.
    pub fn init(config: &AppConfig) -> Result<Self, AppError> {
        let store = match &config.store.sqlite_path {
            Some(path) => SqliteStore::open_at(path.clone())?,
            None => SqliteStore::new(APP_NAME)?,
        };
        let store = Arc::new(store);
        let llm = provider_or_unavailable(&config.llm);
        let pipeline = build_pipeline(config, llm).with_store(store.clone());
        Ok(Self::new(Arc::new(pipeline), store))
    }
}

/// Pipeline without a store; callers that persist usage attach one.
pub fn build_pipeline(config: &AppConfig, llm: Arc<dyn LLMProvider>) -> TurnPipeline {
    let data = Arc::new(ClinicalData::load(config.data.dir.as_deref()));
    let agent = ClinicalAgent::new(llm, ToolExecutor::new(data), config.agent.clone());
    let persona = PersonaGuard::with_extra_phrases(&config.guardrails.extra_blocked_phrases);
    TurnPipeline::new(agent, persona).with_pricing(&config.llm)
}
