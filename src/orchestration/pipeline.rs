use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::assistant::ClinicalAgent;
use crate::guardrails::{apply_disclaimer, fact_check, redact_phi, PersonaGuard, PersonaVerdict, REFUSAL_MESSAGE};
use crate::llm::provider::TokenUsage;
use crate::models::chat::{ChatResponse, ChatTurn, ToolUsed};
use crate::models::llm::LLMRuntimeConfig;
use crate::models::records::{UsageRecord, UsageSource};
use crate::store::sqlite::SqliteStore;
use crate::tools::definition::ToolInvocation;

pub const EMPTY_RESPONSE_FALLBACK: &str = "I couldn't generate a response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// Persona guard fired; the model was never called.
    Refused,
    /// The agent invocation failed.
    Failed,
    Completed,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub output: String,
    pub history: Vec<ChatTurn>,
    pub tools_used: Vec<ToolInvocation>,
    pub status: TurnStatus,
    pub redacted_query: String,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
    pub error: Option<String>,
    /// Fact-check rules that annotated the answer.
    pub fact_check_flags: Vec<&'static str>,
}

impl TurnOutcome {
    /// True when the turn ended before the model was invoked.
    pub fn short_circuited(&self) -> bool {
        self.status == TurnStatus::Refused
    }

    pub fn to_chat_response(&self) -> ChatResponse {
        ChatResponse {
            output: self.output.clone(),
            history: self.history.clone(),
            tools_used: self.tools_used.iter().map(ToolUsed::from).collect(),
            error: self.error.clone(),
        }
    }

    fn unchanged(status: TurnStatus, output: String, history: &[ChatTurn], redacted_query: String, error: Option<String>) -> Self {
        Self {
            output,
            history: history.to_vec(),
            tools_used: Vec::new(),
            status,
            redacted_query,
            usage: None,
            model: None,
            error,
            fact_check_flags: Vec::new(),
        }
    }
}

/// Guardrails wrapped around a single agent invocation:
/// redact → persona → agent → fact-check → disclaimer.
///
/// Holds no per-turn state; share it behind an `Arc`.
pub struct TurnPipeline {
    agent: ClinicalAgent,
    persona: PersonaGuard,
    pricing: LLMRuntimeConfig,
    store: Option<Arc<SqliteStore>>,
}

impl TurnPipeline {
    pub fn new(agent: ClinicalAgent, persona: PersonaGuard) -> Self {
        let pricing = LLMRuntimeConfig {
            model_id: agent.model_id().to_string(),
            ..LLMRuntimeConfig::default()
        };
        Self {
            agent,
            persona,
            pricing,
            store: None,
        }
    }

    /// Use the configured per-1k prices instead of the built-in table.
    pub fn with_pricing(mut self, llm: &LLMRuntimeConfig) -> Self {
        self.pricing = LLMRuntimeConfig {
            api_key: String::new(),
            ..llm.clone()
        };
        self
    }

    /// Record a usage row for every turn that reached the model.
    pub fn with_store(mut self, store: Arc<SqliteStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn run_turn(&self, query: &str, history: &[ChatTurn], source: UsageSource) -> TurnOutcome {
        let redacted = redact_phi(query);
        debug!(stage = "redacted", source = source.as_str(), "turn started");

        if let PersonaVerdict::Refused { rule } = self.persona.check(&redacted) {
            info!(rule = %rule, source = source.as_str(), "query refused by persona guard");
            return TurnOutcome::unchanged(TurnStatus::Refused, REFUSAL_MESSAGE.to_string(), history, redacted, None);
        }
        debug!(stage = "persona_passed", "invoking agent");

        let run = match self.agent.run(history, &redacted).await {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, source = source.as_str(), "agent invocation failed");
                return TurnOutcome::unchanged(TurnStatus::Failed, String::new(), history, redacted, Some(e.to_string()));
            }
        };
        debug!(stage = "agent_done", tools = run.invocations.len(), rounds = run.rounds, "agent finished");

        let mut output = run.output.clone();
        let mut fact_check_flags = Vec::new();
        if output.trim().is_empty() {
            output = EMPTY_RESPONSE_FALLBACK.to_string();
        } else {
            if !run.invocations.is_empty() {
                let checked = fact_check(&output, &run.invocations);
                output = checked.output;
                fact_check_flags = checked.flagged;
                debug!(stage = "fact_checked", flagged = fact_check_flags.len(), "fact-check done");
            }
            output = apply_disclaimer(&output, &redacted);
            debug!(stage = "disclaimer", "post-processing done");
        }

        let mut new_history = history.to_vec();
        new_history.push(ChatTurn::user(redacted.clone()));
        new_history.push(ChatTurn::assistant(output.clone()));

        self.record_usage(source, &run.model, run.usage, &redacted).await;

        TurnOutcome {
            output,
            history: new_history,
            tools_used: run.invocations,
            status: TurnStatus::Completed,
            redacted_query: redacted,
            usage: Some(run.usage),
            model: Some(run.model),
            error: None,
            fact_check_flags,
        }
    }

    pub fn estimate_cost_usd(&self, usage: &TokenUsage) -> f64 {
        self.pricing.estimate_cost_usd(usage)
    }

    async fn record_usage(&self, source: UsageSource, model: &str, usage: TokenUsage, redacted_query: &str) {
        let cost = self.estimate_cost_usd(&usage);
        info!(
            source = source.as_str(),
            model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            estimated = usage.estimated,
            cost_usd = cost,
            "turn usage"
        );

        let Some(store) = self.store.clone() else {
            return;
        };
        let record = UsageRecord::new(source, model, usage, cost, redacted_query);
        let res = tokio::task::spawn_blocking(move || store.usage_insert(&record)).await;
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to record usage"),
            Err(e) => warn!(error = %e, "usage recording task failed"),
        }
    }
}
