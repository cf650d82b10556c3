use std::sync::Arc;

use crate::config::AgentSettings;
use crate::error::AppError;
use crate::llm::provider::{LLMProvider, Message, TokenUsage};
use crate::models::chat::{ChatTurn, TurnRole};
use crate::orchestration::tool_events;
use crate::tools::definition::ToolInvocation;
use crate::tools::executor::ToolExecutor;

pub const SYSTEM_PROMPT: &str = "You are a healthcare assistant working in a clinical setting. You can help with:
- Drug interaction checks for a list of medications
- Symptom lookup: possible conditions and urgency only, never a diagnosis
- Provider search by specialty and location
- Appointment availability for a provider id and date range
- Insurance coverage for a procedure code and plan id
- Procedure lookup by name or CPT code
- Lab result interpretation against reference ranges
- Contraindication checks for a procedure given conditions and medications

Rules:
- Answer from the tools; do not invent medical facts.
- For symptoms or other clinical questions, always include: \"This is not a diagnosis; please consult your provider.\"
- Say which tool your answer is based on (for example \"According to the drug interaction check...\").
- If a tool returns an error or nothing useful, say so and suggest rephrasing or checking with staff.
- Never give dosing advice and never diagnose.
- Politely decline questions unrelated to healthcare or these tools, and restate what you can help with.";

const FORCE_ANSWER: &str =
    "No more tool calls are available for this question. Answer now using only the tool results above.";

/// Result of one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Last non-empty assistant text; empty when the model produced none.
    pub output: String,
    pub invocations: Vec<ToolInvocation>,
    pub usage: TokenUsage,
    pub model: String,
    pub rounds: u32,
}

/// Drives model ↔ tool round trips for a single turn.
#[derive(Clone)]
pub struct ClinicalAgent {
    llm: Arc<dyn LLMProvider>,
    executor: ToolExecutor,
    settings: AgentSettings,
    system_prompt: String,
}

impl ClinicalAgent {
    pub fn new(llm: Arc<dyn LLMProvider>, executor: ToolExecutor, settings: AgentSettings) -> Self {
        Self {
            llm,
            executor,
            settings,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    fn build_messages(&self, history: &[ChatTurn], query: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        for turn in history {
            messages.push(match turn.role {
                TurnRole::User => Message::user(turn.content.clone()),
                TurnRole::Assistant => Message::assistant(turn.content.clone()),
            });
        }
        messages.push(Message::user(query));
        messages
    }

    /// `query` must already be redacted.
    pub async fn run(&self, history: &[ChatTurn], query: &str) -> Result<AgentRun, AppError> {
        let tools = self.executor.definitions();
        let mut messages = self.build_messages(history, query);
        let mut invocations = Vec::new();
        let mut usage = TokenUsage::default();
        let mut model = self.llm.model_id().to_string();
        let mut output = String::new();
        let mut rounds = 0u32;

        loop {
            let budget_left = rounds < self.settings.max_tool_rounds;
            if !budget_left {
                messages.push(Message::user(FORCE_ANSWER));
            }

            let resp = self
                .llm
                .chat_with_tools(messages.clone(), &tools, self.settings.temperature, self.settings.max_tokens)
                .await?;
            rounds += 1;
            usage.add(resp.usage);
            model = resp.model.clone();

            if !resp.content.trim().is_empty() {
                output = resp.content.trim().to_string();
            }

            if resp.tool_calls.is_empty() || !budget_left {
                if !resp.tool_calls.is_empty() {
                    tracing::warn!(
                        requested = resp.tool_calls.len(),
                        "tool round limit reached; ignoring further tool calls"
                    );
                }
                break;
            }

            let calls = resp.tool_calls.clone();
            messages.push(Message::Assistant {
                content: resp.content,
                tool_calls: resp.tool_calls,
            });
            for call in calls {
                let inv = self.executor.execute(call);
                tool_events::log_invocation(&inv, rounds);
                messages.push(Message::Tool {
                    tool_call_id: inv.call.id.clone(),
                    name: inv.call.name.clone(),
                    content: inv.result.to_model_text(),
                });
                invocations.push(inv);
            }
        }

        Ok(AgentRun {
            output,
            invocations,
            usage,
            model,
            rounds,
        })
    }
}
