use tracing::{debug, info, warn};

use crate::tools::definition::ToolInvocation;

const PREVIEW_CHARS: usize = 200;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

/// Log one tool invocation. Arguments come from the model, which only ever
/// saw the redacted query.
pub fn log_invocation(inv: &ToolInvocation, round: u32) {
    let ok = inv.result.success();
    if ok {
        info!(
            tool = %inv.call.name,
            round,
            duration_ms = inv.duration_ms.unwrap_or_default(),
            "tool call ok"
        );
    } else {
        warn!(
            tool = %inv.call.name,
            round,
            error = inv.result.error().unwrap_or_default(),
            "tool call failed"
        );
    }

    debug!(
        tool = %inv.call.name,
        tool_call_id = %inv.call.id,
        args = %truncate(&inv.call.arguments.to_string(), PREVIEW_CHARS),
        output = %truncate(&inv.result.to_model_text(), PREVIEW_CHARS),
        "tool call detail"
    );
}
