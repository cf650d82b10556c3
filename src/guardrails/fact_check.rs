use std::sync::LazyLock;

use regex::Regex;

use crate::tools::builtin::DRUG_INTERACTION_CHECK;
use crate::tools::definition::ToolInvocation;

pub const FACT_CHECK_NOTICE: &str = "Note: the interaction check for these medications reported a minor interaction. The wording above may overstate the risk; please confirm with your pharmacist or provider.";

/// A tool reported `field == reported`, and the answer must not use
/// language matching `overstatement` without a visible correction.
struct FactCheckRule {
    name: &'static str,
    tool: &'static str,
    field: &'static str,
    reported: &'static str,
    overstatement: Regex,
    notice: &'static str,
}

static RULES: LazyLock<Vec<FactCheckRule>> = LazyLock::new(|| {
    vec![FactCheckRule {
        name: "minor_interaction_overstated",
        tool: DRUG_INTERACTION_CHECK,
        field: "severity",
        reported: "minor",
        overstatement: Regex::new(r"(?i)\bfatal\w*|\bmajor\b").expect("valid overstatement pattern"),
        notice: FACT_CHECK_NOTICE,
    }]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactCheckOutcome {
    pub output: String,
    /// Names of the rules that appended a notice.
    pub flagged: Vec<&'static str>,
}

/// Compare the answer with what the tools actually returned. The answer text
/// is never rewritten; a mismatch only appends the rule's notice, once.
pub fn fact_check(output: &str, invocations: &[ToolInvocation]) -> FactCheckOutcome {
    let mut result = output.to_string();
    let mut flagged = Vec::new();

    for rule in RULES.iter() {
        let reported = invocations.iter().any(|inv| {
            inv.call.name == rule.tool
                && inv.result.success()
                && inv
                    .result
                    .data()
                    .and_then(|d| d.get(rule.field))
                    .and_then(|v| v.as_str())
                    == Some(rule.reported)
        });
        if !reported || result.contains(rule.notice) || !rule.overstatement.is_match(output) {
            continue;
        }
        tracing::debug!(rule = rule.name, "fact-check flagged the answer");
        result = format!("{}\n\n{}", result.trim_end(), rule.notice);
        flagged.push(rule.name);
    }

    FactCheckOutcome { output: result, flagged }
}
