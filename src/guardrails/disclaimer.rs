use std::sync::LazyLock;

use regex::Regex;

pub const DISCLAIMER: &str = "This is not a diagnosis; please consult your provider.";

static CLINICAL_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:symptoms?|conditions?|diagnos(?:is|es|e|ed|ing)|headaches?|migraines?|pain(?:s|ful)?|fevers?|nausea|dizz(?:y|iness)|cough(?:s|ing)?|rash(?:es)?|infections?|diseases?|illness(?:es)?|urgency)\b",
    )
    .expect("valid clinical vocabulary pattern")
});

static ALREADY_DISCLAIMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)not\s+a\s+diagnosis|consult\s+(?:with\s+)?your\s+(?:provider|doctor)")
        .expect("valid disclaimer pattern")
});

pub fn mentions_clinical_topic(text: &str) -> bool {
    CLINICAL_TERMS.is_match(text)
}

/// Append [`DISCLAIMER`] when the exchange touches clinical topics and the
/// answer does not already carry an equivalent phrase. Applying it twice is
/// the same as applying it once.
pub fn apply_disclaimer(output: &str, redacted_query: &str) -> String {
    if output.trim().is_empty() {
        return output.to_string();
    }
    if !mentions_clinical_topic(output) && !mentions_clinical_topic(redacted_query) {
        return output.to_string();
    }
    if ALREADY_DISCLAIMED.is_match(output) {
        return output.to_string();
    }
    format!("{}\n\n{}", output.trim_end(), DISCLAIMER)
}
