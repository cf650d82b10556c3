//! PHI redaction applied to every query before it is logged or sent upstream.

use std::sync::LazyLock;

use regex::Regex;

use crate::guardrails::rules::{Rule, RuleSet};

pub const SSN_PLACEHOLDER: &str = "[REDACTED SSN]";
pub const PHONE_PLACEHOLDER: &str = "[REDACTED PHONE]";
pub const DOB_PLACEHOLDER: &str = "[REDACTED DOB]";

const SSN_PATTERN: &str = r"\b\d{3}-?\d{2}-?\d{4}\b";

const PHONE_PATTERN: &str = r"(?:(?:\+|\b)1[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b";

// A date only counts as a birth date when a birth keyword (plus an optional
// connector) sits right in front of it.
const DOB_PATTERN: &str = concat!(
    r"(?i)(?P<kw>\b(?:(?:date\s+of\s+birth|birth\s*date|birthday|dob|born)\b|d\.o\.b\.?))",
    r"(?P<sep>\s*(?:(?:is|was|on)\s*)?[:=]?\s*)",
    r"(?:\d{4}-\d{1,2}-\d{1,2}",
    r"|\d{1,2}/\d{1,2}/\d{4}",
    r"|\d{1,2}-\d{1,2}-\d{2}(?:\d{2})?",
    r"|(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4})\b",
);

static PHI_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::redact("ssn", Regex::new(SSN_PATTERN).expect("valid ssn pattern"), SSN_PLACEHOLDER),
        Rule::redact("phone", Regex::new(PHONE_PATTERN).expect("valid phone pattern"), PHONE_PLACEHOLDER),
        Rule::redact(
            "dob",
            Regex::new(DOB_PATTERN).expect("valid dob pattern"),
            "${kw}${sep}[REDACTED DOB]",
        ),
    ])
});

/// Replace SSNs, phone numbers and keyword-anchored birth dates with
/// placeholders. Placeholders hold no digits, so a second pass changes nothing.
pub fn redact_phi(text: &str) -> String {
    PHI_RULES.redact(text)
}
