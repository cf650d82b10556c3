use std::sync::LazyLock;

use regex::Regex;

use crate::guardrails::rules::{Rule, RuleSet};

pub const REFUSAL_MESSAGE: &str = "I'm a healthcare information assistant. I can only help with questions about medications, symptoms, providers, appointments, insurance coverage, procedures and lab results, and I can't change how I operate. How can I help with your health question?";

// (name, pattern). Matched case-insensitively against the redacted query.
const BUILTIN_RULES: &[(&str, &str)] = &[
    (
        "instruction_override",
        concat!(
            r"ignore\s+(?:(?:all|your|the|any)\s+)*(?:previous|prior|above|earlier)\s+instructions",
            r"|ignore\s+all\s+previous",
            r"|(?:disregard|forget)\s+(?:(?:all|your|the|any)\s+)*(?:(?:previous|prior|above|earlier)\s+)?instructions",
        ),
    ),
    ("system_prompt", r"system\s+prompt"),
    (
        "persona_change",
        r"you\s+are\s+now|pretend\s+to\s+be|\bact\s+as\b|talk\s+like\s+an?\b|role[\s-]?play|developer\s+mode|jailbreak",
    ),
    ("hack_or_bypass", r"\b(?:hack(?:s|ed|ing)?|bypass(?:es|ed|ing)?)\b"),
];

static BUILTIN: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::new(
        BUILTIN_RULES
            .iter()
            .map(|(name, pattern)| {
                Rule::refuse(*name, Regex::new(&format!("(?i){pattern}")).expect("valid persona pattern"))
            })
            .collect(),
    )
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaVerdict {
    Allowed,
    Refused { rule: String },
}

/// Pre-model check for prompt injection and persona-change requests.
#[derive(Debug, Clone)]
pub struct PersonaGuard {
    rules: RuleSet,
}

impl Default for PersonaGuard {
    fn default() -> Self {
        Self {
            rules: BUILTIN.clone(),
        }
    }
}

impl PersonaGuard {
    /// Built-in rules plus `extra_phrases`, each matched literally and case-insensitively.
    pub fn with_extra_phrases(extra_phrases: &[String]) -> Self {
        let mut guard = Self::default();
        for phrase in extra_phrases.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            let pattern = format!("(?i){}", regex::escape(phrase));
            // An escaped literal always compiles.
            if let Ok(re) = Regex::new(&pattern) {
                guard.rules.push(Rule::refuse(format!("configured:{phrase}"), re));
            }
        }
        guard
    }

    pub fn check(&self, query: &str) -> PersonaVerdict {
        match self.rules.first_refusal(query) {
            Some(rule) => PersonaVerdict::Refused {
                rule: rule.name.to_string(),
            },
            None => PersonaVerdict::Allowed,
        }
    }
}
