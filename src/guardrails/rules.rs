use std::borrow::Cow;

use regex::Regex;

/// What happens when a rule's pattern matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// Stop the turn and answer with the refusal message.
    Refuse,
    /// Replace every match with this template (`$name` capture refs allowed).
    Redact(Cow<'static, str>),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: Cow<'static, str>,
    pub pattern: Regex,
    pub action: RuleAction,
}

impl Rule {
    pub fn refuse(name: impl Into<Cow<'static, str>>, pattern: Regex) -> Self {
        Self {
            name: name.into(),
            pattern,
            action: RuleAction::Refuse,
        }
    }

    pub fn redact(name: impl Into<Cow<'static, str>>, pattern: Regex, replacement: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            pattern,
            action: RuleAction::Redact(replacement.into()),
        }
    }
}

/// Ordered list of rules. Order matters: refusal checks report the first
/// matching rule and redactions run one after another.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// First refusal rule whose pattern matches `text`.
    pub fn first_refusal(&self, text: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.action == RuleAction::Refuse)
            .find(|r| r.pattern.is_match(text))
    }

    /// Run every redaction rule in order, each over the output of the last.
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();
        for rule in &self.rules {
            if let RuleAction::Redact(replacement) = &rule.action {
                result = rule.pattern.replace_all(&result, replacement.as_ref()).into_owned();
            }
        }
        result
    }
}
