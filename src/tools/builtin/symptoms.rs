use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::models::clinical::{SymptomEntry, Urgency};
use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

const NO_MATCH: &str = "No matching information in lookup; consult a provider.";

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Possible conditions and urgency for a set of symptoms. Never a diagnosis.
pub fn symptom_lookup(data: &ClinicalData, symptoms: &[String]) -> ToolResult {
    if symptoms.is_empty() {
        return ToolResult::ok(json!({ "possible_conditions": [], "urgency": Urgency::Low }));
    }

    let table = match data.symptoms.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };
    let lookup: HashMap<String, &SymptomEntry> =
        table.iter().map(|s| (normalize(&s.symptom), s)).collect();

    let mut conditions: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut urgency = Urgency::Low;
    for sym in symptoms {
        let Some(entry) = lookup.get(&normalize(sym)) else {
            continue;
        };
        for c in &entry.possible_conditions {
            if seen.insert(c.clone()) {
                conditions.push(c.clone());
            }
        }
        urgency = urgency.max(entry.urgency);
    }

    if conditions.is_empty() {
        conditions.push(NO_MATCH.to_string());
    }

    ToolResult::ok(json!({
        "possible_conditions": conditions,
        "urgency": urgency,
        "can_diagnose": false,
        "requires_provider_consultation": true
    }))
}
