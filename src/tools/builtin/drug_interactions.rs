use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;

use crate::models::clinical::{DrugPair, Severity};
use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub drugs: [String; 2],
    pub severity: Severity,
    pub description: String,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    let (a, b) = (normalize(a), normalize(b));
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub fn drug_interaction_check(data: &ClinicalData, medications: &[String]) -> ToolResult {
    if medications.is_empty() {
        return ToolResult::ok(json!({ "interactions": [], "severity": Severity::None }));
    }

    let pairs = match data.drug_pairs.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };

    let (interactions, severity) = lookup_interactions(pairs, medications);
    ToolResult::ok(json!({ "interactions": interactions, "severity": severity }))
}

/// Every unordered pair of the given medications checked against the curated table.
/// Overall severity is the worst severity found, or `none`.
pub fn lookup_interactions(pairs: &[DrugPair], medications: &[String]) -> (Vec<Interaction>, Severity) {
    let mut lookup: HashMap<(String, String), &DrugPair> = HashMap::new();
    for item in pairs {
        if item.drugs.len() >= 2 {
            lookup.insert(pair_key(&item.drugs[0], &item.drugs[1]), item);
        }
    }

    let meds: Vec<&String> = medications
        .iter()
        .filter(|m| !normalize(m).is_empty())
        .collect();
    if meds.len() < 2 {
        return (Vec::new(), Severity::None);
    }

    let mut interactions = Vec::new();
    for i in 0..meds.len() {
        for j in (i + 1)..meds.len() {
            if let Some(info) = lookup.get(&pair_key(meds[i], meds[j])) {
                interactions.push(Interaction {
                    drugs: [meds[i].clone(), meds[j].clone()],
                    severity: info.severity,
                    description: info.description.clone(),
                });
            }
        }
    }

    let overall = interactions
        .iter()
        .map(|i| i.severity)
        .max()
        .unwrap_or(Severity::None);
    (interactions, overall)
}
