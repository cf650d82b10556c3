use serde_json::json;

use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn contraindication_check(
    data: &ClinicalData,
    procedure_code: &str,
    patient_conditions: &[String],
    patient_medications: &[String],
) -> ToolResult {
    let procedure_code = procedure_code.trim();
    if procedure_code.is_empty() {
        return ToolResult::err("procedure_code is required");
    }

    let rows = match data.contraindications.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };

    let Some(entry) = rows.iter().find(|r| r.procedure_code == procedure_code) else {
        return ToolResult::ok(json!({
            "safe": true,
            "flagged_issues": [],
            "reason": format!("No contraindication data found for procedure code {procedure_code}.")
        }));
    };

    let flagged_conditions: Vec<String> = entry.flagged_conditions.iter().map(|c| normalize(c)).collect();
    let flagged_medications: Vec<String> = entry.flagged_medications.iter().map(|m| normalize(m)).collect();

    let mut flagged_issues = Vec::new();
    for condition in patient_conditions.iter().map(|c| normalize(c)) {
        if flagged_conditions.contains(&condition) {
            flagged_issues.push(format!("Condition: {condition}"));
        }
    }
    for medication in patient_medications.iter().map(|m| normalize(m)) {
        if flagged_medications.contains(&medication) {
            flagged_issues.push(format!("Medication: {medication}"));
        }
    }

    if flagged_issues.is_empty() {
        return ToolResult::ok(json!({
            "safe": true,
            "procedure_name": entry.procedure_name,
            "flagged_issues": [],
            "reason": "No known contraindications found for the provided conditions and medications."
        }));
    }

    ToolResult::ok(json!({
        "safe": false,
        "procedure_name": entry.procedure_name,
        "flagged_issues": flagged_issues,
        "reason": entry.reason.clone().unwrap_or_else(|| "Contraindication detected.".to_string())
    }))
}
