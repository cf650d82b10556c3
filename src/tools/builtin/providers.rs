use serde_json::json;

use crate::models::clinical::Provider;
use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

pub fn provider_search(data: &ClinicalData, specialty: &str, location: &str) -> ToolResult {
    let providers = match data.providers.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };

    let specialty = specialty.trim().to_lowercase();
    let location = location.trim().to_lowercase();

    let filtered: Vec<&Provider> = providers
        .iter()
        .filter(|p| specialty.is_empty() || p.specialty.to_lowercase() == specialty)
        .filter(|p| location.is_empty() || p.location.to_lowercase().contains(&location))
        .collect();

    ToolResult::ok(json!({ "providers": filtered }))
}
