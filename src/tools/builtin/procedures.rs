use serde_json::json;

use crate::models::clinical::Procedure;
use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

/// Look a procedure up by CPT code (exact) or by name/description (substring).
pub fn procedure_lookup(data: &ClinicalData, query: &str) -> ToolResult {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return ToolResult::err("query must be a non-empty string");
    }

    let rows = match data.procedures.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };

    let results: Vec<&Procedure> = rows
        .iter()
        .filter(|p| {
            p.code.to_lowercase() == needle
                || p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
        .collect();

    if results.is_empty() {
        return ToolResult::ok(json!({
            "procedures": [],
            "message": format!("No procedure found matching '{}'", query.trim())
        }));
    }
    ToolResult::ok(json!({ "procedures": results }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let data = ClinicalData::embedded();
        let r = procedure_lookup(&data, "knee replacement");
        assert_eq!(r.data().unwrap()["procedures"][0]["code"], "27447");
    }

    #[test]
    fn lookup_by_code() {
        let data = ClinicalData::embedded();
        let r = procedure_lookup(&data, "70553");
        let list = r.data().unwrap()["procedures"].as_array().unwrap().clone();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["name"], "MRI Brain");
    }

    #[test]
    fn no_match_carries_message() {
        let data = ClinicalData::embedded();
        let r = procedure_lookup(&data, "teleportation");
        assert!(r.success());
        assert!(r.data().unwrap()["message"].as_str().unwrap().contains("teleportation"));
    }

    #[test]
    fn blank_query_is_an_error() {
        let data = ClinicalData::embedded();
        assert!(!procedure_lookup(&data, "   ").success());
    }
}
