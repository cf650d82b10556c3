use serde_json::json;

use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

const NOT_FOUND: &str = "No coverage information found for this procedure and plan.";

pub fn insurance_coverage_check(data: &ClinicalData, procedure_code: &str, plan_id: &str) -> ToolResult {
    let rows = match data.coverage.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };

    let procedure_code = procedure_code.trim();
    let plan_id = plan_id.trim();

    match rows
        .iter()
        .find(|r| r.procedure_code == procedure_code && r.plan_id == plan_id)
    {
        Some(row) => ToolResult::ok(json!({ "covered": row.covered, "details": row.details })),
        None => ToolResult::ok(json!({ "covered": false, "details": NOT_FOUND })),
    }
}
