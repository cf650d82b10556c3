pub mod appointments;
pub mod contraindications;
pub mod drug_interactions;
pub mod insurance;
pub mod labs;
pub mod procedures;
pub mod providers;
pub mod symptoms;

use serde_json::json;

use crate::tools::definition::ToolDefinition;

pub const DRUG_INTERACTION_CHECK: &str = "drug_interaction_check";
pub const SYMPTOM_LOOKUP: &str = "symptom_lookup";
pub const PROVIDER_SEARCH: &str = "provider_search";
pub const APPOINTMENT_AVAILABILITY: &str = "appointment_availability";
pub const INSURANCE_COVERAGE_CHECK: &str = "insurance_coverage_check";
pub const PROCEDURE_LOOKUP: &str = "procedure_lookup";
pub const LAB_RESULT_INTERPRETATION: &str = "lab_result_interpretation";
pub const CONTRAINDICATION_CHECK: &str = "contraindication_check";

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: DRUG_INTERACTION_CHECK.to_string(),
            description: "Check for drug-drug interactions between a list of medications. Returns interactions and overall severity (none, minor, major, contraindicated).".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "medications": { "type": "array", "items": { "type": "string" }, "description": "Medication names, e.g. [\"aspirin\", \"ibuprofen\"]." }
                },
                "required": ["medications"]
            }),
        },
        ToolDefinition {
            name: SYMPTOM_LOOKUP.to_string(),
            description: "Look up possible conditions and urgency (low, medium, high) for given symptoms. Does NOT diagnose; always advise the user to consult a provider.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "symptoms": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["symptoms"]
            }),
        },
        ToolDefinition {
            name: PROVIDER_SEARCH.to_string(),
            description: "Search for healthcare providers by specialty and location, e.g. cardiology in Austin, TX.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "specialty": { "type": "string" },
                    "location": { "type": "string" }
                },
                "required": ["specialty", "location"]
            }),
        },
        ToolDefinition {
            name: APPOINTMENT_AVAILABILITY.to_string(),
            description: "Get available appointment slots for a provider in a date range.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "provider_id": { "type": "string", "description": "Provider id, e.g. prov_001." },
                    "date_range": { "type": "string", "description": "'2025-03-01' or '2025-03-01 to 2025-03-07'." }
                },
                "required": ["provider_id", "date_range"]
            }),
        },
        ToolDefinition {
            name: INSURANCE_COVERAGE_CHECK.to_string(),
            description: "Check if a procedure (CPT code) is covered under an insurance plan. Returns covered (true/false) and details.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "procedure_code": { "type": "string", "description": "CPT code, e.g. 99213." },
                    "plan_id": { "type": "string", "description": "Plan id, e.g. plan_001." }
                },
                "required": ["procedure_code", "plan_id"]
            }),
        },
        ToolDefinition {
            name: PROCEDURE_LOOKUP.to_string(),
            description: "Search for a medical procedure by name to get its CPT code, or by CPT code to get its name.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "e.g. 'Knee Replacement' or '27447'." }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: LAB_RESULT_INTERPRETATION.to_string(),
            description: "Compare lab values against standard adult reference ranges and report low, normal or high for each.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "lab_values": {
                        "type": "object",
                        "description": "Test name to numeric value, e.g. {\"glucose\": 110, \"hdl\": 35}.",
                        "additionalProperties": { "type": ["number", "string"] }
                    }
                },
                "required": ["lab_values"]
            }),
        },
        ToolDefinition {
            name: CONTRAINDICATION_CHECK.to_string(),
            description: "Check whether a procedure is contraindicated given a patient's conditions and medications.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "procedure_code": { "type": "string" },
                    "patient_conditions": { "type": "array", "items": { "type": "string" } },
                    "patient_medications": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["procedure_code"]
            }),
        },
    ]
}
