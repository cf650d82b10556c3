use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::tools::builtin::{self, appointments, contraindications, drug_interactions, insurance, labs, procedures, providers, symptoms};
use crate::tools::data::ClinicalData;
use crate::tools::definition::{ToolCall, ToolDefinition, ToolInvocation, ToolResult};

/// Validates tool-call arguments and dispatches to the clinical lookups.
///
/// Every failure, including unknown tool names and malformed arguments, comes
/// back as a failed [`ToolResult`]; nothing here returns `Err`.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    data: Arc<ClinicalData>,
}

impl ToolExecutor {
    pub fn new(data: Arc<ClinicalData>) -> Self {
        Self { data }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        builtin::definitions()
    }

    pub fn execute(&self, call: ToolCall) -> ToolInvocation {
        let started = Instant::now();
        let args = normalize_arguments(&call.arguments);
        let result = match args {
            Ok(args) => dispatch(&self.data, &call.name, &args),
            Err(e) => ToolResult::err(e),
        };
        let duration_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;

        ToolInvocation {
            call,
            result,
            duration_ms: Some(duration_ms),
        }
    }
}

// Some providers hand arguments over as a JSON-encoded string.
fn normalize_arguments(arguments: &Value) -> Result<Value, String> {
    match arguments {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(arguments.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v @ Value::Object(_)) => Ok(v),
            _ => Err("tool arguments must be a JSON object".to_string()),
        },
        _ => Err("tool arguments must be a JSON object".to_string()),
    }
}

fn required_str(args: &Value, key: &str) -> Result<String, String> {
    match args.get(key) {
        None | Some(Value::Null) => Err(format!("{key} is required")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(format!("{key} must be a string")),
    }
}

fn required_str_list(args: &Value, key: &str) -> Result<Vec<String>, String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(format!("{key} must be a list of strings")),
            })
            .collect(),
        _ => Err(format!("{key} must be a list")),
    }
}

fn optional_str_list(args: &Value, key: &str) -> Result<Vec<String>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(_) => required_str_list(args, key),
    }
}

fn dispatch(data: &ClinicalData, tool_name: &str, args: &Value) -> ToolResult {
    let outcome: Result<ToolResult, String> = (|| match tool_name {
        builtin::DRUG_INTERACTION_CHECK => {
            let medications = required_str_list(args, "medications")?;
            Ok(drug_interactions::drug_interaction_check(data, &medications))
        }
        builtin::SYMPTOM_LOOKUP => {
            let symptom_list = required_str_list(args, "symptoms")?;
            Ok(symptoms::symptom_lookup(data, &symptom_list))
        }
        builtin::PROVIDER_SEARCH => {
            let specialty = required_str(args, "specialty")?;
            let location = required_str(args, "location")?;
            Ok(providers::provider_search(data, &specialty, &location))
        }
        builtin::APPOINTMENT_AVAILABILITY => {
            let provider_id = required_str(args, "provider_id")?;
            let date_range = required_str(args, "date_range")?;
            Ok(appointments::appointment_availability(data, &provider_id, &date_range))
        }
        builtin::INSURANCE_COVERAGE_CHECK => {
            let procedure_code = required_str(args, "procedure_code")?;
            let plan_id = required_str(args, "plan_id")?;
            Ok(insurance::insurance_coverage_check(data, &procedure_code, &plan_id))
        }
        builtin::PROCEDURE_LOOKUP => {
            let query = required_str(args, "query")?;
            Ok(procedures::procedure_lookup(data, &query))
        }
        builtin::LAB_RESULT_INTERPRETATION => match args.get("lab_values") {
            Some(Value::Object(values)) => Ok(labs::lab_result_interpretation(values)),
            _ => Err("lab_values must be a dictionary of test names and numerical values.".to_string()),
        },
        builtin::CONTRAINDICATION_CHECK => {
            let procedure_code = required_str(args, "procedure_code")?;
            let conditions = optional_str_list(args, "patient_conditions")?;
            let medications = optional_str_list(args, "patient_medications")?;
            Ok(contraindications::contraindication_check(data, &procedure_code, &conditions, &medications))
        }
        _ => Err(format!("Unknown tool '{tool_name}'")),
    })();

    outcome.unwrap_or_else(ToolResult::err)
}
