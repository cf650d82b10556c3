use serde_json::{json, Map, Value};

use crate::tools::definition::ToolResult;

struct ReferenceRange {
    key: &'static str,
    min: f64,
    max: f64,
    unit: &'static str,
    description: &'static str,
}

// Adult general-population ranges.
const REFERENCE_RANGES: &[ReferenceRange] = &[
    ReferenceRange { key: "glucose", min: 70.0, max: 99.0, unit: "mg/dL", description: "Fasting blood sugar. High levels may indicate diabetes." },
    ReferenceRange { key: "a1c", min: 0.0, max: 5.6, unit: "%", description: "Average blood sugar over 2-3 months." },
    ReferenceRange { key: "cholesterol_total", min: 0.0, max: 199.0, unit: "mg/dL", description: "Total cholesterol in the blood." },
    ReferenceRange { key: "hdl", min: 40.0, max: 1000.0, unit: "mg/dL", description: "High-density lipoprotein (good cholesterol). Low levels are a risk factor for heart disease." },
    ReferenceRange { key: "ldl", min: 0.0, max: 99.0, unit: "mg/dL", description: "Low-density lipoprotein (bad cholesterol)." },
    ReferenceRange { key: "triglycerides", min: 0.0, max: 149.0, unit: "mg/dL", description: "A type of fat found in your blood." },
    ReferenceRange { key: "hemoglobin", min: 12.0, max: 17.5, unit: "g/dL", description: "Protein in red blood cells that carries oxygen. Varies slightly by sex." },
    ReferenceRange { key: "wbc", min: 4.5, max: 11.0, unit: "10^9/L", description: "White blood cell count. High levels may indicate infection." },
    ReferenceRange { key: "platelets", min: 150.0, max: 450.0, unit: "10^9/L", description: "Cell fragments that help with blood clotting." },
    ReferenceRange { key: "sodium", min: 135.0, max: 145.0, unit: "mEq/L", description: "An electrolyte crucial for nerve and muscle function." },
    ReferenceRange { key: "potassium", min: 3.5, max: 5.2, unit: "mEq/L", description: "Helps with nerve function and muscle contraction." },
    ReferenceRange { key: "creatinine", min: 0.6, max: 1.2, unit: "mg/dL", description: "Waste product filtered by kidneys. High levels may indicate reduced kidney function." },
];

fn normalize_key(name: &str) -> String {
    let key = name.trim().to_lowercase().replace(' ', "_");
    match key.as_str() {
        "hba1c" | "hemoglobin_a1c" => "a1c".to_string(),
        "cholesterol" => "cholesterol_total".to_string(),
        "wbc_count" | "white_blood_cells" => "wbc".to_string(),
        "rbc" | "red_blood_cells" => "hemoglobin".to_string(),
        _ => key,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn lab_result_interpretation(lab_values: &Map<String, Value>) -> ToolResult {
    let mut interpretations = Vec::with_capacity(lab_values.len());

    for (raw_name, value) in lab_values {
        let Some(number) = as_number(value) else {
            interpretations.push(json!({
                "test_name": raw_name,
                "status": "error",
                "message": format!("Could not parse value '{}' as a number.", display_value(value))
            }));
            continue;
        };

        let key = normalize_key(raw_name);
        match REFERENCE_RANGES.iter().find(|r| r.key == key) {
            Some(range) => {
                let status = if number < range.min {
                    "low"
                } else if number > range.max {
                    "high"
                } else {
                    "normal"
                };
                interpretations.push(json!({
                    "test_name": raw_name,
                    "value": number,
                    "unit": range.unit,
                    "status": status,
                    "reference_range": format!("{} - {}", range.min, range.max),
                    "description": range.description
                }));
            }
            None => interpretations.push(json!({
                "test_name": raw_name,
                "value": number,
                "status": "unknown",
                "message": "Reference range not available for this test in the current database."
            })),
        }
    }

    ToolResult::ok(json!({ "interpretations": interpretations }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(values: Value) -> Vec<Value> {
        let map = values.as_object().unwrap().clone();
        let r = lab_result_interpretation(&map);
        r.data().unwrap()["interpretations"].as_array().unwrap().clone()
    }

    #[test]
    fn classifies_low_normal_high() {
        let out = interpret(json!({ "glucose": 110, "hdl": 35, "sodium": 140 }));
        let status = |name: &str| {
            out.iter()
                .find(|i| i["test_name"] == name)
                .map(|i| i["status"].as_str().unwrap().to_string())
                .unwrap()
        };
        assert_eq!(status("glucose"), "high");
        assert_eq!(status("hdl"), "low");
        assert_eq!(status("sodium"), "normal");
    }

    #[test]
    fn aliases_and_string_numbers() {
        let out = interpret(json!({ "HbA1c": "6.1", "Potassium": 4.0 }));
        let a1c = out.iter().find(|i| i["test_name"] == "HbA1c").unwrap();
        assert_eq!(a1c["status"], "high");
        assert_eq!(a1c["unit"], "%");
        let k = out.iter().find(|i| i["test_name"] == "Potassium").unwrap();
        assert_eq!(k["status"], "normal");
        assert_eq!(k["reference_range"], "3.5 - 5.2");
    }

    #[test]
    fn unparseable_and_unknown_tests() {
        let out = interpret(json!({ "glucose": "lots", "vitamin_q": 3 }));
        let g = out.iter().find(|i| i["test_name"] == "glucose").unwrap();
        assert_eq!(g["status"], "error");
        assert!(g["message"].as_str().unwrap().contains("lots"));
        let q = out.iter().find(|i| i["test_name"] == "vitamin_q").unwrap();
        assert_eq!(q["status"], "unknown");
    }
}
