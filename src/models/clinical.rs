use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Drug interaction severity, ordered from harmless to forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Major,
    Contraindicated,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Contraindicated => "contraindicated",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Minor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Low
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugPair {
    pub drugs: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub symptom: String,
    #[serde(default)]
    pub possible_conditions: Vec<String>,
    #[serde(default)]
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub location: String,
    #[serde(default = "default_true")]
    pub accepting_new_patients: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSlot {
    pub slot_id: String,
    pub provider_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageRow {
    pub procedure_code: String,
    pub plan_id: String,
    #[serde(default)]
    pub covered: bool,
    #[serde(default)]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContraindicationEntry {
    pub procedure_code: String,
    #[serde(default)]
    pub procedure_name: Option<String>,
    #[serde(default)]
    pub flagged_conditions: Vec<String>,
    #[serde(default)]
    pub flagged_medications: Vec<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_true() -> bool {
    true
}
