//! Clinical lookup tables shared read-only by every tool.
//!
//! Tables are parsed once at startup, either from the JSON assets compiled into
//! the binary or from an override directory holding files with the same names.
//! A table that fails to load is kept as a failed [`Dataset`] so the tools that
//! need it report the failure through their result envelope instead of the
//! process refusing to start.

use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::models::clinical::{
    AppointmentSlot, ContraindicationEntry, CoverageRow, DrugPair, Procedure, Provider,
    SymptomEntry,
};

const DRUG_INTERACTIONS_JSON: &str = include_str!("../../assets/drug_interactions.json");
const SYMPTOMS_JSON: &str = include_str!("../../assets/symptom_lookup.json");
const PROVIDERS_JSON: &str = include_str!("../../assets/providers.json");
const COVERAGE_JSON: &str = include_str!("../../assets/insurance_coverage.json");
const PROCEDURES_JSON: &str = include_str!("../../assets/procedures.json");
const CONTRAINDICATIONS_JSON: &str = include_str!("../../assets/contraindications.json");

const SLOT_YEAR: i32 = 2025;
const SLOT_MONTH: u32 = 3;
const SLOT_MINUTES: i64 = 30;
const WEEKDAY_STARTS: &[(u32, u32)] = &[(9, 0), (10, 30), (14, 0), (15, 30)];
const SATURDAY_STARTS: &[(u32, u32)] = &[(9, 0), (10, 30)];

#[derive(Debug, Clone)]
pub struct Dataset<T> {
    name: &'static str,
    rows: Vec<T>,
    load_error: Option<String>,
}

impl<T> Dataset<T> {
    pub fn loaded(name: &'static str, rows: Vec<T>) -> Self {
        Self {
            name,
            rows,
            load_error: None,
        }
    }

    pub fn failed(name: &'static str, error: impl Into<String>) -> Self {
        Self {
            name,
            rows: Vec::new(),
            load_error: Some(error.into()),
        }
    }

    pub fn rows(&self) -> Result<&[T], String> {
        match &self.load_error {
            Some(e) => Err(format!("{} dataset unavailable: {e}", self.name)),
            None => Ok(&self.rows),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.load_error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ClinicalData {
    pub drug_pairs: Dataset<DrugPair>,
    pub symptoms: Dataset<SymptomEntry>,
    pub providers: Dataset<Provider>,
    pub slots: Dataset<AppointmentSlot>,
    pub coverage: Dataset<CoverageRow>,
    pub procedures: Dataset<Procedure>,
    pub contraindications: Dataset<ContraindicationEntry>,
}

impl ClinicalData {
    pub fn load(data_dir: Option<&Path>) -> Self {
        let data = match data_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::embedded(),
        };
        data.log_summary();
        data
    }

    pub fn embedded() -> Self {
        Self::from_sources(|file| match file {
            "drug_interactions.json" => Ok(DRUG_INTERACTIONS_JSON.to_string()),
            "symptom_lookup.json" => Ok(SYMPTOMS_JSON.to_string()),
            "providers.json" => Ok(PROVIDERS_JSON.to_string()),
            "insurance_coverage.json" => Ok(COVERAGE_JSON.to_string()),
            "procedures.json" => Ok(PROCEDURES_JSON.to_string()),
            "contraindications.json" => Ok(CONTRAINDICATIONS_JSON.to_string()),
            other => Err(format!("no embedded asset named {other}")),
        })
    }

    pub fn from_dir(dir: &Path) -> Self {
        Self::from_sources(|file| {
            let path = dir.join(file);
            std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()))
        })
    }

    fn from_sources(read: impl Fn(&str) -> Result<String, String>) -> Self {
        let providers: Dataset<Provider> = parse_table("providers", "providers", read("providers.json"));
        let slots = match providers.rows() {
            Ok(rows) => Dataset::loaded("appointment slots", generate_slots(rows)),
            Err(e) => Dataset::failed("appointment slots", e),
        };

        Self {
            drug_pairs: parse_table("drug interactions", "pairs", read("drug_interactions.json")),
            symptoms: parse_table("symptoms", "symptoms", read("symptom_lookup.json")),
            providers,
            slots,
            coverage: parse_table("insurance coverage", "coverage", read("insurance_coverage.json")),
            procedures: parse_table("procedures", "procedures", read("procedures.json")),
            contraindications: parse_table(
                "contraindications",
                "contraindications",
                read("contraindications.json"),
            ),
        }
    }

    fn log_summary(&self) {
        let tables: [(&str, bool); 7] = [
            ("drug interactions", self.drug_pairs.is_loaded()),
            ("symptoms", self.symptoms.is_loaded()),
            ("providers", self.providers.is_loaded()),
            ("appointment slots", self.slots.is_loaded()),
            ("insurance coverage", self.coverage.is_loaded()),
            ("procedures", self.procedures.is_loaded()),
            ("contraindications", self.contraindications.is_loaded()),
        ];
        let failed: Vec<&str> = tables.iter().filter(|(_, ok)| !ok).map(|(n, _)| *n).collect();
        if failed.is_empty() {
            info!("clinical datasets loaded ({} tables)", tables.len());
        } else {
            warn!(failed = ?failed, "some clinical datasets failed to load; dependent tools will report errors");
        }
    }
}

fn parse_table<T: DeserializeOwned>(
    name: &'static str,
    key: &str,
    source: Result<String, String>,
) -> Dataset<T> {
    let text = match source {
        Ok(t) => t,
        Err(e) => return Dataset::failed(name, e),
    };
    let parsed: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => return Dataset::failed(name, format!("invalid JSON: {e}")),
    };
    let Some(list) = parsed.get(key) else {
        return Dataset::failed(name, format!("missing top-level \"{key}\" list"));
    };
    match serde_json::from_value::<Vec<T>>(list.clone()) {
        Ok(rows) => Dataset::loaded(name, rows),
        Err(e) => Dataset::failed(name, format!("invalid rows: {e}")),
    }
}

/// Deterministic March 2025 schedule: weekday and Saturday-morning slots, with a
/// rotation that leaves every provider a slightly different set of openings.
pub fn generate_slots(providers: &[Provider]) -> Vec<AppointmentSlot> {
    let mut out = Vec::new();
    for (p_idx, provider) in providers.iter().enumerate() {
        for day in 1..=31u32 {
            let Some(date) = NaiveDate::from_ymd_opt(SLOT_YEAR, SLOT_MONTH, day) else {
                continue;
            };
            let starts = match date.weekday() {
                Weekday::Sun => continue,
                Weekday::Sat => SATURDAY_STARTS,
                _ => WEEKDAY_STARTS,
            };
            for (t_idx, (hour, minute)) in starts.iter().enumerate() {
                if (day as usize + t_idx + p_idx) % 4 == 3 {
                    continue;
                }
                let Some(start) = NaiveTime::from_hms_opt(*hour, *minute, 0) else {
                    continue;
                };
                let end = start + Duration::minutes(SLOT_MINUTES);
                out.push(AppointmentSlot {
                    slot_id: format!("{}_{}_{}", provider.id, date.format("%Y%m%d"), start.format("%H%M")),
                    provider_id: provider.id.clone(),
                    date: date.format("%Y-%m-%d").to_string(),
                    start_time: start.format("%H:%M").to_string(),
                    end_time: end.format("%H:%M").to_string(),
                });
            }
        }
    }
    out
}
