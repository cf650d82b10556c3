use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::json;

use crate::models::clinical::AppointmentSlot;
use crate::tools::data::ClinicalData;
use crate::tools::definition::ToolResult;

static RANGE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+to\s+").expect("valid range separator pattern"));
static ANY_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date pattern"));

const DATE_FORMAT: &str = "%Y-%m-%d";
const RANGE_HINT: &str = "date_range must be YYYY-MM-DD or 'YYYY-MM-DD to YYYY-MM-DD'";

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Accepts `2025-03-01`, `2025-03-01 to 2025-03-07`, or falls back to the first
/// ISO date found anywhere in the string as a single day.
pub fn parse_date_range(input: &str) -> Option<(NaiveDate, NaiveDate)> {
    let input = input.trim();
    if let Some(d) = parse_date(input) {
        return Some((d, d));
    }

    let parts: Vec<&str> = RANGE_SEPARATOR.splitn(input, 2).collect();
    if parts.len() == 2 {
        if let (Some(start), Some(end)) = (parse_date(parts[0]), parse_date(parts[1])) {
            return Some((start, end));
        }
    }

    ANY_DATE
        .find(input)
        .and_then(|m| parse_date(m.as_str()))
        .map(|d| (d, d))
}

pub fn appointment_availability(data: &ClinicalData, provider_id: &str, date_range: &str) -> ToolResult {
    let Some((start, end)) = parse_date_range(date_range) else {
        return ToolResult::err(RANGE_HINT);
    };

    let slots = match data.slots.rows() {
        Ok(rows) => rows,
        Err(e) => return ToolResult::err(e),
    };

    let provider_id = provider_id.trim();
    let filtered: Vec<&AppointmentSlot> = slots
        .iter()
        .filter(|s| s.provider_id == provider_id)
        .filter(|s| match parse_date(&s.date) {
            Some(d) => start <= d && d <= end,
            None => false,
        })
        .collect();

    ToolResult::ok(json!({ "slots": filtered }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_day_range() {
        let (s, e) = parse_date_range("2025-03-01").unwrap();
        assert_eq!(s, e);
    }

    #[test]
    fn explicit_range() {
        let (s, e) = parse_date_range("2025-03-01 to 2025-03-03").unwrap();
        assert_eq!(s.to_string(), "2025-03-01");
        assert_eq!(e.to_string(), "2025-03-03");
    }

    #[test]
    fn embedded_date_falls_back_to_single_day() {
        let (s, e) = parse_date_range("sometime around 2025-03-04 please").unwrap();
        assert_eq!(s.to_string(), "2025-03-04");
        assert_eq!(s, e);
    }

    #[test]
    fn garbage_range_is_rejected() {
        assert!(parse_date_range("next tuesday").is_none());
        let data = ClinicalData::embedded();
        let r = appointment_availability(&data, "prov_001", "next tuesday");
        assert!(!r.success());
        assert_eq!(r.error(), Some(RANGE_HINT));
    }

    #[test]
    fn slots_match_provider_and_fall_in_range() {
        let data = ClinicalData::embedded();
        let r = appointment_availability(&data, "prov_001", "2025-03-01 to 2025-03-03");
        let slots = r.data().unwrap()["slots"].as_array().unwrap().clone();
        assert!(!slots.is_empty());
        for s in slots {
            assert_eq!(s["provider_id"], "prov_001");
            let d = s["date"].as_str().unwrap();
            assert!(("2025-03-01"..="2025-03-03").contains(&d));
            assert!(s.get("start_time").is_some());
            assert!(s.get("end_time").is_some());
        }
    }

    #[test]
    fn unknown_provider_has_no_slots() {
        let data = ClinicalData::embedded();
        let r = appointment_availability(&data, "unknown_provider_xyz", "2025-03-01");
        assert!(r.success());
        assert_eq!(r.data().unwrap()["slots"], json!([]));
    }
}
