//! Record types for the static reference tables
//!
//! Each CSV table gets its own struct; columns the NLU layer does not read
//! are ignored on deserialization. Every field is optional because the
//! tables are maintained by hand and frequently have blank cells.

use serde::{Deserialize, Serialize};

/// One labeled utterance from `intent.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSampleRecord {
    #[serde(default)]
    pub utterance: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
}

/// One alias row from `synonym.csv` (`entity,canonical,alias`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymRecord {
    pub entity: String,
    pub canonical: String,
    pub alias: String,
}

/// One `{label, pattern}` entry of `entity.json`.
/// Non-string patterns are kept as raw JSON and skipped by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub pattern: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorRecord {
    #[serde(default)]
    pub major_code: Option<String>,
    #[serde(default)]
    pub major_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionMethodRecord {
    #[serde(default)]
    pub admission_method: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuitionRecord {
    #[serde(default)]
    pub program_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarshipRecord {
    #[serde(default)]
    pub scholarship_name: Option<String>,
}

/// Row of `admission_scores.csv`; per-year score columns are tracked on the
/// table, not the row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionScoreRecord {
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub subject_combination: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionScoresTable {
    /// Headers that are four-digit years (`2023`, `2024`, ...)
    pub year_columns: Vec<String>,
    pub rows: Vec<AdmissionScoreRecord>,
}

impl AdmissionScoresTable {
    pub fn is_year_header(header: &str) -> bool {
        let header = header.trim();
        header.len() == 4 && header.chars().all(|c| c.is_ascii_digit())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionTargetRecord {
    #[serde(default)]
    pub major_code: Option<String>,
    #[serde(default)]
    pub admission_code: Option<String>,
    #[serde(default)]
    pub major_name: Option<String>,
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub subject_combination: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(default)]
    pub admission_method: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default)]
    pub university_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub hotline: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

/// Language certificate conversion row; only presence of a value matters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CefrRecord {
    #[serde(default, rename = "IELTS")]
    pub ielts: Option<String>,
    #[serde(default, rename = "TOEFL iBT")]
    pub toefl_ibt: Option<String>,
    #[serde(default, rename = "TOEIC")]
    pub toeic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectCombinationRecord {
    #[serde(default)]
    pub combination_code: Option<String>,
    #[serde(default)]
    pub subject_names: Option<String>,
    #[serde(default)]
    pub exam_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConditionRecord {
    #[serde(default)]
    pub nam: Option<String>,
    #[serde(default)]
    pub admission_method: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
}

/// All reference tables of one data directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub majors: Vec<MajorRecord>,
    pub admission_methods: Vec<AdmissionMethodRecord>,
    pub tuition: Vec<TuitionRecord>,
    pub scholarships: Vec<ScholarshipRecord>,
    pub admission_scores: AdmissionScoresTable,
    pub admission_targets: Vec<AdmissionTargetRecord>,
    pub admissions_schedule: Vec<ScheduleRecord>,
    pub contact_info: Vec<ContactRecord>,
    pub cefr_conversion: Vec<CefrRecord>,
    pub subject_combinations: Vec<SubjectCombinationRecord>,
    pub admission_conditions: Vec<AdmissionConditionRecord>,
}

impl ReferenceTables {
    pub fn total_rows(&self) -> usize {
        self.majors.len()
            + self.admission_methods.len()
            + self.tuition.len()
            + self.scholarships.len()
            + self.admission_scores.rows.len()
            + self.admission_targets.len()
            + self.admissions_schedule.len()
            + self.contact_info.len()
            + self.cefr_conversion.len()
            + self.subject_combinations.len()
            + self.admission_conditions.len()
    }
}

/// Trimmed, non-empty cell contents
pub fn cell(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Comma-separated cell split into trimmed, non-empty parts
pub fn cell_list(value: &Option<String>) -> Vec<&str> {
    cell(value)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_header_detection() {
        assert!(AdmissionScoresTable::is_year_header("2024"));
        assert!(AdmissionScoresTable::is_year_header(" 2020 "));
        assert!(!AdmissionScoresTable::is_year_header("program_name"));
        assert!(!AdmissionScoresTable::is_year_header("20245"));
    }

    #[test]
    fn test_cell_helpers() {
        assert_eq!(cell(&Some("  x ".into())), Some("x"));
        assert_eq!(cell(&Some("   ".into())), None);
        assert_eq!(cell(&None), None);
        assert_eq!(cell_list(&Some("A00, A01,,D01 ".into())), vec!["A00", "A01", "D01"]);
    }
}
