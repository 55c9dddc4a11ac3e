//! Readers for the files of a data directory
//!
//! A missing file degrades to an empty table with a warning, a row that
//! cannot be decoded is skipped, and a file whose overall structure cannot
//! be understood is a construction error.

use super::records::{
    AdmissionScoreRecord, AdmissionScoresTable, IntentSampleRecord, PatternRecord,
    ReferenceTables, SynonymRecord,
};
use crate::error::{Error, Result};
use crate::nlu::entity::PatternRule;
use crate::nlu::intent::IntentSamples;
use crate::nlu::normalizer::{normalize, SynonymTable, TextNormalizer};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub const INTENT_FILE: &str = "intent.csv";
pub const SYNONYM_FILE: &str = "synonym.csv";
pub const PATTERN_FILE: &str = "entity.json";
pub const COMPOUND_FILE: &str = "compounds.txt";

fn exists_or_warn(path: &Path, what: &str) -> bool {
    if path.is_file() {
        return true;
    }
    tracing::warn!(path = %path.display(), "{} not found, using an empty table", what);
    false
}

fn corrupt(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::CorruptResource {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn open_csv(path: &Path, has_headers: bool) -> Result<csv::Reader<fs::File>> {
    Ok(ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?)
}

/// Reads a headered CSV table into records of type `T`
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    Ok(read_table_with_headers(path)?.1)
}

fn read_table_with_headers<T: DeserializeOwned>(path: &Path) -> Result<(StringRecord, Vec<T>)> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    if !exists_or_warn(path, &name) {
        return Ok((StringRecord::new(), Vec::new()));
    }

    let mut reader = open_csv(path, true)?;
    let headers = reader
        .headers()
        .map_err(|e| corrupt(path, format!("unreadable header: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (index, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                tracing::debug!(file = %name, row = index + 1, error = %e, "skipping malformed row");
            }
        }
    }
    tracing::debug!(file = %name, rows = rows.len(), skipped, "table loaded");

    Ok((headers, rows))
}

/// `admission_scores.csv` plus the four-digit year columns of its header
pub fn read_admission_scores(path: &Path) -> Result<AdmissionScoresTable> {
    let (headers, rows) = read_table_with_headers::<AdmissionScoreRecord>(path)?;
    let year_columns = headers
        .iter()
        .map(str::trim)
        .filter(|h| AdmissionScoresTable::is_year_header(h))
        .map(str::to_string)
        .collect();
    Ok(AdmissionScoresTable { year_columns, rows })
}

/// Raw synonym rows. The first row is a header; `#` rows and rows with
/// fewer than three columns are skipped.
pub fn read_synonym_rows(path: &Path) -> Result<Vec<SynonymRecord>> {
    if !exists_or_warn(path, SYNONYM_FILE) {
        return Ok(Vec::new());
    }

    let mut reader = open_csv(path, false)?;
    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(row = index + 1, error = %e, "skipping malformed synonym row");
                continue;
            }
        };
        if index == 0 || record.len() < 3 {
            continue;
        }
        let entity = record.get(0).unwrap_or_default();
        if entity.starts_with('#') || entity == "entity" {
            continue;
        }
        let canonical = record.get(1).unwrap_or_default();
        let alias = record.get(2).unwrap_or_default();
        if canonical.is_empty() || alias.is_empty() {
            continue;
        }
        rows.push(SynonymRecord {
            entity: entity.to_string(),
            canonical: canonical.to_string(),
            alias: alias.to_string(),
        });
    }
    Ok(rows)
}

pub fn load_synonyms(path: &Path) -> Result<SynonymTable> {
    let mut table = SynonymTable::new();
    for row in read_synonym_rows(path)? {
        table.insert_with_entity(&row.alias, &row.canonical, Some(&row.entity));
    }
    tracing::debug!(aliases = table.len(), "synonyms loaded");
    Ok(table)
}

/// Labeled utterances grouped by intent and tokenized with
/// [`TextNormalizer::tokenize_and_map`]
pub fn load_intent_samples(
    path: &Path,
    normalizer: &TextNormalizer,
    synonyms: &SynonymTable,
) -> Result<IntentSamples> {
    let mut samples = IntentSamples::new();
    for row in read_table::<IntentSampleRecord>(path)? {
        let utterance = normalize(row.utterance.as_deref().unwrap_or_default());
        let intent = row.intent.as_deref().map(str::trim).unwrap_or_default();
        if utterance.is_empty() || intent.is_empty() {
            continue;
        }
        let tokens = normalizer.tokenize_and_map(&utterance, synonyms);
        samples.entry(intent.to_string()).or_default().push(tokens);
    }
    Ok(samples)
}

/// Ordered pattern rules from `entity.json`.
///
/// The file must be a JSON array; entries that are not `{label, pattern}`
/// objects with a string pattern are skipped.
pub fn load_patterns(path: &Path) -> Result<Vec<PatternRule>> {
    if !exists_or_warn(path, PATTERN_FILE) {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&content).map_err(|e| corrupt(path, e))?;

    let mut rules = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let record: PatternRecord = match serde_json::from_value(entry) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(entry = index, error = %e, "skipping malformed pattern entry");
                continue;
            }
        };
        let (Some(label), Some(pattern)) = (record.label.as_deref(), record.pattern.as_str())
        else {
            continue;
        };
        if let Some(rule) = PatternRule::new(label, pattern) {
            rules.push(rule);
        }
    }
    tracing::debug!(patterns = rules.len(), "entity patterns loaded");
    Ok(rules)
}

/// Compound words for the compound segmenter, one per line. Optional.
pub fn load_compounds(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

impl ReferenceTables {
    /// Loads every reference table found in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let file = |name: &str| -> PathBuf { dir.join(name) };
        let tables = Self {
            majors: read_table(&file("majors.csv"))?,
            admission_methods: read_table(&file("admission_methods.csv"))?,
            tuition: read_table(&file("tuition.csv"))?,
            scholarships: read_table(&file("scholarships.csv"))?,
            admission_scores: read_admission_scores(&file("admission_scores.csv"))?,
            admission_targets: read_table(&file("admission_targets.csv"))?,
            admissions_schedule: read_table(&file("admissions_schedule.csv"))?,
            contact_info: read_table(&file("contact_info.csv"))?,
            cefr_conversion: read_table(&file("cefr_conversion.csv"))?,
            subject_combinations: read_table(&file("subject_combinations.csv"))?,
            admission_conditions: read_table(&file("admission_conditions.csv"))?,
        };
        tracing::info!(dir = %dir.display(), rows = tables.total_rows(), "reference tables loaded");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::records::MajorRecord;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<MajorRecord> = read_table(&dir.path().join("majors.csv")).unwrap();
        assert!(rows.is_empty());
        let tables = ReferenceTables::load(dir.path()).unwrap();
        assert_eq!(tables.total_rows(), 0);
    }

    #[test]
    fn test_read_table_ignores_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "majors.csv",
            "major_code,major_name,description\n7580101,Kiến trúc,Thiết kế\n7480201,,\n",
        );
        let rows: Vec<MajorRecord> = read_table(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].major_name.as_deref(), Some("Kiến trúc"));
    }

    #[test]
    fn test_year_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "admission_scores.csv",
            "program_name,subject_combination,2023,2024,note\nKiến trúc,\"V00, V01\",24.5,25\n",
        );
        let table = read_admission_scores(&path).unwrap();
        assert_eq!(table.year_columns, vec!["2023", "2024"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_synonym_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "synonym.csv",
            "entity,canonical,alias\n# comment,x,y\nTEN_NGANH,Công nghệ thông tin,CNTT\nshort,row\nTEN_NGANH,,empty\n",
        );
        let table = load_synonyms(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("cntt"), Some("công nghệ thông tin"));
    }

    #[test]
    fn test_intent_samples_skip_incomplete_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "intent.csv",
            "utterance,intent\nHọc phí bao nhiêu,hoi_hoc_phi\n,hoi_hoc_phi\nđiểm chuẩn,\n",
        );
        let samples =
            load_intent_samples(&path, &TextNormalizer::new(), &SynonymTable::new()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(
            samples["hoi_hoc_phi"],
            vec![vec!["học".to_string(), "phí".to_string(), "nhiêu".to_string()]]
        );
    }

    #[test]
    fn test_patterns_skip_non_string_entries() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "entity.json",
            r#"[{"label":"HOC_PHI","pattern":"Học Phí"},{"label":"X","pattern":[{"LOWER":"a"}]},{"pattern":"no label"},42]"#,
        );
        let rules = load_patterns(&path).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].pattern, "học phí");
    }

    #[test]
    fn test_corrupt_patterns_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "entity.json", "{not json");
        let err = load_patterns(&path).unwrap_err();
        assert_eq!(err.code(), "CORRUPT_RESOURCE");
    }

    #[test]
    fn test_compounds() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "compounds.txt", "# header\nhọc phí\n\nđiểm chuẩn\n");
        assert_eq!(load_compounds(&path).unwrap(), vec!["học phí", "điểm chuẩn"]);
        assert!(load_compounds(&dir.path().join("none.txt")).unwrap().is_empty());
    }
}
