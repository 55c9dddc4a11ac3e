//! Dictionaries harvested from the reference tables
//!
//! [`harvest_phrases`] builds the `(label, phrase)` list used by the
//! dictionary pass of the entity extractor, and [`MajorCatalog`] holds the
//! major and program names used to recover a major from free text.

use super::entity::labels;
use super::normalizer::{normalize, normalize_folded, SynonymTable};
use crate::data::records::{cell, cell_list, ReferenceTables};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// A normalized phrase with the label it is tagged as
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DictionaryPhrase {
    pub label: String,
    pub phrase: String,
}

impl DictionaryPhrase {
    pub fn new(label: &str, phrase: &str) -> Option<Self> {
        let phrase = normalize(phrase);
        let label = label.trim();
        if label.is_empty() || phrase.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_string(),
            phrase,
        })
    }
}

#[derive(Default)]
struct PhraseSet {
    seen: HashSet<(String, String)>,
    phrases: Vec<DictionaryPhrase>,
}

impl PhraseSet {
    fn add(&mut self, label: &str, value: Option<&str>) {
        let Some(phrase) = value.and_then(|v| DictionaryPhrase::new(label, v)) else {
            return;
        };
        if self.seen.insert((phrase.label.clone(), phrase.phrase.clone())) {
            self.phrases.push(phrase);
        }
    }

    fn add_all<'a>(&mut self, label: &str, values: impl IntoIterator<Item = &'a str>) {
        for value in values {
            self.add(label, Some(value));
        }
    }
}

/// Harvests `(label, phrase)` pairs from every reference table plus the
/// synonym rows whose entity column names a known label.
///
/// Phrases are normalized, empty ones dropped, duplicates removed and the
/// first-seen order kept.
pub fn harvest_phrases(tables: &ReferenceTables, synonyms: &SynonymTable) -> Vec<DictionaryPhrase> {
    use labels::*;
    let mut set = PhraseSet::default();

    for r in &tables.majors {
        set.add(MA_NGANH, cell(&r.major_code));
        set.add(TEN_NGANH, cell(&r.major_name));
    }
    for r in &tables.admission_methods {
        set.add(PHUONG_THUC_XET_TUYEN, cell(&r.admission_method));
    }
    for r in &tables.tuition {
        set.add(HOC_PHI_CATEGORY, cell(&r.program_type));
    }
    for r in &tables.scholarships {
        set.add(HOC_BONG_TEN, cell(&r.scholarship_name));
    }
    for r in &tables.admission_scores.rows {
        set.add(TEN_NGANH, cell(&r.program_name));
        set.add_all(TO_HOP_MON, cell_list(&r.subject_combination));
        set.add_all(NAM_HOC, tables.admission_scores.year_columns.iter().map(String::as_str));
    }
    for r in &tables.admission_targets {
        set.add(MA_NGANH, cell(&r.major_code));
        set.add(MA_XET_TUYEN, cell(&r.admission_code));
        set.add(TEN_NGANH, cell(&r.major_name));
        set.add(CHUYEN_NGANH, cell(&r.program_name));
        set.add_all(TO_HOP_MON, cell_list(&r.subject_combination));
    }
    for r in &tables.admissions_schedule {
        set.add(PHUONG_THUC_XET_TUYEN, cell(&r.admission_method));
        set.add(THOI_GIAN_BUOC, cell(&r.timeline));
    }
    for r in &tables.contact_info {
        set.add(DON_VI_LIEN_HE, cell(&r.university_name));
        set.add(DIA_CHI, cell(&r.address));
        set.add(EMAIL, cell(&r.email));
        set.add(DIEN_THOAI, cell(&r.phone));
        set.add(HOTLINE, cell(&r.hotline));
        set.add(WEBSITE, cell(&r.website));
    }
    for r in &tables.cefr_conversion {
        if cell(&r.ielts).is_some() {
            set.add(CHUNG_CHI_UU_TIEN, Some("IELTS"));
        }
        if cell(&r.toefl_ibt).is_some() {
            set.add(CHUNG_CHI_UU_TIEN, Some("TOEFL iBT"));
        }
        if cell(&r.toeic).is_some() {
            set.add(CHUNG_CHI_UU_TIEN, Some("TOEIC"));
        }
    }
    for r in &tables.subject_combinations {
        set.add(TO_HOP_MON, cell(&r.combination_code));
        set.add(TO_HOP_MON_TEN, cell(&r.subject_names));
        set.add_all(MON_HOC, cell_list(&r.subject_names));
        set.add_all(KY_THI, cell_list(&r.exam_type));
    }
    for r in &tables.admission_conditions {
        set.add(NAM_HOC, cell(&r.nam));
        set.add(PHUONG_THUC_XET_TUYEN, cell(&r.admission_method));
        set.add(DIEU_KIEN_XET_TUYEN, cell(&r.requirements));
    }

    for (entity, canonical) in synonyms.entity_terms() {
        if labels::is_known(entity) {
            set.add(labels::canonical_label(entity), Some(canonical));
        }
    }

    tracing::debug!(phrases = set.phrases.len(), "dictionary phrases harvested");
    set.phrases
}

/// Filler removed from message variants before matching major names
const FILLER_REPLACEMENTS: &[(&str, &str)] = &[
    (" ki thuat ", " ky thuat "),
    (" ki thuat", " ky thuat"),
    (" nganh ", " "),
    (" diem chuan ", " "),
    (" diem ", " "),
    (" chuan ", " "),
    (" nam ", " "),
];

/// Shortest message variant allowed to match inside a longer major name
const MIN_PARTIAL_LEN: usize = 4;

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"))
}

fn digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MajorName {
    display: String,
    folded: String,
}

/// Known major and program names
#[derive(Debug, Clone, Default)]
pub struct MajorCatalog {
    names: Vec<MajorName>,
}

impl MajorCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .filter_map(|name| {
                let display = name.as_ref().trim().to_string();
                let folded = canonical_vi_ascii(&normalize_folded(&display));
                if folded.is_empty() || !seen.insert(folded.clone()) {
                    return None;
                }
                Some(MajorName { display, folded })
            })
            .collect();
        Self { names }
    }

    /// Major names, score-table program names, then target-table program
    /// and major names
    pub fn from_tables(tables: &ReferenceTables) -> Self {
        let mut names: Vec<&str> = Vec::new();
        names.extend(tables.majors.iter().filter_map(|r| cell(&r.major_name)));
        names.extend(tables.admission_scores.rows.iter().filter_map(|r| cell(&r.program_name)));
        for r in &tables.admission_targets {
            names.extend(cell(&r.program_name));
            names.extend(cell(&r.major_name));
        }
        Self::new(names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Finds the major name with the longest overlap with `message`.
    ///
    /// A name matches when it is contained in a message variant, or when a
    /// variant of at least four characters is contained in the name. The
    /// overlap is the length of the contained string; ties keep the earlier
    /// name.
    pub fn infer(&self, message: &str) -> Option<&str> {
        let variants = message_variants(message);
        if variants.is_empty() {
            return None;
        }

        let mut best: Option<&MajorName> = None;
        let mut best_len = 0;
        for name in &self.names {
            for variant in &variants {
                let overlap = if variant.contains(name.folded.as_str()) {
                    name.folded.chars().count()
                } else if variant.chars().count() >= MIN_PARTIAL_LEN
                    && name.folded.contains(variant.as_str())
                {
                    variant.chars().count()
                } else {
                    continue;
                };
                if overlap > best_len {
                    best = Some(name);
                    best_len = overlap;
                }
            }
        }
        best.map(|name| name.display.as_str())
    }
}

fn canonical_vi_ascii(text: &str) -> String {
    text.replace("ki thuat", "ky thuat")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Folded message plus variants with filler words, years and numbers removed
fn message_variants(message: &str) -> Vec<String> {
    let folded = normalize_folded(message);
    if folded.is_empty() {
        return Vec::new();
    }

    let mut raw = vec![folded.clone()];
    let mut base = format!(" {} ", folded);
    for (from, to) in FILLER_REPLACEMENTS {
        base = base.replace(from, to);
        raw.push(base.clone());
    }
    raw.push(year_regex().replace_all(&folded, " ").into_owned());
    raw.push(digits_regex().replace_all(&folded, " ").into_owned());

    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::records::{
        AdmissionScoreRecord, AdmissionScoresTable, AdmissionTargetRecord, CefrRecord, MajorRecord,
    };

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    fn tables() -> ReferenceTables {
        ReferenceTables {
            majors: vec![
                MajorRecord {
                    major_code: s("7580101"),
                    major_name: s("Kiến trúc"),
                },
                MajorRecord {
                    major_code: s("7480201"),
                    major_name: s("Công nghệ thông tin"),
                },
            ],
            admission_scores: AdmissionScoresTable {
                year_columns: vec!["2023".into(), "2024".into()],
                rows: vec![AdmissionScoreRecord {
                    program_name: s("Kiến trúc"),
                    subject_combination: s("V00, V01"),
                }],
            },
            admission_targets: vec![AdmissionTargetRecord {
                major_code: s("7580201"),
                admission_code: s("XDA01"),
                major_name: s("Kỹ thuật xây dựng"),
                program_name: s("Xây dựng dân dụng và công nghiệp"),
                subject_combination: s("A00,A01"),
            }],
            cefr_conversion: vec![CefrRecord {
                ielts: s("5.0"),
                toefl_ibt: None,
                toeic: s(""),
            }],
            ..Default::default()
        }
    }

    fn contains(phrases: &[DictionaryPhrase], label: &str, phrase: &str) -> bool {
        phrases.iter().any(|p| p.label == label && p.phrase == phrase)
    }

    #[test]
    fn test_harvest_phrases() {
        let phrases = harvest_phrases(&tables(), &SynonymTable::new());
        assert!(contains(&phrases, "MA_NGANH", "7580101"));
        assert!(contains(&phrases, "TEN_NGANH", "kiến trúc"));
        assert!(contains(&phrases, "TO_HOP_MON", "v01"));
        assert!(contains(&phrases, "TO_HOP_MON", "a00"));
        assert!(contains(&phrases, "NAM_HOC", "2024"));
        assert!(contains(&phrases, "MA_XET_TUYEN", "xda01"));
        assert!(contains(&phrases, "CHUYEN_NGANH", "xây dựng dân dụng và công nghiệp"));
        assert!(contains(&phrases, "CHUNG_CHI_UU_TIEN", "ielts"));
        assert!(!contains(&phrases, "CHUNG_CHI_UU_TIEN", "toeic"));

        let kt = phrases
            .iter()
            .filter(|p| p.label == "TEN_NGANH" && p.phrase == "kiến trúc")
            .count();
        assert_eq!(kt, 1);
    }

    #[test]
    fn test_synonym_entities_become_phrases() {
        let mut synonyms = SynonymTable::new();
        synonyms.insert_with_entity("ktxd", "Kỹ thuật xây dựng", Some("TEN_NGANH"));
        synonyms.insert_with_entity("hp", "học phí", Some("misc"));
        let phrases = harvest_phrases(&ReferenceTables::default(), &synonyms);
        assert_eq!(phrases, vec![DictionaryPhrase::new("TEN_NGANH", "kỹ thuật xây dựng").unwrap()]);
    }

    #[test]
    fn test_infer_major_longest_overlap() {
        let catalog = MajorCatalog::from_tables(&tables());
        assert_eq!(catalog.infer("học phí ngành kien truc năm 2024"), Some("Kiến trúc"));
        assert_eq!(
            catalog.infer("điểm chuẩn Kĩ thuật xây dựng"),
            Some("Kỹ thuật xây dựng")
        );
        assert_eq!(catalog.infer("xây dựng dân dụng"), Some("Xây dựng dân dụng và công nghiệp"));
    }

    #[test]
    fn test_infer_rejects_short_fragments() {
        let catalog = MajorCatalog::from_tables(&tables());
        assert_eq!(catalog.infer("có"), None);
        assert_eq!(catalog.infer("học bổng thế nào"), None);
        assert_eq!(catalog.infer(""), None);
    }
}
