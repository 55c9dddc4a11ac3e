//! Entity extraction and label canonicalization
//!
//! Three independent passes feed one merged list:
//!
//! 1. literal patterns from `entity.json`
//! 2. phrases harvested from the reference tables, with a second lookup over
//!    the synonym-expanded text
//! 3. an optional statistical BIO tagger
//!
//! The merge canonicalizes labels and keeps the first entity for every
//! `(label, normalized text)` pair.

use super::lexicon::DictionaryPhrase;
use super::normalizer::{normalize, SynonymTable};
use super::tagger::{collect_bio_spans, SequenceTagger};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Fixed entity label vocabulary
pub mod labels {
    pub const MA_NGANH: &str = "MA_NGANH";
    pub const TEN_NGANH: &str = "TEN_NGANH";
    pub const CHUYEN_NGANH: &str = "CHUYEN_NGANH";
    pub const MA_XET_TUYEN: &str = "MA_XET_TUYEN";
    pub const TO_HOP_MON: &str = "TO_HOP_MON";
    pub const TO_HOP_MON_TEN: &str = "TO_HOP_MON_TEN";
    pub const MON_HOC: &str = "MON_HOC";
    pub const KY_THI: &str = "KY_THI";
    pub const DIEM_SO: &str = "DIEM_SO";
    pub const DIEM_CHUAN: &str = "DIEM_CHUAN";
    pub const DIEM_SAN: &str = "DIEM_SAN";
    pub const NAM_HOC: &str = "NAM_HOC";
    pub const PHUONG_THUC_XET_TUYEN: &str = "PHUONG_THUC_XET_TUYEN";
    pub const DIEU_KIEN_XET_TUYEN: &str = "DIEU_KIEN_XET_TUYEN";
    pub const CHUNG_CHI_UU_TIEN: &str = "CHUNG_CHI_UU_TIEN";
    pub const HOC_PHI: &str = "HOC_PHI";
    pub const HOC_PHI_CATEGORY: &str = "HOC_PHI_CATEGORY";
    pub const HOC_BONG: &str = "HOC_BONG";
    pub const HOC_BONG_TEN: &str = "HOC_BONG_TEN";
    pub const THOI_GIAN_BUOC: &str = "THOI_GIAN_BUOC";
    pub const DON_VI_LIEN_HE: &str = "DON_VI_LIEN_HE";
    pub const DIA_CHI: &str = "DIA_CHI";
    pub const EMAIL: &str = "EMAIL";
    pub const DIEN_THOAI: &str = "DIEN_THOAI";
    pub const HOTLINE: &str = "HOTLINE";
    pub const WEBSITE: &str = "WEBSITE";

    pub const ALL: &[&str] = &[
        MA_NGANH,
        TEN_NGANH,
        CHUYEN_NGANH,
        MA_XET_TUYEN,
        TO_HOP_MON,
        TO_HOP_MON_TEN,
        MON_HOC,
        KY_THI,
        DIEM_SO,
        DIEM_CHUAN,
        DIEM_SAN,
        NAM_HOC,
        PHUONG_THUC_XET_TUYEN,
        DIEU_KIEN_XET_TUYEN,
        CHUNG_CHI_UU_TIEN,
        HOC_PHI,
        HOC_PHI_CATEGORY,
        HOC_BONG,
        HOC_BONG_TEN,
        THOI_GIAN_BUOC,
        DON_VI_LIEN_HE,
        DIA_CHI,
        EMAIL,
        DIEN_THOAI,
        HOTLINE,
        WEBSITE,
    ];

    /// Labels that identify a major or program
    pub const MAJOR_LABELS: &[&str] = &[MA_NGANH, TEN_NGANH, CHUYEN_NGANH];

    /// Labels that carry a year
    pub const YEAR_LABELS: &[&str] = &[NAM_HOC];

    const ALIASES: &[(&str, &str)] = &[
        ("NAM_TUYEN_SINH", NAM_HOC),
        ("NAM", NAM_HOC),
        ("PHUONG_THUC", PHUONG_THUC_XET_TUYEN),
        ("PHUONG_THUC_TUYEN_SINH", PHUONG_THUC_XET_TUYEN),
        ("CHUNG_CHI", CHUNG_CHI_UU_TIEN),
        ("TO_HOP", TO_HOP_MON),
        ("KHOI_THI", TO_HOP_MON),
    ];

    /// Resolves a label alias; unknown labels pass through unchanged
    pub fn canonical_label(label: &str) -> &str {
        let label = label.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == label)
            .map(|(_, canonical)| *canonical)
            .unwrap_or(label)
    }

    pub fn is_known(label: &str) -> bool {
        ALL.contains(&canonical_label(label))
    }

    pub fn is_major(label: &str) -> bool {
        MAJOR_LABELS.contains(&label)
    }

    pub fn is_year(label: &str) -> bool {
        YEAR_LABELS.contains(&label)
    }
}

/// Which strategy produced an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitySource {
    Pattern,
    Dictionary,
    Statistical,
    /// Major name recovered from the raw message by the context resolver
    Inferred,
}

impl fmt::Display for EntitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntitySource::Pattern => "pattern",
            EntitySource::Dictionary => "dictionary",
            EntitySource::Statistical => "statistical",
            EntitySource::Inferred => "inferred",
        };
        f.write_str(name)
    }
}

/// An entity found in an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub label: String,
    pub text: String,
    pub source: EntitySource,
}

impl ExtractedEntity {
    pub fn new(label: impl Into<String>, text: impl Into<String>, source: EntitySource) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            source,
        }
    }

    pub fn is_major(&self) -> bool {
        labels::is_major(&self.label)
    }

    pub fn is_year(&self) -> bool {
        labels::is_year(&self.label)
    }

    /// Dedup key: canonical label plus normalized text
    pub fn key(&self) -> (String, String) {
        (
            labels::canonical_label(&self.label).to_string(),
            normalize(&self.text),
        )
    }
}

/// A `(label, literal)` rule from the pattern file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub label: String,
    pub pattern: String,
}

impl PatternRule {
    /// Builds a rule with a normalized pattern, or `None` when it is empty
    pub fn new(label: &str, pattern: &str) -> Option<Self> {
        let label = label.trim();
        let pattern = normalize(pattern);
        if label.is_empty() || pattern.is_empty() {
            return None;
        }
        Some(Self {
            label: label.to_string(),
            pattern,
        })
    }

    /// Label emitted for a hit on this rule
    fn emitted_label(&self) -> &str {
        if self.pattern.contains("điểm sàn") {
            labels::DIEM_SAN
        } else if self.pattern.contains("điểm chuẩn") {
            labels::DIEM_CHUAN
        } else {
            &self.label
        }
    }
}

/// Multi-strategy entity extractor
#[derive(Debug, Clone, Default)]
pub struct EntityExtractor {
    patterns: Vec<PatternRule>,
    phrases: Vec<DictionaryPhrase>,
    synonyms: SynonymTable,
    tagger: Option<Arc<dyn SequenceTagger>>,
}

impl EntityExtractor {
    pub fn new(
        patterns: Vec<PatternRule>,
        phrases: Vec<DictionaryPhrase>,
        synonyms: SynonymTable,
    ) -> Self {
        Self {
            patterns,
            phrases,
            synonyms,
            tagger: None,
        }
    }

    /// Attaches a statistical tagger for the third pass
    pub fn with_tagger(mut self, tagger: Arc<dyn SequenceTagger>) -> Self {
        self.tagger = Some(tagger);
        self
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// Extracts a deduplicated, label-canonicalized entity list
    pub fn extract(&self, text: &str) -> Vec<ExtractedEntity> {
        let norm = normalize(text);
        if norm.is_empty() {
            return Vec::new();
        }

        let mut found = self.extract_by_patterns(&norm);
        found.extend(self.extract_by_dictionary(&norm));
        found.extend(self.extract_by_tagger(&norm));

        merge(found)
    }

    fn extract_by_patterns(&self, norm: &str) -> Vec<ExtractedEntity> {
        self.patterns
            .iter()
            .filter(|rule| norm.contains(rule.pattern.as_str()))
            .map(|rule| {
                ExtractedEntity::new(rule.emitted_label(), &rule.pattern, EntitySource::Pattern)
            })
            .collect()
    }

    fn extract_by_dictionary(&self, norm: &str) -> Vec<ExtractedEntity> {
        let mut found: Vec<ExtractedEntity> = self
            .phrases
            .iter()
            .filter(|p| norm.contains(p.phrase.as_str()))
            .map(|p| ExtractedEntity::new(&p.label, &p.phrase, EntitySource::Dictionary))
            .collect();

        let expanded = norm
            .split_whitespace()
            .map(|token| self.synonyms.canonical(token))
            .collect::<Vec<_>>()
            .join(" ");
        if expanded == norm {
            return found;
        }

        let verbatim: HashSet<(&str, &str)> = self
            .phrases
            .iter()
            .filter(|p| norm.contains(p.phrase.as_str()))
            .map(|p| (p.label.as_str(), p.phrase.as_str()))
            .collect();
        for p in &self.phrases {
            if expanded.contains(p.phrase.as_str())
                && !verbatim.contains(&(p.label.as_str(), p.phrase.as_str()))
            {
                found.push(ExtractedEntity::new(
                    &p.label,
                    &p.phrase,
                    EntitySource::Dictionary,
                ));
            }
        }
        found
    }

    fn extract_by_tagger(&self, norm: &str) -> Vec<ExtractedEntity> {
        let Some(tagger) = &self.tagger else {
            return Vec::new();
        };
        match tagger.tag(norm) {
            Ok(tokens) => collect_bio_spans(&tokens)
                .into_iter()
                .map(|span| ExtractedEntity::new(span.label, span.text, EntitySource::Statistical))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "statistical tagger failed, skipping pass");
                Vec::new()
            }
        }
    }
}

/// Canonicalizes labels and drops `(label, normalized text)` duplicates,
/// keeping the first occurrence.
pub fn merge(entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(entities.len());

    for mut entity in entities {
        let norm_text = normalize(&entity.text);
        let mut label = labels::canonical_label(&entity.label).to_string();
        if norm_text.contains("điểm chuẩn") {
            label = labels::DIEM_CHUAN.to_string();
        }
        if label.is_empty() || norm_text.is_empty() {
            continue;
        }
        if seen.insert((label.clone(), norm_text)) {
            entity.label = label;
            merged.push(entity);
        }
    }

    merged
}
