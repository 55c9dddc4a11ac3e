//! Text normalization and tokenization for Vietnamese utterances
//!
//! Every downstream scorer (intent centroids, dictionary lookups, major
//! inference) goes through [`normalize`], so its output must be stable:
//! `normalize(normalize(x)) == normalize(x)`.

use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Precomposed Vietnamese lowercase letters kept by [`normalize`]
const VIETNAMESE_LETTERS: &str = "áàảãạăắằẳẵặâấầẩẫậéèẻẽẹêếềểễệíìỉĩịóòỏõọôốồổỗộơớờởỡợúùủũụưứừửữựýỳỷỹỵđ";

/// Function words dropped by [`TextNormalizer::tokenize_and_map`]
pub const STOPWORDS: &[&str] = &[
    "là", "làm", "và", "hoặc", "nhưng", "thì", "lúc", "khi", "ở", "của", "cho", "với", "đến",
    "tới", "từ", "có", "được", "nhé", "ạ", "à", "ư", "mình", "bạn", "xin", "chào", "ơi", "giúp",
    "hỏi", "xem", "bao",
];

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_lowercase()
        || ch.is_ascii_digit()
        || ch == '_'
        || ch.is_whitespace()
        || VIETNAMESE_LETTERS.contains(ch)
}

/// Lowercase, NFC-compose, replace anything outside the Vietnamese
/// alphanumeric allow-list with a space and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let composed: String = text.to_lowercase().nfc().collect();
    let replaced: String = composed
        .chars()
        .map(|ch| if is_allowed(ch) { ch } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip tone and vowel marks (`điểm chuẩn` -> `diem chuan`).
///
/// Used where users are expected to type without accents: keyword cues and
/// major-name matching.
pub fn fold_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .map(|ch| match ch {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

/// `normalize` followed by [`fold_diacritics`]
pub fn normalize_folded(text: &str) -> String {
    fold_diacritics(&normalize(text))
}

/// Alias -> canonical term mapping loaded from the synonym table
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    canonical: HashMap<String, String>,
    /// Entity column of each alias row, when one was given
    entity: HashMap<String, String>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `alias -> canonical`. Both sides are normalized; empty
    /// entries are ignored.
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.insert_with_entity(alias, canonical, None);
    }

    pub fn insert_with_entity(&mut self, alias: &str, canonical: &str, entity: Option<&str>) {
        let alias = normalize(alias);
        let canonical = normalize(canonical);
        if alias.is_empty() || canonical.is_empty() {
            return;
        }
        if let Some(entity) = entity.map(str::trim).filter(|e| !e.is_empty()) {
            self.entity.insert(alias.clone(), entity.to_string());
        }
        self.canonical.insert(alias, canonical);
    }

    /// Canonical form of `token`, or the token itself
    pub fn canonical<'a>(&'a self, token: &'a str) -> &'a str {
        self.canonical.get(token).map(String::as_str).unwrap_or(token)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.canonical.get(token).map(String::as_str)
    }

    /// `(entity, canonical)` pairs for rows that named an entity column
    pub fn entity_terms(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut aliases: Vec<&String> = self.entity.keys().collect();
        aliases.sort();
        aliases.into_iter().filter_map(move |alias| {
            let entity = self.entity.get(alias)?;
            let canonical = self.canonical.get(alias)?;
            Some((entity.as_str(), canonical.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl<A: AsRef<str>, C: AsRef<str>> FromIterator<(A, C)> for SynonymTable {
    fn from_iter<I: IntoIterator<Item = (A, C)>>(iter: I) -> Self {
        let mut table = SynonymTable::new();
        for (alias, canonical) in iter {
            table.insert(alias.as_ref(), canonical.as_ref());
        }
        table
    }
}

/// Splits normalized text into word tokens
pub trait Segmenter: Send + Sync + fmt::Debug {
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// Whitespace splitting; also the fallback for every other segmenter
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}

/// Greedy longest-match segmenter over a compound-word lexicon.
///
/// Syllables of a known compound are joined with `_`
/// (`học phí` -> `học_phí`), everything else stays a single syllable.
#[derive(Debug, Clone, Default)]
pub struct CompoundSegmenter {
    compounds: HashSet<String>,
    max_syllables: usize,
}

impl CompoundSegmenter {
    pub fn new<I, S>(compounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        let mut max_syllables = 1;
        for phrase in compounds {
            let phrase = normalize(phrase.as_ref());
            let syllables = phrase.split(' ').count();
            if syllables < 2 {
                continue;
            }
            max_syllables = max_syllables.max(syllables);
            set.insert(phrase);
        }
        Self {
            compounds: set,
            max_syllables,
        }
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }
}

impl Segmenter for CompoundSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let syllables: Vec<&str> = text.split_whitespace().collect();
        let mut tokens = Vec::with_capacity(syllables.len());
        let mut i = 0;
        while i < syllables.len() {
            let longest = (self.max_syllables.min(syllables.len() - i)).max(1);
            let mut taken = 1;
            for width in (2..=longest).rev() {
                let candidate = syllables[i..i + width].join(" ");
                if self.compounds.contains(&candidate) {
                    taken = width;
                    break;
                }
            }
            tokens.push(syllables[i..i + taken].join("_"));
            i += taken;
        }
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(Error::Segmenter(format!("empty token while segmenting {:?}", text)));
        }
        Ok(tokens)
    }
}

/// Normalizes, segments, maps synonyms and removes stop words
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    segmenter: Arc<dyn Segmenter>,
    stopwords: HashSet<&'static str>,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::with_segmenter(Arc::new(WhitespaceSegmenter))
    }

    pub fn with_segmenter(segmenter: Arc<dyn Segmenter>) -> Self {
        Self {
            segmenter,
            stopwords: STOPWORDS.iter().copied().collect(),
        }
    }

    pub fn normalize(&self, text: &str) -> String {
        normalize(text)
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Token sequence used for TF-IDF scoring
    pub fn tokenize_and_map(&self, text: &str, synonyms: &SynonymTable) -> Vec<String> {
        let norm = normalize(text);
        let tokens = match self.segmenter.segment(&norm) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::debug!(error = %e, "segmenter failed, falling back to whitespace");
                norm.split_whitespace().map(str::to_string).collect()
            }
        };

        tokens
            .into_iter()
            .map(|token| map_token(token, synonyms))
            .filter(|token| !self.stopwords.contains(token.as_str()))
            .collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn map_token(token: String, synonyms: &SynonymTable) -> String {
    if let Some(canonical) = synonyms.get(&token) {
        return canonical.to_string();
    }
    if token.contains('_') {
        if let Some(canonical) = synonyms.get(&token.replace('_', " ")) {
            return canonical.to_string();
        }
    }
    token
}

/// [`TextNormalizer::tokenize_and_map`] with the whitespace segmenter
pub fn tokenize_and_map(text: &str, synonyms: &SynonymTable) -> Vec<String> {
    TextNormalizer::new().tokenize_and_map(text, synonyms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Học   PHÍ ngành CNTT?? "), "học phí ngành cntt");
        assert_eq!(normalize("Điểm chuẩn: 25.5 (2024)!"), "điểm chuẩn 25 5 2024");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_composes_decomposed_input() {
        // "ệ" written as e + circumflex + dot below
        let decomposed = "Vie\u{0302}\u{0323}t";
        assert_eq!(normalize(decomposed), "việt");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Học phí NGÀNH Kiến Trúc 2025 là bao nhiêu???",
            "e-mail: tuyensinh@huce.edu.vn",
            "İstanbul café ñ",
            "A00, D01; V-SAT",
            "\tđiểm\n\nsàn ",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input: {:?}", s);
        }
    }

    #[test]
    fn test_fold_diacritics() {
        assert_eq!(fold_diacritics("điểm chuẩn ngành kiến trúc"), "diem chuan nganh kien truc");
        assert_eq!(normalize_folded("Học Phí"), "hoc phi");
    }

    #[test]
    fn test_tokenize_and_map_drops_stopwords_and_maps_synonyms() {
        let synonyms: SynonymTable = [("cntt", "công nghệ thông tin")].into_iter().collect();
        let tokens = tokenize_and_map("Cho mình hỏi học phí ngành CNTT là bao nhiêu", &synonyms);
        assert_eq!(tokens, vec!["học", "phí", "ngành", "công nghệ thông tin", "nhiêu"]);
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let synonyms = SynonymTable::new();
        let a = tokenize_and_map("điểm chuẩn ngành xây dựng", &synonyms);
        let b = tokenize_and_map("điểm chuẩn ngành xây dựng", &synonyms);
        assert_eq!(a, b);
    }

    #[test]
    fn test_compound_segmenter_longest_match() {
        let segmenter = CompoundSegmenter::new(["học phí", "công nghệ thông tin", "công nghệ"]);
        let tokens = segmenter.segment("học phí ngành công nghệ thông tin").unwrap();
        assert_eq!(tokens, vec!["học_phí", "ngành", "công_nghệ_thông_tin"]);
    }

    #[test]
    fn test_compound_tokens_resolve_spaced_synonyms() {
        let normalizer =
            TextNormalizer::with_segmenter(Arc::new(CompoundSegmenter::new(["kĩ thuật"])));
        let synonyms: SynonymTable = [("kĩ thuật", "kỹ thuật")].into_iter().collect();
        let tokens = normalizer.tokenize_and_map("ngành kĩ thuật", &synonyms);
        assert_eq!(tokens, vec!["ngành", "kỹ thuật"]);
    }

    #[test]
    fn test_synonym_table_ignores_empty_rows() {
        let mut table = SynonymTable::new();
        table.insert("", "x");
        table.insert("y", "  ");
        table.insert_with_entity("CNTT", "Công nghệ thông tin", Some("TEN_NGANH"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.canonical("cntt"), "công nghệ thông tin");
        assert_eq!(table.canonical("khác"), "khác");
        let terms: Vec<_> = table.entity_terms().collect();
        assert_eq!(terms, vec![("TEN_NGANH", "công nghệ thông tin")]);
    }
}
