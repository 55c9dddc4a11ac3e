//! NLU pipeline: intent detection plus entity extraction over one data
//! directory

use super::entity::{labels, EntityExtractor, ExtractedEntity};
use super::intent::{IntentClassifier, IntentMatch, MatchMethod, FALLBACK_INTENT};
use super::lexicon::{harvest_phrases, MajorCatalog};
use super::normalizer::{normalize, CompoundSegmenter, TextNormalizer};
use super::tagger::SequenceTagger;
use crate::config::{NluConfig, SegmenterKind};
use crate::data::loader::{self, COMPOUND_FILE, INTENT_FILE, PATTERN_FILE, SYNONYM_FILE};
use crate::data::records::ReferenceTables;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Intent assigned by the major-introduction override
pub const MAJOR_INFO_INTENT: &str = "hoi_nganh_hoc";

/// Margin above the threshold under which a result counts as uncertain.
/// Also the score given to an overridden result.
const UNCERTAIN_MARGIN: f64 = 0.15;

/// Intents that never count as a confident answer
const UNCERTAIN_INTENTS: &[&str] = &[FALLBACK_INTENT, "tro_giup", "chao_hoi"];

/// Wording that means the user asks about something other than the major
/// itself, matched against normalized text in both spellings
const EXCLUSION_KEYWORDS: &[&str] = &[
    "ma nganh",
    "mã ngành",
    "ma ",
    " ma",
    "diem chuan",
    "điểm chuẩn",
    "diem ",
    "điểm ",
    "hoc phi",
    "học phí",
    "tien hoc",
    "tiền học",
    "chi phi",
    "chi phí",
    "chi tieu",
    "chỉ tiêu",
    "tuyen sinh",
    "tuyển sinh",
    "tuyen",
    "tuyển",
    "to hop",
    "tổ hợp",
    "khoi thi",
    "khối thi",
    "mon thi",
    "môn thi",
    "phuong thuc",
    "phương thức",
    "xet tuyen",
    "xét tuyển",
];

/// Wording that asks for an introduction
const INTRO_KEYWORDS: &[&str] = &[
    "gioi thieu",
    "giới thiệu",
    "tim hieu",
    "tìm hiểu",
    "mo ta",
    "mô tả",
    "la gi",
    "là gì",
    "hoc gi",
    "học gì",
    "ve nganh",
    "về ngành",
    "thong tin ve",
    "thông tin về",
    "cho biet ve",
    "cho biết về",
    "muon biet",
    "muốn biết",
];

const MAJOR_WORDS: &[&str] = &["nganh", "ngành"];

/// Result of [`NluPipeline::analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub intent: String,
    pub score: f64,
    pub method: MatchMethod,
    pub entities: Vec<ExtractedEntity>,
}

/// Normalizer, classifier and extractor built from one data directory
#[derive(Debug, Clone)]
pub struct NluPipeline {
    normalizer: TextNormalizer,
    classifier: IntentClassifier,
    extractor: EntityExtractor,
    catalog: MajorCatalog,
    threshold: f64,
}

impl NluPipeline {
    /// Loads every resource of `config.data_dir`.
    ///
    /// Missing files yield empty tables; an unparsable `entity.json` or an
    /// unreadable CSV header is an error.
    pub fn load(config: &NluConfig) -> Result<Self> {
        let dir = &config.data_dir;
        tracing::info!(data_dir = %dir.display(), "🔧 loading NLU resources");

        let normalizer = match config.segmenter {
            SegmenterKind::Whitespace => TextNormalizer::new(),
            SegmenterKind::Compound => {
                let compounds = loader::load_compounds(&dir.join(COMPOUND_FILE))?;
                let segmenter = CompoundSegmenter::new(compounds);
                tracing::debug!(compounds = segmenter.len(), "compound segmenter ready");
                TextNormalizer::with_segmenter(Arc::new(segmenter))
            }
        };

        let synonyms = loader::load_synonyms(&dir.join(SYNONYM_FILE))?;
        let samples = loader::load_intent_samples(&dir.join(INTENT_FILE), &normalizer, &synonyms)?;
        let patterns = loader::load_patterns(&dir.join(PATTERN_FILE))?;
        let tables = ReferenceTables::load(dir)?;

        let classifier = IntentClassifier::new(&samples, config.intent_threshold)
            .with_normalizer(normalizer.clone())
            .with_synonyms(synonyms.clone())
            .with_score_bonus(config.bonus_prefix.clone(), config.score_bonus);
        let phrases = harvest_phrases(&tables, &synonyms);
        let extractor = EntityExtractor::new(patterns, phrases, synonyms);
        let catalog = MajorCatalog::from_tables(&tables);

        tracing::info!(
            intents = samples.len(),
            patterns = extractor.pattern_count(),
            phrases = extractor.phrase_count(),
            majors = catalog.len(),
            "✅ NLU pipeline ready"
        );

        Ok(Self::from_parts(normalizer, classifier, extractor, catalog))
    }

    /// Assembles a pipeline from prebuilt components
    pub fn from_parts(
        normalizer: TextNormalizer,
        classifier: IntentClassifier,
        extractor: EntityExtractor,
        catalog: MajorCatalog,
    ) -> Self {
        let threshold = classifier.threshold();
        Self {
            normalizer,
            classifier,
            extractor,
            catalog,
            threshold,
        }
    }

    /// Attaches a statistical tagger to the entity extractor
    pub fn with_tagger(mut self, tagger: Arc<dyn SequenceTagger>) -> Self {
        self.extractor = self.extractor.with_tagger(tagger);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn extractor(&self) -> &EntityExtractor {
        &self.extractor
    }

    /// Known major and program names
    pub fn catalog(&self) -> &MajorCatalog {
        &self.catalog
    }

    pub fn detect_intent(&self, text: &str) -> IntentMatch {
        self.classifier.detect(text)
    }

    pub fn extract_entities(&self, text: &str) -> Vec<ExtractedEntity> {
        self.extractor.extract(text)
    }

    /// Intent, score and entities for one utterance
    pub fn analyze(&self, text: &str) -> Analysis {
        let detected = self.detect_intent(text);
        let entities = self.extract_entities(text);

        let mut analysis = Analysis {
            intent: detected.intent,
            score: detected.score,
            method: detected.method,
            entities,
        };

        if self.is_major_introduction(&analysis, text) {
            tracing::debug!(from = %analysis.intent, "major introduction override");
            analysis.intent = MAJOR_INFO_INTENT.to_string();
            analysis.score = (self.threshold + UNCERTAIN_MARGIN).min(1.0);
        }

        analysis
    }

    fn is_major_introduction(&self, analysis: &Analysis, text: &str) -> bool {
        let uncertain = UNCERTAIN_INTENTS.contains(&analysis.intent.as_str())
            || analysis.score < self.threshold + UNCERTAIN_MARGIN;
        if !uncertain || analysis.entities.is_empty() {
            return false;
        }

        let norm = normalize(text);
        let has_major = analysis
            .entities
            .iter()
            .any(|e| e.label == labels::TEN_NGANH || e.label == labels::CHUYEN_NGANH);
        let asks_intro = MAJOR_WORDS.iter().any(|kw| norm.contains(kw))
            && INTRO_KEYWORDS.iter().any(|kw| norm.contains(kw));
        let excluded = EXCLUSION_KEYWORDS.iter().any(|kw| norm.contains(kw));

        (has_major || asks_intro) && !excluded
    }
}
