//! Intent classification over a TF-IDF vector space
//!
//! The model is fitted once from labeled samples: every intent is represented
//! by the L2-normalized sum of its samples' TF-IDF vectors. An utterance is
//! assigned the intent whose centroid has the highest cosine similarity. When
//! no centroid clears the threshold an ordered keyword list gets a chance
//! before the utterance is declared `fallback`.

use super::normalizer::{normalize, SynonymTable, TextNormalizer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

/// Intent returned when nothing matches
pub const FALLBACK_INTENT: &str = "fallback";

/// Amount added to the threshold for keyword matches
const KEYWORD_SCORE_EPSILON: f64 = 0.01;

/// Sparse term-weight vector, ordered by token so float sums are reproducible
pub type SparseVector = BTreeMap<String, f64>;

/// Labeled training samples: intent -> tokenized utterances
pub type IntentSamples = BTreeMap<String, Vec<Vec<String>>>;

/// How an intent was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Centroid similarity at or above the threshold
    Similarity,
    /// Keyword backoff
    Keyword,
    /// No match
    Fallback,
}

/// Result of [`IntentClassifier::detect`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMatch {
    pub intent: String,
    pub score: f64,
    pub method: MatchMethod,
}

impl IntentMatch {
    pub fn is_fallback(&self) -> bool {
        self.intent == FALLBACK_INTENT
    }
}

/// Fitted IDF table and per-intent centroids. Immutable after [`IntentModel::fit`].
#[derive(Debug, Clone, Default)]
pub struct IntentModel {
    idf: HashMap<String, f64>,
    centroids: BTreeMap<String, SparseVector>,
    sample_count: usize,
}

impl IntentModel {
    pub fn fit(samples: &IntentSamples) -> Self {
        let sample_count = samples.values().map(Vec::len).sum::<usize>();

        let mut df: HashMap<&str, usize> = HashMap::new();
        for tokens in samples.values().flatten() {
            let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for token in distinct {
                *df.entry(token).or_insert(0) += 1;
            }
        }

        let n = sample_count as f64;
        let idf = df
            .into_iter()
            .map(|(token, count)| {
                let weight = ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0;
                (token.to_string(), weight)
            })
            .collect();

        let mut model = Self {
            idf,
            centroids: BTreeMap::new(),
            sample_count,
        };

        for (intent, intent_samples) in samples {
            let mut sum = SparseVector::new();
            for tokens in intent_samples {
                for (token, weight) in model.vectorize(tokens) {
                    *sum.entry(token).or_insert(0.0) += weight;
                }
            }
            l2_normalize(&mut sum);
            model.centroids.insert(intent.clone(), sum);
        }

        model
    }

    /// L2-normalized TF-IDF vector. Tokens absent from the IDF table weigh 0.
    pub fn vectorize(&self, tokens: &[String]) -> SparseVector {
        if tokens.is_empty() {
            return SparseVector::new();
        }
        let total = tokens.len() as f64;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for token in tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(token, count)| {
                let tf = count as f64 / total;
                (token.to_string(), tf * self.idf(token))
            })
            .collect();
        l2_normalize(&mut vector);
        vector
    }

    pub fn idf(&self, token: &str) -> f64 {
        self.idf.get(token).copied().unwrap_or(0.0)
    }

    pub fn centroid(&self, intent: &str) -> Option<&SparseVector> {
        self.centroids.get(intent)
    }

    /// Intents in lexicographic order
    pub fn intents(&self) -> impl Iterator<Item = &str> {
        self.centroids.keys().map(String::as_str)
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }
}

fn l2_normalize(vector: &mut SparseVector) {
    let norm = vector.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vector.values_mut() {
            *value /= norm;
        }
    }
}

/// Dot product of two L2-normalized vectors
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short
        .iter()
        .filter_map(|(token, va)| long.get(token).map(|vb| va * vb))
        .sum()
}

/// One `(keyword, intent)` backoff rule, matched against normalized text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    keyword: String,
    intent: String,
}

impl KeywordRule {
    pub fn new(keyword: &str, intent: &str) -> Self {
        // Leading spaces mark token-initial keywords (" a00"), keep them.
        Self {
            keyword: keyword.to_lowercase().nfc().collect(),
            intent: intent.trim().to_string(),
        }
    }

    pub fn intent(&self) -> &str {
        &self.intent
    }
}

/// Ordered keyword backoff table; the first hit wins
pub fn default_keyword_backoff() -> Vec<KeywordRule> {
    // Accented and unaccented spellings are listed separately; an accented
    // keyword never matches unaccented input and vice versa.
    const RULES: &[(&str, &str)] = &[
        ("điểm chuẩn", "hoi_diem_chuan"),
        ("diem chuan", "hoi_diem_chuan"),
        ("chỉ tiêu", "hoi_chi_tieu"),
        ("chi tieu", "hoi_chi_tieu"),
        ("học phí", "hoi_hoc_phi"),
        ("hoc phi", "hoi_hoc_phi"),
        ("phi", "hoi_hoc_phi"),
        ("học bổng", "hoi_hoc_bong"),
        ("hoc bong", "hoi_hoc_bong"),
        ("phương thức", "hoi_phuong_thuc"),
        ("phuong thuc", "hoi_phuong_thuc"),
        ("điều kiện", "hoi_dieu_kien"),
        ("dieu kien", "hoi_dieu_kien"),
        ("thời gian", "hoi_thoi_gian_dk"),
        ("thoi gian", "hoi_thoi_gian_dk"),
        ("deadline", "hoi_thoi_gian_dk"),
        ("kênh nộp", "hoi_kenh_nop_ho_so"),
        ("kenh nop", "hoi_kenh_nop_ho_so"),
        ("nộp hồ sơ", "hoi_kenh_nop_ho_so"),
        ("nop ho so", "hoi_kenh_nop_ho_so"),
        ("tổ hợp", "hoi_to_hop_mon"),
        ("to hop", "hoi_to_hop_mon"),
        ("khối thi", "hoi_to_hop_mon"),
        ("khoi thi", "hoi_to_hop_mon"),
        ("môn thi", "hoi_to_hop_mon"),
        ("mon thi", "hoi_to_hop_mon"),
        ("mã ngành", "hoi_ma_nganh"),
        ("ma nganh", "hoi_ma_nganh"),
        (" a00", "hoi_to_hop_mon"),
        (" a01", "hoi_to_hop_mon"),
        (" a02", "hoi_to_hop_mon"),
        (" b00", "hoi_to_hop_mon"),
        (" c01", "hoi_to_hop_mon"),
        (" c02", "hoi_to_hop_mon"),
        (" d01", "hoi_to_hop_mon"),
        (" d07", "hoi_to_hop_mon"),
        (" d24", "hoi_to_hop_mon"),
        (" d29", "hoi_to_hop_mon"),
        (" h00", "hoi_to_hop_mon"),
        (" h07", "hoi_to_hop_mon"),
        (" v00", "hoi_to_hop_mon"),
        (" v01", "hoi_to_hop_mon"),
        (" v02", "hoi_to_hop_mon"),
        (" x05", "hoi_to_hop_mon"),
        (" x06", "hoi_to_hop_mon"),
        (" x26", "hoi_to_hop_mon"),
        (" k00", "hoi_to_hop_mon"),
        (" sp1", "hoi_to_hop_mon"),
        (" sp2", "hoi_to_hop_mon"),
        (" sp3", "hoi_to_hop_mon"),
        (" sp4", "hoi_to_hop_mon"),
        (" vs1", "hoi_to_hop_mon"),
        (" vs2", "hoi_to_hop_mon"),
        (" vs3", "hoi_to_hop_mon"),
        (" vs4", "hoi_to_hop_mon"),
        ("mô tả ngành", "hoi_nganh_hoc"),
        ("mo ta nganh", "hoi_nganh_hoc"),
        ("giới thiệu ngành", "hoi_nganh_hoc"),
        ("gioi thieu nganh", "hoi_nganh_hoc"),
        ("học gì", "hoi_nganh_hoc"),
        ("hoc gi", "hoi_nganh_hoc"),
        ("là gì", "hoi_nganh_hoc"),
        ("la gi", "hoi_nganh_hoc"),
        ("ra làm gì", "hoi_nganh_hoc"),
        ("ra lam gi", "hoi_nganh_hoc"),
        ("học những gì", "hoi_nganh_hoc"),
        ("hoc nhung gi", "hoi_nganh_hoc"),
        ("đào tạo gì", "hoi_nganh_hoc"),
        ("dao tao gi", "hoi_nganh_hoc"),
        ("chương trình đào tạo", "hoi_nganh_hoc"),
        ("chuong trinh dao tao", "hoi_nganh_hoc"),
        ("cho biết về ngành", "hoi_nganh_hoc"),
        ("cho biet ve nganh", "hoi_nganh_hoc"),
        ("thông tin về ngành", "hoi_nganh_hoc"),
        ("thong tin ve nganh", "hoi_nganh_hoc"),
        ("tìm hiểu về ngành", "hoi_nganh_hoc"),
        ("tim hieu ve nganh", "hoi_nganh_hoc"),
        ("về ngành", "hoi_nganh_hoc"),
        ("ve nganh", "hoi_nganh_hoc"),
        ("giới thiệu về", "hoi_nganh_hoc"),
        ("gioi thieu ve", "hoi_nganh_hoc"),
        ("liên hệ", "hoi_lien_he"),
        ("lien he", "hoi_lien_he"),
        ("v sat", "hoi_phuong_thuc"),
        ("vsat", "hoi_phuong_thuc"),
    ];
    RULES
        .iter()
        .map(|(keyword, intent)| KeywordRule::new(keyword, intent))
        .collect()
}

/// Multiplier applied to intents sharing a name prefix
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBonus {
    pub prefix: String,
    pub factor: f64,
}

/// TF-IDF intent classifier with keyword backoff
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    model: IntentModel,
    threshold: f64,
    normalizer: TextNormalizer,
    synonyms: SynonymTable,
    keywords: Vec<KeywordRule>,
    bonus: Option<ScoreBonus>,
}

impl IntentClassifier {
    /// Fits the model from tokenized samples
    pub fn new(samples: &IntentSamples, threshold: f64) -> Self {
        let model = IntentModel::fit(samples);
        tracing::debug!(
            intents = model.centroids.len(),
            samples = model.sample_count,
            vocabulary = model.vocabulary_size(),
            "intent model fitted"
        );
        Self {
            model,
            threshold,
            normalizer: TextNormalizer::new(),
            synonyms: SynonymTable::new(),
            keywords: default_keyword_backoff(),
            bonus: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// Replaces the keyword backoff table
    pub fn with_keyword_backoff(mut self, keywords: Vec<KeywordRule>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Multiplies the cosine of intents starting with `prefix` by `factor`.
    /// A factor of 1.0 disables the bonus.
    pub fn with_score_bonus(mut self, prefix: impl Into<String>, factor: f64) -> Self {
        self.bonus = if (factor - 1.0).abs() < f64::EPSILON {
            None
        } else {
            Some(ScoreBonus {
                prefix: prefix.into(),
                factor,
            })
        };
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model(&self) -> &IntentModel {
        &self.model
    }

    /// Classifies an utterance. Deterministic for a fitted model.
    pub fn detect(&self, text: &str) -> IntentMatch {
        let tokens = self.normalizer.tokenize_and_map(text, &self.synonyms);
        let query = self.model.vectorize(&tokens);

        let mut best_intent: Option<&str> = None;
        let mut best_score = 0.0;
        for (intent, centroid) in &self.model.centroids {
            let score = self.adjust(intent, cosine(&query, centroid));
            if score > best_score {
                best_score = score;
                best_intent = Some(intent);
            }
        }

        if let Some(intent) = best_intent {
            if best_score >= self.threshold {
                return IntentMatch {
                    intent: intent.to_string(),
                    score: best_score,
                    method: MatchMethod::Similarity,
                };
            }
        }

        if let Some(rule) = self.match_keyword(text) {
            tracing::debug!(intent = %rule.intent, keyword = %rule.keyword, "keyword backoff");
            return IntentMatch {
                intent: rule.intent.clone(),
                score: (self.threshold + KEYWORD_SCORE_EPSILON).min(1.0),
                method: MatchMethod::Keyword,
            };
        }

        IntentMatch {
            intent: FALLBACK_INTENT.to_string(),
            score: best_score,
            method: MatchMethod::Fallback,
        }
    }

    fn adjust(&self, intent: &str, cosine: f64) -> f64 {
        let score = match &self.bonus {
            Some(bonus) if intent.starts_with(&bonus.prefix) => cosine * bonus.factor,
            _ => cosine,
        };
        score.clamp(0.0, 1.0)
    }

    fn match_keyword(&self, text: &str) -> Option<&KeywordRule> {
        let norm = normalize(text);
        if norm.is_empty() {
            return None;
        }
        let haystack = format!(" {}", norm);
        self.keywords
            .iter()
            .find(|rule| !rule.keyword.trim().is_empty() && haystack.contains(&rule.keyword))
    }
}
