//! Carries entity information from one turn of a session to the next

use super::entity::{labels, EntitySource, ExtractedEntity};
use super::lexicon::MajorCatalog;
use super::normalizer::normalize_folded;
use crate::session::SessionContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Intent name fragment → category, first match wins
const CATEGORY_TABLE: &[(&str, IntentCategory)] = &[
    ("diem_chuan", IntentCategory::Score),
    ("diem", IntentCategory::Score),
    ("hoc_phi", IntentCategory::Tuition),
    ("hoc_bong", IntentCategory::Scholarship),
    ("nganh", IntentCategory::Major),
    ("chi_tieu", IntentCategory::Quota),
    ("phuong_thuc", IntentCategory::Method),
    ("dieu_kien", IntentCategory::Condition),
    ("thoi_gian", IntentCategory::Schedule),
    ("lich_trinh", IntentCategory::Schedule),
    ("to_hop", IntentCategory::Combination),
    ("khoi_thi", IntentCategory::Combination),
];

// Cue lists are diacritic-folded. Entries without a space match whole tokens.
const ANAPHORIC_CUES: &[&str] = &[
    "chuyen nganh nay",
    "chuyen nganh do",
    "nganh nay",
    "nganh do",
    "nganh ay",
    "nganh tren",
    "cua no",
    "no",
];

const FOLLOW_UP_CUES: &[&str] = &["con", "them", "nua", "khac"];

const GENERAL_CUES: &[&str] = &[
    "tat ca",
    "cac nganh",
    "toan bo",
    "noi chung",
    "chung chung",
];

/// Topic of an intent, used to decide what context survives the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentCategory {
    Score,
    Tuition,
    Scholarship,
    Major,
    Quota,
    Method,
    Condition,
    Schedule,
    Combination,
    Other,
}

impl IntentCategory {
    pub fn from_intent(intent: &str) -> Self {
        CATEGORY_TABLE
            .iter()
            .find(|(fragment, _)| intent.contains(fragment))
            .map(|(_, category)| *category)
            .unwrap_or(IntentCategory::Other)
    }

    /// Independent categories never inherit a major from earlier turns
    pub fn is_independent(self) -> bool {
        matches!(
            self,
            IntentCategory::Scholarship
                | IntentCategory::Condition
                | IntentCategory::Schedule
                | IntentCategory::Other
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Score => "score",
            IntentCategory::Tuition => "tuition",
            IntentCategory::Scholarship => "scholarship",
            IntentCategory::Major => "major",
            IntentCategory::Quota => "quota",
            IntentCategory::Method => "method",
            IntentCategory::Condition => "condition",
            IntentCategory::Schedule => "schedule",
            IntentCategory::Combination => "combination",
            IntentCategory::Other => "other",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discourse markers found in a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCues {
    /// "ngành này", "nó", ...
    pub anaphoric: bool,
    /// "còn", "thêm", "nữa", "khác"
    pub follow_up: bool,
    /// "tất cả", "các ngành", "toàn bộ", ...
    pub general: bool,
}

impl TurnCues {
    pub fn detect(message: &str) -> Self {
        let folded = normalize_folded(message);
        let tokens: Vec<&str> = folded.split_whitespace().collect();
        Self {
            anaphoric: contains_cue(&folded, &tokens, ANAPHORIC_CUES),
            follow_up: contains_cue(&folded, &tokens, FOLLOW_UP_CUES),
            general: contains_cue(&folded, &tokens, GENERAL_CUES),
        }
    }

    fn refers_back(&self) -> bool {
        self.anaphoric || self.follow_up
    }
}

fn contains_cue(folded: &str, tokens: &[&str], cues: &[&str]) -> bool {
    cues.iter().any(|cue| {
        if cue.contains(' ') {
            folded.contains(cue)
        } else {
            tokens.contains(cue)
        }
    })
}

/// Where the resolved major came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorOrigin {
    /// Extracted from the current message
    Extracted,
    /// Recovered from the current message by name matching
    Inferred,
    /// Carried over from an earlier turn
    Carried,
}

/// Outcome of one turn of context resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResolution {
    pub category: IntentCategory,
    /// Entities to store as the session's `last_entities`
    pub last_entities: Vec<ExtractedEntity>,
    pub major: Option<String>,
    pub major_origin: Option<MajorOrigin>,
    pub year: Option<String>,
    /// First admission-method entity of the turn
    pub method: Option<String>,
    pub cues: TurnCues,
}

#[derive(Debug, Clone)]
pub struct ContextResolver {
    catalog: MajorCatalog,
}

impl ContextResolver {
    pub fn new(catalog: MajorCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MajorCatalog {
        &self.catalog
    }

    /// Decides which entities the turn carries forward.
    ///
    /// `context` is the state stored before this turn; it is not modified.
    pub fn resolve(
        &self,
        intent: &str,
        message: &str,
        current: &[ExtractedEntity],
        context: &SessionContext,
    ) -> ContextResolution {
        let category = IntentCategory::from_intent(intent);
        let cues = TurnCues::detect(message);
        let mut entities = current.to_vec();
        let mut origin = None;

        if current.iter().any(ExtractedEntity::is_major) {
            origin = Some(MajorOrigin::Extracted);
        } else if !category.is_independent() && !cues.general {
            // Anaphora and follow-ups look back first, plain questions look
            // at their own wording first.
            let (first, second) = if cues.refers_back() {
                (MajorOrigin::Carried, MajorOrigin::Inferred)
            } else {
                (MajorOrigin::Inferred, MajorOrigin::Carried)
            };
            for candidate in [first, second] {
                let found = match candidate {
                    MajorOrigin::Inferred => self.infer_from_message(message),
                    _ => self.major_from_context(context),
                };
                if let Some(entity) = found {
                    match candidate {
                        MajorOrigin::Carried => entities.insert(0, entity),
                        _ => entities.push(entity),
                    }
                    origin = Some(candidate);
                    break;
                }
            }
        }

        let resolution = ContextResolution {
            category,
            major: last_text(&entities, ExtractedEntity::is_major),
            year: last_text(&entities, ExtractedEntity::is_year),
            method: entities
                .iter()
                .find(|e| labels::canonical_label(&e.label) == labels::PHUONG_THUC_XET_TUYEN)
                .map(|e| e.text.clone()),
            major_origin: origin,
            last_entities: entities,
            cues,
        };

        tracing::debug!(
            intent,
            category = %resolution.category,
            major = resolution.major.as_deref().unwrap_or("-"),
            origin = ?resolution.major_origin,
            "context resolved"
        );
        resolution
    }

    fn infer_from_message(&self, message: &str) -> Option<ExtractedEntity> {
        self.catalog
            .infer(message)
            .map(|name| ExtractedEntity::new(labels::TEN_NGANH, name, EntitySource::Inferred))
    }

    /// Last stored major, else one inferred from the history, newest first
    fn major_from_context(&self, context: &SessionContext) -> Option<ExtractedEntity> {
        if let Some(entity) = context.last_major() {
            return Some(entity.clone());
        }
        context
            .conversation_history
            .iter()
            .rev()
            .find_map(|entry| self.catalog.infer(&entry.message))
            .map(|name| ExtractedEntity::new(labels::TEN_NGANH, name, EntitySource::Inferred))
    }
}

fn last_text(entities: &[ExtractedEntity], pred: impl Fn(&ExtractedEntity) -> bool) -> Option<String> {
    entities
        .iter()
        .rev()
        .find(|e| pred(e))
        .map(|e| e.text.clone())
}
