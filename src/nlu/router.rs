//! Maps an analyzed turn to a lookup plan, a clarification or a fallback

use super::intent::FALLBACK_INTENT;
use super::normalizer::normalize_folded;
use super::resolver::{ContextResolution, IntentCategory};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const FALLBACK_PROMPT: &str = "Xin lỗi, mình chưa hiểu rõ bạn muốn hỏi gì. Bạn thử nói rõ hơn (ví dụ: điểm chuẩn, học phí, ngành học...) nhé.";
const SCORE_PROMPT: &str =
    "Bạn cho mình xin tên ngành bạn quan tâm để mình tra điểm chuẩn giúp nhé?";
const MAJOR_PROMPT: &str =
    "Bạn đang tìm hiểu ngành nào vậy? Cho mình xin tên ngành để hỗ trợ chi tiết nhé.";
const COMBINATION_PROMPT: &str = "Bạn muốn mình tra tổ hợp môn cho ngành nào, hoặc cho mình mã tổ hợp cụ thể (ví dụ: A00, D01) để tra chi tiết nhé.";

/// Wording that asks for the full list of combinations (diacritic-folded)
const LISTING_CUES: &[&str] = &["tat ca", "danh sach", "cac to hop"];

fn combination_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z]\d{2}|[A-Z]{2}\d|SP\d|VS\d|TT)\b").expect("valid combination regex")
    })
}

/// Combination codes (`A00`, `D01`, `DG1`, ...) mentioned in `message`, in
/// order of appearance and without repeats
pub fn combination_codes(message: &str) -> Vec<String> {
    let upper = message.to_uppercase();
    let mut codes: Vec<String> = Vec::new();
    for m in combination_code_regex().find_iter(&upper) {
        if !codes.iter().any(|c| c == m.as_str()) {
            codes.push(m.as_str().to_string());
        }
    }
    codes
}

/// Reference-table lookup the caller should run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum QueryPlan {
    StandardScore {
        major: String,
        year: Option<String>,
    },
    MajorInfo {
        major: String,
    },
    Tuition {
        major: Option<String>,
        year: Option<String>,
    },
    Scholarships,
    AdmissionConditions {
        year: Option<String>,
    },
    Quota {
        major: Option<String>,
        year: Option<String>,
    },
    AdmissionMethods {
        major: Option<String>,
    },
    Schedule {
        method: Option<String>,
    },
    SubmissionChannels,
    Combinations {
        codes: Vec<String>,
        major: Option<String>,
        list_all: bool,
    },
    Contact,
}

/// Terminal result of a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    Lookup(QueryPlan),
    /// A required slot is missing; `prompt` asks the user for it
    Clarification {
        category: IntentCategory,
        prompt: String,
    },
    Fallback {
        prompt: String,
    },
}

impl Resolution {
    fn clarify(category: IntentCategory, prompt: &str) -> Self {
        Resolution::Clarification {
            category,
            prompt: prompt.to_string(),
        }
    }

    fn fallback() -> Self {
        Resolution::Fallback {
            prompt: FALLBACK_PROMPT.to_string(),
        }
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, Resolution::Lookup(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resolution::Lookup(_) => "lookup",
            Resolution::Clarification { .. } => "clarification",
            Resolution::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryRouter {
    threshold: f64,
}

impl QueryRouter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn route(
        &self,
        intent: &str,
        score: f64,
        message: &str,
        slots: &ContextResolution,
    ) -> Resolution {
        if intent == FALLBACK_INTENT || score < self.threshold {
            tracing::debug!(intent, score, threshold = self.threshold, "routing to fallback");
            return Resolution::fallback();
        }

        let major = slots.major.clone();
        let year = slots.year.clone();

        match slots.category {
            IntentCategory::Score => match major {
                Some(major) => Resolution::Lookup(QueryPlan::StandardScore { major, year }),
                None => Resolution::clarify(slots.category, SCORE_PROMPT),
            },
            IntentCategory::Major => match major {
                Some(major) => Resolution::Lookup(QueryPlan::MajorInfo { major }),
                None => Resolution::clarify(slots.category, MAJOR_PROMPT),
            },
            IntentCategory::Tuition => Resolution::Lookup(QueryPlan::Tuition { major, year }),
            IntentCategory::Scholarship => Resolution::Lookup(QueryPlan::Scholarships),
            IntentCategory::Condition => {
                Resolution::Lookup(QueryPlan::AdmissionConditions { year })
            }
            IntentCategory::Quota => Resolution::Lookup(QueryPlan::Quota { major, year }),
            IntentCategory::Method => Resolution::Lookup(QueryPlan::AdmissionMethods { major }),
            IntentCategory::Schedule => Resolution::Lookup(QueryPlan::Schedule {
                method: slots.method.clone(),
            }),
            IntentCategory::Combination => self.route_combination(message, major),
            IntentCategory::Other => {
                if intent.contains("kenh_nop") || intent.contains("ho_so") {
                    Resolution::Lookup(QueryPlan::SubmissionChannels)
                } else if intent.contains("lien_he") {
                    Resolution::Lookup(QueryPlan::Contact)
                } else {
                    tracing::debug!(intent, "no handler for intent");
                    Resolution::fallback()
                }
            }
        }
    }

    fn route_combination(&self, message: &str, major: Option<String>) -> Resolution {
        let codes = combination_codes(message);
        if !codes.is_empty() || major.is_some() {
            return Resolution::Lookup(QueryPlan::Combinations {
                codes,
                major,
                list_all: false,
            });
        }

        let folded = normalize_folded(message);
        if LISTING_CUES.iter().any(|cue| folded.contains(cue)) {
            Resolution::Lookup(QueryPlan::Combinations {
                codes,
                major: None,
                list_all: true,
            })
        } else {
            Resolution::clarify(IntentCategory::Combination, COMBINATION_PROMPT)
        }
    }
}
