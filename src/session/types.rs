use crate::nlu::entity::ExtractedEntity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One answered turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message: String,
    pub intent: String,
    pub response: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        message: impl Into<String>,
        intent: impl Into<String>,
        response: serde_json::Value,
    ) -> Self {
        Self {
            message: message.into(),
            intent: intent.into(),
            response,
            timestamp: Utc::now(),
        }
    }
}

/// Conversation state carried between turns of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub last_intent: Option<String>,
    pub last_entities: Vec<ExtractedEntity>,
    pub conversation_history: VecDeque<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.last_intent.is_none()
            && self.last_entities.is_empty()
            && self.conversation_history.is_empty()
    }

    /// Appends `entry`, dropping the oldest entries beyond `limit`
    pub fn push_history(&mut self, entry: HistoryEntry, limit: usize) {
        self.conversation_history.push_back(entry);
        while self.conversation_history.len() > limit {
            self.conversation_history.pop_front();
        }
        self.touch();
    }

    /// Most recent major-type entity of the previous turn
    pub fn last_major(&self) -> Option<&ExtractedEntity> {
        self.last_entities.iter().rev().find(|e| e.is_major())
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::entity::EntitySource;

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::from("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut ctx = SessionContext::new();
        for i in 0..3 {
            ctx.push_history(
                HistoryEntry::new(format!("m{}", i), "hoi_hoc_phi", serde_json::Value::Null),
                2,
            );
        }
        let messages: Vec<_> = ctx
            .conversation_history
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, vec!["m1", "m2"]);
        assert!(ctx.updated_at.is_some());
    }

    #[test]
    fn test_last_major_prefers_latest() {
        let ctx = SessionContext {
            last_entities: vec![
                ExtractedEntity::new("TEN_NGANH", "kiến trúc", EntitySource::Dictionary),
                ExtractedEntity::new("NAM_HOC", "2024", EntitySource::Pattern),
                ExtractedEntity::new("CHUYEN_NGANH", "kỹ thuật phần mềm", EntitySource::Dictionary),
            ],
            ..Default::default()
        };
        assert_eq!(ctx.last_major().map(|e| e.text.as_str()), Some("kỹ thuật phần mềm"));
        assert!(!ctx.is_empty());
        assert!(SessionContext::new().is_empty());
    }
}
