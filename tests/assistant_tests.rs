//! 会話サービスの統合テスト

mod common;

use admissions_nlu::nlu::{IntentCategory, MajorOrigin};
use admissions_nlu::{AdmissionsAssistant, QueryPlan, Resolution, SessionId};
use std::sync::Arc;

fn assistant() -> (tempfile::TempDir, AdmissionsAssistant) {
    let dir = common::data_dir();
    let assistant = AdmissionsAssistant::load(&common::config_for(dir.path())).unwrap();
    (dir, assistant)
}

#[tokio::test]
async fn test_major_carries_into_dependent_turn() {
    let (_dir, assistant) = assistant();
    let session = SessionId::from("scenario-c");

    let first = assistant
        .handle_message(&session, "giới thiệu ngành kiến trúc", true)
        .await
        .unwrap();
    assert_eq!(first.analysis.intent, "hoi_nganh_hoc");
    assert!(matches!(
        first.resolution,
        Resolution::Lookup(QueryPlan::MajorInfo { ref major }) if major == "kiến trúc"
    ));

    let second = assistant
        .handle_message(&session, "học phí ngành này thế nào", true)
        .await
        .unwrap();
    assert_eq!(second.analysis.intent, "hoi_hoc_phi");
    assert_eq!(second.slots.major_origin, Some(MajorOrigin::Carried));
    assert!(second
        .context
        .last_entities
        .iter()
        .any(|e| e.text.to_lowercase() == "kiến trúc"));
    assert_eq!(
        second.resolution,
        Resolution::Lookup(QueryPlan::Tuition {
            major: Some("kiến trúc".to_string()),
            year: None,
        })
    );
}

#[tokio::test]
async fn test_independent_intent_does_not_leak_major() {
    let (_dir, assistant) = assistant();
    let session = SessionId::from("isolation");

    assistant
        .handle_message(&session, "giới thiệu ngành kiến trúc", true)
        .await
        .unwrap();
    let turn = assistant
        .handle_message(&session, "có học bổng không", true)
        .await
        .unwrap();

    assert_eq!(turn.analysis.intent, "hoi_hoc_bong");
    assert_eq!(turn.slots.category, IntentCategory::Scholarship);
    assert!(turn.context.last_entities.iter().all(|e| !e.is_major()));
    assert_eq!(turn.resolution, Resolution::Lookup(QueryPlan::Scholarships));
}

#[tokio::test]
async fn test_score_without_major_asks_back() {
    let (_dir, assistant) = assistant();
    let turn = assistant
        .handle_message(&SessionId::from("fresh"), "điểm chuẩn năm ngoái", true)
        .await
        .unwrap();

    assert_eq!(turn.analysis.intent, "hoi_diem_chuan");
    match turn.resolution {
        Resolution::Clarification { category, prompt } => {
            assert_eq!(category, IntentCategory::Score);
            assert!(prompt.contains("tên ngành"));
        }
        other => panic!("expected clarification, got {:?}", other),
    }
}

#[tokio::test]
async fn test_without_context_nothing_is_inherited() {
    let (_dir, assistant) = assistant();
    let session = SessionId::from("no-context");

    assistant
        .handle_message(&session, "giới thiệu ngành kiến trúc", true)
        .await
        .unwrap();
    let turn = assistant
        .handle_message(&session, "học phí ngành này thế nào", false)
        .await
        .unwrap();

    assert_eq!(turn.slots.major, None);
    // the stored context is still updated
    assert_eq!(turn.context.conversation_history.len(), 2);
    assert_eq!(turn.context.last_intent.as_deref(), Some("hoi_hoc_phi"));
}

#[tokio::test]
async fn test_unrecognized_message_falls_back() {
    let (_dir, assistant) = assistant();
    let turn = assistant
        .handle_message(&SessionId::from("fallback"), "thời tiết hôm nay đẹp quá", true)
        .await
        .unwrap();

    assert_eq!(turn.analysis.intent, "fallback");
    assert_eq!(turn.resolution.kind(), "fallback");
    assert_eq!(turn.context.last_intent.as_deref(), Some("fallback"));
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let (_dir, assistant) = assistant();
    let err = assistant
        .handle_message(&SessionId::from("empty"), "   ", true)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(assistant
        .get_context(&SessionId::from("empty"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_history_limit() {
    let dir = common::data_dir();
    let mut config = common::config_for(dir.path());
    config.context_history_limit = 2;
    let assistant = AdmissionsAssistant::load(&config).unwrap();
    let session = SessionId::from("bounded");

    for message in ["học phí bao nhiêu", "có học bổng không", "điểm chuẩn ngành"] {
        assistant.handle_message(&session, message, true).await.unwrap();
    }

    let context = assistant.get_context(&session).await.unwrap();
    let messages: Vec<_> = context
        .conversation_history
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(messages, vec!["có học bổng không", "điểm chuẩn ngành"]);
}

#[tokio::test]
async fn test_reset_context() {
    let (_dir, assistant) = assistant();
    let session = SessionId::from("reset");

    assistant
        .handle_message(&session, "học phí bao nhiêu", true)
        .await
        .unwrap();
    assert_eq!(assistant.tracked_sessions().await, 1);
    assert!(assistant.reset_context(&session).await.unwrap());
    assert!(assistant.get_context(&session).await.unwrap().is_empty());
    assert_eq!(assistant.tracked_sessions().await, 0);
    assert!(!assistant.reset_context(&session).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_turns_on_one_session_are_not_lost() {
    let (_dir, assistant) = assistant();
    let assistant = Arc::new(assistant);
    let session = SessionId::from("concurrent");

    let mut handles = Vec::new();
    for i in 0..8 {
        let assistant = Arc::clone(&assistant);
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            let message = if i % 2 == 0 {
                "học phí bao nhiêu"
            } else {
                "có học bổng không"
            };
            assistant.handle_message(&session, message, true).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let context = assistant.get_context(&session).await.unwrap();
    assert_eq!(context.conversation_history.len(), 8);
}
