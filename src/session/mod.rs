//! Session context tracking
//!
//! 会話ごとの直前インテント・エンティティ・履歴を保持する。
//! ストアは [`ContextStore`] トレイトの背後に置き、既定実装はプロセス内メモリ。

pub mod storage;
pub mod types;

pub use storage::{ContextStore, MemoryContextStore};
pub use types::{HistoryEntry, SessionContext, SessionId};
