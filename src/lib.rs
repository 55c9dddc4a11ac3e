//! # admissions-nlu
//!
//! Understanding of Vietnamese university-admissions questions.
//!
//! An utterance is normalized, classified into an intent with a TF-IDF
//! centroid model, scanned for entities by pattern, dictionary and optional
//! statistical passes, and finally resolved against the session's previous
//! turns into a lookup plan, a clarification question or a fallback.
//!
//! ```no_run
//! use admissions_nlu::{AdmissionsAssistant, NluConfig, SessionId};
//!
//! # async fn run() -> admissions_nlu::Result<()> {
//! let config = NluConfig::load(None)?;
//! let assistant = AdmissionsAssistant::load(&config)?;
//! let session = SessionId::from("demo");
//! let turn = assistant
//!     .handle_message(&session, "Điểm chuẩn ngành CNTT 2024", true)
//!     .await?;
//! println!("{} -> {}", turn.analysis.intent, turn.resolution.kind());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod nlu;
pub mod service;
pub mod session;

pub use config::NluConfig;
pub use error::{Error, Result, SessionError};
pub use nlu::{Analysis, NluPipeline, QueryPlan, Resolution};
pub use service::{AdmissionsAssistant, TurnOutcome};
pub use session::{ContextStore, MemoryContextStore, SessionContext, SessionId};
