//! Natural-language understanding for admission questions
//!
//! The pipeline runs in dependency order:
//! [`normalizer`] → {[`intent`], [`entity`]} → [`resolver`] → [`router`].

pub mod entity;
pub mod intent;
pub mod lexicon;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod router;
pub mod tagger;

pub use entity::{EntityExtractor, EntitySource, ExtractedEntity, PatternRule};
pub use intent::{IntentClassifier, IntentMatch, IntentModel, IntentSamples, MatchMethod, FALLBACK_INTENT};
pub use lexicon::{DictionaryPhrase, MajorCatalog};
pub use normalizer::{SynonymTable, TextNormalizer};
pub use pipeline::{Analysis, NluPipeline};
pub use resolver::{ContextResolution, ContextResolver, IntentCategory, MajorOrigin, TurnCues};
pub use router::{QueryPlan, QueryRouter, Resolution};
pub use tagger::{SequenceTagger, TaggedToken};
