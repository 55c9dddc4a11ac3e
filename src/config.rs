//! Runtime configuration

mod loader;

pub use loader::ConfigLoader;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default acceptance threshold for centroid similarity
pub const DEFAULT_INTENT_THRESHOLD: f64 = 0.25;

/// Default number of turns kept per session
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Word segmenter used before TF-IDF scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterKind {
    #[default]
    Whitespace,
    /// Greedy longest match over `compounds.txt`
    Compound,
}

/// NLU pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NluConfig {
    /// Directory holding `intent.csv`, `synonym.csv`, `entity.json` and the
    /// reference tables
    pub data_dir: PathBuf,
    pub intent_threshold: f64,
    pub context_history_limit: usize,
    /// Multiplier for intents starting with `bonus_prefix` (1.0 = off)
    pub score_bonus: f64,
    pub bonus_prefix: String,
    pub segmenter: SegmenterKind,
    pub logging: LoggingConfig,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            intent_threshold: DEFAULT_INTENT_THRESHOLD,
            context_history_limit: DEFAULT_HISTORY_LIMIT,
            score_bonus: 1.0,
            bonus_prefix: "hoi_".to_string(),
            segmenter: SegmenterKind::Whitespace,
            logging: LoggingConfig::default(),
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// ログレベル (trace, debug, info, warn, error) または EnvFilter 式
    pub level: String,
    /// ログディレクトリ（未指定時は自動選択）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub console: bool,
    pub file: bool,
    /// daily / hourly / never
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            console: true,
            file: false,
            rotation: "daily".to_string(),
        }
    }
}

impl NluConfig {
    /// Defaults, then the config file, then environment variables
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        ConfigLoader::new()
            .load_from_file(path)
            .load_from_env()
            .build()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Commented sample configuration file
    pub fn sample_toml() -> Result<String> {
        let body = toml::to_string_pretty(&NluConfig::default())
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(format!(
            r#"# admissions-nlu configuration
#
# Save as admissions-nlu.toml (or config/admissions-nlu.toml).
# Every key can be overridden with NLU_-prefixed environment variables,
# nested keys separated by "__" (e.g. NLU_LOGGING__LEVEL=debug).
# INTENT_THRESHOLD and CONTEXT_HISTORY_LIMIT are honoured as well.

{}
# intent_threshold      minimum centroid similarity accepted without keyword backoff
# context_history_limit turns kept per session, oldest dropped first
# score_bonus           multiplier for intents starting with bonus_prefix (1.0 = off)
# segmenter             "whitespace" or "compound" (reads compounds.txt)
"#,
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NluConfig::default();
        assert_eq!(config.intent_threshold, 0.25);
        assert_eq!(config.context_history_limit, 10);
        assert_eq!(config.score_bonus, 1.0);
        assert_eq!(config.segmenter, SegmenterKind::Whitespace);
    }

    #[test]
    fn test_sample_toml_parses_back() {
        let sample = NluConfig::sample_toml().unwrap();
        let parsed: NluConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed, NluConfig::default());
    }
}
