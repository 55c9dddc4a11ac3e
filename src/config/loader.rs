use super::NluConfig;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Direct environment variables accepted on top of the `NLU_` prefix
const LEGACY_THRESHOLD_VAR: &str = "INTENT_THRESHOLD";
const LEGACY_HISTORY_VAR: &str = "CONTEXT_HISTORY_LIMIT";

/// Configuration loader with builder pattern
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    load_env: bool,
    env_override: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from file
    pub fn load_from_file(mut self, path: Option<&Path>) -> Self {
        self.config_file = path.map(Path::to_path_buf);
        self
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Use `vars` instead of the process environment
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.load_env = true;
        self.env_override = Some(vars);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<NluConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&NluConfig::default())?);

        if let Some(path) = &self.config_file {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.as_path()));
        } else {
            builder = builder
                .add_source(File::with_name("admissions-nlu").required(false))
                .add_source(File::with_name("config/admissions-nlu").required(false));
        }

        if self.load_env {
            let mut env = Environment::with_prefix("NLU")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true);
            if let Some(vars) = &self.env_override {
                env = env.source(Some(vars.clone()));
            }
            builder = builder.add_source(env);
        }

        let mut config: NluConfig = builder.build()?.try_deserialize()?;

        if self.load_env {
            match &self.env_override {
                Some(vars) => apply_legacy_overrides(&mut config, |k| vars.get(k).cloned())?,
                None => apply_legacy_overrides(&mut config, |k| std::env::var(k).ok())?,
            }
        }

        Ok(config)
    }
}

/// `INTENT_THRESHOLD` and `CONTEXT_HISTORY_LIMIT` override everything else.
/// Values are only type-coerced; a value that does not parse is an error.
fn apply_legacy_overrides(
    config: &mut NluConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = lookup(LEGACY_THRESHOLD_VAR) {
        config.intent_threshold = raw.trim().parse().map_err(|_| {
            Error::Config(format!("{} is not a number: {:?}", LEGACY_THRESHOLD_VAR, raw))
        })?;
    }
    if let Some(raw) = lookup(LEGACY_HISTORY_VAR) {
        config.context_history_limit = raw.trim().parse().map_err(|_| {
            Error::Config(format!("{} is not an integer: {:?}", LEGACY_HISTORY_VAR, raw))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmenterKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_file_then_env() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "data_dir = \"/srv/nlu\"\nintent_threshold = 0.3\nsegmenter = \"compound\"\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = ConfigLoader::new()
            .load_from_file(Some(file.path()))
            .with_env_vars(vars(&[("NLU_CONTEXT_HISTORY_LIMIT", "4")]))
            .build()
            .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/nlu"));
        assert_eq!(config.intent_threshold, 0.3);
        assert_eq!(config.context_history_limit, 4);
        assert_eq!(config.segmenter, SegmenterKind::Compound);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_legacy_variables_win() {
        let config = ConfigLoader::new()
            .with_env_vars(vars(&[
                ("NLU_INTENT_THRESHOLD", "0.4"),
                ("INTENT_THRESHOLD", "0.35"),
                ("CONTEXT_HISTORY_LIMIT", "3"),
            ]))
            .build()
            .unwrap();
        assert_eq!(config.intent_threshold, 0.35);
        assert_eq!(config.context_history_limit, 3);
    }

    #[test]
    fn test_unparsable_legacy_value() {
        let err = ConfigLoader::new()
            .with_env_vars(vars(&[("INTENT_THRESHOLD", "high")]))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_out_of_range_values_are_accepted() {
        let config = ConfigLoader::new()
            .with_env_vars(vars(&[
                ("INTENT_THRESHOLD", "1.5"),
                ("CONTEXT_HISTORY_LIMIT", "0"),
            ]))
            .build()
            .unwrap();
        assert_eq!(config.intent_threshold, 1.5);
        assert_eq!(config.context_history_limit, 0);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::new()
            .load_from_file(Some(Path::new("/nonexistent/admissions-nlu.toml")))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
